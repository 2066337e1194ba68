use crate::ipc::error::{err, no_workspace, ok, store_err};
use crate::ipc::helpers::{optional_sort, optional_str, param_as, required_str};
use crate::ipc::types::{AppState, Request};
use crate::live::{sort_records, StorePath};
use crate::model::{AssignmentStatus, Role};
use crate::store::assignments::{self, NewFeedback, NewSubmission};
use crate::store::students;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct FeedbackParams {
    text: String,
    #[serde(default)]
    author: Option<String>,
}

/// `feedback` may be a bare string or `{ text, author? }`; the author
/// defaults to the signed-in email.
fn feedback_param(
    req: &Request,
    actor: &str,
) -> Result<Option<NewFeedback>, serde_json::Value> {
    let parsed = match req.params.get("feedback") {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::String(text)) => FeedbackParams {
            text: text.clone(),
            author: None,
        },
        Some(_) => param_as::<FeedbackParams>(req, "feedback")?,
    };
    Ok(Some(NewFeedback {
        text: parsed.text,
        author: parsed
            .author
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| actor.to_string()),
    }))
}

fn ids(req: &Request) -> Result<(String, String), serde_json::Value> {
    Ok((
        required_str(req, "trainerId")?,
        required_str(req, "assignmentId")?,
    ))
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let trainer_id = match required_str(req, "trainerId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "assignments": [] }));
    };
    let sort = match optional_sort(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = match optional_str(req, "status").map(|s| s.parse::<AssignmentStatus>()) {
        None => None,
        Some(Ok(s)) => Some(s),
        Some(Err(e)) => return err(&req.id, "bad_params", e, None),
    };

    match assignments::list(conn, &trainer_id) {
        Ok(all) => {
            let mut rows: Vec<_> = all
                .into_iter()
                .filter(|a| status.map_or(true, |s| a.status == s))
                .collect();
            if let Some(spec) = sort {
                sort_records(&mut rows, spec);
            }
            ok(&req.id, json!({ "assignments": rows }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_assignments_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let trainer_id = match required_str(req, "trainerId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let file_url = match required_str(req, "fileUrl") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut student_name = optional_str(req, "studentName");
    let mut student_email = optional_str(req, "studentEmail");
    // A signed-in student submits as themselves unless told otherwise.
    if student_name.is_none() || student_email.is_none() {
        if let Some(session) = state
            .session
            .as_ref()
            .filter(|s| s.role == Some(Role::Student))
        {
            match students::find_by_email(conn, &session.email) {
                Ok(Some(s)) => {
                    student_name = student_name.or(Some(s.name));
                    student_email = student_email.or(Some(s.email));
                }
                Ok(None) => {}
                Err(e) => return store_err(&req.id, &e),
            }
        }
    }

    let input = NewSubmission {
        student_name: student_name.unwrap_or_default(),
        student_email: student_email.unwrap_or_default(),
        file_url,
        file_name: optional_str(req, "fileName"),
    };
    match assignments::submit(conn, &trainer_id, input) {
        Ok(a) => {
            state.live.touch(StorePath::Assignments(trainer_id));
            ok(&req.id, json!({ "assignmentId": a.id, "assignment": a }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_assignments_mark_checked(state: &mut AppState, req: &Request) -> serde_json::Value {
    let actor = state.actor_email();
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let (trainer_id, assignment_id) = match ids(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let feedback = match feedback_param(req, &actor) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match assignments::mark_checked(conn, &trainer_id, &assignment_id, feedback) {
        Ok(a) => {
            state.live.touch(StorePath::Assignments(trainer_id));
            ok(&req.id, json!({ "assignment": a }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_assignments_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let (trainer_id, assignment_id) = match ids(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status: AssignmentStatus = match param_as(req, "status") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match assignments::set_status(conn, &trainer_id, &assignment_id, status) {
        Ok(a) => {
            state.live.touch(StorePath::Assignments(trainer_id));
            ok(&req.id, json!({ "assignment": a }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_assignments_add_feedback(state: &mut AppState, req: &Request) -> serde_json::Value {
    let actor = state.actor_email();
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let (trainer_id, assignment_id) = match ids(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let feedback = match feedback_param(req, &actor) {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "bad_params", "missing feedback", None),
        Err(resp) => return resp,
    };
    match assignments::add_feedback(conn, &trainer_id, &assignment_id, feedback) {
        Ok(a) => {
            state.live.touch(StorePath::Assignments(trainer_id));
            ok(&req.id, json!({ "assignment": a }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.list" => Some(handle_assignments_list(state, req)),
        "assignments.submit" => Some(handle_assignments_submit(state, req)),
        "assignments.markChecked" => Some(handle_assignments_mark_checked(state, req)),
        "assignments.setStatus" => Some(handle_assignments_set_status(state, req)),
        "assignments.addFeedback" => Some(handle_assignments_add_feedback(state, req)),
        _ => None,
    }
}
