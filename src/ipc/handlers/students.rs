use crate::ipc::error::{no_workspace, ok, store_err};
use crate::ipc::helpers::{optional_sort, optional_str, param_as, params_as, required_str};
use crate::ipc::types::{AppState, Request};
use crate::live::{sort_records, StorePath};
use crate::roster;
use crate::store::students::{self, NewStudent, StudentPatch};
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };
    let sort = match optional_sort(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let query = optional_str(req, "query").unwrap_or_default();
    let batch = optional_str(req, "batch");

    match students::list(conn) {
        Ok(all) => {
            let mut rows: Vec<_> = all
                .into_iter()
                .filter(|s| roster::student_matches(s, &query))
                .filter(|s| match &batch {
                    Some(b) => s.batches.iter().any(|l| l == b),
                    None => true,
                })
                .collect();
            if let Some(spec) = sort {
                sort_records(&mut rows, spec);
            }
            ok(&req.id, json!({ "students": rows }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match students::get(conn, &student_id) {
        Ok(s) => ok(&req.id, json!({ "student": s })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let actor = state.actor_email();
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let input: NewStudent = match params_as(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match students::create(conn, input, &actor) {
        Ok(s) => {
            state.live.touch(StorePath::Students);
            ok(&req.id, json!({ "studentId": s.id, "student": s }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch: StudentPatch = match param_as(req, "patch") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match students::update(conn, &student_id, patch) {
        Ok(s) => {
            state.live.touch(StorePath::Students);
            ok(&req.id, json!({ "student": s }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match students::delete(conn, &student_id) {
        Ok(()) => {
            state.live.touch(StorePath::Students);
            ok(&req.id, json!({ "studentId": student_id }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
