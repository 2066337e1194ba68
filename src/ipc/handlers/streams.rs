use crate::files;
use crate::ipc::error::{err, no_workspace, ok, store_err};
use crate::ipc::helpers::{optional_sort, optional_str, param_as, required_str};
use crate::ipc::types::{AppState, Request};
use crate::live::{sort_records, StorePath};
use crate::model::{Attachment, AuthorRole, Role};
use crate::store::streams::{self, NewPost};
use crate::store::{students, trainers, StoreError};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct AttachmentParams {
    url: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    file_type: Option<String>,
}

impl AttachmentParams {
    fn into_attachment(self, index: usize) -> Attachment {
        let mut att = files::describe(&self.url, self.size, index);
        if let Some(name) = self.name.filter(|n| !n.trim().is_empty()) {
            att.name = name;
        }
        if let Some(t) = self.file_type.filter(|t| !t.trim().is_empty()) {
            att.file_type = t;
        }
        att
    }
}

struct Author {
    email: String,
    name: String,
    role: AuthorRole,
}

/// Posting on a trainer's behalf uses the trainer's email, or the email of
/// whoever created the trainer when it has none.
fn trainer_author(conn: &Connection, trainer_id: &str) -> Result<Author, StoreError> {
    let t = trainers::get(conn, trainer_id)?;
    let email = t
        .email
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(t.creator_email);
    Ok(Author {
        email,
        name: t.name,
        role: AuthorRole::Trainer,
    })
}

fn session_author(state: &AppState, conn: &Connection) -> Result<Option<Author>, StoreError> {
    let Some(session) = state.session.as_ref() else {
        return Ok(None);
    };
    match session.role {
        Some(Role::Admin) => Ok(Some(Author {
            email: session.email.clone(),
            name: session.email.clone(),
            role: AuthorRole::Admin,
        })),
        Some(Role::Student) => Ok(students::find_by_email(conn, &session.email)?.map(|s| Author {
            email: s.email,
            name: s.name,
            role: AuthorRole::Student,
        })),
        _ => Ok(None),
    }
}

fn resolve_author(
    state: &AppState,
    conn: &Connection,
    req: &Request,
) -> Result<Author, serde_json::Value> {
    if let Some(trainer_id) = optional_str(req, "trainerId") {
        return trainer_author(conn, &trainer_id).map_err(|e| store_err(&req.id, &e));
    }
    let fallback = session_author(state, conn).map_err(|e| store_err(&req.id, &e))?;
    let role = match req.params.get("authorRole") {
        None | Some(serde_json::Value::Null) => fallback.as_ref().map(|a| a.role),
        Some(_) => Some(param_as::<AuthorRole>(req, "authorRole")?),
    };
    let (fb_email, fb_name) = match fallback {
        Some(a) => (Some(a.email), Some(a.name)),
        None => (None, None),
    };
    let email = optional_str(req, "authorEmail").or(fb_email);
    let name = optional_str(req, "authorName").or(fb_name);
    match (email, name, role) {
        (Some(email), Some(name), Some(role)) => Ok(Author { email, name, role }),
        _ => Err(err(
            &req.id,
            "bad_params",
            "post author unknown: pass trainerId, authorEmail/authorName/authorRole, or sign in",
            None,
        )),
    }
}

fn handle_streams_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let batch = match required_str(req, "batch") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "posts": [] }));
    };
    let sort = match optional_sort(req) {
        Ok(v) => v.or_else(|| StorePath::Stream(batch.clone()).default_sort()),
        Err(resp) => return resp,
    };
    match streams::list(conn, &batch) {
        Ok(mut posts) => {
            if let Some(spec) = sort {
                sort_records(&mut posts, spec);
            }
            ok(&req.id, json!({ "batch": batch, "posts": posts }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_streams_post(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let batch = match required_str(req, "batch") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let raw_attachments: Vec<AttachmentParams> = match req.params.get("attachments") {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(_) => match param_as(req, "attachments") {
            Ok(v) => v,
            Err(resp) => return resp,
        },
    };
    let author = match resolve_author(state, conn, req) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    let input = NewPost {
        batch: batch.clone(),
        author_email: author.email,
        author_name: author.name,
        author_role: author.role,
        text: req
            .params
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim()
            .to_string(),
        attachments: raw_attachments
            .into_iter()
            .enumerate()
            .map(|(i, a)| a.into_attachment(i))
            .collect(),
    };
    match streams::post(conn, input, &state.config.uploads) {
        Ok(p) => {
            state.live.touch(StorePath::Stream(batch));
            ok(&req.id, json!({ "postId": p.id, "post": p }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_streams_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let batch = match required_str(req, "batch") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let post_id = match required_str(req, "postId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match streams::delete(conn, &batch, &post_id) {
        Ok(()) => {
            state.live.touch(StorePath::Stream(batch));
            ok(&req.id, json!({ "postId": post_id }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "streams.list" => Some(handle_streams_list(state, req)),
        "streams.post" => Some(handle_streams_post(state, req)),
        "streams.delete" => Some(handle_streams_delete(state, req)),
        _ => None,
    }
}
