use crate::ipc::error::{ok, store_err};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::model::{Student, Trainer};
use crate::roster;
use crate::store::{students, trainers, StoreError};
use rusqlite::Connection;
use serde_json::json;

fn load(conn: &Connection) -> Result<(Vec<Trainer>, Vec<Student>), StoreError> {
    Ok((trainers::list(conn)?, students::list(conn)?))
}

fn handle_roster_batches(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "labels": [], "batches": [], "orphans": [] }));
    };
    match load(conn) {
        Ok((t, s)) => ok(
            &req.id,
            json!({
                "labels": roster::distinct_labels(&t),
                "batches": roster::batch_index(&t, &s),
                "orphans": roster::orphan_labels(&t, &s),
            }),
        ),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_roster_subjects(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "subjects": [] }));
    };
    match trainers::list(conn) {
        Ok(t) => ok(&req.id, json!({ "subjects": roster::subjects(&t) })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_roster_batches_for_subject(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "subject": subject, "batches": [] }));
    };
    match trainers::list(conn) {
        Ok(t) => ok(
            &req.id,
            json!({
                "subject": subject,
                "batches": roster::batches_for_subject(&t, &subject),
            }),
        ),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.batches" => Some(handle_roster_batches(state, req)),
        "roster.subjects" => Some(handle_roster_subjects(state, req)),
        "roster.batchesForSubject" => Some(handle_roster_batches_for_subject(state, req)),
        _ => None,
    }
}
