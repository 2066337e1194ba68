use crate::ipc::error::{err, no_workspace, ok, store_err};
use crate::ipc::helpers::{optional_sort, optional_str, param_as, params_as, required_str};
use crate::ipc::types::{AppState, Request};
use crate::live::{sort_records, StorePath};
use crate::roster;
use crate::store::trainers::{self, NewTrainer, TrainerPatch};
use serde_json::json;

fn handle_trainers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "trainers": [] }));
    };
    let sort = match optional_sort(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let query = optional_str(req, "query").unwrap_or_default();

    match trainers::list(conn) {
        Ok(all) => {
            let mut rows: Vec<_> = all
                .into_iter()
                .filter(|t| roster::trainer_matches(t, &query))
                .collect();
            if let Some(spec) = sort {
                sort_records(&mut rows, spec);
            }
            ok(&req.id, json!({ "trainers": rows }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_trainers_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let trainer_id = match required_str(req, "trainerId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match trainers::get(conn, &trainer_id) {
        Ok(t) => ok(&req.id, json!({ "trainer": t })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_trainers_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let actor = state.actor_email();
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let input: NewTrainer = match params_as(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match trainers::create(conn, input, &actor) {
        Ok(t) => {
            state.live.touch(StorePath::Trainers);
            ok(&req.id, json!({ "trainerId": t.id, "trainer": t }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_trainers_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let actor = state.actor_email();
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let trainer_id = match required_str(req, "trainerId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch: TrainerPatch = match param_as(req, "patch") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match trainers::update(conn, &trainer_id, patch, &actor) {
        Ok(t) => {
            state.live.touch(StorePath::Trainers);
            ok(&req.id, json!({ "trainer": t }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_trainers_batch(state: &mut AppState, req: &Request, add: bool) -> serde_json::Value {
    let actor = state.actor_email();
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let trainer_id = match required_str(req, "trainerId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    // Removal matches the stored label exactly, so it is not trimmed.
    let Some(label) = req.params.get("batch").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing batch", None);
    };

    let result = if add {
        trainers::add_batch(conn, &trainer_id, label, &actor)
    } else {
        trainers::remove_batch(conn, &trainer_id, label, &actor)
    };
    match result {
        Ok(t) => {
            state.live.touch(StorePath::Trainers);
            let notice = if add {
                format!("Batch {} added successfully", label.trim())
            } else {
                format!("Batch {label} removed successfully")
            };
            ok(&req.id, json!({ "trainer": t, "notice": notice }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_trainers_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let trainer_id = match required_str(req, "trainerId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match trainers::delete(conn, &trainer_id) {
        Ok(()) => {
            state.live.touch(StorePath::Trainers);
            ok(&req.id, json!({ "trainerId": trainer_id }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "trainers.list" => Some(handle_trainers_list(state, req)),
        "trainers.get" => Some(handle_trainers_get(state, req)),
        "trainers.create" => Some(handle_trainers_create(state, req)),
        "trainers.update" => Some(handle_trainers_update(state, req)),
        "trainers.addBatch" => Some(handle_trainers_batch(state, req, true)),
        "trainers.removeBatch" => Some(handle_trainers_batch(state, req, false)),
        "trainers.delete" => Some(handle_trainers_delete(state, req)),
        _ => None,
    }
}
