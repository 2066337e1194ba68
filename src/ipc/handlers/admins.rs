use crate::ipc::error::{no_workspace, ok, store_err};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::live::StorePath;
use crate::store::admins;
use serde_json::json;

fn handle_admins_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "admins": [] }));
    };
    match admins::list(conn) {
        Ok(emails) => ok(&req.id, json!({ "admins": emails })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_admins_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match admins::add(conn, &email) {
        Ok(added) => {
            if added {
                state.live.touch(StorePath::Admin);
            }
            ok(&req.id, json!({ "email": email, "added": added }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_admins_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match admins::remove(conn, &email) {
        Ok(()) => {
            state.live.touch(StorePath::Admin);
            ok(&req.id, json!({ "email": email }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "admins.list" => Some(handle_admins_list(state, req)),
        "admins.add" => Some(handle_admins_add(state, req)),
        "admins.remove" => Some(handle_admins_remove(state, req)),
        _ => None,
    }
}
