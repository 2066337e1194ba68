use crate::ipc::error::{err, no_workspace, ok};
use crate::ipc::helpers::{optional_sort, required_str, store_path};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// The initial snapshot follows the response as the first event for the
/// new subscription.
fn handle_live_subscribe(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return no_workspace(&req.id);
    }
    let path = match store_path(req, "path") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let sort = match optional_sort(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let id = state.live.subscribe(path.clone(), sort);
    ok(&req.id, json!({ "subscriptionId": id, "path": path }))
}

fn handle_live_switch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let sub_id = match required_str(req, "subscriptionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let path = match store_path(req, "path") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let sort = match optional_sort(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !state.live.switch(&sub_id, path.clone(), sort) {
        return err(
            &req.id,
            "not_found",
            format!("no subscription {sub_id}"),
            Some(json!({ "entity": "subscription", "id": sub_id })),
        );
    }
    ok(&req.id, json!({ "subscriptionId": sub_id, "path": path }))
}

fn handle_live_unsubscribe(state: &mut AppState, req: &Request) -> serde_json::Value {
    let sub_id = match required_str(req, "subscriptionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !state.live.unsubscribe(&sub_id) {
        return err(
            &req.id,
            "not_found",
            format!("no subscription {sub_id}"),
            Some(json!({ "entity": "subscription", "id": sub_id })),
        );
    }
    ok(&req.id, json!({ "subscriptionId": sub_id }))
}

fn handle_live_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "subscriptions": state.live.subscriptions() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "live.subscribe" => Some(handle_live_subscribe(state, req)),
        "live.switch" => Some(handle_live_switch(state, req)),
        "live.unsubscribe" => Some(handle_live_unsubscribe(state, req)),
        "live.list" => Some(handle_live_list(state, req)),
        _ => None,
    }
}
