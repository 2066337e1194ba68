use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type Family = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const FAMILIES: &[Family] = &[
    handlers::core::try_handle,
    handlers::session::try_handle,
    handlers::admins::try_handle,
    handlers::trainers::try_handle,
    handlers::students::try_handle,
    handlers::assignments::try_handle,
    handlers::streams::try_handle,
    handlers::roster::try_handle,
    handlers::files::try_handle,
    handlers::live::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    for family in FAMILIES {
        if let Some(resp) = family(state, &req) {
            return resp;
        }
    }

    tracing::debug!(method = %req.method, "unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
