use crate::ipc::error::{err, no_workspace, ok, store_err};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request, Session};
use crate::model::Role;
use crate::roles;
use crate::store::students;
use serde_json::json;

fn session_json(state: &AppState) -> serde_json::Value {
    match state.session.as_ref() {
        Some(s) => json!({
            "email": s.email,
            "role": s.role,
            "resolved": s.role.is_some(),
        }),
        None => json!({ "email": null, "role": null, "resolved": false }),
    }
}

/// Re-runs role resolution for the current identity. A read failure is
/// logged and leaves the role unresolved; there is no retry.
pub(crate) fn refresh_role(state: &mut AppState) -> Option<Role> {
    let Some(session) = state.session.as_mut() else {
        return None;
    };
    session.role = None;
    let conn = state.db.as_ref()?;
    match roles::resolve_role(conn, &session.email) {
        Ok(role) => {
            tracing::info!(email = %session.email, role = ?role, "role resolved");
            session.role = Some(role);
        }
        Err(e) => {
            tracing::error!(email = %session.email, error = %e, "role resolution failed");
        }
    }
    session.role
}

fn handle_sign_in(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let same_identity = state
        .session
        .as_ref()
        .map(|s| s.email == email && s.role.is_some())
        .unwrap_or(false);
    if !same_identity {
        state.session = Some(Session { email, role: None });
        refresh_role(state);
    }
    ok(&req.id, session_json(state))
}

fn handle_sign_out(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(s) = state.session.take() {
        tracing::info!(email = %s.email, "signed out");
    }
    ok(&req.id, session_json(state))
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, session_json(state))
}

fn handle_resolve(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.session.is_none() {
        return err(&req.id, "no_session", "sign in first", None);
    }
    if state.db.is_none() {
        return no_workspace(&req.id);
    }
    refresh_role(state);
    ok(&req.id, session_json(state))
}

fn handle_profile(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_session", "sign in first", None);
    };

    let student = match students::find_by_email(conn, &session.email) {
        Ok(Some(s)) => s,
        Ok(None) => {
            return err(
                &req.id,
                "not_found",
                "Student record not found. Please contact your administrator.",
                Some(json!({ "email": session.email })),
            )
        }
        Err(e) => return store_err(&req.id, &e),
    };

    let default_batch = student.batches.first().cloned();
    let notice = if default_batch.is_none() {
        Some("You are not assigned to any batch.")
    } else {
        None
    };
    ok(
        &req.id,
        json!({
            "student": student,
            "defaultBatch": default_batch,
            "notice": notice,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.signIn" => Some(handle_sign_in(state, req)),
        "session.signOut" => Some(handle_sign_out(state, req)),
        "session.current" => Some(handle_current(state, req)),
        "session.resolve" => Some(handle_resolve(state, req)),
        "session.profile" => Some(handle_profile(state, req)),
        _ => None,
    }
}
