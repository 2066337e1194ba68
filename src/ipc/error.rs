use serde_json::json;

use crate::store::StoreError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn no_workspace(id: &str) -> serde_json::Value {
    err(id, "no_workspace", "select a workspace first", None)
}

pub fn store_err(id: &str, e: &StoreError) -> serde_json::Value {
    let details = match e {
        StoreError::NotFound { entity, id: missing } => {
            Some(json!({ "entity": entity, "id": missing }))
        }
        StoreError::FileTooLarge { name, size, limit } => {
            Some(json!({ "name": name, "size": size, "limit": limit }))
        }
        StoreError::InvalidTransition { from, to, .. } => Some(json!({ "from": from, "to": to })),
        StoreError::Db(_) | StoreError::Json(_) | StoreError::Corrupt(_) => {
            tracing::error!(error = %e, "store failure");
            None
        }
        StoreError::Validation(_) => None,
    };
    err(id, e.code(), e.to_string(), details)
}
