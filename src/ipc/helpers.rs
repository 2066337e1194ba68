use serde::de::DeserializeOwned;

use super::error::err;
use super::types::Request;
use crate::live::{SortSpec, StorePath};

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{key} must not be empty"),
            None,
        )),
        None => Err(err(&req.id, "bad_params", format!("missing {key}"), None)),
    }
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Deserialize the whole params object.
pub fn params_as<T: DeserializeOwned>(req: &Request) -> Result<T, serde_json::Value> {
    serde_json::from_value(req.params.clone())
        .map_err(|e| err(&req.id, "bad_params", e.to_string(), None))
}

/// Deserialize one params field; a missing field is an error.
pub fn param_as<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, serde_json::Value> {
    let Some(raw) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {key}"), None));
    };
    serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("invalid {key}: {e}"),
            None,
        )
    })
}

pub fn optional_sort(req: &Request) -> Result<Option<SortSpec>, serde_json::Value> {
    match req.params.get("sort") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => param_as(req, "sort").map(Some),
    }
}

pub fn store_path(req: &Request, key: &str) -> Result<StorePath, serde_json::Value> {
    let raw = required_str(req, key)?;
    raw.parse()
        .map_err(|e: String| err(&req.id, "bad_params", e, Some(serde_json::json!({ "value": raw }))))
}
