use crate::files;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::param_as;
use crate::ipc::types::{AppState, Request};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct FileRef {
    url: String,
    #[serde(default)]
    size: Option<u64>,
}

fn file_refs(req: &Request) -> Result<Vec<FileRef>, serde_json::Value> {
    if req.params.get("files").is_some() {
        return param_as(req, "files");
    }
    if req.params.get("urls").is_some() {
        let urls: Vec<String> = param_as(req, "urls")?;
        return Ok(urls
            .into_iter()
            .map(|url| FileRef { url, size: None })
            .collect());
    }
    Err(err(&req.id, "bad_params", "missing files or urls", None))
}

/// Pure metadata: nothing is stored and no path is touched.
fn handle_files_describe(state: &mut AppState, req: &Request) -> serde_json::Value {
    let refs = match file_refs(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut attachments = Vec::with_capacity(refs.len());
    for (i, r) in refs.into_iter().enumerate() {
        if r.url.trim().is_empty() {
            return err(
                &req.id,
                "bad_params",
                format!("file {i} has an empty url"),
                None,
            );
        }
        let att = files::describe(r.url.trim(), r.size, i);
        if let Err(e) = files::check_size(&att, &state.config.uploads) {
            return err(
                &req.id,
                "file_too_large",
                e.to_string(),
                Some(json!({ "name": e.name, "size": e.size, "limit": e.limit })),
            );
        }
        attachments.push(att);
    }
    ok(&req.id, json!({ "attachments": attachments }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "files.describe" => Some(handle_files_describe(state, req)),
        _ => None,
    }
}
