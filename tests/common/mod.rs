#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
}

/// Runs in `cwd` so a stray `lernova.toml` or `.env` is never picked up.
pub fn spawn_sidecar(cwd: &Path) -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_lernovad");
    let mut child = Command::new(exe)
        .current_dir(cwd)
        .env_remove("LERNOVA_STORE__WORKSPACE")
        .env_remove("LERNOVA_ADMIN__EMAILS")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn lernovad");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
    }
}

impl Sidecar {
    pub fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
    }

    pub fn read_line(&mut self) -> serde_json::Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read line");
        assert!(!line.trim().is_empty(), "sidecar closed stdout");
        serde_json::from_str(line.trim()).expect("parse json line")
    }

    /// Returns the response line; the next line must carry this id, so any
    /// unexpected event queued before it fails here.
    pub fn request(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        self.send_raw(&payload.to_string());
        let value = self.read_line();
        assert_eq!(
            value.get("id").and_then(|v| v.as_str()),
            Some(id),
            "expected response to {}, got {}",
            method,
            value
        );
        value
    }

    pub fn request_ok(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or(serde_json::Value::Null)
    }

    /// Returns the error code of a failed request.
    pub fn request_err(&mut self, id: &str, method: &str, params: serde_json::Value) -> String {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value["error"]["code"]
            .as_str()
            .expect("error code")
            .to_string()
    }

    /// Blocks until the next line; only call when an event is owed.
    pub fn read_event(&mut self) -> serde_json::Value {
        let value = self.read_line();
        assert!(value.get("event").is_some(), "expected event, got {}", value);
        value
    }

    pub fn open_workspace(&mut self, dir: &Path) {
        self.request_ok(
            "ws",
            "workspace.select",
            json!({ "path": dir.to_string_lossy() }),
        );
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
