mod config;
mod db;
mod files;
mod ipc;
mod live;
mod model;
mod roles;
mod roster;
mod store;

use std::io::{self, BufRead, Write};

use tracing_subscriber::EnvFilter;

use crate::config::LernovaConfig;

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("LERNOVA_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn write_line(stdout: &mut impl Write, value: &impl serde::Serialize) {
    let line = serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string());
    let _ = writeln!(stdout, "{line}");
}

fn main() {
    let config = match LernovaConfig::load_with_dotenv() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("lernovad: {e}");
            std::process::exit(2);
        }
    };
    init_tracing(&config.log.level);

    let startup_workspace = config.store.workspace.clone();
    let mut state = ipc::AppState::new(config);
    if let Some(path) = startup_workspace {
        if let Err(e) = ipc::open_workspace(&mut state, &path) {
            tracing::error!(error = %format!("{e:#}"), "configured workspace could not be opened");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to reply to.
                tracing::warn!(error = %e, "bad request line");
                write_line(
                    &mut stdout,
                    &serde_json::json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    }),
                );
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        write_line(&mut stdout, &resp);
        for event in ipc::drain_events(&mut state) {
            write_line(&mut stdout, &event);
        }
        let _ = stdout.flush();
    }
}
