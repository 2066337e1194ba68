use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::config::LernovaConfig;
use crate::live::LiveHub;
use crate::model::{Role, UNKNOWN_EMAIL};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Identity handed over by the identity provider. `role` stays `None`
/// until resolution succeeds.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
    pub role: Option<Role>,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: LernovaConfig,
    pub session: Option<Session>,
    pub live: LiveHub,
}

impl AppState {
    pub fn new(config: LernovaConfig) -> Self {
        Self {
            workspace: None,
            db: None,
            config,
            session: None,
            live: LiveHub::new(),
        }
    }

    /// Email stamped on creator/editor fields.
    pub fn actor_email(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.email.clone())
            .unwrap_or_else(|| UNKNOWN_EMAIL.to_string())
    }
}
