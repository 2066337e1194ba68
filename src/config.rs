//! Layered configuration for the sidecar.
//!
//! Sources, highest priority last:
//! 1. Built-in defaults
//! 2. `lernova.toml` in the working directory
//! 3. Environment variables (`LERNOVA_*`, `__` separates sections)
//!
//! `LERNOVA_STORE__WORKSPACE=/data/lernova` maps to `store.workspace`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const CONFIG_FILE: &str = "lernova.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LernovaConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub uploads: UploadLimits,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Workspace directory opened at start-up. Without it the client must
    /// call `workspace.select` first.
    #[serde(default)]
    pub workspace: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Emails seeded into the admin allow-list whenever a workspace opens.
    #[serde(default)]
    pub emails: Vec<String>,
}

/// Per-category ceilings applied to attachment sizes reported by the
/// upload service.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct UploadLimits {
    #[serde(default = "default_image_max")]
    pub image_max_bytes: u64,
    #[serde(default = "default_pdf_max")]
    pub pdf_max_bytes: u64,
    #[serde(default = "default_text_max")]
    pub text_max_bytes: u64,
    #[serde(default = "default_office_max")]
    pub office_max_bytes: u64,
}

const MB: u64 = 1024 * 1024;

const fn default_image_max() -> u64 {
    4 * MB
}

const fn default_pdf_max() -> u64 {
    4 * MB
}

const fn default_text_max() -> u64 {
    MB
}

const fn default_office_max() -> u64 {
    8 * MB
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            image_max_bytes: default_image_max(),
            pdf_max_bytes: default_pdf_max(),
            text_max_bytes: default_text_max(),
            office_max_bytes: default_office_max(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Filter used when `LERNOVA_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LernovaConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` from the working directory (if any), then the figment chain.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let local_path = PathBuf::from(CONFIG_FILE);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // LERNOVA_LOG is the tracing filter, not a config key.
        figment.merge(Env::prefixed("LERNOVA_").split("__").ignore(&["log"]))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(email) = self.admin.emails.iter().find(|e| e.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "admin.emails".into(),
                reason: format!("blank entry {email:?}"),
            });
        }
        let limits = [
            ("uploads.image_max_bytes", self.uploads.image_max_bytes),
            ("uploads.pdf_max_bytes", self.uploads.pdf_max_bytes),
            ("uploads.text_max_bytes", self.uploads.text_max_bytes),
            ("uploads.office_max_bytes", self.uploads.office_max_bytes),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    reason: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_upload_router() {
        let config = LernovaConfig::default();
        assert!(config.store.workspace.is_none());
        assert!(config.admin.emails.is_empty());
        assert_eq!(config.uploads.image_max_bytes, 4 * MB);
        assert_eq!(config.uploads.text_max_bytes, MB);
        assert_eq!(config.uploads.office_max_bytes, 8 * MB);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn toml_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [store]
                workspace = "/srv/lernova"

                [admin]
                emails = ["head@school.test"]

                [uploads]
                pdf_max_bytes = 1000
                "#,
            )?;
            jail.set_env("LERNOVA_UPLOADS__PDF_MAX_BYTES", "2000");
            jail.set_env("LERNOVA_LOG__LEVEL", "debug");
            jail.set_env("LERNOVA_LOG", "lernovad=trace");

            let config = LernovaConfig::load().expect("config loads");
            assert_eq!(config.store.workspace, Some(PathBuf::from("/srv/lernova")));
            assert_eq!(config.admin.emails, vec!["head@school.test".to_string()]);
            assert_eq!(config.uploads.pdf_max_bytes, 2000);
            assert_eq!(config.uploads.image_max_bytes, 4 * MB);
            assert_eq!(config.log.level, "debug");
            Ok(())
        });
    }

    #[test]
    fn zero_limit_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("LERNOVA_UPLOADS__TEXT_MAX_BYTES", "0");
            let err = LernovaConfig::load().expect_err("zero limit");
            assert!(matches!(err, ConfigError::InvalidValue { .. }));
            Ok(())
        });
    }
}
