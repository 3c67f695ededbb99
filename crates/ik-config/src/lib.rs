//! # ik-config
//!
//! Layered settings: built-in defaults, then an optional `infoking.toml`,
//! then `INFOKING__*` environment variables (a `.env` file is honoured).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "INFOKING";
const DEFAULT_FILE: &str = "infoking";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Which persistence plugin the binary wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// JSON documents in `data_dir`.
    Local,
    /// Relational store at `database_url`.
    Sqlite,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    backend: Backend,
    data_dir: PathBuf,
    database_url: String,
    #[serde(default)]
    gemini_api_key: Option<String>,
    #[serde(default)]
    text_model: Option<String>,
    #[serde(default)]
    image_model: Option<String>,
    auth_providers: Vec<String>,
    log_filter: String,
    log_json: bool,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub database_url: String,
    /// `None` when unset or blank; generation then reports "not configured".
    pub gemini_api_key: Option<SecretString>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    /// Third-party sign-in providers offered by the auth plugin.
    pub auth_providers: Vec<String>,
    pub log_filter: String,
    pub log_json: bool,
}

impl Settings {
    /// Reads `.env`, `./infoking.toml` and the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::build(Some(Path::new(DEFAULT_FILE)), None)
    }

    /// Same layering with an explicit file and environment map.
    pub fn load_from(
        file: Option<&Path>,
        env: HashMap<String, String>,
    ) -> Result<Self, SettingsError> {
        Self::build(file, Some(env))
    }

    fn build(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("backend", "local")?
            .set_default("data_dir", "./data")?
            .set_default("database_url", "sqlite://infoking.db?mode=rwc")?
            .set_default("auth_providers", vec!["google", "github"])?
            .set_default("log_filter", "info")?
            .set_default("log_json", false)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }

        let raw: RawSettings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth_providers")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        Self::validate(raw)
    }

    fn validate(raw: RawSettings) -> Result<Self, SettingsError> {
        if raw.backend == Backend::Sqlite && raw.database_url.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "database_url",
                reason: "required when backend = \"sqlite\"".to_string(),
            });
        }
        if raw.log_filter.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "log_filter",
                reason: "must not be empty".to_string(),
            });
        }

        let gemini_api_key = raw
            .gemini_api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(SecretString::from);

        let auth_providers = raw
            .auth_providers
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(Self {
            backend: raw.backend,
            data_dir: raw.data_dir,
            database_url: raw.database_url,
            gemini_api_key,
            text_model: raw.text_model.filter(|m| !m.trim().is_empty()),
            image_model: raw.image_model.filter(|m| !m.trim().is_empty()),
            auth_providers,
            log_filter: raw.log_filter,
            log_json: raw.log_json,
        })
    }
}
