//! Environment-driven settings.
//!
//! All configuration comes from `ORGANIZER_*` environment variables; there
//! are no config files and no file-stored secrets.

use std::env;
use std::path::PathBuf;

use crate::error::{OrganizerError, OrganizerResult};

const DEFAULT_PORT: u16 = 4114;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// LLM backend: "hosted", "local", or "demo".
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_timeout_secs: u64,

    pub store_backend: StoreBackend,
    /// SQLite database file (sqlite backend).
    pub db_path: PathBuf,
    /// Directory for the flat-file JSON store (json backend).
    pub data_dir: PathBuf,

    pub host: String,
    pub port: u16,
    /// CORS allow-list; empty means allow any origin.
    pub allowed_origins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> OrganizerResult<Self> {
        let llm_provider = env_or("ORGANIZER_LLM_PROVIDER", "demo");

        let store_backend = match env_or("ORGANIZER_STORE", "sqlite").as_str() {
            "sqlite" => StoreBackend::Sqlite,
            "json" => StoreBackend::Json,
            other => {
                return Err(OrganizerError::Config(format!(
                    "ORGANIZER_STORE must be 'sqlite' or 'json', got '{other}'"
                )));
            }
        };

        let port = match env::var("ORGANIZER_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| {
                OrganizerError::Config(format!("ORGANIZER_PORT must be a port number, got '{raw}'"))
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let llm_timeout_secs = match env::var("ORGANIZER_LLM_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                OrganizerError::Config(format!(
                    "ORGANIZER_LLM_TIMEOUT_SECS must be an integer, got '{raw}'"
                ))
            })?,
            Err(_) => DEFAULT_LLM_TIMEOUT_SECS,
        };

        let allowed_origins = env::var("ORGANIZER_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Settings {
            llm_provider,
            llm_model: env_or("ORGANIZER_LLM_MODEL", "default"),
            llm_api_key: env::var("ORGANIZER_LLM_API_KEY").ok(),
            llm_base_url: env::var("ORGANIZER_LLM_BASE_URL").ok(),
            llm_timeout_secs,
            store_backend,
            db_path: PathBuf::from(env_or("ORGANIZER_DB_PATH", "organizer.db")),
            data_dir: PathBuf::from(env_or("ORGANIZER_DATA_DIR", "organizer_data")),
            host: env_or("ORGANIZER_HOST", "127.0.0.1"),
            port,
            allowed_origins,
        })
    }
}

impl Default for Settings {
    /// Offline defaults: demo provider, sqlite store.
    fn default() -> Self {
        Settings {
            llm_provider: "demo".to_string(),
            llm_model: "default".to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            store_backend: StoreBackend::Sqlite,
            db_path: PathBuf::from("organizer.db"),
            data_dir: PathBuf::from("organizer_data"),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            allowed_origins: Vec::new(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
