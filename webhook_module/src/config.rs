//! Runtime configuration from the environment and an optional TOML file.
//!
//! Environment variables always win over the file. The file only carries
//! non-secret settings: listen address, collection names and the note source.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use line_messaging_module::{LineClientConfig, DEFAULT_LINE_API_BASE_URL};
use serde::Deserialize;

use crate::google_auth::{GoogleAuthConfig, DEFAULT_TOKEN_URI};
use crate::records::Collections;
use crate::router::DEFAULT_NOTE_SOURCE;
use crate::store::{FirestoreConfig, DEFAULT_FIRESTORE_API_BASE_URL};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Bearer token the Firestore emulator accepts for any project.
const EMULATOR_TOKEN: &str = "owner";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default)]
pub struct WebhookConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub collections: Collections,
    #[serde(default)]
    pub notes: NotesSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct NotesSection {
    pub source: Option<String>,
}

pub fn load_config_file(path: &Path) -> Result<WebhookConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct FirebaseSettings {
    pub project_id: String,
    pub client_email: Option<String>,
    pub private_key: Option<String>,
    pub api_base_url: String,
    pub token_uri: String,
    /// `host:port` of a local Firestore emulator
    pub emulator_host: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LineSettings {
    pub access_token: String,
    pub channel_secret: Option<String>,
    pub api_base_url: String,
    /// Reject requests whose signature does not verify
    pub enforce_signature: bool,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub http_timeout: Duration,
    pub collections: Collections,
    pub note_source: String,
    pub firebase: FirebaseSettings,
    pub line: LineSettings,
    pub config_path: Option<PathBuf>,
}

impl WebhookConfig {
    /// Build the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_path = env_value("WEBHOOK_CONFIG_PATH").map(PathBuf::from);
        let file = match config_path.as_deref() {
            Some(path) => load_config_file(path)?,
            None => WebhookConfigFile::default(),
        };

        let host = env_value("WEBHOOK_HOST")
            .or(file.server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match env_value("WEBHOOK_PORT") {
            Some(value) => parse_value("WEBHOOK_PORT", &value)?,
            None => file.server.port.unwrap_or(DEFAULT_PORT),
        };
        let max_body_bytes = match env_value("WEBHOOK_MAX_BODY_BYTES") {
            Some(value) => parse_positive("WEBHOOK_MAX_BODY_BYTES", &value)?,
            None => file
                .server
                .max_body_bytes
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
        };
        let http_timeout = match env_value("HTTP_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(parse_positive("HTTP_TIMEOUT_SECS", &value)?),
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };
        let note_source = file
            .notes
            .source
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_NOTE_SOURCE.to_string());

        let emulator_host = env_value("FIRESTORE_EMULATOR_HOST");
        let client_email = env_value("FIREBASE_CLIENT_EMAIL");
        let private_key = env_value("FIREBASE_PRIVATE_KEY").map(|key| unescape_private_key(&key));
        if emulator_host.is_none() {
            if client_email.is_none() {
                return Err(ConfigError::Missing("FIREBASE_CLIENT_EMAIL"));
            }
            if private_key.is_none() {
                return Err(ConfigError::Missing("FIREBASE_PRIVATE_KEY"));
            }
        }
        let api_base_url = match emulator_host.as_deref() {
            Some(host) => format!("http://{}", host),
            None => env_value("FIRESTORE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FIRESTORE_API_BASE_URL.to_string()),
        };
        let firebase = FirebaseSettings {
            project_id: require("FIREBASE_PROJECT_ID")?,
            client_email,
            private_key,
            api_base_url,
            token_uri: env_value("GOOGLE_TOKEN_URI").unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            emulator_host,
        };

        let enforce_signature = match env_value("LINE_SIGNATURE_ENFORCE") {
            Some(value) => parse_flag("LINE_SIGNATURE_ENFORCE", &value)?,
            None => false,
        };
        let channel_secret = env_value("LINE_CHANNEL_SECRET");
        if enforce_signature && channel_secret.is_none() {
            return Err(ConfigError::Missing("LINE_CHANNEL_SECRET"));
        }
        let line = LineSettings {
            access_token: require("LINE_ACCESS_TOKEN")?,
            channel_secret,
            api_base_url: env_value("LINE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LINE_API_BASE_URL.to_string()),
            enforce_signature,
        };

        Ok(Self {
            host,
            port,
            max_body_bytes,
            http_timeout,
            collections: file.collections,
            note_source,
            firebase,
            line,
            config_path,
        })
    }

    pub fn google_auth_config(&self) -> GoogleAuthConfig {
        let mut config = match (
            self.firebase.emulator_host.as_ref(),
            self.firebase.client_email.as_ref(),
            self.firebase.private_key.as_ref(),
        ) {
            (None, Some(email), Some(key)) => GoogleAuthConfig::service_account(email, key),
            _ => GoogleAuthConfig::static_token(EMULATOR_TOKEN),
        };
        config.token_uri = self.firebase.token_uri.clone();
        config.timeout = self.http_timeout;
        config
    }

    pub fn firestore_config(&self) -> FirestoreConfig {
        let mut config = FirestoreConfig::new(self.firebase.project_id.clone());
        config.api_base_url = self.firebase.api_base_url.clone();
        config.timeout = self.http_timeout;
        config
    }

    pub fn line_client_config(&self) -> LineClientConfig {
        let mut config = LineClientConfig::new(self.line.access_token.clone());
        config.api_base_url = self.line.api_base_url.clone();
        config.timeout = self.http_timeout;
        config
    }
}

/// Keys pasted into env files usually carry literal `\n` sequences.
pub fn unescape_private_key(raw: &str) -> String {
    raw.trim().trim_matches('"').replace("\\n", "\n")
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env_value(name).ok_or(ConfigError::Missing(name))
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let parsed: T = parse_value(name, value)?;
    if parsed > T::default() {
        Ok(parsed)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}
