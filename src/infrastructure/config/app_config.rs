//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::args::CliArgs;
use crate::application::store::DEFAULT_PAGE_SIZE;
use crate::domain::destinations::Destinations;
use crate::infrastructure::stomp::{DEFAULT_HEARTBEAT_MS, MAX_RECONNECT_ATTEMPTS};

pub(super) const APP_NAME: &str = "roomsync";
pub(super) const APP_QUALIFIER: &str = "com";
pub(super) const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Push channel tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Re-establish dropped links automatically.
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    /// Consecutive failed attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Heart-beat offered to the broker, in milliseconds. Zero disables.
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// REST base URL, e.g. `https://chat.example.com/api`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// STOMP WebSocket endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Viewer id used for per-user topics and own-message checks.
    #[serde(default)]
    pub user_id: String,

    /// Bearer token. Prefer the environment over storing it here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Messages per history page.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,

    /// Push channel tuning.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Topic and destination templates.
    #[serde(default)]
    pub destinations: Destinations,
}

fn default_api_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

const fn default_history_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_max_reconnect_attempts() -> u32 {
    MAX_RECONNECT_ATTEMPTS
}

const fn default_heartbeat_ms() -> u64 {
    DEFAULT_HEARTBEAT_MS
}

const fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: CliArgs) {
        if let Some(config_path) = args.config {
            self.config = Some(config_path);
        }
        if let Some(api_base_url) = args.api_base_url {
            self.api_base_url = api_base_url;
        }
        if let Some(ws_url) = args.ws_url {
            self.ws_url = ws_url;
        }
        if let Some(user_id) = args.user_id {
            self.user_id = user_id;
        }
        if let Some(token) = args.token {
            self.token = Some(token);
        }
        if let Some(log_path) = args.log_path {
            self.log_path = Some(log_path);
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(page_size) = args.history_page_size {
            self.history_page_size = page_size;
        }
        if let Some(auto_reconnect) = args.auto_reconnect {
            self.transport.auto_reconnect = auto_reconnect;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Page size clamped to at least one message.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.history_page_size.max(1)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            api_base_url: default_api_base_url(),
            ws_url: default_ws_url(),
            user_id: String::new(),
            token: None,
            log_path: None,
            log_level: LogLevel::Info,
            history_page_size: DEFAULT_PAGE_SIZE,
            transport: TransportConfig::default(),
            destinations: Destinations::default(),
        }
    }
}
