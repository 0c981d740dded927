use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "roomsync",
    version,
    about = "Headless chat room and notification sync client",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", env = "ROOMSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// REST base URL.
    #[arg(long, value_name = "URL", env = "ROOMSYNC_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// STOMP WebSocket endpoint.
    #[arg(long, value_name = "URL", env = "ROOMSYNC_WS_URL")]
    pub ws_url: Option<String>,

    /// Viewer user id.
    #[arg(long, value_name = "ID", env = "ROOMSYNC_USER_ID")]
    pub user_id: Option<String>,

    /// Bearer token.
    #[arg(long, value_name = "TOKEN", env = "ROOMSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Log file path.
    #[arg(long, value_name = "PATH", env = "ROOMSYNC_LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, env = "ROOMSYNC_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Messages per history page.
    #[arg(long, value_name = "N")]
    pub history_page_size: Option<u32>,

    /// Re-establish dropped push links automatically.
    #[arg(long)]
    pub auto_reconnect: Option<bool>,
}
