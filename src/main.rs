use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use roomsync::application::{ChatHandle, ChatPorts, ChatRuntime, ChatSnapshot};
use roomsync::domain::entities::{AccessToken, UserId};
use roomsync::domain::ConnectionStatus;
use roomsync::infrastructure::{
    AppConfig, ChatHttpClient, CliArgs, StompClient, StompClientConfig, StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default()
            .add_directive(LevelFilter::from_level(config.log_level.to_tracing_level()).into())
    });

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let args = CliArgs::parse();
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn create_runtime(config: &AppConfig) -> Result<(ChatRuntime, ChatHandle)> {
    if config.user_id.trim().is_empty() {
        return Err(eyre!(
            "no user id configured; pass --user-id or set ROOMSYNC_USER_ID"
        ));
    }

    let token = config.token.as_deref().and_then(AccessToken::new);
    if let Some(token) = &token {
        info!(token = %token.masked(), "Using bearer token");
    } else {
        warn!("No token configured, connecting anonymously");
    }

    let http = Arc::new(ChatHttpClient::new(config.api_base_url.clone(), token.clone())?);
    let transport = Arc::new(StompClient::new(
        StompClientConfig::new(config.ws_url.clone())
            .with_token(token)
            .with_heartbeat_ms(config.transport.heartbeat_ms)
            .with_auto_reconnect(config.transport.auto_reconnect)
            .with_max_reconnect_attempts(config.transport.max_reconnect_attempts),
    ));

    let ports = ChatPorts {
        chat_api: http.clone(),
        notification_api: http,
        transport,
    };

    Ok(ChatRuntime::new(
        ports,
        config.destinations.clone(),
        UserId::from(config.user_id.clone()),
        config.page_size(),
    ))
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    connection: ConnectionStatus,
    rooms: usize,
    chat_unread: u32,
    notification_unread: u32,
}

impl From<&ChatSnapshot> for Summary {
    fn from(snapshot: &ChatSnapshot) -> Self {
        Self {
            connection: snapshot.connection,
            rooms: snapshot.rooms.len(),
            chat_unread: snapshot.badge.chat_unread,
            notification_unread: snapshot.badge.notification_unread,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_logging(&config)?;

    info!(
        version = roomsync::VERSION,
        config = ?config.effective_config_path(),
        "Starting {}",
        roomsync::NAME
    );

    let (runtime, handle) = create_runtime(&config)?;
    let mut runtime_task = tokio::spawn(runtime.run());
    let mut snapshots = handle.subscribe_snapshots();
    let mut last = Summary::default();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                handle.shutdown();
                break;
            }
            result = &mut runtime_task => {
                result??;
                return Ok(());
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let summary = Summary::from(&*snapshots.borrow_and_update());
                if summary != last {
                    info!(
                        connection = %summary.connection,
                        rooms = summary.rooms,
                        chat_unread = summary.chat_unread,
                        notifications = summary.notification_unread,
                        "State changed"
                    );
                    last = summary;
                }
            }
        }
    }

    runtime_task.await??;
    Ok(())
}
