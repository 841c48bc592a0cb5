#![forbid(unsafe_code)]

use std::env;

use rolodex::http::{AppState, DEFAULT_MAX_BODY_BYTES, build_router};
use rolodex::persist::sqlite::SqliteOpSink;
use rolodex::runtime::handle::{RuntimeConfig, spawn_directory};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env::var("ROLODEX_BIND").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
    let db_path = env::var("ROLODEX_DB").unwrap_or_else(|_| "rolodex.db".to_string());
    let max_body_bytes = env_usize("ROLODEX_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES);

    let config = RuntimeConfig {
        flush_on_write: env_bool("ROLODEX_FLUSH_ON_WRITE", true),
        batch_max_ops: env_usize("ROLODEX_BATCH_MAX_OPS", 32),
        batch_max_latency_ms: env_u64("ROLODEX_BATCH_MAX_LATENCY_MS", 75),
        persist_queue_bound: env_usize("ROLODEX_PERSIST_QUEUE_BOUND", 64),
        snapshot_every_ops: env_usize("ROLODEX_SNAPSHOT_EVERY_OPS", 2000),
        compact_after_snapshot: env_bool("ROLODEX_COMPACT_AFTER_SNAPSHOT", false),
    };

    let sink = SqliteOpSink::open(&db_path).map_err(|e| format!("open journal {db_path}: {e}"))?;
    let store = sink
        .load_store()
        .map_err(|e| format!("replay journal {db_path}: {e}"))?;
    info!(contacts = store.len(), db = %db_path, "directory loaded");

    let directory = spawn_directory(store, Some(Box::new(sink)), config);
    let state = AppState {
        directory: directory.clone(),
        max_body_bytes,
    };
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr}: {e}"))?;
    info!("rolodexd listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received");
        })
        .await
        .map_err(|e| format!("server failed: {e}"))?;

    directory
        .shutdown()
        .await
        .map_err(|e| format!("directory shutdown failed: {e}"))?;
    info!("journal flushed, exiting");
    Ok(())
}
