use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use banking_assist::config::AppConfig;
use banking_assist::error::ConfigError;
use banking_assist::llm::{LlmConfig, create_provider};
use banking_assist::web::{AppState, app_routes, sessions::spawn_sweep_task};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        if let ConfigError::MissingEnvVar(var) = &e {
            eprintln!("  export {var}=...");
        }
        std::process::exit(1);
    });

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = init_tracing(&config);

    eprintln!("🏦 Banking Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {} ({})", config.backend, config.model);
    eprintln!("   Page: http://0.0.0.0:{}/", config.port);
    eprintln!("   Chat WS: ws://0.0.0.0:{}/ws/chat", config.port);
    eprintln!(
        "   Replies: {}",
        if config.streaming { "streaming" } else { "whole" }
    );

    let llm_config = LlmConfig {
        backend: config.backend,
        api_key: config.api_key.clone(),
        model: config.model.clone(),
    };
    let llm = create_provider(&llm_config)?;
    let state = AppState::from_config(&config, llm)?;
    let _sweeper = spawn_sweep_task(Arc::clone(&state.sessions));
    let app = app_routes(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Banking Assist listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Banking Assist stopped");
    Ok(())
}

/// Console logging filtered by `RUST_LOG`, plus a daily-rolled file when a
/// log directory is configured.
fn init_tracing(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(false);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "banking-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    eprintln!("\n👋 Shutting down...");
}
