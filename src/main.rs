use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use career_assist::app::build_chat_service;
use career_assist::config::ServerConfig;
use career_assist::interview::spawn_prune_task;
use career_assist::web::chat_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let _ = dotenvy::dotenv();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Initialize tracing; the guard must live as long as the process.
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "career-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    eprintln!("🧭 Career Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {} ({})", config.llm.backend, config.llm.model);
    eprintln!("   Chat: http://{}/", config.bind_addr());

    match &config.script_path {
        Some(path) => eprintln!("   Script: {}", path.display()),
        None => eprintln!("   Script: built-in career interview"),
    }
    match &config.db_path {
        Some(path) => eprintln!("   Sessions: {}", path.display()),
        None => eprintln!("   Sessions: in-memory"),
    }

    let chat = build_chat_service(&config)
        .await
        .context("failed to build chat service")?;
    let _prune_handle = spawn_prune_task(
        Arc::clone(&chat),
        Duration::from_secs(300),
        config.session_idle_timeout,
    );
    let app = chat_routes(chat);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    tracing::info!(addr = %config.bind_addr(), "Chat server started");
    axum::serve(listener, app).await?;

    Ok(())
}
