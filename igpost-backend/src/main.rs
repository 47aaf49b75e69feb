//! igpost server and CLI entry point.
//!
//! Configuration loading, tracing setup, and either the HTTP server or a
//! one-shot upload/profile command that reuses the same credential resolver
//! as the HTTP layer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use igpost_backend::resolve::resolve_session;
use igpost_backend::{build_router, state::AppState};
use igpost_client::{GatewayClient, VideoSource};

mod cli;
mod tracing_setup;

use cli::{Cli, Command, ProfileArgs, UploadArgs};
use tracing_setup::install_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Resolve config path: CLI > environment variable
    let config_path = cli
        .config_path
        .clone()
        .or_else(|| std::env::var("IGPOST_CONFIG_PATH").ok().map(PathBuf::from));

    let mut config = igpost_config::load_config(config_path.as_deref())?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    install_tracing(&config.logging);

    let mut builder = GatewayClient::builder(config.gateway.base_url.clone())
        .timeout(Duration::from_secs(config.gateway.timeout_secs));
    if let Some(token) = &config.gateway.auth_token {
        builder = builder.auth_token(token.clone());
    }
    let client = builder.build()?;

    let state = Arc::new(AppState::new(config, Arc::new(client)));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::Upload(args) => run_upload(state, args).await,
        Command::Profile(args) => run_profile(state, args).await,
    }
}

async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        gateway = %state.config.gateway.base_url,
        session_file = %state.config.session.file.display(),
        "igpost listening"
    );
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

async fn run_upload(state: Arc<AppState>, args: UploadArgs) -> anyhow::Result<()> {
    if !args.video.is_file() {
        anyhow::bail!("video file not found: {}", args.video.display());
    }
    let data = std::fs::read(&args.video)?;
    let filename = args
        .video
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.mp4")
        .to_string();

    let credentials = args.credentials.into_credentials();
    let token = resolve_session(&state, &credentials).await?;
    let media = state
        .client
        .clip_upload(
            &token,
            VideoSource::Bytes {
                filename,
                data: data.into(),
            },
            &args.description,
        )
        .await?;

    match media.permalink() {
        Some(url) => println!("{url}"),
        None => println!("Upload complete. media_id={}", media.media_id),
    }
    Ok(())
}

async fn run_profile(state: Arc<AppState>, args: ProfileArgs) -> anyhow::Result<()> {
    let credentials = args.credentials.into_credentials();
    let token = resolve_session(&state, &credentials).await?;
    let info = state.client.account_info(&token).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
