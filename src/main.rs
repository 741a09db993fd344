//! Gemini relay - HTTP façade over the Gemini API.

use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use gemini_relay::cli::Cli;
use gemini_relay::config::{self, Config};
use gemini_relay::context::ServiceContext;
use gemini_relay::error::RelayError;
use gemini_relay::http::{build_router, AppState};
use gemini_relay::model::ModelRoles;
use gemini_relay::storage::ImageStore;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        tracing::error!("{e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "gemini_relay=debug,tower_http=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<(), RelayError> {
    let config_path = config::discover_config_path(cli.config.as_deref());
    let config = Config::load(&config_path).map_err(RelayError::Config)?;

    let models = ModelRoles::resolve(&config.models.text, &config.models.image)
        .map_err(RelayError::Config)?;
    tracing::debug!(text = %models.text, image = %models.image, "Resolved models");

    let replay_path = std::env::var("RELAY_REPLAY").ok();
    let is_recording = std::env::var("RELAY_REC").is_ok_and(|v| v == "true" || v == "1");

    let (ctx, recording_session) = if let Some(ref cassette_path) = replay_path {
        tracing::info!(cassette = %cassette_path, "Replaying upstream interactions");
        (ServiceContext::replaying(Path::new(cassette_path))?, None)
    } else if is_recording {
        tracing::info!("Recording upstream interactions");
        let (ctx, session) = ServiceContext::recording(&config)?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(&config), None)
    };

    if !ctx.gate.is_configured() {
        tracing::error!(
            "{} is not set; every endpoint that calls Gemini will fail",
            config::GEMINI_KEY_ENV
        );
    }

    let image_dir = cli.image_dir.unwrap_or(config.server.image_dir);
    let state = AppState::new(Arc::new(ctx.into_gateway(models)), ImageStore::new(image_dir));
    let app = build_router(state, config.server.max_upload_bytes);

    let bind = cli.bind.unwrap_or(config.server.bind);
    let listener = TcpListener::bind(bind.as_str())
        .await
        .map_err(|e| RelayError::Config(format!("Failed to bind {bind}: {e}")))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    if let Some(session) = recording_session {
        match session.flush() {
            Ok(path) => tracing::info!("Cassette saved: {}", path.display()),
            Err(e) => tracing::warn!("Failed to save cassette: {e}"),
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
