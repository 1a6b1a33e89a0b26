use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skyreader::config::Config;
use skyreader::session::{Authenticator, ResumeOutcome, SessionHandle, SessionStore};
use skyreader::web::{self, AppState};
use skyreader::xrpc::XrpcClient;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    init_tracing()?;

    info!("Starting skyreader");

    // Load and validate configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(service_url = %config.service_url, page_limit = config.page_limit, "Configuration loaded");

    tokio::fs::create_dir_all(&config.session_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create session directory: {}",
                config.session_dir.display()
            )
        })?;

    let session = SessionHandle::new();
    let client = XrpcClient::new(&config, session).context("Failed to build HTTP client")?;
    let auth = Authenticator::new(client, SessionStore::new(&config.session_dir));

    // Restore the stored session, or log in with configured credentials
    match auth.resume().await? {
        ResumeOutcome::Resumed(s) | ResumeOutcome::Refreshed(s) | ResumeOutcome::Unverified(s) => {
            info!(handle = %s.handle, "Using stored session");
        }
        ResumeOutcome::NoSession | ResumeOutcome::Expired => {
            if let (Some(identifier), Some(password)) = (&config.identifier, &config.app_password) {
                match auth.login(identifier, password).await {
                    Ok(s) => info!(handle = %s.handle, "Logged in with configured credentials"),
                    Err(e) => warn!("Configured login failed: {e:#}"),
                }
            } else {
                info!("No session; log in from the web UI");
            }
        }
    }

    let state = AppState::new(config, auth);
    web::serve(state, shutdown_signal()).await?;

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,skyreader=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
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
                error!("Failed to install SIGTERM handler: {e}");
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

    info!("Shutting down...");
}
