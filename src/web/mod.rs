pub mod pages;
mod routes;
pub mod views;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::feed::RetryingFetcher;
use crate::session::Authenticator;

pub use views::{AnyView, HomeTab, ViewKey, ViewRegistry};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Authenticator,
    pub views: ViewRegistry,
}

impl AppState {
    /// Wire the views to the authenticator, which refreshes expired
    /// tokens, with retries around it.
    #[must_use]
    pub fn new(config: Config, auth: Authenticator) -> Self {
        let fetcher = Arc::new(RetryingFetcher::new(
            auth.clone(),
            config.fetch_retries,
            config.retry_backoff,
        ));
        let views = ViewRegistry::new(&config, fetcher.clone(), fetcher);
        Self {
            config: Arc::new(config),
            auth,
            views,
        }
    }
}

/// Start the web server and run until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve<S>(state: AppState, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", state.config.web_host, state.config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let app = create_app(state);

    info!(addr = %addr, "Starting HTTP web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Web server error")?;

    Ok(())
}

/// Create the main application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
