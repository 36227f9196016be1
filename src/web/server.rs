//! Web server for Filedrop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::{FiledropError, Result};

use super::handlers::AppState;
use super::router::create_app;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a new web server, opening storage and the catalog.
    pub fn new(config: &Config) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                FiledropError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    config.server.host, config.server.port
                ))
            })?;

        let app_state = AppState::from_config(config)?;

        Ok(Self::with_state(
            addr,
            Arc::new(app_state),
            config.server.cors_origins.clone(),
        ))
    }

    /// Create a web server around an existing state.
    pub fn with_state(
        addr: SocketAddr,
        app_state: Arc<AppState>,
        cors_origins: Vec<String>,
    ) -> Self {
        Self {
            addr,
            app_state,
            cors_origins,
        }
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn into_parts(self) -> (SocketAddr, Router) {
        let router = create_app(self.app_state, &self.cors_origins);
        (self.addr, router)
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let (addr, router) = self.into_parts();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (addr, router) = self.into_parts();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
