//! Server Implementation
//!
//! HTTP 服务器启动和管理

use crate::api;
use crate::core::{Config, Result, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config)?,
        };

        if state.config.webhook_api_key.is_empty() {
            const MISSING_KEY: &str =
                "PAYMENT_WEBHOOK_API_KEY is not set, bank webhooks will be rejected";
            if state.config.is_production() {
                tracing::error!("{}", MISSING_KEY);
            } else {
                tracing::warn!("{}", MISSING_KEY);
            }
        }

        // 启动前补齐未完成的收款入账
        match state.payments.recover() {
            Ok(0) => {}
            Ok(n) => tracing::warn!(recovered = n, "Recovered incomplete payment settlements"),
            Err(e) => tracing::error!(error = %e, "Payment recovery failed"),
        }

        let app = api::build_app(state);
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("🍜 Dine Server listening on {}", addr);

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
