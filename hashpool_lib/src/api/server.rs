// Copyright (C) 2025, 2026 Hashpool Developers (see AUTHORS)
//
// This file is part of Hashpool
//
// Hashpool is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Hashpool is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Hashpool. If not, see <https://www.gnu.org/licenses/>.

use super::auth::require_bearer;
use super::handlers::{
    dispatch_job, get_jobs, get_stats, health_check, send_payout, submit_share,
};
use super::models::ApiState;
use crate::config::ServerConfig;
use crate::pool::Pool;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the transport router over a pool facade. Mutating routes sit behind
/// the bearer-token gate; submission and reads are open to workers.
pub fn router(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/jobs/dispatch", post(dispatch_job))
        .route("/payout", post(send_payout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/submit", post(submit_share))
        .route("/stats", get(get_stats))
        .route("/jobs", get(get_jobs))
        .merge(protected)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// HTTP API server for the pool
pub struct ApiServer {
    state: ApiState,
    config: ServerConfig,
}

impl ApiServer {
    pub fn new(pool: Arc<Pool>, config: ServerConfig) -> Self {
        Self {
            state: ApiState {
                pool,
                auth_token: config.auth_token.clone(),
            },
            config,
        }
    }

    /// Serve until the shutdown signal fires.
    pub async fn start(
        &self,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = router(self.state.clone());
        let addr = format!("{}:{}", self.config.hostname, self.config.port);

        info!("Starting API server on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
                info!("API server shutting down");
            })
            .await?;

        Ok(())
    }
}
