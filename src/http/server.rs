//! HTTP server assembly.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tracing::{error, info};

use crate::error::{FloodgateError, Result};
use crate::http::{admin, middleware, routes};
use crate::limit::Limiters;

/// HTTP server carrying the limited routes and the admin surface.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The named limiter instances
    limiters: Arc<Limiters>,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, limiters: Arc<Limiters>) -> Self {
        Self { addr, limiters }
    }

    /// Assemble the router.
    ///
    /// The demo routes sit behind their named policies; the admin and
    /// health endpoints are left unlimited.
    pub fn router(&self) -> Router {
        let mut app = Router::new().route("/", get(routes::index));
        if let Some(moderate) = self.limiters.get("moderate") {
            app = app.layer(from_fn_with_state(moderate, middleware::rate_limit));
        }

        let mut login = Router::new().route("/login", post(routes::login));
        if let Some(limiter) = self.limiters.get("login") {
            login = login.layer(from_fn_with_state(limiter, middleware::rate_limit));
        }

        let admin = Router::new()
            .route("/admin/limits", get(admin::limits))
            .with_state(self.limiters.clone());

        app.merge(login)
            .merge(admin)
            .route("/healthz", get(admin::healthz))
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server drains and returns once the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        info!(addr = %self.addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            FloodgateError::Io(e)
        })
    }
}
