//! HTTP surface: routes, middleware stack, and the serve loop.

pub mod error;
pub mod handlers;
pub mod origin;

pub use error::ApiError;

// std
use std::{any::Any, future, net::SocketAddr};
// crates.io
use axum::{
	Router,
	extract::DefaultBodyLimit,
	middleware,
	response::Response,
	routing::get,
};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
// self
use crate::{_prelude::*, pipeline::Gateway};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Builds the router for `gateway`.
///
/// `/api/me` is only mounted outside production.
pub fn router(gateway: Arc<Gateway>) -> Router {
	let config = gateway.config();
	let mut routes = Router::new()
		.route("/health", get(handlers::health))
		.route("/api/financial-data", get(handlers::financial_data));

	if !config.mode.is_production() {
		routes = routes.route("/api/me", get(handlers::me));
	}

	routes
		.fallback(handlers::not_found)
		.layer(origin::cors_layer(&config.platform))
		.layer(middleware::from_fn_with_state(gateway.clone(), origin::enforce_origin))
		.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
		.layer(CatchPanicLayer::custom(panic_response))
		.layer(TraceLayer::new_for_http())
		.with_state(gateway)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(gateway: Arc<Gateway>, addr: SocketAddr) -> Result<()> {
	let listener = TcpListener::bind(addr).await?;

	tracing::info!(
		addr = %listener.local_addr()?,
		mode = gateway.config().mode.as_str(),
		rate_limit = gateway.config().rate_limit_ceiling,
		"Quote gateway listening."
	);

	axum::serve(listener, router(gateway).into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
		future::pending::<()>().await;
	}

	tracing::info!("Shutdown signal received.");
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
	let detail = panic
		.downcast_ref::<&str>()
		.map(|s| (*s).to_owned())
		.or_else(|| panic.downcast_ref::<String>().cloned())
		.unwrap_or_default();

	tracing::error!(panic = %detail, "Handler panicked.");

	error::internal_error()
}
