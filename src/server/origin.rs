//! Origin enforcement and CORS.
//!
//! Requests without an `Origin` header pass through. An `Origin` whose host ends with the platform
//! domain suffix passes and receives CORS headers; any other origin is refused with 403 before
//! routing.

// crates.io
use axum::{
	extract::{Request, State},
	http::{HeaderValue, Method, header, request::Parts},
	middleware::Next,
	response::Response,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
// self
use crate::{
	_prelude::*,
	auth::platform_host_of,
	config::PlatformConfig,
	pipeline::Gateway,
	server::error,
};

/// Middleware refusing browser requests from foreign origins.
pub async fn enforce_origin(
	State(gateway): State<Arc<Gateway>>,
	request: Request,
	next: Next,
) -> Response {
	if let Some(origin) = request.headers().get(header::ORIGIN) {
		let allowed = origin
			.to_str()
			.map(|origin| gateway.config().platform.allows_origin(origin))
			.unwrap_or(false);

		if !allowed {
			tracing::warn!(origin = ?origin, "Rejected request from foreign origin.");

			return error::access_denied();
		}
	}

	next.run(request).await
}

/// CORS layer admitting platform origins with credentials.
pub fn cors_layer(platform: &PlatformConfig) -> CorsLayer {
	let suffix = platform.domain_suffix.clone();

	CorsLayer::new()
		.allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
			origin.to_str().is_ok_and(|origin| platform_host_of(origin, &suffix).is_some())
		}))
		.allow_credentials(true)
		.allow_methods([Method::GET, Method::OPTIONS])
		.allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
