//! Route handlers.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Json,
	extract::{ConnectInfo, Request, State},
	http::{HeaderMap, header},
	response::Response,
};
// self
use crate::{
	_prelude::*,
	auth::{AuthType, AuthenticatedIdentity},
	market::FinancialSnapshot,
	pipeline::{Gateway, InboundRequest},
	server::error::{self, ApiError},
};

/// Body of `GET /health`.
#[derive(Clone, Debug, Serialize)]
pub struct HealthStatus {
	/// Always `ok`.
	pub status: &'static str,
	/// Time the probe was answered.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
}

/// User section of `GET /api/me`.
#[derive(Clone, Debug, Serialize)]
pub struct MeUser {
	/// `shared_link` for shared-link callers, the platform user type for bearer callers.
	#[serde(rename = "type")]
	pub kind: Option<serde_json::Value>,
	/// User email, bearer callers only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
}

/// Body of `GET /api/me`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
	/// Scheme the caller authenticated with.
	pub auth_type: AuthType,
	/// Organization label.
	pub organization: Option<String>,
	/// Caller summary.
	pub user: MeUser,
}
impl From<&AuthenticatedIdentity> for MeResponse {
	fn from(identity: &AuthenticatedIdentity) -> Self {
		let user = match identity {
			AuthenticatedIdentity::SharedLink(_) =>
				MeUser { kind: Some(AuthType::SharedLink.as_str().into()), email: None },
			AuthenticatedIdentity::Bearer(bearer) =>
				MeUser { kind: bearer.user.get("type").cloned(), email: bearer.email.clone() },
		};

		Self {
			auth_type: identity.auth_type(),
			organization: identity.organization().map(str::to_owned),
			user,
		}
	}
}

/// `GET /health`: unauthenticated, not rate-limited liveness probe.
pub async fn health() -> Json<HealthStatus> {
	Json(HealthStatus { status: "ok", timestamp: OffsetDateTime::now_utc() })
}

/// `GET /api/financial-data`.
pub async fn financial_data(
	State(gateway): State<Arc<Gateway>>,
	request: Request,
) -> Result<Json<FinancialSnapshot>, ApiError> {
	let inbound = inbound_request(&request);

	gateway
		.financial_data(&inbound)
		.await
		.map(Json)
		.map_err(|e| ApiError::new(e, gateway.config().mode))
}

/// `GET /api/me`: authenticated identity echo (development only).
pub async fn me(
	State(gateway): State<Arc<Gateway>>,
	request: Request,
) -> Result<Json<MeResponse>, ApiError> {
	let inbound = inbound_request(&request);

	let identity = gateway
		.authenticate(&inbound)
		.await
		.map_err(|e| ApiError::new(e, gateway.config().mode))?;

	Ok(Json(MeResponse::from(&identity)))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> Response {
	error::not_found()
}

/// Extracts the pipeline's view of an axum request.
pub fn inbound_request(request: &Request) -> InboundRequest {
	let headers = request.headers();
	let tickers = request.uri().query().and_then(|query| {
		url::form_urlencoded::parse(query.as_bytes())
			.find(|(key, _)| key == "tickers")
			.map(|(_, value)| value.into_owned())
	});
	let remote_addr = request
		.extensions()
		.get::<ConnectInfo<SocketAddr>>()
		.map(|ConnectInfo(addr)| addr.ip());

	InboundRequest {
		authorization: header_value(headers, header::AUTHORIZATION),
		referer: header_value(headers, header::REFERER),
		origin: header_value(headers, header::ORIGIN),
		remote_addr,
		tickers,
	}
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
	headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
	// crates.io
	use axum::body::Body;
	// self
	use super::*;
	use crate::auth::BearerIdentity;

	#[test]
	fn inbound_request_reads_headers_query_and_peer() {
		let mut request = Request::builder()
			.uri("/api/financial-data?tickers=aapl%2CMSFT&x=1")
			.header(header::AUTHORIZATION, "Bearer abc")
			.header(header::REFERER, "https://acme.my.pitcher.com/room")
			.body(Body::empty())
			.expect("Request should build.");

		request.extensions_mut().insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 5555))));

		let inbound = inbound_request(&request);

		assert_eq!(inbound.authorization.as_deref(), Some("Bearer abc"));
		assert_eq!(inbound.referer.as_deref(), Some("https://acme.my.pitcher.com/room"));
		assert_eq!(inbound.origin, None);
		assert_eq!(inbound.tickers.as_deref(), Some("aapl,MSFT"));
		assert_eq!(inbound.remote_addr.map(|ip| ip.to_string()).as_deref(), Some("10.0.0.7"));
	}

	#[test]
	fn me_response_echoes_bearer_user() {
		let identity = AuthenticatedIdentity::Bearer(BearerIdentity::from_user(
			"acme",
			serde_json::json!({ "type": "admin", "email": "rep@acme.test" }),
		));
		let value = serde_json::to_value(MeResponse::from(&identity))
			.expect("Response should serialize.");

		assert_eq!(
			value,
			serde_json::json!({
				"authType": "bearer",
				"organization": "acme",
				"user": { "type": "admin", "email": "rep@acme.test" }
			})
		);
	}
}
