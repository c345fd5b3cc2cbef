//! Error-to-response mapping with caller-safe messages.

// crates.io
use axum::{
	Json,
	http::{HeaderValue, StatusCode, header},
	response::{IntoResponse, Response},
};
// self
use crate::{_prelude::*, auth::AuthType, config::RuntimeMode, error::AuthSchemeError};

/// 401 message for a request without an Authorization header.
pub const MISSING_AUTHORIZATION: &str = "Missing Authorization header";
/// 401 message for an unknown scheme or empty token.
pub const INVALID_AUTHORIZATION_FORMAT: &str =
	"Invalid Authorization header format. Use \"SharedLink <jwt>\" or \"Bearer <token>\"";
/// 401 message for a rejected shared-link token.
pub const INVALID_SHARED_LINK: &str = "Invalid or expired shared link token";
/// 401 message for a rejected bearer token.
pub const INVALID_BEARER: &str = "Invalid or expired token";
/// 400 message for an empty ticker set.
pub const INVALID_TICKERS: &str = "Invalid ticker symbols";
/// Hint attached to [`INVALID_TICKERS`].
pub const INVALID_TICKERS_NOTE: &str = "Tickers must be 1-5 uppercase letters (e.g., AAPL, MSFT)";
/// 500 message for a failed snapshot.
pub const FETCH_FAILED: &str = "Failed to fetch financial data";
/// 429 message.
pub const TOO_MANY_REQUESTS: &str = "Too many requests";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
	error: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	note: Option<&'static str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	retry_after: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	message: Option<String>,
}
impl ErrorBody {
	fn new(error: &'static str) -> Self {
		Self { error, note: None, retry_after: None, message: None }
	}
}

/// Gateway error paired with the runtime mode that decides how much detail leaks.
#[derive(Debug)]
pub struct ApiError {
	/// Underlying pipeline error.
	pub error: Error,
	/// Runtime mode of the serving gateway.
	pub mode: RuntimeMode,
}
impl ApiError {
	/// Wraps `error` for a gateway running in `mode`.
	pub fn new(error: Error, mode: RuntimeMode) -> Self {
		Self { error, mode }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, body) = match &self.error {
			Error::RateLimited(directive) => {
				let secs = directive.retry_after_secs();
				let body = ErrorBody { retry_after: Some(secs), ..ErrorBody::new(TOO_MANY_REQUESTS) };
				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

				response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs));

				return response;
			},
			Error::AuthScheme(AuthSchemeError::Missing) =>
				(StatusCode::UNAUTHORIZED, ErrorBody::new(MISSING_AUTHORIZATION)),
			Error::AuthScheme(AuthSchemeError::Unrecognized) =>
				(StatusCode::UNAUTHORIZED, ErrorBody::new(INVALID_AUTHORIZATION_FORMAT)),
			Error::AuthValidation { scheme: AuthType::SharedLink, .. } =>
				(StatusCode::UNAUTHORIZED, ErrorBody::new(INVALID_SHARED_LINK)),
			Error::AuthValidation { scheme: AuthType::Bearer, .. } =>
				(StatusCode::UNAUTHORIZED, ErrorBody::new(INVALID_BEARER)),
			Error::InvalidTickers => (
				StatusCode::BAD_REQUEST,
				ErrorBody { note: Some(INVALID_TICKERS_NOTE), ..ErrorBody::new(INVALID_TICKERS) },
			),
			other => {
				tracing::error!(error = %other, "Request failed.");

				let message = (!self.mode.is_production()).then(|| other.to_string());

				(StatusCode::INTERNAL_SERVER_ERROR, ErrorBody { message, ..ErrorBody::new(FETCH_FAILED) })
			},
		};

		(status, Json(body)).into_response()
	}
}

/// `404 {"error":"Not found"}`.
pub fn not_found() -> Response {
	(StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found"))).into_response()
}

/// `403 {"error":"Access denied"}` for rejected origins.
pub fn access_denied() -> Response {
	(StatusCode::FORBIDDEN, Json(ErrorBody::new("Access denied"))).into_response()
}

/// `500 {"error":"Internal server error"}` for anything that escaped the handlers.
pub fn internal_error() -> Response {
	(StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new("Internal server error")))
		.into_response()
}

#[cfg(test)]
mod tests {
	// crates.io
	use axum::body;
	// self
	use super::*;
	use crate::{error::AuthValidationError, rate_limit::RetryDirective};

	async fn json_of(response: Response) -> serde_json::Value {
		let bytes = body::to_bytes(response.into_body(), usize::MAX)
			.await
			.expect("Response body should be readable.");

		serde_json::from_slice(&bytes).expect("Response body should be JSON.")
	}

	#[tokio::test]
	async fn rate_limited_sets_retry_after() {
		let now = OffsetDateTime::now_utc();
		let directive = RetryDirective::new(now + Duration::seconds(30), now);
		let response =
			ApiError::new(Error::RateLimited(directive), RuntimeMode::Production).into_response();

		assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
		assert_eq!(
			response.headers().get(header::RETRY_AFTER).and_then(|v| v.to_str().ok()),
			Some("30")
		);

		let body = json_of(response).await;

		assert_eq!(body["error"], TOO_MANY_REQUESTS);
		assert_eq!(body["retryAfter"], 30);
	}

	#[tokio::test]
	async fn auth_errors_use_scheme_specific_messages() {
		let response = ApiError::new(
			Error::auth_validation(AuthType::SharedLink, AuthValidationError::Expired),
			RuntimeMode::Development,
		)
		.into_response();

		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(json_of(response).await["error"], INVALID_SHARED_LINK);

		let response =
			ApiError::new(AuthSchemeError::Unrecognized.into(), RuntimeMode::Development)
				.into_response();

		assert_eq!(json_of(response).await["error"], INVALID_AUTHORIZATION_FORMAT);
	}

	#[tokio::test]
	async fn failure_details_are_hidden_in_production() {
		let failure = || Error::AggregateFailure { failed_calls: 5 };
		let dev = json_of(ApiError::new(failure(), RuntimeMode::Development).into_response()).await;
		let prod = json_of(ApiError::new(failure(), RuntimeMode::Production).into_response()).await;

		assert_eq!(dev["error"], FETCH_FAILED);
		assert!(dev["message"].is_string());
		assert_eq!(prod["error"], FETCH_FAILED);
		assert!(prod.get("message").is_none());
	}
}
