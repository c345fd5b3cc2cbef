#![cfg(feature = "test")]

// crates.io
use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header},
	response::Response,
};
use httpmock::prelude::*;
use tower::ServiceExt;
// self
use quote_gateway::{_preludet::*, config::GatewayConfig, server};

const USER_PATH: &str = "/api/v1/users/me/";
const BEARER: &str = "Bearer rep-access-token";

fn app(config: GatewayConfig) -> Router {
	server::router(build_test_gateway(config))
}

fn get(uri: &str) -> axum::http::request::Builder {
	Request::builder().method("GET").uri(uri)
}

async fn send(app: &Router, request: axum::http::request::Builder) -> Response {
	app.clone()
		.oneshot(request.body(Body::empty()).expect("Test request should build."))
		.await
		.expect("Router should always produce a response.")
}

async fn json_of(response: Response) -> serde_json::Value {
	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Response body should be readable.");

	serde_json::from_slice(&bytes).expect("Response body should be JSON.")
}

async fn mock_user(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET).path(USER_PATH).header("authorization", BEARER);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"id":3,"type":"rep","email":"rep@acme.test"}"#);
		})
		.await
}

async fn mock_quotes(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/quote").query_param("token", TEST_API_KEY);
			then.status(200).header("content-type", "application/json").body(
				r#"{"c":100.5,"d":0.5,"dp":0.5,"h":101,"l":99,"o":100,"pc":100,"t":1735689600}"#,
			);
		})
		.await
}

#[tokio::test]
async fn health_is_public() {
	let server = MockServer::start_async().await;
	let app = app(test_gateway_config(&server.base_url(), &server.base_url()));
	let response = send(&app, get("/health")).await;

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_of(response).await;

	assert_eq!(body["status"], "ok");
	assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_routes_return_json_404() {
	let server = MockServer::start_async().await;
	let app = app(test_gateway_config(&server.base_url(), &server.base_url()));
	let response = send(&app, get("/api/unknown")).await;

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert_eq!(json_of(response).await, serde_json::json!({ "error": "Not found" }));
}

#[tokio::test]
async fn foreign_origins_are_denied_and_platform_origins_get_cors() {
	let server = MockServer::start_async().await;
	let app = app(test_gateway_config(&server.base_url(), &server.base_url()));
	let denied = send(&app, get("/health").header(header::ORIGIN, "https://evil.example.com")).await;

	assert_eq!(denied.status(), StatusCode::FORBIDDEN);
	assert_eq!(json_of(denied).await, serde_json::json!({ "error": "Access denied" }));

	let allowed =
		send(&app, get("/health").header(header::ORIGIN, "https://acme.my.pitcher.com")).await;

	assert_eq!(allowed.status(), StatusCode::OK);
	assert_eq!(
		allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
		Some("https://acme.my.pitcher.com")
	);
	assert_eq!(
		allowed
			.headers()
			.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
			.and_then(|v| v.to_str().ok()),
		Some("true")
	);
}

#[tokio::test]
async fn missing_authorization_is_401_without_upstream_calls() {
	let server = MockServer::start_async().await;
	let app = app(test_gateway_config(&server.base_url(), &server.base_url()));
	let upstream = server
		.mock_async(|when, then| {
			when.any_request();
			then.status(200);
		})
		.await;
	let response = send(&app, get("/api/financial-data?tickers=AAPL")).await;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(json_of(response).await["error"], "Missing Authorization header");

	let response =
		send(&app, get("/api/financial-data").header(header::AUTHORIZATION, "Token abc")).await;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(
		json_of(response).await["error"],
		"Invalid Authorization header format. Use \"SharedLink <jwt>\" or \"Bearer <token>\""
	);

	upstream.assert_calls_async(0).await;
}

#[tokio::test]
async fn financial_data_fans_out_once_and_serves_repeats_from_cache() {
	let server = MockServer::start_async().await;
	let app = app(test_gateway_config(&server.base_url(), &server.base_url()));
	let user = mock_user(&server).await;
	let quotes = mock_quotes(&server).await;
	let request = || {
		get("/api/financial-data?tickers=AAPL,MSFT")
			.header(header::AUTHORIZATION, BEARER)
			.header(header::REFERER, "https://acme.my.pitcher.com/dsr")
	};
	let first = send(&app, request()).await;

	assert_eq!(first.status(), StatusCode::OK);

	let first = json_of(first).await;

	// Two tickers plus three indices.
	quotes.assert_calls_async(5).await;

	let second = json_of(send(&app, request()).await).await;

	quotes.assert_calls_async(5).await;
	user.assert_calls_async(1).await;

	assert_eq!(first["stock_quotes"], second["stock_quotes"]);
	assert_eq!(first["market_overview"], second["market_overview"]);
	assert_eq!(first["_metadata"]["fetched_at"], second["_metadata"]["fetched_at"]);
	assert_eq!(first["stock_quotes"][0]["symbol"], "AAPL");
	assert_eq!(first["stock_quotes"][1]["symbol"], "MSFT");
	assert_eq!(first["_metadata"]["tickers_count"], 2);
	assert_eq!(first["_metadata"]["source"], "finnhub_api");
	assert_eq!(first["_metadata"]["cached"], false);
	assert_eq!(second["_metadata"]["cached"], true);
	assert_eq!(second["_metadata"]["auth_type"], "bearer");
	assert_eq!(second["_metadata"]["requested_by"], "rep@acme.test");
	assert_eq!(second["_metadata"]["organization"], "acme");
}

#[tokio::test]
async fn invalid_tickers_are_400_after_authentication() {
	let server = MockServer::start_async().await;
	let app = app(test_gateway_config(&server.base_url(), &server.base_url()));
	let _user = mock_user(&server).await;
	let quotes = mock_quotes(&server).await;
	let response = send(
		&app,
		get("/api/financial-data?tickers=123,TOOLONGTICKER").header(header::AUTHORIZATION, BEARER),
	)
	.await;

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(
		json_of(response).await,
		serde_json::json!({
			"error": "Invalid ticker symbols",
			"note": "Tickers must be 1-5 uppercase letters (e.g., AAPL, MSFT)"
		})
	);

	quotes.assert_calls_async(0).await;
}

#[tokio::test]
async fn rate_limit_precedes_authentication() {
	let server = MockServer::start_async().await;
	let mut config = test_gateway_config(&server.base_url(), &server.base_url());

	config.rate_limit_ceiling = 1;

	let app = app(config);
	let first = send(&app, get("/api/financial-data")).await;

	assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

	let second = send(&app, get("/api/financial-data")).await;

	assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

	let retry_after = second
		.headers()
		.get(header::RETRY_AFTER)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.parse::<u64>().ok())
		.expect("429 responses carry a numeric Retry-After header.");
	let body = json_of(second).await;

	assert!((1..=60).contains(&retry_after));
	assert_eq!(body["error"], "Too many requests");
	assert_eq!(body["retryAfter"], retry_after);

	// Health checks are never rate-limited.
	assert_eq!(send(&app, get("/health")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn aggregate_failure_hides_details_in_production() {
	let server = MockServer::start_async().await;
	let _user = mock_user(&server).await;
	let _outage = server
		.mock_async(|when, then| {
			when.method(GET).path("/quote");
			then.status(500);
		})
		.await;

	for (config, expose) in [
		(test_gateway_config(&server.base_url(), &server.base_url()), true),
		(test_production_config(&server.base_url(), &server.base_url()), false),
	] {
		let app = app(config);
		let response = send(
			&app,
			get("/api/financial-data?tickers=AAPL").header(header::AUTHORIZATION, BEARER),
		)
		.await;

		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

		let body = json_of(response).await;

		assert_eq!(body["error"], "Failed to fetch financial data");
		assert_eq!(body.get("message").is_some(), expose);
	}
}

#[tokio::test]
async fn me_is_exposed_only_outside_production() {
	let server = MockServer::start_async().await;
	let _user = mock_user(&server).await;
	let dev = app(test_gateway_config(&server.base_url(), &server.base_url()));
	let response = send(
		&dev,
		get("/api/me")
			.header(header::AUTHORIZATION, BEARER)
			.header(header::ORIGIN, "https://acme.my.pitcher.com"),
	)
	.await;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		json_of(response).await,
		serde_json::json!({
			"authType": "bearer",
			"organization": "acme",
			"user": { "type": "rep", "email": "rep@acme.test" }
		})
	);

	let prod = app(test_production_config(&server.base_url(), &server.base_url()));
	let response = send(&prod, get("/api/me").header(header::AUTHORIZATION, BEARER)).await;

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
