//! Transport primitives shared by every upstream call.
//!
//! The gateway talks to two upstream families: the identity platform (token validation) and the
//! quote provider. Both go through [`ReqwestHttpClient`] so status classification and JSON
//! decoding live in one place. Any non-success status becomes [`UpstreamError::Status`] and
//! decoding failures keep the JSON path that failed via `serde_path_to_error`.

// std
use std::ops::Deref;
// crates.io
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::UpstreamError};

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The wrapped client uses reqwest's default socket behavior; no request-level timeout is
/// applied, so a hung upstream call holds only the request that issued it.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Sends `request` and decodes a successful JSON body into `T`.
	pub async fn send_json<T>(&self, request: RequestBuilder) -> Result<T, UpstreamError>
	where
		T: DeserializeOwned,
	{
		let response = request.send().await?;
		let status = response.status();

		if !status.is_success() {
			return Err(UpstreamError::Status { status: status.as_u16() });
		}

		let body = response.bytes().await?;

		decode_json(&body, status.as_u16())
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Decodes `body` into `T`, recording the JSON path of the first mismatch.
pub(crate) fn decode_json<T>(body: &[u8], status: u16) -> Result<T, UpstreamError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| UpstreamError::Parse { source, status })
}
