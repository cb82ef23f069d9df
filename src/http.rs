//! Reqwest transport shared by the built-in provider clients.
//!
//! Provider endpoints answer directly, so the default client never follows redirects.
//! Response bodies are read incrementally and capped at [`MAX_BODY_BYTES`] so a
//! misbehaving provider cannot exhaust memory.

// std
use std::ops::Deref;
// crates.io
use reqwest::{Response, redirect::Policy};
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::{ConfigError, ProviderError}};

/// Largest response body accepted from a provider.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const BODY_PREVIEW_CHARS: usize = 256;

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds a client that does not follow redirects.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	///
	/// Configure custom clients to disable redirect following.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
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

/// Reads a JSON body from `response`, mapping non-success statuses to
/// [`ProviderError::Status`].
pub(crate) async fn read_json<T>(
	endpoint: &'static str,
	response: Response,
) -> Result<T, ProviderError>
where
	T: DeserializeOwned,
{
	let status = response.status();
	let body = read_body(endpoint, response).await?;

	if !status.is_success() {
		return Err(ProviderError::Status {
			endpoint,
			status: status.as_u16(),
			body: preview(&body),
		});
	}

	let mut de = serde_json::Deserializer::from_slice(&body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| ProviderError::Parse { endpoint, source })
}

async fn read_body(
	endpoint: &'static str,
	mut response: Response,
) -> Result<Vec<u8>, ProviderError> {
	if response.content_length().is_some_and(|len| len > MAX_BODY_BYTES as u64) {
		return Err(ProviderError::BodyTooLarge { endpoint });
	}

	let mut body = Vec::new();

	while let Some(chunk) =
		response.chunk().await.map_err(|e| ProviderError::network(endpoint, e))?
	{
		if body.len() + chunk.len() > MAX_BODY_BYTES {
			return Err(ProviderError::BodyTooLarge { endpoint });
		}

		body.extend_from_slice(&chunk);
	}

	Ok(body)
}

fn preview(body: &[u8]) -> String {
	String::from_utf8_lossy(body).chars().take(BODY_PREVIEW_CHARS).collect()
}
