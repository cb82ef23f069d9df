//! HS256 access tokens minted from verified login profiles.
//!
//! The header is a fixed constant; nothing about the signing algorithm is ever read
//! from input.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	auth::{LoginProfile, Secret},
	clock::{self, Clock},
	error::TokenError,
};

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Signed access token plus its lifetime, returned by [`TokenIssuer::issue`].
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
	/// Compact `header.claims.signature` JWT.
	pub token: String,
	/// Lifetime in seconds.
	pub expires_in: i64,
}
impl Debug for IssuedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuedToken")
			.field("token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

#[derive(Serialize)]
struct Claims<'a> {
	sub: &'a str,
	iss: &'a str,
	iat: i64,
	exp: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	aud: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	name: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	picture: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	preferred_username: Option<&'a str>,
}

/// Mints tenant-scoped HS256 JWTs.
#[derive(Clone)]
pub struct TokenIssuer {
	secret: Secret,
	issuer: String,
	audience: Option<String>,
	expires_in: Duration,
	clock: Arc<dyn Clock>,
}
impl TokenIssuer {
	/// Creates an issuer signing with `secret` and stamping `iss = issuer`.
	pub fn new(secret: impl Into<Secret>, issuer: impl Into<String>, expires_in: Duration) -> Self {
		Self {
			secret: secret.into(),
			issuer: issuer.into(),
			audience: None,
			expires_in,
			clock: clock::system(),
		}
	}

	/// Sets the `aud` claim; blank values leave it out.
	pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
		let audience = audience.into();

		self.audience = Some(audience).filter(|aud| !aud.trim().is_empty());

		self
	}

	/// Replaces the clock used for `iat` and `exp`.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Signs a token for `profile`.
	pub fn issue(&self, profile: &LoginProfile) -> Result<IssuedToken, TokenError> {
		if self.secret.expose().is_empty() {
			return Err(TokenError::EmptySecret);
		}

		let now = self.clock.now();
		let claims = Claims {
			sub: &profile.id,
			iss: &self.issuer,
			iat: now.unix_timestamp(),
			exp: (now + self.expires_in).unix_timestamp(),
			aud: self.audience.as_deref(),
			name: Some(profile.display_name.as_str()).filter(|name| !name.is_empty()),
			picture: profile.avatar_url.as_deref(),
			preferred_username: profile.username.as_deref(),
		};
		let unsigned = format!(
			"{}.{}",
			URL_SAFE_NO_PAD.encode(HEADER),
			URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
		);
		let mac = HmacSha256::new_from_slice(self.secret.as_bytes())
			.map_err(|_| TokenError::EmptySecret)?
			.chain_update(unsigned.as_bytes());
		let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
		let token = format!("{unsigned}.{signature}");

		Ok(IssuedToken { token, expires_in: self.expires_in.whole_seconds() })
	}
}
impl Debug for TokenIssuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenIssuer")
			.field("issuer", &self.issuer)
			.field("audience", &self.audience)
			.field("expires_in", &self.expires_in)
			.finish_non_exhaustive()
	}
}
