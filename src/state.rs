//! Self-contained anti-CSRF state tokens.
//!
//! A state token carries its own issue time, the origin that started the login, and a
//! random nonce, all covered by an HMAC-SHA256 signature keyed with the tenant secret.
//! Any instance holding the same secret can verify a token without shared storage:
//!
//! ```text
//! base64url("<unix seconds>|<origin>|<nonce>|<base64url(hmac)>")
//! ```
//!
//! Both base64 layers use the unpadded URL-safe alphabet. Signatures are compared in
//! constant time.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{TryRngCore, rngs::OsRng};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	clock::{self, Clock},
	error::StateError,
};

type HmacSha256 = Hmac<Sha256>;

const NONCE_BYTES: usize = 32;
const FIELD_SEPARATOR: char = '|';

/// Fields embedded in a state token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatePayload {
	/// Issue instant, truncated to whole seconds once decoded.
	pub issued_at: OffsetDateTime,
	/// Origin that requested the login.
	pub origin: String,
	/// Random value unique to this token.
	pub nonce: String,
}

/// Token plus the payload it encodes, returned by [`StateManager::issue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedState {
	/// Opaque value to round-trip through the provider redirect.
	pub token: String,
	/// Payload encoded in `token`.
	pub payload: StatePayload,
}

/// Issues, decodes, and verifies HMAC-signed state tokens for one tenant+provider.
#[derive(Clone)]
pub struct StateManager {
	secret: Secret,
	ttl: Duration,
	clock: Arc<dyn Clock>,
}
impl StateManager {
	/// Creates a manager that signs with `secret` and accepts tokens younger than `ttl`.
	///
	/// A blank secret would let anyone forge tokens, so it is refused.
	pub fn new(secret: impl Into<Secret>, ttl: Duration) -> Result<Self, StateError> {
		let secret = secret.into();

		if secret.is_blank() {
			return Err(StateError::EmptySecret);
		}

		Ok(Self { secret, ttl, clock: clock::system() })
	}

	/// Replaces the clock used to stamp and check tokens.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Maximum accepted token age.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Clock used to stamp and check tokens.
	pub fn clock(&self) -> Arc<dyn Clock> {
		Arc::clone(&self.clock)
	}

	/// Issues a fresh token bound to `origin`.
	pub fn issue(&self, origin: &str) -> Result<IssuedState, StateError> {
		let nonce = random_urlsafe(NONCE_BYTES)?;
		let now = self.clock.now();
		let serialized = format!("{}|{origin}|{nonce}", now.unix_timestamp());
		let signature = URL_SAFE_NO_PAD.encode(self.sign(serialized.as_bytes())?);
		let token = URL_SAFE_NO_PAD.encode(format!("{serialized}|{signature}"));

		let payload = StatePayload { issued_at: now, origin: origin.into(), nonce };

		Ok(IssuedState { token, payload })
	}

	/// Decodes `token` and checks its signature without looking at its age.
	///
	/// Used on its own to recover the origin of a failed or denied login.
	pub fn decode(&self, token: &str) -> Result<StatePayload, StateError> {
		let raw = URL_SAFE_NO_PAD.decode(token.as_bytes()).map_err(|_| StateError::Invalid)?;
		let raw = String::from_utf8(raw).map_err(|_| StateError::Invalid)?;
		let fields = raw.split(FIELD_SEPARATOR).collect::<Vec<_>>();
		let [issued_raw, origin, nonce, signature_raw] = fields.as_slice() else {
			return Err(StateError::Invalid);
		};
		let signed_len = issued_raw.len() + origin.len() + nonce.len() + 2;
		let signature =
			URL_SAFE_NO_PAD.decode(signature_raw.as_bytes()).map_err(|_| StateError::Invalid)?;

		self.mac()?
			.chain_update(&raw.as_bytes()[..signed_len])
			.verify_slice(&signature)
			.map_err(|_| StateError::Invalid)?;

		let issued_at = parse_unix(issued_raw)?;

		Ok(StatePayload { issued_at, origin: (*origin).into(), nonce: (*nonce).into() })
	}

	/// Decodes `token` and rejects it once it is older than the TTL.
	///
	/// A token exactly `ttl` old is still accepted.
	pub fn verify(&self, token: &str) -> Result<StatePayload, StateError> {
		let payload = self.decode(token)?;
		let elapsed = self.clock.now().unix_timestamp() - payload.issued_at.unix_timestamp();

		if elapsed > self.ttl.whole_seconds() {
			return Err(StateError::Expired);
		}

		Ok(payload)
	}

	fn sign(&self, message: &[u8]) -> Result<Vec<u8>, StateError> {
		Ok(self.mac()?.chain_update(message).finalize().into_bytes().to_vec())
	}

	fn mac(&self) -> Result<HmacSha256, StateError> {
		// HMAC accepts keys of any length.
		HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| StateError::Invalid)
	}
}
impl Debug for StateManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StateManager")
			.field("secret", &self.secret)
			.field("ttl", &self.ttl)
			.finish_non_exhaustive()
	}
}

/// Returns `len` bytes from the OS RNG, base64url-encoded without padding.
pub(crate) fn random_urlsafe(len: usize) -> Result<String, StateError> {
	let mut buf = vec![0_u8; len];

	OsRng.try_fill_bytes(&mut buf).map_err(StateError::entropy)?;

	Ok(URL_SAFE_NO_PAD.encode(buf))
}

fn parse_unix(raw: &str) -> Result<OffsetDateTime, StateError> {
	if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
		return Err(StateError::Invalid);
	}

	let secs = raw.parse::<i64>().map_err(|_| StateError::Invalid)?;

	OffsetDateTime::from_unix_timestamp(secs).map_err(|_| StateError::Invalid)
}
