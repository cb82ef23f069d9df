//! PKCE verifier generation and the one-shot state→verifier store.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	clock::{self, Clock},
	error::StateError,
	state,
};

const VERIFIER_BYTES: usize = 64;

/// Challenge method advertised on the authorize URL.
pub const CHALLENGE_METHOD: &str = "S256";

/// Verifier plus its S256 challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
	/// High-entropy verifier kept server-side until the callback.
	pub verifier: String,
	/// `base64url(SHA256(verifier))`, sent on the authorize URL.
	pub challenge: String,
}
impl PkcePair {
	/// Generates a verifier from 64 OS-random bytes (86 base64url characters).
	pub fn generate() -> Result<Self, StateError> {
		let verifier = state::random_urlsafe(VERIFIER_BYTES)?;
		let challenge = challenge_for(&verifier);

		Ok(Self { verifier, challenge })
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.finish()
	}
}

/// Derives the S256 challenge for `verifier`.
pub fn challenge_for(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Short-lived map from issued state tokens to their PKCE verifiers.
///
/// Every verifier can be taken at most once. Entries older than the TTL are swept on
/// insertion; ages are counted in whole seconds, the same way state tokens are checked.
pub struct VerifierStore {
	entries: Mutex<HashMap<String, (String, OffsetDateTime)>>,
	ttl: Duration,
	clock: Arc<dyn Clock>,
}
impl VerifierStore {
	/// Creates an empty store whose entries go stale after `ttl`.
	pub fn new(ttl: Duration) -> Self {
		Self { entries: Mutex::new(HashMap::new()), ttl, clock: clock::system() }
	}

	/// Replaces the clock used to stamp and sweep entries.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Associates `verifier` with `state`, replacing any previous value.
	pub fn store(&self, state: impl Into<String>, verifier: impl Into<String>) {
		let now = self.clock.now();
		let ttl = self.ttl.whole_seconds();
		let mut entries = self.entries.lock();

		entries.retain(|_, (_, inserted_at)| {
			now.unix_timestamp() - inserted_at.unix_timestamp() <= ttl
		});
		entries.insert(state.into(), (verifier.into(), now));
	}

	/// Removes and returns the verifier for `state`.
	///
	/// `None` means the state was never stored, already consumed, or swept.
	pub fn take(&self, state: &str) -> Option<String> {
		self.entries.lock().remove(state).map(|(verifier, _)| verifier)
	}

	/// Number of pending verifiers.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns true when no verifier is pending.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}
impl Debug for VerifierStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("VerifierStore")
			.field("pending", &self.len())
			.field("ttl", &self.ttl)
			.finish_non_exhaustive()
	}
}
