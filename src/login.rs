//! Login orchestration for one tenant and one provider.
//!
//! [`LoginUsecase::start`] issues a state token (plus a PKCE verifier when the provider
//! needs one) and returns the provider authorize URL. [`LoginUsecase::callback`] walks
//! the redirect back through state verification, code exchange, profile lookup, and
//! access token issuance. Routine failures along the way become a failed
//! [`CallbackResult`] with a user-facing message; only broken invariants surface as
//! [`Error`].

pub mod context;
pub mod outcome;
pub mod pkce;
pub mod redirect;

pub use context::*;
pub use outcome::*;
pub use pkce::*;
pub use redirect::*;

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::time::{self as tokio_time, Instant};
// self
use crate::{
	_prelude::*,
	auth::{LoginProfile, ProviderKind, ProviderProfile},
	error::StateError,
	obs::{self, FlowOutcome, FlowSpan, LoginStage},
	provider::{
		CodeExchangeClient, ExchangeClient, PkceExchangeClient, ProviderFuture, ProviderToken,
	},
	state::{StateManager, StatePayload},
	token::TokenIssuer,
};

const DEFAULT_PROVIDER_TIMEOUT: StdDuration = StdDuration::from_secs(10);
const TOKEN_TYPE: &str = "Bearer";

/// Output of [`LoginUsecase::start`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartOutput {
	/// Provider URL the browser should be sent to.
	pub authorization_url: Url,
	/// State token embedded in the URL.
	pub state: String,
}

enum ExchangeMode {
	Plain(Arc<dyn CodeExchangeClient>),
	Pkce { client: Arc<dyn PkceExchangeClient>, verifiers: VerifierStore },
}

/// Start and callback orchestration for one tenant+provider pair.
///
/// Callbacks bound their provider calls with [`tokio::time::timeout_at`], so they must
/// run inside a Tokio runtime with the time driver enabled.
pub struct LoginUsecase {
	provider: ProviderKind,
	exchange: ExchangeMode,
	states: StateManager,
	tokens: TokenIssuer,
	allowed_origins: BTreeSet<String>,
	default_redirect_origin: String,
	provider_timeout: StdDuration,
}
impl LoginUsecase {
	/// Wires a usecase around `client`; PKCE clients get their own verifier store.
	///
	/// Every origin is allowed until [`with_allowed_origins`](Self::with_allowed_origins)
	/// narrows the set.
	pub fn new(client: ExchangeClient, states: StateManager, tokens: TokenIssuer) -> Self {
		let provider = client.kind();
		let exchange = match client {
			ExchangeClient::Plain(client) => ExchangeMode::Plain(client),
			ExchangeClient::Pkce(client) => ExchangeMode::Pkce {
				client,
				verifiers: VerifierStore::new(states.ttl()).with_clock(states.clock()),
			},
		};

		Self {
			provider,
			exchange,
			states,
			tokens,
			allowed_origins: BTreeSet::new(),
			default_redirect_origin: String::new(),
			provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
		}
	}

	/// Restricts logins to `origins`; an empty set allows every origin.
	pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.allowed_origins = origins
			.into_iter()
			.map(Into::into)
			.map(|origin| origin.trim().to_owned())
			.filter(|origin| !origin.is_empty())
			.collect();

		self
	}

	/// Origin reported when a failed callback carries no usable state.
	pub fn with_default_redirect_origin(mut self, origin: impl Into<String>) -> Self {
		self.default_redirect_origin = origin.into().trim().to_owned();

		self
	}

	/// Budget shared by the token exchange and profile fetch of one callback.
	pub fn with_provider_timeout(mut self, timeout: StdDuration) -> Self {
		self.provider_timeout = timeout;

		self
	}

	/// Provider this usecase logs users in with.
	pub fn provider(&self) -> ProviderKind {
		self.provider
	}

	/// Allowed origins; empty allows every origin.
	pub fn allowed_origins(&self) -> &BTreeSet<String> {
		&self.allowed_origins
	}

	/// Fallback origin for failed callbacks.
	pub fn default_redirect_origin(&self) -> &str {
		&self.default_redirect_origin
	}

	/// Verifiers waiting for their callback; always zero for plain providers.
	pub fn pending_verifiers(&self) -> usize {
		match &self.exchange {
			ExchangeMode::Plain(_) => 0,
			ExchangeMode::Pkce { verifiers, .. } => verifiers.len(),
		}
	}

	/// Returns true when `origin` may start a login.
	pub fn is_origin_allowed(&self, origin: &str) -> bool {
		!origin.contains('|')
			&& (self.allowed_origins.is_empty() || self.allowed_origins.contains(origin))
	}

	/// Issues a state token for `origin` and builds the provider authorize URL.
	pub fn start(&self, origin: &str) -> Result<StartOutput> {
		let _guard = FlowSpan::new(self.provider, LoginStage::Start).entered();

		obs::record_flow_outcome(self.provider, LoginStage::Start, FlowOutcome::Attempt);

		let result = self.start_inner(origin);
		let outcome = if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Error };

		obs::record_flow_outcome(self.provider, LoginStage::Start, outcome);

		result
	}

	/// Completes a login from the provider redirect.
	///
	/// The provider calls share a deadline of `min(ctx deadline, now + provider timeout)`.
	/// Dropping the returned future abandons any in-flight provider call.
	pub async fn callback(
		&self,
		ctx: &CallContext,
		code: &str,
		state: &str,
	) -> Result<CallbackResult> {
		let span = FlowSpan::new(self.provider, LoginStage::Callback);

		obs::record_flow_outcome(self.provider, LoginStage::Callback, FlowOutcome::Attempt);

		let result = span.instrument(self.callback_inner(ctx, code, state)).await;
		let outcome = match &result {
			Ok(result) if result.success => FlowOutcome::Success,
			Ok(_) => FlowOutcome::Failure,
			Err(_) => FlowOutcome::Error,
		};

		obs::record_flow_outcome(self.provider, LoginStage::Callback, outcome);

		result
	}

	/// Builds the failed result for a provider redirect carrying `error` instead of a code.
	pub fn callback_denied(&self, error_code: &str, state: &str) -> CallbackResult {
		let state = state.trim();
		let error_code = match error_code.trim() {
			"" => "unknown_error",
			code => code,
		};
		let failure = CallbackFailure::ProviderDenied { error_code: error_code.to_owned() };
		let result = self.fail(state, self.best_effort_origin(state), failure, &error_code);

		obs::record_flow_outcome(self.provider, LoginStage::Callback, FlowOutcome::Failure);

		result
	}

	/// Decodes `state` without checking its age.
	pub fn decode_state(&self, state: &str) -> Result<StatePayload> {
		Ok(self.states.decode(state.trim())?)
	}

	fn start_inner(&self, origin: &str) -> Result<StartOutput> {
		let origin = origin.trim();

		if origin.is_empty() {
			return Err(Error::OriginRequired);
		}
		if !self.is_origin_allowed(origin) {
			return Err(Error::OriginNotAllowed { origin: origin.to_owned() });
		}

		let issued = self.states.issue(origin)?;
		let authorization_url = match &self.exchange {
			ExchangeMode::Plain(client) => client.authorize_url(&issued.token),
			ExchangeMode::Pkce { client, verifiers } => {
				let pair = PkcePair::generate()?;

				verifiers.store(issued.token.clone(), pair.verifier);

				client.authorize_url(&issued.token, &pair.challenge)
			},
		};

		Ok(StartOutput { authorization_url, state: issued.token })
	}

	async fn callback_inner(
		&self,
		ctx: &CallContext,
		code: &str,
		state: &str,
	) -> Result<CallbackResult> {
		let deadline = ctx.effective_deadline(Instant::now(), self.provider_timeout);
		let code = code.trim();
		let state = state.trim();

		if code.is_empty() || state.is_empty() {
			let origin = self.best_effort_origin(state);
			let detail = "missing code or state";

			return Ok(self.fail(state, origin, CallbackFailure::InvalidResponse, &detail));
		}

		let payload = match self.states.verify(state) {
			Ok(payload) => payload,
			Err(e) => {
				let failure = match e {
					StateError::Expired => CallbackFailure::Expired,
					_ => CallbackFailure::InvalidAttempt,
				};

				return Ok(self.fail(state, self.best_effort_origin(state), failure, &e));
			},
		};
		let origin = self.origin_or_default(payload.origin);
		let exchanged = match &self.exchange {
			ExchangeMode::Plain(client) =>
				tokio_time::timeout_at(deadline, client.exchange_token(code)).await,
			ExchangeMode::Pkce { client, verifiers } => {
				let Some(verifier) = verifiers.take(state) else {
					let detail = "verifier missing or already used";

					return Ok(self.fail(state, origin, CallbackFailure::Expired, &detail));
				};

				tokio_time::timeout_at(deadline, client.exchange_token(code, &verifier)).await
			},
		};
		let token = match exchanged {
			Ok(Ok(token)) => token,
			Ok(Err(e)) =>
				return Ok(self.fail(state, origin, CallbackFailure::ProviderUnavailable, &e)),
			Err(e) =>
				return Ok(self.fail(state, origin, CallbackFailure::ProviderUnavailable, &e)),
		};
		let profile = match tokio_time::timeout_at(deadline, self.fetch_profile(&token)).await {
			Ok(Ok(profile)) => profile,
			Ok(Err(e)) =>
				return Ok(self.fail(state, origin, CallbackFailure::ProfileUnavailable, &e)),
			Err(e) =>
				return Ok(self.fail(state, origin, CallbackFailure::ProviderUnavailable, &e)),
		};
		let user = LoginProfile::normalize(self.provider, profile)?;
		let issued = match self.tokens.issue(&user) {
			Ok(issued) => issued,
			Err(e) => return Ok(self.fail(state, origin, CallbackFailure::TokenIssueFailed, &e)),
		};
		let payload = LoginPayload {
			access_token: issued.token,
			token_type: TOKEN_TYPE.into(),
			expires_in: issued.expires_in,
			user,
		};

		Ok(CallbackResult::success(state.to_owned(), origin, payload))
	}

	fn fetch_profile<'a>(
		&'a self,
		token: &'a ProviderToken,
	) -> ProviderFuture<'a, ProviderProfile> {
		let access_token = token.access_token.expose();

		match &self.exchange {
			ExchangeMode::Plain(client) => client.fetch_profile(access_token),
			ExchangeMode::Pkce { client, .. } => client.fetch_profile(access_token),
		}
	}

	fn best_effort_origin(&self, state: &str) -> String {
		let decoded = self.states.decode(state).map(|payload| payload.origin).unwrap_or_default();

		self.origin_or_default(decoded)
	}

	fn origin_or_default(&self, origin: String) -> String {
		if origin.trim().is_empty() { self.default_redirect_origin.clone() } else { origin }
	}

	fn fail(
		&self,
		state: &str,
		origin: String,
		failure: CallbackFailure,
		detail: &dyn Display,
	) -> CallbackResult {
		obs::log_soft_failure(self.provider, failure.as_str(), detail);

		CallbackResult::failure(self.provider, state.to_owned(), origin, failure)
	}
}
impl Debug for LoginUsecase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginUsecase")
			.field("provider", &self.provider)
			.field("states", &self.states)
			.field("tokens", &self.tokens)
			.field("allowed_origins", &self.allowed_origins)
			.field("default_redirect_origin", &self.default_redirect_origin)
			.field("provider_timeout", &self.provider_timeout)
			.finish_non_exhaustive()
	}
}
