//! Provider capability traits and the built-in LINE and X clients.
//!
//! [`CodeExchangeClient`] covers providers that redeem a bare authorization code with
//! a client secret; [`PkceExchangeClient`] covers providers that bind the code to a
//! PKCE verifier. Both share profile lookup through [`ProviderClient`]. Futures are
//! boxed and `Send` so trait objects can be shared across request tasks.

pub mod factory;
#[cfg(feature = "reqwest")] pub mod line;
#[cfg(feature = "reqwest")] pub mod x;

pub use factory::*;
#[cfg(feature = "reqwest")] pub use line::LineClient;
#[cfg(feature = "reqwest")] pub use x::XClient;

// self
use crate::{
	_prelude::*,
	auth::{ProviderKind, ProviderProfile, Secret},
	error::{ConfigError, ProviderError},
	tenant::ProviderEndpoints,
};

/// Boxed future returned by provider calls.
pub type ProviderFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ProviderError>> + 'a + Send>>;

/// Token endpoint response; only the access token is required.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderToken {
	/// Bearer token for the profile endpoint.
	#[serde(default)]
	pub access_token: Secret,
	/// Token type reported by the provider.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Provider token lifetime in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Provider refresh token; the broker never uses it.
	#[serde(default)]
	pub refresh_token: Option<Secret>,
	/// Granted scopes.
	#[serde(default)]
	pub scope: Option<String>,
}
impl ProviderToken {
	/// Rejects responses without an access token.
	pub fn require_access_token(self, endpoint: &'static str) -> Result<Self, ProviderError> {
		if self.access_token.is_blank() {
			return Err(ProviderError::MissingField { endpoint, field: "access_token" });
		}

		Ok(self)
	}
}

/// Capabilities shared by every provider client.
pub trait ProviderClient
where
	Self: Send + Sync,
{
	/// Provider this client talks to.
	fn kind(&self) -> ProviderKind;

	/// Fetches the profile of the user owning `access_token`.
	fn fetch_profile<'a>(&'a self, access_token: &'a str) -> ProviderFuture<'a, ProviderProfile>;
}

/// Provider redeeming plain authorization codes.
pub trait CodeExchangeClient
where
	Self: ProviderClient,
{
	/// Builds the provider authorize URL carrying `state`.
	fn authorize_url(&self, state: &str) -> Url;

	/// Redeems `code` for a provider token.
	fn exchange_token<'a>(&'a self, code: &'a str) -> ProviderFuture<'a, ProviderToken>;
}

/// Provider redeeming authorization codes bound to a PKCE verifier.
pub trait PkceExchangeClient
where
	Self: ProviderClient,
{
	/// Builds the provider authorize URL carrying `state` and the S256 `code_challenge`.
	fn authorize_url(&self, state: &str, code_challenge: &str) -> Url;

	/// Redeems `code` together with the verifier that produced the challenge.
	fn exchange_token<'a>(
		&'a self,
		code: &'a str,
		code_verifier: &'a str,
	) -> ProviderFuture<'a, ProviderToken>;
}

/// A provider client in the exchange mode its provider requires.
#[derive(Clone)]
pub enum ExchangeClient {
	/// Plain code exchange.
	Plain(Arc<dyn CodeExchangeClient>),
	/// Code exchange with PKCE.
	Pkce(Arc<dyn PkceExchangeClient>),
}
impl ExchangeClient {
	/// Provider behind the client.
	pub fn kind(&self) -> ProviderKind {
		match self {
			ExchangeClient::Plain(client) => client.kind(),
			ExchangeClient::Pkce(client) => client.kind(),
		}
	}
}
impl Debug for ExchangeClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			ExchangeClient::Plain(client) => write!(f, "ExchangeClient::Plain({})", client.kind()),
			ExchangeClient::Pkce(client) => write!(f, "ExchangeClient::Pkce({})", client.kind()),
		}
	}
}

/// Resolved provider endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
	/// Browser-facing authorization endpoint.
	pub authorize: Url,
	/// Token endpoint.
	pub token: Url,
	/// Profile endpoint.
	pub profile: Url,
}
impl Endpoints {
	/// Public endpoints of `provider` with any `overrides` applied.
	pub fn resolve(
		provider: ProviderKind,
		overrides: &ProviderEndpoints,
	) -> Result<Self, ConfigError> {
		let (authorize, token, profile) = match provider {
			ProviderKind::Line => (
				"https://access.line.me/oauth2/v2.1/authorize",
				"https://api.line.me/oauth2/v2.1/token",
				"https://api.line.me/v2/profile",
			),
			ProviderKind::X => (
				"https://twitter.com/i/oauth2/authorize",
				"https://api.twitter.com/2/oauth2/token",
				"https://api.twitter.com/2/users/me",
			),
		};

		Ok(Self {
			authorize: parse_endpoint("authorize", overrides.authorize_url.as_deref(), authorize)?,
			token: parse_endpoint("token", overrides.token_url.as_deref(), token)?,
			profile: parse_endpoint("profile", overrides.profile_url.as_deref(), profile)?,
		})
	}
}

fn parse_endpoint(
	field: &'static str,
	configured: Option<&str>,
	default: &str,
) -> Result<Url, ConfigError> {
	let raw = configured.map(str::trim).filter(|raw| !raw.is_empty()).unwrap_or(default);

	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })
}
