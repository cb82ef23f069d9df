//! Tenant configuration model and the in-memory config source.
//!
//! Documents use camelCase keys and whole seconds for durations:
//!
//! ```json
//! {
//!   "auth": {
//!     "tenanta": {
//!       "allowedOrigins": ["https://app.example.com"],
//!       "defaultRedirectOrigin": "https://app.example.com",
//!       "line": { "clientId": "...", "clientSecret": "...", "redirectUri": "..." },
//!       "x": { "clientId": "...", "redirectUri": "...", "stateTtlSecs": 300 }
//!     }
//!   }
//! }
//! ```

// self
use crate::{
	_prelude::*,
	auth::{ProviderKind, Secret, TenantId},
	error::ConfigError,
};

const DEFAULT_STATE_TTL_SECS: u64 = 600;
const DEFAULT_JWT_EXPIRES_IN_SECS: u64 = 86_400;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REDIRECT_PATH: &str = "/";

/// Lookup contract for tenant configuration.
pub trait TenantConfigSource
where
	Self: Send + Sync,
{
	/// Returns the configuration for `tenant`, if one exists.
	fn tenant(&self, tenant: &TenantId) -> Option<TenantConfig>;
}

/// Everything the broker knows about one tenant.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantConfig {
	/// Origins allowed to start a login; empty allows every origin.
	pub allowed_origins: Vec<String>,
	/// Origin used when a result carries none.
	pub default_redirect_origin: String,
	/// Frontend path results are delivered to.
	pub redirect_path: String,
	/// LINE settings.
	pub line: ProviderSettings,
	/// X settings.
	#[serde(alias = "twitter")]
	pub x: ProviderSettings,
}
impl TenantConfig {
	/// Settings for `provider`.
	pub fn provider(&self, provider: ProviderKind) -> &ProviderSettings {
		match provider {
			ProviderKind::Line => &self.line,
			ProviderKind::X => &self.x,
		}
	}

	/// Trimmed, non-empty allowed origins.
	pub fn allowed_origin_set(&self) -> BTreeSet<String> {
		self.allowed_origins
			.iter()
			.map(|origin| origin.trim())
			.filter(|origin| !origin.is_empty())
			.map(ToOwned::to_owned)
			.collect()
	}
}
impl Default for TenantConfig {
	fn default() -> Self {
		Self {
			allowed_origins: Vec::new(),
			default_redirect_origin: String::new(),
			redirect_path: DEFAULT_REDIRECT_PATH.into(),
			line: ProviderSettings::default(),
			x: ProviderSettings::default(),
		}
	}
}

/// Credentials, secrets, and limits for one provider of one tenant.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
	/// OAuth client identifier (LINE channel id).
	pub client_id: String,
	/// OAuth client secret (LINE channel secret); optional for X.
	pub client_secret: Secret,
	/// Callback URI registered with the provider.
	pub redirect_uri: String,
	/// Requested scopes; empty uses the provider defaults.
	pub scopes: Vec<String>,
	/// Key for state token signatures.
	pub state_secret: Secret,
	/// Maximum state age in seconds.
	pub state_ttl_secs: u64,
	/// Key for access token signatures.
	pub jwt_secret: Secret,
	/// `iss` claim; blank uses the provider default.
	pub jwt_issuer: String,
	/// `aud` claim; blank omits it.
	pub jwt_audience: String,
	/// Access token lifetime in seconds.
	pub jwt_expires_in_secs: u64,
	/// Budget for the outbound calls of one callback, in seconds.
	pub provider_timeout_secs: u64,
	/// LINE `bot_prompt` parameter (`normal` or `aggressive`).
	pub bot_prompt: Option<String>,
	/// Endpoint overrides.
	pub endpoints: ProviderEndpoints,
}
impl ProviderSettings {
	/// Returns true when the credentials and signing secrets `provider` needs are all
	/// present.
	pub fn is_complete(&self, provider: ProviderKind) -> bool {
		let base = !self.client_id.trim().is_empty() && !self.redirect_uri.trim().is_empty();
		let secrets = !self.state_secret.is_blank() && !self.jwt_secret.is_blank();

		base && secrets && (!provider.requires_client_secret() || !self.client_secret.is_blank())
	}

	/// Rejects zero durations.
	pub fn check_limits(&self) -> Result<(), ConfigError> {
		for (field, secs) in [
			("stateTtlSecs", self.state_ttl_secs),
			("jwtExpiresInSecs", self.jwt_expires_in_secs),
			("providerTimeoutSecs", self.provider_timeout_secs),
		] {
			if secs == 0 {
				return Err(ConfigError::NonPositive { field });
			}
		}

		Ok(())
	}

	/// Space-delimited scopes, falling back to the provider defaults.
	pub fn scope_param(&self, provider: ProviderKind) -> String {
		let scopes = self
			.scopes
			.iter()
			.map(|scope| scope.trim())
			.filter(|scope| !scope.is_empty())
			.collect::<Vec<_>>();

		if scopes.is_empty() {
			return match provider {
				ProviderKind::Line => "profile openid".into(),
				ProviderKind::X => "tweet.read users.read offline.access".into(),
			};
		}

		scopes.join(" ")
	}

	/// `iss` claim, falling back to `auth-<provider>`.
	pub fn issuer(&self, provider: ProviderKind) -> String {
		match self.jwt_issuer.trim() {
			"" => format!("auth-{}", provider.as_str()),
			issuer => issuer.to_owned(),
		}
	}

	/// State TTL.
	pub fn state_ttl(&self) -> Duration {
		seconds(self.state_ttl_secs)
	}

	/// Access token lifetime.
	pub fn jwt_expires_in(&self) -> Duration {
		seconds(self.jwt_expires_in_secs)
	}

	/// Outbound call budget.
	pub fn provider_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.provider_timeout_secs)
	}
}
impl Default for ProviderSettings {
	fn default() -> Self {
		Self {
			client_id: String::new(),
			client_secret: Secret::default(),
			redirect_uri: String::new(),
			scopes: Vec::new(),
			state_secret: Secret::default(),
			state_ttl_secs: DEFAULT_STATE_TTL_SECS,
			jwt_secret: Secret::default(),
			jwt_issuer: String::new(),
			jwt_audience: String::new(),
			jwt_expires_in_secs: DEFAULT_JWT_EXPIRES_IN_SECS,
			provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
			bot_prompt: None,
			endpoints: ProviderEndpoints::default(),
		}
	}
}

/// Optional overrides for provider endpoints, mostly for tests and staging.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderEndpoints {
	/// Authorization endpoint.
	pub authorize_url: Option<String>,
	/// Token endpoint.
	pub token_url: Option<String>,
	/// Profile endpoint.
	pub profile_url: Option<String>,
}

/// In-memory [`TenantConfigSource`] built from config documents.
#[derive(Clone, Debug, Default)]
pub struct StaticTenantConfigs {
	tenants: HashMap<TenantId, TenantConfig>,
}
impl StaticTenantConfigs {
	/// Parses a `{ "auth": { "<tenant>": { ... } } }` document.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		#[derive(Deserialize)]
		struct Document {
			#[serde(default)]
			auth: HashMap<TenantId, TenantConfig>,
		}

		let mut de = serde_json::Deserializer::from_str(raw);
		let doc: Document = serde_path_to_error::deserialize(&mut de)?;

		Ok(Self { tenants: doc.auth })
	}

	/// Adds or replaces one tenant.
	pub fn insert(mut self, tenant: TenantId, config: TenantConfig) -> Self {
		self.tenants.insert(tenant, config);

		self
	}

	/// Folds `other` into `self`; tenants present in both take `other`'s config.
	pub fn merge(mut self, other: Self) -> Self {
		self.tenants.extend(other.tenants);

		self
	}

	/// Configured tenant ids.
	pub fn tenant_ids(&self) -> impl Iterator<Item = &TenantId> {
		self.tenants.keys()
	}

	/// Number of configured tenants.
	pub fn len(&self) -> usize {
		self.tenants.len()
	}

	/// Returns true when no tenant is configured.
	pub fn is_empty(&self) -> bool {
		self.tenants.is_empty()
	}
}
impl TenantConfigSource for StaticTenantConfigs {
	fn tenant(&self, tenant: &TenantId) -> Option<TenantConfig> {
		self.tenants.get(tenant).cloned()
	}
}

fn seconds(secs: u64) -> Duration {
	Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}
