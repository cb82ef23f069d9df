//! Lazily built, memoized per-tenant login dependencies.
//!
//! The first request for a tenant+provider pair loads its config, builds the state
//! manager, token issuer, provider client, and usecase, and caches the bundle. Later
//! requests only take the read lock. Concurrent first requests may each build a
//! bundle; the first one stored wins and every caller receives it.

// self
use crate::{
	_prelude::*,
	auth::{ProviderKind, TenantId},
	clock::{self, Clock},
	login::{CallbackResult, LoginUsecase, RedirectBuilder},
	obs,
	provider::ProviderFactory,
	state::StateManager,
	tenant::{TenantConfig, TenantConfigSource},
	token::TokenIssuer,
};

type CacheKey = (TenantId, ProviderKind);

/// Fully wired login dependencies for one tenant+provider pair.
#[derive(Debug)]
pub struct TenantDeps {
	/// Login orchestration.
	pub usecase: LoginUsecase,
	/// Origins allowed to start a login; empty allows every origin.
	pub allowed_origins: BTreeSet<String>,
	/// Origin used when a result carries none.
	pub default_redirect_origin: String,
	/// Frontend path results are delivered to.
	pub redirect_path: String,
}
impl TenantDeps {
	/// Redirect builder bound to the tenant defaults.
	pub fn redirect_builder(&self) -> RedirectBuilder {
		RedirectBuilder::new(self.default_redirect_origin.clone(), &self.redirect_path)
	}

	/// Renders `result` into the tenant frontend URL.
	pub fn redirect_url(&self, result: &CallbackResult, fragment_key: &str) -> Result<Url> {
		self.redirect_builder().build(result, fragment_key)
	}
}

/// Resolves tenants to cached [`TenantDeps`].
pub struct TenantResolver {
	source: Arc<dyn TenantConfigSource>,
	factory: Arc<dyn ProviderFactory>,
	clock: Arc<dyn Clock>,
	cache: RwLock<HashMap<CacheKey, Arc<TenantDeps>>>,
	disabled_logged: Mutex<HashSet<CacheKey>>,
}
impl TenantResolver {
	/// Creates a resolver reading configs from `source` and clients from `factory`.
	pub fn new(source: Arc<dyn TenantConfigSource>, factory: Arc<dyn ProviderFactory>) -> Self {
		Self {
			source,
			factory,
			clock: clock::system(),
			cache: RwLock::new(HashMap::new()),
			disabled_logged: Mutex::new(HashSet::new()),
		}
	}

	/// Replaces the clock handed to state managers and token issuers.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Returns the cached dependencies for `tenant` and `provider`, building them once.
	pub fn resolve(&self, tenant: &TenantId, provider: ProviderKind) -> Result<Arc<TenantDeps>> {
		let key = (tenant.clone(), provider);

		if let Some(deps) = self.cache.read().get(&key) {
			return Ok(Arc::clone(deps));
		}

		let config = self
			.source
			.tenant(tenant)
			.ok_or_else(|| Error::TenantNotFound { tenant: tenant.to_string() })?;

		if !config.provider(provider).is_complete(provider) {
			if self.disabled_logged.lock().insert(key) {
				obs::log_provider_disabled(tenant, provider);
			}

			return Err(Error::ProviderDisabled { tenant: tenant.to_string(), provider });
		}

		let built = Arc::new(self.build(tenant, provider, &config)?);
		let mut cache = self.cache.write();

		Ok(Arc::clone(cache.entry(key).or_insert(built)))
	}

	/// Number of cached tenant+provider bundles.
	pub fn cached(&self) -> usize {
		self.cache.read().len()
	}

	fn build(
		&self,
		tenant: &TenantId,
		provider: ProviderKind,
		config: &TenantConfig,
	) -> Result<TenantDeps> {
		let settings = config.provider(provider);

		settings.check_limits()?;

		let client = self.factory.build(tenant, provider, settings)?;
		let states = StateManager::new(settings.state_secret.clone(), settings.state_ttl())?
			.with_clock(Arc::clone(&self.clock));
		let tokens = TokenIssuer::new(
			settings.jwt_secret.clone(),
			settings.issuer(provider),
			settings.jwt_expires_in(),
		)
		.with_audience(settings.jwt_audience.clone())
		.with_clock(Arc::clone(&self.clock));
		let allowed_origins = config.allowed_origin_set();
		let default_redirect_origin = config.default_redirect_origin.trim().to_owned();
		let usecase = LoginUsecase::new(client, states, tokens)
			.with_allowed_origins(allowed_origins.iter().cloned())
			.with_default_redirect_origin(default_redirect_origin.clone())
			.with_provider_timeout(settings.provider_timeout());

		Ok(TenantDeps {
			usecase,
			allowed_origins,
			default_redirect_origin,
			redirect_path: RedirectBuilder::new("", &config.redirect_path).path().to_owned(),
		})
	}
}
impl Debug for TenantResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TenantResolver").field("cached", &self.cached()).finish_non_exhaustive()
	}
}
