// std
use std::{
	sync::{
		Arc, Barrier,
		atomic::{AtomicUsize, Ordering},
	},
	thread,
	time::Duration as StdDuration,
};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;
// self
use login_broker::{
	auth::{ProviderKind, ProviderProfile, TenantId},
	error::{ConfigError, Error, Result},
	login::{CallContext, CallbackFailure, CallbackResult, DEFAULT_FRAGMENT_KEY},
	provider::{
		CodeExchangeClient, ExchangeClient, PkceExchangeClient, ProviderClient, ProviderFactory,
		ProviderFuture, ProviderToken,
	},
	tenant::{ProviderSettings, StaticTenantConfigs, TenantResolver},
};

const CONFIG: &str = r#"{
	"auth": {
		"tenanta": {
			"allowedOrigins": ["https://a.example.com"],
			"defaultRedirectOrigin": "https://a.example.com",
			"redirectPath": "login/done",
			"line": {
				"clientId": "line-a",
				"clientSecret": "line-secret-a",
				"redirectUri": "https://tenanta.auth.example.com/line/callback",
				"stateSecret": "state-a",
				"jwtSecret": "jwt-a"
			},
			"x": { "clientId": "x-a" }
		},
		"tenantb": {
			"line": {
				"clientId": "line-b",
				"clientSecret": "line-secret-b",
				"redirectUri": "https://tenantb.auth.example.com/line/callback",
				"stateSecret": "state-b",
				"jwtSecret": "jwt-b"
			}
		},
		"tenantc": {
			"allowedOrigins": ["https://c.example.com"],
			"line": {
				"clientId": "line-c",
				"clientSecret": "line-secret-c",
				"redirectUri": "https://tenantc.auth.example.com/line/callback",
				"jwtSecret": "jwt-c"
			}
		},
		"tenantd": {
			"line": {
				"clientId": "line-d",
				"clientSecret": "line-secret-d",
				"redirectUri": "https://tenantd.auth.example.com/line/callback",
				"stateSecret": "state-d",
				"jwtSecret": "jwt-d",
				"providerTimeoutSecs": 0
			}
		}
	}
}"#;

struct StubClient(ProviderKind);
impl ProviderClient for StubClient {
	fn kind(&self) -> ProviderKind {
		self.0
	}

	fn fetch_profile<'a>(&'a self, _access_token: &'a str) -> ProviderFuture<'a, ProviderProfile> {
		Box::pin(async {
			Ok(ProviderProfile { id: "U1".into(), display_name: "Taro".into(), ..Default::default() })
		})
	}
}
impl CodeExchangeClient for StubClient {
	fn authorize_url(&self, state: &str) -> Url {
		let mut url =
			Url::parse("https://provider.example.com/authorize").expect("Stub URL should parse.");

		url.query_pairs_mut().append_pair("state", state);

		url
	}

	fn exchange_token<'a>(&'a self, _code: &'a str) -> ProviderFuture<'a, ProviderToken> {
		Box::pin(async { Ok(ProviderToken { access_token: "access".into(), ..Default::default() }) })
	}
}
impl PkceExchangeClient for StubClient {
	fn authorize_url(&self, state: &str, _code_challenge: &str) -> Url {
		CodeExchangeClient::authorize_url(self, state)
	}

	fn exchange_token<'a>(
		&'a self,
		code: &'a str,
		_code_verifier: &'a str,
	) -> ProviderFuture<'a, ProviderToken> {
		CodeExchangeClient::exchange_token(self, code)
	}
}

#[derive(Default)]
struct CountingFactory {
	builds: AtomicUsize,
}
impl ProviderFactory for CountingFactory {
	fn build(
		&self,
		_tenant: &TenantId,
		provider: ProviderKind,
		_settings: &ProviderSettings,
	) -> Result<ExchangeClient> {
		self.builds.fetch_add(1, Ordering::SeqCst);
		// Widen the window in which concurrent first resolutions overlap.
		thread::sleep(StdDuration::from_millis(5));

		let client = Arc::new(StubClient(provider));

		Ok(match provider {
			ProviderKind::Line => ExchangeClient::Plain(client),
			ProviderKind::X => ExchangeClient::Pkce(client),
		})
	}
}

fn tenant(id: &str) -> TenantId {
	TenantId::new(id).expect("Tenant fixture should be valid.")
}

fn resolver() -> (Arc<CountingFactory>, Arc<TenantResolver>) {
	let configs = StaticTenantConfigs::from_json(CONFIG).expect("Fixture config should parse.");
	let factory = Arc::new(CountingFactory::default());
	let resolver = TenantResolver::new(Arc::new(configs), factory.clone());

	(factory, Arc::new(resolver))
}

#[test]
fn unknown_tenant_is_not_found() {
	let (_, resolver) = resolver();
	let err = resolver
		.resolve(&tenant("nobody"), ProviderKind::Line)
		.expect_err("Unknown tenants must not resolve.");

	assert!(matches!(err, Error::TenantNotFound { tenant } if tenant == "nobody"));
}

#[test]
fn incomplete_credentials_disable_the_provider() {
	let (factory, resolver) = resolver();

	for _ in 0..2 {
		let err = resolver
			.resolve(&tenant("tenanta"), ProviderKind::X)
			.expect_err("X without a redirect URI must be disabled.");

		assert!(matches!(
			err,
			Error::ProviderDisabled { ref tenant, provider: ProviderKind::X } if tenant == "tenanta"
		));
	}

	assert!(matches!(
		resolver.resolve(&tenant("tenantb"), ProviderKind::X),
		Err(Error::ProviderDisabled { .. })
	));
	assert_eq!(factory.builds.load(Ordering::SeqCst), 0);
	assert_eq!(resolver.cached(), 0);
}

#[test]
fn blank_state_secret_disables_the_provider() {
	let (factory, resolver) = resolver();
	let err = resolver
		.resolve(&tenant("tenantc"), ProviderKind::Line)
		.expect_err("A tenant without a state secret must not sign states.");

	assert!(matches!(
		err,
		Error::ProviderDisabled { ref tenant, provider: ProviderKind::Line } if tenant == "tenantc"
	));
	assert_eq!(factory.builds.load(Ordering::SeqCst), 0);
	assert_eq!(resolver.cached(), 0);
}

#[tokio::test]
async fn states_signed_with_an_empty_key_are_rejected() {
	let (_, resolver) = resolver();
	let deps = resolver.resolve(&tenant("tenanta"), ProviderKind::Line).expect("Should resolve.");
	let body = format!(
		"{}|https://evil.example.com|forged",
		time::OffsetDateTime::now_utc().unix_timestamp()
	);
	let signature = Hmac::<Sha256>::new_from_slice(b"")
		.expect("HMAC accepts any key length.")
		.chain_update(body.as_bytes())
		.finalize()
		.into_bytes();
	let forged = URL_SAFE_NO_PAD.encode(format!("{body}|{}", URL_SAFE_NO_PAD.encode(signature)));
	let result = deps
		.usecase
		.callback(&CallContext::new(), "code", &forged)
		.await
		.expect("Callback should not fail hard.");

	assert!(!result.success);
	assert_eq!(result.failure, Some(CallbackFailure::InvalidAttempt));
	assert_eq!(result.origin, "https://a.example.com");
}

#[test]
fn zero_provider_timeout_is_a_config_error() {
	let (factory, resolver) = resolver();
	let err = resolver
		.resolve(&tenant("tenantd"), ProviderKind::Line)
		.expect_err("A zero provider timeout must be rejected.");

	assert!(matches!(
		err,
		Error::Config(ConfigError::NonPositive { field: "providerTimeoutSecs" })
	));
	assert_eq!(factory.builds.load(Ordering::SeqCst), 0);
	assert_eq!(resolver.cached(), 0);
}

#[test]
fn resolution_is_memoized_per_tenant_and_provider() {
	let (factory, resolver) = resolver();
	let first = resolver.resolve(&tenant("tenanta"), ProviderKind::Line).expect("Should resolve.");
	let second = resolver.resolve(&tenant("tenanta"), ProviderKind::Line).expect("Should resolve.");
	let other = resolver.resolve(&tenant("tenantb"), ProviderKind::Line).expect("Should resolve.");

	assert!(Arc::ptr_eq(&first, &second));
	assert!(!Arc::ptr_eq(&first, &other));
	assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
	assert_eq!(resolver.cached(), 2);
	assert_eq!(first.allowed_origins.iter().collect::<Vec<_>>(), ["https://a.example.com"]);
	assert_eq!(first.default_redirect_origin, "https://a.example.com");
	assert_eq!(first.redirect_path, "/login/done");
	assert!(other.allowed_origins.is_empty());
	assert_eq!(other.redirect_path, "/");
}

#[test]
fn concurrent_first_resolutions_share_one_bundle() {
	const THREADS: usize = 16;

	let (_, resolver) = resolver();
	let barrier = Arc::new(Barrier::new(THREADS));
	let handles = (0..THREADS)
		.map(|_| {
			let resolver = Arc::clone(&resolver);
			let barrier = Arc::clone(&barrier);

			thread::spawn(move || {
				barrier.wait();

				resolver
					.resolve(&tenant("tenanta"), ProviderKind::Line)
					.expect("Concurrent resolution should succeed.")
			})
		})
		.collect::<Vec<_>>();
	let resolved = handles
		.into_iter()
		.map(|handle| handle.join().expect("Resolver thread should not panic."))
		.collect::<Vec<_>>();

	assert!(resolved.iter().all(|deps| Arc::ptr_eq(deps, &resolved[0])));
	assert_eq!(resolver.cached(), 1);
}

#[tokio::test]
async fn tenants_do_not_accept_each_others_state() {
	let (_, resolver) = resolver();
	let a = resolver.resolve(&tenant("tenanta"), ProviderKind::Line).expect("Should resolve.");
	let b = resolver.resolve(&tenant("tenantb"), ProviderKind::Line).expect("Should resolve.");
	let start = a.usecase.start("https://a.example.com").expect("Allowed origin should start.");
	let own = a
		.usecase
		.callback(&CallContext::new(), "code", &start.state)
		.await
		.expect("Callback should not fail hard.");

	assert!(own.success);
	assert_eq!(own.payload.map(|payload| payload.user.id).as_deref(), Some("U1"));

	let foreign = b
		.usecase
		.callback(&CallContext::new(), "code", &start.state)
		.await
		.expect("Callback should not fail hard.");

	assert_eq!(foreign.failure, Some(CallbackFailure::InvalidAttempt));
}

#[test]
fn deps_render_results_into_the_tenant_frontend() {
	let (_, resolver) = resolver();
	let deps = resolver.resolve(&tenant("tenanta"), ProviderKind::Line).expect("Should resolve.");
	let result = deps.usecase.callback_denied("access_denied", "not-a-state");
	let url = deps.redirect_url(&result, DEFAULT_FRAGMENT_KEY).expect("Redirect should build.");

	assert_eq!(url.origin().ascii_serialization(), "https://a.example.com");
	assert_eq!(url.path(), "/login/done");

	let encoded = url
		.fragment()
		.and_then(|fragment| fragment.strip_prefix("result="))
		.expect("Fragment should carry the result.");
	let decoded = URL_SAFE_NO_PAD.decode(encoded).expect("Fragment should be base64url.");
	let back: CallbackResult =
		serde_json::from_slice(&decoded).expect("Fragment should hold the result JSON.");

	assert_eq!(back, result);
}
