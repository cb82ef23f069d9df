//! Construction of provider clients from tenant settings.

// self
#[cfg(feature = "reqwest")]
use crate::{
	http::ReqwestHttpClient,
	provider::{LineClient, XClient},
};
use crate::{
	_prelude::*,
	auth::{ProviderKind, TenantId},
	provider::ExchangeClient,
	tenant::ProviderSettings,
};

/// Builds the provider client used by a tenant's login usecase.
pub trait ProviderFactory
where
	Self: Send + Sync,
{
	/// Builds the client for `provider` from `settings`.
	///
	/// Settings passed here always carry the credentials the provider requires.
	fn build(
		&self,
		tenant: &TenantId,
		provider: ProviderKind,
		settings: &ProviderSettings,
	) -> Result<ExchangeClient>;
}

/// Default factory wiring [`LineClient`] and [`XClient`] onto a shared reqwest client.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestProviderFactory {
	http: ReqwestHttpClient,
}
#[cfg(feature = "reqwest")]
impl ReqwestProviderFactory {
	/// Creates a factory with a redirect-free reqwest client.
	pub fn new() -> Result<Self> {
		Ok(Self { http: ReqwestHttpClient::new()? })
	}

	/// Creates a factory sharing `http` across every tenant.
	pub fn with_http_client(http: ReqwestHttpClient) -> Self {
		Self { http }
	}
}
#[cfg(feature = "reqwest")]
impl ProviderFactory for ReqwestProviderFactory {
	fn build(
		&self,
		_tenant: &TenantId,
		provider: ProviderKind,
		settings: &ProviderSettings,
	) -> Result<ExchangeClient> {
		Ok(match provider {
			ProviderKind::Line =>
				ExchangeClient::Plain(Arc::new(LineClient::new(self.http.clone(), settings)?)),
			ProviderKind::X =>
				ExchangeClient::Pkce(Arc::new(XClient::new(self.http.clone(), settings)?)),
		})
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	#[test]
	fn builds_the_matching_exchange_mode() {
		let factory = ReqwestProviderFactory::new().expect("Factory should build.");
		let tenant = TenantId::new("tenant-a").expect("Tenant fixture should be valid.");
		let settings = ProviderSettings {
			client_id: "client".into(),
			client_secret: "secret".into(),
			redirect_uri: "https://auth.example.com/callback".into(),
			..Default::default()
		};
		let line = factory
			.build(&tenant, ProviderKind::Line, &settings)
			.expect("LINE client should build.");
		let x = factory.build(&tenant, ProviderKind::X, &settings).expect("X client should build.");

		assert!(matches!(line, ExchangeClient::Plain(_)));
		assert!(matches!(x, ExchangeClient::Pkce(_)));
		assert_eq!(x.kind(), ProviderKind::X);
	}
}
