//! X (formerly Twitter) OAuth 2.0 client (authorization code with PKCE).

// self
use crate::{
	_prelude::*,
	auth::{ProviderKind, ProviderProfile, Secret},
	error::ProviderError,
	http::{self, ReqwestHttpClient},
	login::CHALLENGE_METHOD,
	provider::{Endpoints, PkceExchangeClient, ProviderClient, ProviderFuture, ProviderToken},
	tenant::ProviderSettings,
};

const USER_FIELDS: &str = "name,username,profile_image_url";

#[derive(Deserialize)]
struct XProfileResponse {
	#[serde(default)]
	data: Option<XUser>,
}

#[derive(Deserialize)]
struct XUser {
	#[serde(default)]
	id: String,
	#[serde(default)]
	name: String,
	#[serde(default)]
	username: Option<String>,
	#[serde(default)]
	profile_image_url: Option<String>,
}

/// Reqwest-backed X client.
///
/// A configured client secret switches the token request to HTTP Basic client
/// authentication; without one the client acts as a public PKCE client.
#[derive(Clone)]
pub struct XClient {
	http: ReqwestHttpClient,
	client_id: String,
	client_secret: Option<Secret>,
	redirect_uri: String,
	scope: String,
	endpoints: Endpoints,
}
impl XClient {
	/// Builds a client from tenant settings.
	pub fn new(http: ReqwestHttpClient, settings: &ProviderSettings) -> Result<Self> {
		let mut endpoints = Endpoints::resolve(ProviderKind::X, &settings.endpoints)?;

		if !endpoints.profile.query_pairs().any(|(key, _)| key == "user.fields") {
			endpoints.profile.query_pairs_mut().append_pair("user.fields", USER_FIELDS);
		}

		Ok(Self {
			http,
			client_id: settings.client_id.trim().to_owned(),
			client_secret: Some(Secret::new(settings.client_secret.expose().trim()))
				.filter(|secret| !secret.is_blank()),
			redirect_uri: settings.redirect_uri.trim().to_owned(),
			scope: settings.scope_param(ProviderKind::X),
			endpoints,
		})
	}
}
impl ProviderClient for XClient {
	fn kind(&self) -> ProviderKind {
		ProviderKind::X
	}

	fn fetch_profile<'a>(&'a self, access_token: &'a str) -> ProviderFuture<'a, ProviderProfile> {
		Box::pin(async move {
			let response = self
				.http
				.get(self.endpoints.profile.clone())
				.bearer_auth(access_token)
				.send()
				.await
				.map_err(|e| ProviderError::network("profile", e))?;
			let payload: XProfileResponse = http::read_json("profile", response).await?;
			let user = payload
				.data
				.filter(|user| !user.id.trim().is_empty())
				.ok_or(ProviderError::MissingField { endpoint: "profile", field: "data.id" })?;

			Ok(ProviderProfile {
				id: user.id,
				display_name: user.name,
				username: user.username,
				avatar_url: user.profile_image_url,
			})
		})
	}
}
impl PkceExchangeClient for XClient {
	fn authorize_url(&self, state: &str, code_challenge: &str) -> Url {
		let mut url = self.endpoints.authorize.clone();

		url.query_pairs_mut()
			.append_pair("response_type", "code")
			.append_pair("client_id", &self.client_id)
			.append_pair("redirect_uri", &self.redirect_uri)
			.append_pair("scope", &self.scope)
			.append_pair("state", state)
			.append_pair("code_challenge", code_challenge)
			.append_pair("code_challenge_method", CHALLENGE_METHOD);

		url
	}

	fn exchange_token<'a>(
		&'a self,
		code: &'a str,
		code_verifier: &'a str,
	) -> ProviderFuture<'a, ProviderToken> {
		Box::pin(async move {
			let form = [
				("grant_type", "authorization_code"),
				("code", code),
				("redirect_uri", self.redirect_uri.as_str()),
				("code_verifier", code_verifier),
				("client_id", self.client_id.as_str()),
			];
			let mut request = self.http.post(self.endpoints.token.clone()).form(&form);

			if let Some(secret) = &self.client_secret {
				request = request.basic_auth(&self.client_id, Some(secret.expose()));
			}

			let response =
				request.send().await.map_err(|e| ProviderError::network("token", e))?;
			let token: ProviderToken = http::read_json("token", response).await?;

			token.require_access_token("token")
		})
	}
}
impl Debug for XClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("XClient")
			.field("client_id", &self.client_id)
			.field("confidential", &self.client_secret.is_some())
			.field("redirect_uri", &self.redirect_uri)
			.field("endpoints", &self.endpoints)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn client(profile_url: Option<&str>) -> XClient {
		let settings = ProviderSettings {
			client_id: "x-client".into(),
			redirect_uri: "https://auth.example.com/x/callback".into(),
			endpoints: crate::tenant::ProviderEndpoints {
				profile_url: profile_url.map(Into::into),
				..Default::default()
			},
			..Default::default()
		};

		let http = ReqwestHttpClient::new().expect("HTTP client should build.");

		XClient::new(http, &settings).expect("X client should build.")
	}

	#[test]
	fn authorize_url_carries_pkce_challenge() {
		let url = client(None).authorize_url("state-1", "challenge-1");
		let pairs = url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		assert_eq!(url.host_str(), Some("twitter.com"));
		assert_eq!(pairs["code_challenge"], "challenge-1");
		assert_eq!(pairs["code_challenge_method"], "S256");
		assert_eq!(pairs["scope"], "tweet.read users.read offline.access");
	}

	#[test]
	fn profile_url_keeps_explicit_user_fields() {
		let default = client(None);

		assert_eq!(
			default.endpoints.profile.as_str(),
			"https://api.twitter.com/2/users/me?user.fields=name%2Cusername%2Cprofile_image_url"
		);

		let custom = client(Some("https://api.example.com/me?user.fields=id"));

		assert_eq!(custom.endpoints.profile.as_str(), "https://api.example.com/me?user.fields=id");
	}
}
