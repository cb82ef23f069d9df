//! LINE Login client (authorization code with a channel secret).

// self
use crate::{
	_prelude::*,
	auth::{ProviderKind, ProviderProfile, Secret},
	error::ProviderError,
	http::{self, ReqwestHttpClient},
	provider::{CodeExchangeClient, Endpoints, ProviderClient, ProviderFuture, ProviderToken},
	tenant::ProviderSettings,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineProfileResponse {
	#[serde(default)]
	user_id: String,
	#[serde(default)]
	display_name: String,
	#[serde(default)]
	picture_url: Option<String>,
}

/// Reqwest-backed LINE Login client.
#[derive(Clone)]
pub struct LineClient {
	http: ReqwestHttpClient,
	client_id: String,
	client_secret: Secret,
	redirect_uri: String,
	scope: String,
	bot_prompt: Option<String>,
	endpoints: Endpoints,
}
impl LineClient {
	/// Builds a client from tenant settings.
	pub fn new(http: ReqwestHttpClient, settings: &ProviderSettings) -> Result<Self> {
		let endpoints = Endpoints::resolve(ProviderKind::Line, &settings.endpoints)?;

		Ok(Self {
			http,
			client_id: settings.client_id.trim().to_owned(),
			client_secret: Secret::new(settings.client_secret.expose().trim()),
			redirect_uri: settings.redirect_uri.trim().to_owned(),
			scope: settings.scope_param(ProviderKind::Line),
			bot_prompt: settings
				.bot_prompt
				.as_deref()
				.map(str::trim)
				.filter(|prompt| !prompt.is_empty())
				.map(ToOwned::to_owned),
			endpoints,
		})
	}
}
impl ProviderClient for LineClient {
	fn kind(&self) -> ProviderKind {
		ProviderKind::Line
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
			let profile: LineProfileResponse = http::read_json("profile", response).await?;

			if profile.user_id.trim().is_empty() {
				return Err(ProviderError::MissingField {
					endpoint: "profile",
					field: "userId",
				});
			}

			Ok(ProviderProfile {
				id: profile.user_id,
				display_name: profile.display_name,
				username: None,
				avatar_url: profile.picture_url,
			})
		})
	}
}
impl CodeExchangeClient for LineClient {
	fn authorize_url(&self, state: &str) -> Url {
		let mut url = self.endpoints.authorize.clone();

		{
			let mut query = url.query_pairs_mut();

			query
				.append_pair("response_type", "code")
				.append_pair("client_id", &self.client_id)
				.append_pair("redirect_uri", &self.redirect_uri)
				.append_pair("state", state)
				.append_pair("scope", &self.scope);

			if let Some(prompt) = &self.bot_prompt {
				query.append_pair("bot_prompt", prompt);
			}
		}

		url
	}

	fn exchange_token<'a>(&'a self, code: &'a str) -> ProviderFuture<'a, ProviderToken> {
		Box::pin(async move {
			let form = [
				("grant_type", "authorization_code"),
				("code", code),
				("redirect_uri", self.redirect_uri.as_str()),
				("client_id", self.client_id.as_str()),
				("client_secret", self.client_secret.expose()),
			];
			let response = self
				.http
				.post(self.endpoints.token.clone())
				.form(&form)
				.send()
				.await
				.map_err(|e| ProviderError::network("token", e))?;
			let token: ProviderToken = http::read_json("token", response).await?;

			token.require_access_token("token")
		})
	}
}
impl Debug for LineClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LineClient")
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.field("endpoints", &self.endpoints)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn authorize_url_carries_line_parameters() {
		let settings = ProviderSettings {
			client_id: "channel".into(),
			client_secret: "secret".into(),
			redirect_uri: "https://auth.example.com/line/callback".into(),
			bot_prompt: Some("aggressive".into()),
			..Default::default()
		};
		let http = ReqwestHttpClient::new().expect("HTTP client should build.");
		let client = LineClient::new(http, &settings).expect("LINE client should build.");
		let url = client.authorize_url("state-1");
		let pairs = url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		assert_eq!(url.host_str(), Some("access.line.me"));
		assert_eq!(pairs["response_type"], "code");
		assert_eq!(pairs["client_id"], "channel");
		assert_eq!(pairs["state"], "state-1");
		assert_eq!(pairs["scope"], "profile openid");
		assert_eq!(pairs["bot_prompt"], "aggressive");
	}
}
