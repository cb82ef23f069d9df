//! Frontend redirects carrying a callback result in the URL fragment.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, error::ConfigError, login::CallbackResult};

/// Fragment key used when the caller has no preference.
pub const DEFAULT_FRAGMENT_KEY: &str = "result";

/// Builds the frontend URL a callback result is delivered to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectBuilder {
	default_origin: String,
	path: String,
}
impl RedirectBuilder {
	/// Creates a builder falling back to `default_origin`; `path` gains a leading `/`.
	pub fn new(default_origin: impl Into<String>, path: &str) -> Self {
		Self { default_origin: default_origin.into().trim().to_owned(), path: normalize_path(path) }
	}

	/// Normalized redirect path.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Renders `result` as `<origin><path>#<key>=base64url(json(result))`.
	///
	/// The result origin wins over the default; any query on the origin is dropped.
	pub fn build(&self, result: &CallbackResult, fragment_key: &str) -> Result<Url> {
		let origin = match result.origin.trim() {
			"" => self.default_origin.as_str(),
			origin => origin,
		};

		if origin.is_empty() {
			return Err(ConfigError::EmptyRedirectOrigin.into());
		}

		let mut url = Url::parse(origin)
			.map_err(|source| ConfigError::InvalidUrl { field: "redirect origin", source })?;
		let json = serde_json::to_vec(result).map_err(|source| Error::Encode { source })?;
		let encoded = URL_SAFE_NO_PAD.encode(json);

		url.set_path(&self.path);
		url.set_query(None);
		url.set_fragment(Some(&format!("{fragment_key}={encoded}")));

		Ok(url)
	}
}

fn normalize_path(path: &str) -> String {
	let path = path.trim();

	if path.is_empty() {
		"/".into()
	} else if path.starts_with('/') {
		path.into()
	} else {
		format!("/{path}")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{auth::ProviderKind, login::CallbackFailure};

	fn failure(origin: &str) -> CallbackResult {
		let failure = CallbackFailure::Expired;

		CallbackResult::failure(ProviderKind::Line, "s".into(), origin.into(), failure)
	}

	#[test]
	fn path_is_normalized() {
		assert_eq!(RedirectBuilder::new("", "").path(), "/");
		assert_eq!(RedirectBuilder::new("", "login/done").path(), "/login/done");
		assert_eq!(RedirectBuilder::new("", "/done").path(), "/done");
	}

	#[test]
	fn fragment_round_trips_the_result() {
		let builder = RedirectBuilder::new("https://default.example.com", "done");
		let result = failure("https://app.example.com?drop=me");
		let url = builder.build(&result, DEFAULT_FRAGMENT_KEY).expect("Redirect should build.");

		assert_eq!(url.host_str(), Some("app.example.com"));
		assert_eq!(url.path(), "/done");
		assert_eq!(url.query(), None);

		let fragment = url.fragment().expect("Redirect should carry a fragment.");
		let encoded = fragment.strip_prefix("result=").expect("Fragment should use the key.");
		let decoded = URL_SAFE_NO_PAD.decode(encoded).expect("Fragment should be base64url.");
		let back: CallbackResult =
			serde_json::from_slice(&decoded).expect("Fragment should hold the result JSON.");

		assert_eq!(back, result);
	}

	#[test]
	fn falls_back_to_default_origin() {
		let builder = RedirectBuilder::new("https://default.example.com", "/");
		let url = builder.build(&failure(" "), "r").expect("Default origin should be used.");

		assert_eq!(url.host_str(), Some("default.example.com"));
		assert!(url.fragment().is_some_and(|f| f.starts_with("r=")));
	}

	#[test]
	fn empty_or_unparsable_origin_fails() {
		let builder = RedirectBuilder::new("", "/");

		assert!(matches!(
			builder.build(&failure(""), "r"),
			Err(Error::Config(ConfigError::EmptyRedirectOrigin))
		));
		assert!(matches!(
			builder.build(&failure("not a url"), "r"),
			Err(Error::Config(ConfigError::InvalidUrl { .. }))
		));
	}
}
