//! Broker-level error types shared across the state protocol, providers, and tenant wiring.

// self
use crate::{_prelude::*, auth::ProviderKind};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// Routine login failures (stale state, provider outages) never surface here; the
/// callback converts them into a soft [`CallbackResult`](crate::login::CallbackResult).
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// State token could not be issued or accepted.
	#[error(transparent)]
	State(#[from] StateError),
	/// Access token could not be minted.
	#[error(transparent)]
	Token(#[from] TokenError),
	/// Provider call failed.
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// Provider returned a profile that breaks the client contract.
	#[error(transparent)]
	Profile(#[from] ProfileError),

	/// Callback result could not be encoded for a redirect.
	#[error("Callback result could not be encoded.")]
	Encode {
		/// Serialization failure.
		#[source]
		source: serde_json::Error,
	},

	/// Login start was requested without an origin.
	#[error("Origin is required.")]
	OriginRequired,
	/// Login start was requested from an origin outside the tenant allow-list.
	#[error("Origin `{origin}` is not allowed.")]
	OriginNotAllowed {
		/// Rejected origin after trimming.
		origin: String,
	},
	/// No configuration exists for the tenant.
	#[error("Tenant `{tenant}` is not configured.")]
	TenantNotFound {
		/// Requested tenant identifier.
		tenant: String,
	},
	/// Tenant exists but has no usable credentials for the provider.
	#[error("The {provider} login is disabled for tenant `{tenant}`.")]
	ProviderDisabled {
		/// Tenant identifier.
		tenant: String,
		/// Provider whose credentials are missing.
		provider: ProviderKind,
	},
}

/// Configuration and validation failures raised while wiring tenants.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured endpoint or redirect URI cannot be parsed.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Config field that failed to parse.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Tenant config document is malformed.
	#[error("Tenant config is malformed.")]
	Malformed(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// Redirect target cannot be built from the result or the tenant default.
	#[error("Redirect origin is empty.")]
	EmptyRedirectOrigin,
	/// A duration setting must be at least one second.
	#[error("The {field} setting must be positive.")]
	NonPositive {
		/// Config field holding the zero value.
		field: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// State token failures.
///
/// [`StateError::Invalid`] and [`StateError::Expired`] are kept apart because the
/// user-facing message differs.
#[derive(Debug, ThisError)]
pub enum StateError {
	/// Token is malformed, tampered with, or signed with another secret.
	#[error("State is invalid.")]
	Invalid,
	/// Token is authentic but older than the configured TTL.
	#[error("State has expired.")]
	Expired,
	/// Signing secret is blank.
	#[error("State signing secret is empty.")]
	EmptySecret,
	/// The OS randomness source failed.
	#[error("Randomness source failed.")]
	Entropy {
		/// Underlying RNG failure.
		#[source]
		source: BoxError,
	},
}
impl StateError {
	/// Wraps an RNG failure.
	pub fn entropy(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Entropy { source: Box::new(src) }
	}
}

/// Access token minting failures.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// Signing secret is not configured.
	#[error("Token signing secret is empty.")]
	EmptySecret,
	/// Claims could not be serialized.
	#[error("Token claims could not be serialized.")]
	Serialize(#[from] serde_json::Error),
}

/// Upstream provider failures.
#[derive(Debug, ThisError)]
pub enum ProviderError {
	/// Provider answered with a non-success status code.
	#[error("The {endpoint} endpoint returned status {status}: {body}.")]
	Status {
		/// Endpoint label (`token` or `profile`).
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label (`token` or `profile`).
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Response body exceeded the accepted size.
	#[error("The {endpoint} endpoint returned an oversized body.")]
	BodyTooLarge {
		/// Endpoint label (`token` or `profile`).
		endpoint: &'static str,
	},
	/// Provider responded with malformed JSON that could not be parsed.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	Parse {
		/// Endpoint label (`token` or `profile`).
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Response parsed but a required field was empty.
	#[error("The {endpoint} endpoint response is missing `{field}`.")]
	MissingField {
		/// Endpoint label (`token` or `profile`).
		endpoint: &'static str,
		/// Missing JSON field.
		field: &'static str,
	},
}
impl ProviderError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: &'static str, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

/// Profile normalization failures; these indicate a provider client bug.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProfileError {
	/// Provider profile carried an empty user identifier.
	#[error("The {provider} profile has an empty user id.")]
	EmptyId {
		/// Provider that produced the profile.
		provider: ProviderKind,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn state_errors_convert_with_distinct_messages() {
		let invalid: Error = StateError::Invalid.into();
		let expired: Error = StateError::Expired.into();

		assert!(matches!(invalid, Error::State(StateError::Invalid)));
		assert_ne!(invalid.to_string(), expired.to_string());
	}

	#[test]
	fn provider_disabled_names_tenant_and_provider() {
		let err = Error::ProviderDisabled { tenant: "tenant-a".into(), provider: ProviderKind::X };

		assert_eq!(err.to_string(), "The x login is disabled for tenant `tenant-a`.");
	}

	#[test]
	fn network_error_exposes_source() {
		let io = std::io::Error::other("connection reset");
		let err: Error = ProviderError::network("token", io).into();
		let source = StdError::source(&err)
			.expect("Provider network error should expose the transport error as its source.");

		assert_eq!(source.to_string(), "connection reset");
	}
}
