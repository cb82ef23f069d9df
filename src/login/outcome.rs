//! Outward callback contract shared by every provider.

// self
use crate::{_prelude::*, auth::{LoginProfile, ProviderKind}};

const RESULT_TYPE: &str = "oauth-login-result";

/// Machine-readable reason for a failed callback.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackFailure {
	/// Code or state was missing.
	InvalidResponse,
	/// State failed signature or shape checks.
	InvalidAttempt,
	/// State or PKCE verifier is stale, unknown, or already used.
	Expired,
	/// Token exchange failed or the provider did not answer in time.
	ProviderUnavailable,
	/// Profile endpoint failed.
	ProfileUnavailable,
	/// Access token could not be signed.
	TokenIssueFailed,
	/// Provider redirected back with an error instead of a code.
	ProviderDenied {
		/// Error code reported by the provider.
		error_code: String,
	},
}
impl CallbackFailure {
	/// Stable label for logs and metrics.
	pub fn as_str(&self) -> &'static str {
		match self {
			CallbackFailure::InvalidResponse => "invalid_response",
			CallbackFailure::InvalidAttempt => "invalid_attempt",
			CallbackFailure::Expired => "expired",
			CallbackFailure::ProviderUnavailable => "provider_unavailable",
			CallbackFailure::ProfileUnavailable => "profile_unavailable",
			CallbackFailure::TokenIssueFailed => "token_issue_failed",
			CallbackFailure::ProviderDenied { .. } => "provider_denied",
		}
	}

	/// English message shown to the end user.
	pub fn message(&self, provider: ProviderKind) -> String {
		let name = provider.display_name();

		match self {
			CallbackFailure::InvalidResponse => "Invalid login response. Please try again.".into(),
			CallbackFailure::InvalidAttempt => "Invalid login attempt. Please try again.".into(),
			CallbackFailure::Expired => "Login expired. Please try again.".into(),
			CallbackFailure::ProviderUnavailable =>
				format!("Communication with {name} failed. Please try again later."),
			CallbackFailure::ProfileUnavailable => format!("Failed to fetch {name} profile."),
			CallbackFailure::TokenIssueFailed => "Failed to generate access token.".into(),
			CallbackFailure::ProviderDenied { error_code } =>
				format!("{name} login was cancelled: {error_code}"),
		}
	}
}

/// Access token and profile delivered on success.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
	/// Tenant-scoped HS256 JWT.
	pub access_token: String,
	/// Always `Bearer`.
	pub token_type: String,
	/// Token lifetime in seconds.
	pub expires_in: i64,
	/// Normalized profile the token was minted for.
	pub user: LoginProfile,
}
impl Debug for LoginPayload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginPayload")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("user", &self.user)
			.finish()
	}
}

/// Result of a callback, success or user-facing failure.
///
/// `payload` is present exactly when `success` is true; `error_message` and `failure`
/// are present exactly when it is false.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "oauth-login-result")]
pub struct CallbackResult {
	/// Whether the login completed.
	pub success: bool,
	/// State token echoed back to the frontend.
	pub state: String,
	/// Origin the frontend should receive the result on.
	pub origin: String,
	/// User-facing failure message.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_message: Option<String>,
	/// Machine-readable failure reason.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub failure: Option<CallbackFailure>,
	/// Token and profile on success.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<LoginPayload>,
}
impl CallbackResult {
	/// Value of the `type` field in the serialized form.
	pub const TYPE: &'static str = RESULT_TYPE;

	/// Successful result carrying `payload`.
	pub fn success(state: String, origin: String, payload: LoginPayload) -> Self {
		Self {
			success: true,
			state,
			origin,
			error_message: None,
			failure: None,
			payload: Some(payload),
		}
	}

	/// Failed result with the message for `failure`.
	pub fn failure(
		provider: ProviderKind,
		state: String,
		origin: String,
		failure: CallbackFailure,
	) -> Self {
		Self {
			success: false,
			state,
			origin,
			error_message: Some(failure.message(provider)),
			failure: Some(failure),
			payload: None,
		}
	}
}
