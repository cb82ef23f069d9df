//! Provider-reported profiles and their normalized login form.

// self
use crate::{_prelude::*, auth::ProviderKind, error::ProfileError};

/// Profile as reported by a provider client, before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderProfile {
	/// Provider-scoped user identifier.
	pub id: String,
	/// Human-readable name.
	pub display_name: String,
	/// Handle without the leading `@`, when the provider has one.
	pub username: Option<String>,
	/// Avatar image URL.
	pub avatar_url: Option<String>,
}

/// Normalized profile that flows into access tokens and callback payloads.
///
/// Construction guarantees a non-empty, trimmed `id`; the optional fields are
/// trimmed and dropped when blank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginProfile {
	/// Provider that vouched for the profile.
	pub provider: ProviderKind,
	/// Provider-scoped user identifier.
	#[serde(rename = "userId")]
	pub id: String,
	/// Human-readable name; may be empty.
	pub display_name: String,
	/// Handle without the leading `@`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// Avatar image URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub avatar_url: Option<String>,
}
impl LoginProfile {
	/// Normalizes a provider profile, rejecting empty identifiers.
	pub fn normalize(
		provider: ProviderKind,
		profile: ProviderProfile,
	) -> Result<Self, ProfileError> {
		let id = profile.id.trim();

		if id.is_empty() {
			return Err(ProfileError::EmptyId { provider });
		}

		Ok(Self {
			provider,
			id: id.to_owned(),
			display_name: profile.display_name.trim().to_owned(),
			username: non_blank(profile.username),
			avatar_url: non_blank(profile.avatar_url),
		})
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}
