//! Strongly typed tenant identifiers and the supported provider kinds.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (tenant, provider).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (tenant, provider).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (tenant, provider).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The provider name is not supported.
	#[error("Unknown provider `{name}`.")]
	UnknownProvider {
		/// Rejected provider name.
		name: String,
	},
}

/// Unique identifier for a broker tenant.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);
impl TenantId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view("Tenant", view)?;

		Ok(Self(view.to_owned()))
	}

	/// Derives the tenant from the first label of a request host.
	///
	/// `auth-tenant.example.com:8443` resolves to `auth-tenant`.
	pub fn from_host(host: &str) -> Result<Self, IdentifierError> {
		let host = host.trim();
		let label = host.split('.').next().unwrap_or_default();
		let label = label.split(':').next().unwrap_or_default();

		Self::new(label)
	}
}
impl Deref for TenantId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for TenantId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<TenantId> for String {
	fn from(value: TenantId) -> Self {
		value.0
	}
}
impl TryFrom<String> for TenantId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view("Tenant", &value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for TenantId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for TenantId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Tenant({})", self.0)
	}
}
impl Display for TenantId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for TenantId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

/// Identity providers the broker can log users in with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
	/// LINE Login; plain authorization code exchange with a client secret.
	Line,
	/// X (formerly Twitter) OAuth 2.0; authorization code with PKCE.
	X,
}
impl ProviderKind {
	/// Every supported provider.
	pub const ALL: [ProviderKind; 2] = [ProviderKind::Line, ProviderKind::X];

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProviderKind::Line => "line",
			ProviderKind::X => "x",
		}
	}

	/// Returns the provider name shown to end users.
	pub const fn display_name(self) -> &'static str {
		match self {
			ProviderKind::Line => "LINE",
			ProviderKind::X => "X",
		}
	}

	/// Returns true when the provider requires a PKCE verifier at exchange time.
	pub const fn uses_pkce(self) -> bool {
		matches!(self, ProviderKind::X)
	}

	/// Returns true when the provider rejects public clients.
	pub const fn requires_client_secret(self) -> bool {
		matches!(self, ProviderKind::Line)
	}
}
impl Display for ProviderKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ProviderKind {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"line" => Ok(ProviderKind::Line),
			"x" | "twitter" => Ok(ProviderKind::X),
			_ => Err(IdentifierError::UnknownProvider { name: s.to_owned() }),
		}
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace_and_empty() {
		assert!(TenantId::new(" tenant-123").is_err(), "Leading whitespace must be rejected.");
		assert!(TenantId::new("tenant-123 ").is_err(), "Trailing whitespace must be rejected.");
		assert!(TenantId::new("").is_err());

		let tenant =
			TenantId::new("tenant-123").expect("Tenant fixture should be considered valid.");

		assert_eq!(tenant.as_ref(), "tenant-123");
	}

	#[test]
	fn tenant_is_taken_from_first_host_label() {
		let tenant = TenantId::from_host("tenanta.example.com")
			.expect("Host with a subdomain should yield a tenant.");

		assert_eq!(tenant.as_ref(), "tenanta");

		let tenant =
			TenantId::from_host("localhost:8080").expect("Host with a port should yield a tenant.");

		assert_eq!(tenant.as_ref(), "localhost");
		assert!(TenantId::from_host("").is_err());
		assert!(TenantId::from_host(".example.com").is_err());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let tenant: TenantId =
			serde_json::from_str("\"tenant-42\"").expect("Tenant should deserialize successfully.");

		assert_eq!(tenant.as_ref(), "tenant-42");
		assert!(serde_json::from_str::<TenantId>("\"with space\"").is_err());
	}

	#[test]
	fn length_limit_is_inclusive() {
		TenantId::new("a".repeat(IDENTIFIER_MAX_LEN)).expect("Exact length should succeed.");

		assert!(TenantId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn provider_kind_parses_aliases() {
		assert_eq!("LINE".parse::<ProviderKind>(), Ok(ProviderKind::Line));
		assert_eq!("twitter".parse::<ProviderKind>(), Ok(ProviderKind::X));
		assert!("github".parse::<ProviderKind>().is_err());
		assert!(ProviderKind::X.uses_pkce());
		assert!(!ProviderKind::Line.uses_pkce());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<TenantId, u8> = HashMap::from_iter([(
			TenantId::new("tenant-123").expect("Tenant used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("tenant-123"), Some(&7));
	}
}
