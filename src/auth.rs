//! Auth-domain identifiers, provider profiles, and redacted secrets.

pub mod id;
pub mod profile;
pub mod secret;

pub use id::*;
pub use profile::*;
pub use secret::*;
