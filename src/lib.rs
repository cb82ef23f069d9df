//! Multi-tenant OAuth 2.0 login broker: stateless HMAC state tokens, one-shot PKCE verifiers,
//! lazily wired per-tenant providers, and HS256 access tokens minted from provider profiles.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod error;
#[cfg(feature = "reqwest")] pub mod http;
pub mod login;
pub mod obs;
pub mod provider;
pub mod state;
pub mod tenant;
pub mod token;

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
