//! Tenant configuration and lazy per-tenant wiring.

pub mod config;
pub mod resolver;

pub use config::*;
pub use resolver::*;
