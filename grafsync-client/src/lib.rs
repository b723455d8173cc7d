//! # grafsync-client
//!
//! HTTP implementation of [`grafsync_core::GrafanaApi`] plus connection and
//! profile configuration.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;

pub use client::GrafanaClient;
pub use config::{load_profiles, load_profiles_at, load_profiles_file, Profiles};
pub use connection::{Auth, Connection, DEFAULT_TIMEOUT};
pub use error::ClientError;
