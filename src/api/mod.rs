//! Typed access to the Task Tally REST API.
//!
//! Each resource exposes a service trait with an HTTP implementation on top
//! of [`ApiClient`] and an in-memory store with the same contract.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod client;
pub mod credentials;
pub mod templates;

pub use client::ApiClient;

/// Simulated round trip of the in-memory stores.
pub const MOCK_LATENCY: Duration = Duration::from_millis(30);

/// Git hosting provider of a repository or key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GitProvider {
    #[default]
    Github,
    Gitlab,
}

impl fmt::Display for GitProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
        })
    }
}
