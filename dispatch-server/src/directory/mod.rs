//! Provider Directory
//!
//! Answers proximity/availability queries and accepts push notifications to
//! providers. Two implementations:
//! - [`HttpProviderDirectory`]: remote directory service over HTTP
//! - [`MemoryDirectory`]: in-process registry (default when no URL is configured),
//!   seeded from `PROVIDER_SEED_FILE` at startup

mod http;
mod memory;

pub use http::HttpProviderDirectory;
pub use memory::{MemoryDirectory, RegisteredProvider, SentNotification};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::order::{Coordinates, OpaquePayload, PayloadError};
use thiserror::Error;

/// Provider returned by an availability query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderCandidate {
    pub provider_id: String,
    #[serde(default)]
    pub name: String,
    /// 0-5 scale
    pub rating: f64,
    /// Distance from the queried point, in km
    pub distance: f64,
}

/// Directory errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Directory returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Invalid payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid provider seed: {0}")]
    Seed(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Provider directory contract
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Available providers offering `service_type` within `radius_km` of `location`
    async fn find_available(
        &self,
        location: Coordinates,
        radius_km: f64,
        service_type: &str,
    ) -> DirectoryResult<Vec<ProviderCandidate>>;

    /// Push a payload to one provider (best-effort for callers)
    async fn notify(
        &self,
        provider_id: &str,
        order_id: &str,
        payload: &OpaquePayload,
    ) -> DirectoryResult<()>;
}
