//! In-process provider directory
//!
//! Providers register with a position, rating and service types. Queries use
//! great-circle distance. Every notification is kept so operators (and tests)
//! can inspect what was pushed.
//!
//! A fresh directory is empty. The server fills it once at startup from a
//! JSON seed file (`PROVIDER_SEED_FILE`); without one every matching query
//! comes back empty.

use super::{DirectoryError, DirectoryResult, ProviderCandidate, ProviderDirectory};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shared::order::{Coordinates, OpaquePayload};
use std::path::Path;
use std::sync::Arc;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A provider known to the in-process directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredProvider {
    pub provider_id: String,
    #[serde(default)]
    pub name: String,
    pub rating: f64,
    pub service_types: Vec<String>,
    pub position: Coordinates,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

/// A notification pushed to a provider
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub provider_id: String,
    pub order_id: String,
    pub payload: OpaquePayload,
}

/// In-process directory backed by concurrent maps
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    providers: Arc<DashMap<String, RegisteredProvider>>,
    notifications: Arc<DashMap<String, Vec<SentNotification>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a provider
    pub fn register(&self, provider: RegisteredProvider) {
        self.providers.insert(provider.provider_id.clone(), provider);
    }

    /// Register every provider listed in a JSON array file
    ///
    /// Returns how many were loaded. Later entries replace earlier ones with
    /// the same `provider_id`.
    pub fn load_seed(&self, path: impl AsRef<Path>) -> DirectoryResult<usize> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| DirectoryError::Seed(format!("{}: {e}", path.display())))?;
        let providers: Vec<RegisteredProvider> = serde_json::from_slice(&bytes)
            .map_err(|e| DirectoryError::Seed(format!("{}: {e}", path.display())))?;

        let count = providers.len();
        for provider in providers {
            self.register(provider);
        }
        tracing::info!(path = %path.display(), count, "Provider directory seeded");
        Ok(count)
    }

    /// Notifications sent to one provider, oldest first
    pub fn notifications_for(&self, provider_id: &str) -> Vec<SentNotification> {
        self.notifications
            .get(provider_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

/// Great-circle distance in km
fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[async_trait]
impl ProviderDirectory for MemoryDirectory {
    async fn find_available(
        &self,
        location: Coordinates,
        radius_km: f64,
        service_type: &str,
    ) -> DirectoryResult<Vec<ProviderCandidate>> {
        let mut found: Vec<ProviderCandidate> = self
            .providers
            .iter()
            .filter(|p| p.available && p.service_types.iter().any(|s| s == service_type))
            .filter_map(|p| {
                let distance = haversine_km(location, p.position);
                (distance <= radius_km).then(|| ProviderCandidate {
                    provider_id: p.provider_id.clone(),
                    name: p.name.clone(),
                    rating: p.rating,
                    distance,
                })
            })
            .collect();

        // Nearest first, like a directory query ordered by distance
        found.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.provider_id.cmp(&b.provider_id))
        });
        Ok(found)
    }

    async fn notify(
        &self,
        provider_id: &str,
        order_id: &str,
        payload: &OpaquePayload,
    ) -> DirectoryResult<()> {
        if !self.providers.contains_key(provider_id) {
            return Err(DirectoryError::ProviderNotFound(provider_id.to_string()));
        }
        self.notifications
            .entry(provider_id.to_string())
            .or_default()
            .push(SentNotification {
                provider_id: provider_id.to_string(),
                order_id: order_id.to_string(),
                payload: payload.clone(),
            });
        tracing::debug!(provider_id, order_id, "Provider notified");
        Ok(())
    }
}
