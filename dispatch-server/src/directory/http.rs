//! HTTP client for a remote provider directory
//!
//! | Call | Request |
//! |------|---------|
//! | find_available | `GET {base}/api/providers/available?latitude&longitude&radius_km&service_type` |
//! | notify | `POST {base}/api/providers/{provider_id}/notify` |

use super::{DirectoryError, DirectoryResult, ProviderCandidate, ProviderDirectory};
use async_trait::async_trait;
use serde::Serialize;
use shared::order::{Coordinates, OpaquePayload};
use std::time::Duration;

/// Notification body; the payload bytes are JSON so they travel inline
#[derive(Debug, Serialize)]
struct NotifyBody<'a> {
    order_id: &'a str,
    schema: &'a str,
    schema_version: u16,
    payload: serde_json::Value,
}

pub struct HttpProviderDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProviderDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> DirectoryResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn check(resp: reqwest::Response) -> DirectoryResult<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        if status == 404 {
            return Err(DirectoryError::ProviderNotFound(body));
        }
        Err(DirectoryError::Status { status, body })
    }
}

#[async_trait]
impl ProviderDirectory for HttpProviderDirectory {
    async fn find_available(
        &self,
        location: Coordinates,
        radius_km: f64,
        service_type: &str,
    ) -> DirectoryResult<Vec<ProviderCandidate>> {
        let resp = self
            .client
            .get(format!("{}/api/providers/available", self.base_url))
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("radius_km", radius_km.to_string()),
                ("service_type", service_type.to_string()),
            ])
            .send()
            .await?;

        let candidates = Self::check(resp).await?.json().await?;
        Ok(candidates)
    }

    async fn notify(
        &self,
        provider_id: &str,
        order_id: &str,
        payload: &OpaquePayload,
    ) -> DirectoryResult<()> {
        let body = NotifyBody {
            order_id,
            schema: &payload.schema,
            schema_version: payload.schema_version,
            payload: serde_json::from_slice(&payload.bytes)
                .map_err(shared::order::PayloadError::from)?,
        };

        let resp = self
            .client
            .post(format!("{}/api/providers/{}/notify", self.base_url, provider_id))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}
