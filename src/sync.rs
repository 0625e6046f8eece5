//! Authoritative schedule source.
//!
//! A sync pulls the complete technician and job lists and replaces local
//! state wholesale. There is no diffing, paging or retry here; a failed sync
//! is retried by calling it again.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::error::{SyncError, SyncResult};
use crate::models::{Job, Technician};

/// Body returned by the scheduling endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulePayload {
    pub technicians: Vec<Technician>,
    pub jobs: Vec<Job>,
}

/// Something that can produce the authoritative schedule.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Fetches the full technician and job lists.
    async fn fetch(&self) -> SyncResult<SchedulePayload>;
}

/// HTTP source: `GET {endpoint}` returning a JSON `SchedulePayload`.
#[derive(Debug, Clone)]
pub struct HttpScheduleSource {
    endpoint: String,
    http: Client,
}

impl HttpScheduleSource {
    /// Creates a source for the given endpoint URL.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(endpoint, Client::new())
    }

    /// Creates a source sharing an existing client.
    #[must_use]
    pub fn with_client(endpoint: impl Into<String>, http: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
        }
    }

    /// Creates a source from config, applying the request timeout.
    pub fn from_config(config: &StoreConfig) -> SyncResult<Self> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(config.endpoint.clone(), http))
    }

    /// The endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ScheduleSource for HttpScheduleSource {
    async fn fetch(&self) -> SyncResult<SchedulePayload> {
        let response = self.http.get(&self.endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::status(status.as_u16()));
        }

        response
            .json::<SchedulePayload>()
            .await
            .map_err(|e| SyncError::decode(e.to_string()))
    }
}
