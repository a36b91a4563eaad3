//! Remote record service client.
//!
//! One JSON POST per write, no authentication, no retry. Stub and completion
//! writes go to separate base endpoints, kept distinct in configuration.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::RemoteConfig;
use crate::error::{Result, TrackerError};
use crate::record::{CompletionRecord, StubRecord};

/// Write interface for the remote record service.
///
/// The lifecycle manager only talks to this trait, so a retrying outbox can
/// wrap an implementation without touching classification or dedup.
#[async_trait]
pub trait RecordWriter: Send + Sync {
    async fn submit_stub(&self, record: &StubRecord) -> Result<()>;

    async fn submit_completion(&self, record: &CompletionRecord) -> Result<()>;
}

pub struct HttpRecordWriter {
    client: reqwest::Client,
    stub_url: String,
    completion_url: String,
}

impl HttpRecordWriter {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| TrackerError::RemoteWriteFailure {
                endpoint: "http client".to_string(),
                details: err.to_string(),
            })?;

        Ok(Self {
            client,
            stub_url: config.stub_url.clone(),
            completion_url: config.completion_url.clone(),
        })
    }

    async fn post<T>(&self, url: &str, body: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| TrackerError::RemoteWriteFailure {
                endpoint: url.to_string(),
                details: err.to_string(),
            })?;

        let status = response.status();
        tracing::debug!(url = %url, status = status.as_u16(), "Remote write response");

        if status.is_success() {
            Ok(())
        } else {
            Err(TrackerError::RemoteWriteFailure {
                endpoint: url.to_string(),
                details: format!("HTTP {}", status),
            })
        }
    }
}

#[async_trait]
impl RecordWriter for HttpRecordWriter {
    async fn submit_stub(&self, record: &StubRecord) -> Result<()> {
        self.post(&self.stub_url, record).await
    }

    async fn submit_completion(&self, record: &CompletionRecord) -> Result<()> {
        self.post(&self.completion_url, record).await
    }
}
