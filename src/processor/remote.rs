//! Remote execution
//!
//! Sends each job to an execution service as one gzip-compressed JSON
//! request and extracts the returned archive under the output root.

use crate::error::{PackError, PackResult};
use crate::plan::Job;
use crate::processor::runtime::Processor;
use crate::protocol::{Archive, InputFile, PackRequest, PackResponse};
use async_trait::async_trait;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Processor that dispatches jobs to an execution service
#[derive(Debug, Clone)]
pub struct RemoteProcessor {
    client: reqwest::Client,
    address: String,
}

impl RemoteProcessor {
    /// Create a processor for the service at `address`.
    ///
    /// `timeout` bounds each whole request; `None` waits indefinitely.
    pub fn new(address: impl Into<String>, timeout: Option<Duration>) -> PackResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PackError::Internal(format!("building HTTP client: {}", e)))?;

        Ok(Self {
            client,
            address: address.into(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn dispatch(&self, body: Vec<u8>) -> PackResult<PackResponse> {
        let response = self
            .client
            .post(&self.address)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_ENCODING, "gzip")
            .body(body)
            .send()
            .await
            .map_err(|e| PackError::transport(&self.address, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PackError::transport(&self.address, e))?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| {
                PackError::Archive(format!("unreadable response envelope: {}", e))
            });
        }

        // Failed executions still carry an envelope with the reason
        match serde_json::from_str::<PackResponse>(&text) {
            Ok(PackResponse {
                error: Some(error), ..
            }) if !error.is_empty() => Err(PackError::Remote(error)),
            _ => Err(PackError::transport(
                &self.address,
                format!("HTTP {}", status),
            )),
        }
    }
}

#[async_trait]
impl Processor for RemoteProcessor {
    async fn process(
        &self,
        job: &Job,
        inputs: &[InputFile],
        output_root: &Path,
    ) -> PackResult<Vec<String>> {
        let request = PackRequest::new(job, inputs.to_vec());
        let body = request.encode()?;
        info!(
            "{}: sending {} file(s) to {} ({} bytes)",
            job.id(),
            request.files.len(),
            self.address,
            body.len()
        );

        let archive = self.dispatch(body).await?.into_archive()?;
        let archive = Archive::from_bytes(&archive)?;
        debug!("{}: received {} file(s)", job.id(), archive.len());

        archive.extract_to(output_root).await
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        // Bind then drop a listener so the port is known to be closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let temp = TempDir::new().unwrap();
        let processor = RemoteProcessor::new(address, Some(Duration::from_secs(5))).unwrap();
        let job = Job {
            params: vec![],
            files: vec![],
            sheet: "ui.pvr.ccz".to_string(),
            data: "ui.plist".to_string(),
        };

        let err = processor.process(&job, &[], temp.path()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!temp.path().join("ui.plist").exists());
    }
}
