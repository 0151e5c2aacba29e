//! Remote record store client
//!
//! The study's electronic data capture service stores one uploaded chamber
//! export per (record id, field name). Batch preprocessing pulls the raw
//! export down, processes it locally and can push result files back up.

use std::fs;
use std::path::Path;

use reqwest::multipart;

use crate::types::{PipelineError, Result};

/// Connection settings for the record store
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub api_url: String,
    pub api_token: String,
}

impl RemoteConfig {
    /// Read the connection settings from `CALORIX_API_URL` and
    /// `CALORIX_API_TOKEN`
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("CALORIX_API_URL").map_err(|_| {
            PipelineError::Configuration("CALORIX_API_URL is not set".to_string())
        })?;
        let api_token = std::env::var("CALORIX_API_TOKEN").map_err(|_| {
            PipelineError::Configuration("CALORIX_API_TOKEN is not set".to_string())
        })?;
        Ok(Self { api_url, api_token })
    }
}

/// HTTP client for the record store
#[derive(Debug)]
pub struct RemoteClient {
    config: RemoteConfig,
    http: reqwest::Client,
}

impl RemoteClient {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Download the raw file stored under `(record_id, field)`
    pub async fn export_record(&self, record_id: &str, field: &str) -> Result<Vec<u8>> {
        let form = [
            ("token", self.config.api_token.as_str()),
            ("content", "file"),
            ("action", "export"),
            ("record", record_id),
            ("field", field),
        ];
        let response = self.http.post(&self.config.api_url).form(&form).send().await?;
        let status = response.status();
        log::info!("export {record_id}/{field}: HTTP {status}");
        if !status.is_success() {
            return Err(PipelineError::Remote(format!(
                "export of {record_id}/{field} returned HTTP {status}"
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Upload a local file into `(record_id, field)`
    pub async fn import_record(&self, record_id: &str, field: &str, path: &Path) -> Result<()> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let form = multipart::Form::new()
            .text("token", self.config.api_token.clone())
            .text("content", "file")
            .text("action", "import")
            .text("record", record_id.to_string())
            .text("field", field.to_string())
            .text("returnFormat", "json")
            .part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .http
            .post(&self.config.api_url)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        log::info!("import {record_id}/{field}: HTTP {status}");
        if !status.is_success() {
            return Err(PipelineError::Remote(format!(
                "import of {record_id}/{field} returned HTTP {status}"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_is_configuration_error() {
        std::env::remove_var("CALORIX_API_URL");
        std::env::remove_var("CALORIX_API_TOKEN");
        let err = RemoteConfig::from_env().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
