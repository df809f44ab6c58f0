//! Transport between the upload form and the analysis service.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::state::{StagedFile, TrustedHtml};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },
}

/// Wire shape of a successful analysis response.
#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    analysis: String,
}

/// Wire shape of an error response.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Carries one staged file to the analysis service and returns the HTML
/// fragment. Implemented by `HttpTransport` in production and by mocks in
/// tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn upload(&self, file: &StagedFile) -> Result<TrustedHtml, TransportError>;
}

/// Production transport: multipart POST to `{base_url}/upload`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload(&self, file: &StagedFile) -> Result<TrustedHtml, TransportError> {
        let part = reqwest::multipart::Part::bytes(file.data.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(TransportError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let analysis: AnalysisResponse = response.json().await?;
        Ok(TrustedHtml::from_upstream(analysis.analysis))
    }
}
