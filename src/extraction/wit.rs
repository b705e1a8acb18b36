//! HTTP client for the entity annotation service (`GET {base_url}message?q=`).

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::postprocessor::{entries_from_annotations, MessageAnnotations};
use super::Extractor;
use crate::config::ExtractorConfig;
use crate::error::ExtractionError;
use crate::models::WorkoutEntry;

#[derive(Debug, Clone)]
pub struct WitExtractor {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl WitExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        let base_url = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };

        Ok(Self {
            client,
            endpoint: format!("{base_url}message"),
            bearer_token: config.bearer_token.clone(),
        })
    }

    async fn annotate(&self, text: &str) -> Result<MessageAnnotations, ExtractionError> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("q", text)])
            .header(reqwest::header::ACCEPT, "*/*");
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<MessageAnnotations>()
            .await
            .map_err(|e| ExtractionError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Extractor for WitExtractor {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn extract(&self, text: &str) -> Result<Vec<WorkoutEntry>, ExtractionError> {
        let annotations = self.annotate(text).await?;
        let entries = entries_from_annotations(&annotations);
        debug!(entries = entries.len(), "Extracted workout entries");
        Ok(entries)
    }
}
