use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{CreatureGenerator, GeneratorError};
use crate::{deck::Item, rarity::Rarity};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    image_base64: Option<String>,
    generated_at: Option<String>,
    metadata: Option<GenerateMetadata>,
}

#[derive(Debug, Deserialize)]
struct GenerateMetadata {
    id: Option<String>,
    name: Option<String>,
    rarity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
}

fn required(field: Option<String>, name: &str) -> Result<String, GeneratorError> {
    field
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| GeneratorError::Validation(format!("missing field `{}`", name)))
}

impl GenerateResponse {
    fn into_item(self) -> Result<Item, GeneratorError> {
        let metadata = self
            .metadata
            .ok_or_else(|| GeneratorError::Validation("missing field `metadata`".to_string()))?;

        let id = required(metadata.id, "metadata.id")?;
        let name = required(metadata.name, "metadata.name")?;
        let rarity_tag = required(metadata.rarity, "metadata.rarity")?;
        let image_base64 = required(self.image_base64, "imageBase64")?;
        let generated_at = required(self.generated_at, "generatedAt")?;

        // Unknown tiers are refused here; only stored data may carry them
        let rarity = Rarity::try_from(rarity_tag.as_str())
            .map_err(|tag| GeneratorError::Validation(format!("unknown rarity `{}`", tag)))?;
        let generated_at = DateTime::parse_from_rfc3339(&generated_at)
            .map_err(|e| GeneratorError::Validation(format!("bad generatedAt: {}", e)))?
            .with_timezone(&Utc);

        Ok(Item::new_owned(id, name, rarity, image_base64, generated_at))
    }
}

/// Calls the remote `GET {base}/generate` endpoint.
pub struct HttpCreatureGenerator {
    client: Client,
    base_url: String,
    bearer_token: String,
    timeout: Duration,
}

impl HttpCreatureGenerator {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
            timeout,
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/generate", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CreatureGenerator for HttpCreatureGenerator {
    #[instrument(skip(self))]
    async fn generate(&self) -> Result<Item, GeneratorError> {
        let url = self.generate_url();
        debug!(url = %url, "Requesting a new creature");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Generator request failed");
                if e.is_timeout() {
                    GeneratorError::Timeout(self.timeout.as_secs())
                } else {
                    GeneratorError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = parse_api_error(status.as_u16(), &body);
            warn!(status = %status, error = %error, "Generator returned an error");
            return Err(error);
        }

        let payload: GenerateResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Generator response was not valid JSON");
            GeneratorError::Validation(e.to_string())
        })?;

        let item = payload.into_item()?;
        debug!(item_id = %item.id, rarity = %item.rarity, "Creature generated");
        Ok(item)
    }
}

/// Reads the `{error:{code,message}}` envelope, falling back to the status.
fn parse_api_error(status: u16, body: &str) -> GeneratorError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => GeneratorError::Api {
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => GeneratorError::Api {
            code: "UNKNOWN_ERROR".to_string(),
            message: format!("HTTP error! Status: {}", status),
        },
    }
}
