use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{shared::AppError, store::ArchivedGame};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CertifyError {
    #[error("Certification service unreachable: {0}")]
    Network(String),

    #[error("Certification refused: {0}")]
    Rejected(String),

    #[error("Invalid certification response: {0}")]
    InvalidResponse(String),
}

impl From<CertifyError> for AppError {
    fn from(err: CertifyError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CertifyScoreRequest {
    pub score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck: Option<ArchivedGame>,
}

impl CertifyScoreRequest {
    /// Builds a request for an archived game with a fresh nonce.
    pub fn for_archive(archive: &ArchivedGame, subject: Option<String>) -> Self {
        Self {
            score: archive.score,
            subject,
            nonce: Uuid::new_v4().to_string(),
            deck: Some(archive.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertifiedPayload {
    pub id: String,
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub nonce: String,
    pub issued_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedScore {
    pub payload: CertifiedPayload,
    pub canonical_b64: String,
    pub signature_b64: String,
    pub algorithm: String,
    pub signature_format: String,
    #[serde(
        default,
        rename = "certificateFingerprintSHA256",
        skip_serializing_if = "Option::is_none"
    )]
    pub certificate_fingerprint_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_pem: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertifyScoreResponse {
    pub signed: SignedScore,
    pub generated_at: String,
}

/// Trait for obtaining a signed attestation of a final score
#[async_trait]
pub trait ScoreCertifier: Send + Sync {
    async fn certify(&self, request: CertifyScoreRequest)
        -> Result<CertifyScoreResponse, CertifyError>;
}

/// Posts score certification requests to a remote signer.
pub struct HttpScoreCertifier {
    client: Client,
    endpoint: String,
    bearer_token: String,
    timeout: Duration,
}

impl HttpScoreCertifier {
    pub fn new(endpoint: impl Into<String>, bearer_token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            bearer_token: bearer_token.into(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl ScoreCertifier for HttpScoreCertifier {
    #[instrument(skip(self, request), fields(score = request.score))]
    async fn certify(
        &self,
        request: CertifyScoreRequest,
    ) -> Result<CertifyScoreResponse, CertifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Certification request failed");
                CertifyError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("Failed to certify score (HTTP {})", status.as_u16()));
            warn!(status = %status, message = %message, "Certification refused");
            return Err(CertifyError::Rejected(message));
        }

        let certified: CertifyScoreResponse = response
            .json()
            .await
            .map_err(|e| CertifyError::InvalidResponse(e.to_string()))?;

        if certified.signed.payload.nonce != request.nonce {
            warn!("Certification nonce mismatch");
            return Err(CertifyError::InvalidResponse(
                "nonce does not match the request".to_string(),
            ));
        }

        debug!(certificate_id = %certified.signed.payload.id, "Score certified");
        Ok(certified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{style::StyleBadge, telemetry::ArchiveTelemetry};
    use chrono::Utc;

    fn archive() -> ArchivedGame {
        let telemetry = ArchiveTelemetry {
            rolls: 1,
            tokens_spent: 10,
            resell_count: 0,
            quick_flip_count: 0,
            sold_high_rarity: false,
            session_duration_seconds: 90,
            style_badge: StyleBadge::NoPlayer,
        };
        ArchivedGame::new(55, 90, vec![], telemetry, "v2", Utc::now())
    }

    #[test]
    fn request_carries_score_and_fresh_nonce() {
        let archive = archive();
        let first = CertifyScoreRequest::for_archive(&archive, Some("ada".to_string()));
        let second = CertifyScoreRequest::for_archive(&archive, None);

        assert_eq!(first.score, 55);
        assert_ne!(first.nonce, second.nonce);

        let json = serde_json::to_value(&second).unwrap();
        assert!(json.get("subject").is_none());
        assert_eq!(json["deck"]["id"], archive.id);
    }

    #[test]
    fn parses_signed_response() {
        let json = r#"{
            "signed": {
                "payload": {"id": "c-1", "score": 55, "nonce": "n-1", "issuedAt": "2025-01-01T00:00:00Z"},
                "canonicalB64": "e30=",
                "signatureB64": "c2ln",
                "algorithm": "RSASSA-PSS",
                "signatureFormat": "base64",
                "certificateFingerprintSHA256": "ab:cd"
            },
            "generatedAt": "2025-01-01T00:00:00Z"
        }"#;

        let response: CertifyScoreResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.signed.payload.score, 55);
        assert_eq!(
            response.signed.certificate_fingerprint_sha256.as_deref(),
            Some("ab:cd")
        );
        assert!(response.signed.certificate_pem.is_none());
    }

    #[test]
    fn certify_errors_are_upstream_failures() {
        let err: AppError = CertifyError::Rejected("nope".to_string()).into();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
