pub mod http;
pub mod local;

use async_trait::async_trait;
use thiserror::Error;

use crate::{deck::Item, shared::AppError};

pub use http::HttpCreatureGenerator;
pub use local::{LocalCreatureGenerator, RARITY_DROP_WEIGHTS};

/// Failures of a generation attempt. None of them may leave the player
/// charged; the session controller refunds on every variant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    #[error("Generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Could not reach the generator: {0}")]
    Network(String),

    #[error("Generator rejected the request ({code}): {message}")]
    Api { code: String, message: String },

    #[error("Invalid generator response: {0}")]
    Validation(String),
}

impl From<GeneratorError> for AppError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::Timeout(_) => AppError::Timeout(err.to_string()),
            _ => AppError::Upstream(err.to_string()),
        }
    }
}

/// Trait for producing new creatures
#[async_trait]
pub trait CreatureGenerator: Send + Sync {
    async fn generate(&self) -> Result<Item, GeneratorError>;
}
