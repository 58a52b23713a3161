// Library crate for the minidek deck-scoring and archival engine
// This file exposes the public API for integration tests

pub mod certify;
pub mod config;
pub mod deck;
pub mod game;
pub mod generator;
pub mod handlers;
pub mod rarity;
pub mod scoring;
pub mod shared;
pub mod store;
pub mod style;
pub mod telemetry;

// Re-export commonly used types for easier access in tests
pub use config::GameConfig;
pub use deck::{Item, ItemStatus};
pub use game::{GameSessionController, SessionPhase};
pub use generator::{CreatureGenerator, GeneratorError};
pub use rarity::Rarity;
pub use scoring::{compute_score, DeckScorer};
pub use shared::{AppError, AppState};
pub use store::{ArchivedGame, GameStore, InMemoryGameStore};
pub use style::{classify, StyleBadge};
