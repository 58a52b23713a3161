// Public API
pub use models::{
    ContinueOutcome, DeckView, EndGameOutcome, GenerateOutcome, HallOfFameEntry, HallOfFameView,
    LaunchState, ResellOutcome, SessionPhase, StartOutcome,
};
pub use service::GameSessionController;

// Internal modules
mod models;
mod service;
