pub mod models;
pub mod postgres;
pub mod repository;

pub use models::{
    AppStateRecord, ArchivedGame, Collection, ResellReceipt, APP_STATE_KEY, SCHEMA_VERSION,
    TOKEN_BALANCE_KEY,
};
pub use postgres::PostgresGameStore;
pub use repository::{GameStore, InMemoryGameStore, DEFAULT_STARTING_TOKENS};
