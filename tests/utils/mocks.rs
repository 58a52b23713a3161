use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use minidek::{
    deck::Item,
    generator::{CreatureGenerator, GeneratorError},
    rarity::Rarity,
    shared::AppError,
    store::{AppStateRecord, ArchivedGame, GameStore, InMemoryGameStore, ResellReceipt},
    telemetry::ArchiveTelemetry,
};

// ============================================================================
// Generators
// ============================================================================

/// Hands out creatures of the queued rarities in order, then F forever.
pub struct ScriptedGenerator {
    rarities: Mutex<VecDeque<Rarity>>,
    calls: AtomicUsize,
    age: ChronoDuration,
}

impl ScriptedGenerator {
    pub fn new(rarities: Vec<Rarity>) -> Self {
        Self {
            rarities: Mutex::new(rarities.into()),
            calls: AtomicUsize::new(0),
            age: ChronoDuration::zero(),
        }
    }

    /// Backdates every generated creature, so resells are never quick flips.
    pub fn aged(mut self, age: ChronoDuration) -> Self {
        self.age = age;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CreatureGenerator for ScriptedGenerator {
    async fn generate(&self) -> Result<Item, GeneratorError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let rarity = self
            .rarities
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Rarity::F);
        Ok(Item::new_owned(
            format!("mon-{}", n),
            format!("Scripted {}", n),
            rarity,
            "aW1n",
            Utc::now() - self.age,
        ))
    }
}

/// Fails every call the way an unreachable endpoint would.
pub struct FailingGenerator;

#[async_trait]
impl CreatureGenerator for FailingGenerator {
    async fn generate(&self) -> Result<Item, GeneratorError> {
        Err(GeneratorError::Api {
            code: "SERVICE_UNAVAILABLE".to_string(),
            message: "generator offline".to_string(),
        })
    }
}

/// Never answers within any sensible deadline.
pub struct SlowGenerator {
    pub delay: Duration,
}

#[async_trait]
impl CreatureGenerator for SlowGenerator {
    async fn generate(&self) -> Result<Item, GeneratorError> {
        tokio::time::sleep(self.delay).await;
        Ok(Item::new_owned("late", "Latecomer", Rarity::S, "aW1n", Utc::now()))
    }
}

// ============================================================================
// Stores
// ============================================================================

/// In-memory store whose archive and reset writes can be made to fail.
pub struct FlakyStore {
    inner: InMemoryGameStore,
    archive_failures: AtomicUsize,
    reset_failures: AtomicUsize,
    archive_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryGameStore::default(),
            archive_failures: AtomicUsize::new(0),
            reset_failures: AtomicUsize::new(0),
            archive_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_archives(self, times: usize) -> Self {
        self.archive_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn fail_resets(self, times: usize) -> Self {
        self.reset_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn archive_calls(&self) -> usize {
        self.archive_calls.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl GameStore for FlakyStore {
    async fn get_items(&self) -> Result<Vec<Item>, AppError> {
        self.inner.get_items().await
    }
    async fn add_item(&self, item: &Item) -> Result<(), AppError> {
        self.inner.add_item(item).await
    }
    async fn update_item(&self, item: &Item) -> Result<(), AppError> {
        self.inner.update_item(item).await
    }
    async fn resell_item(&self, item_id: &str) -> Result<ResellReceipt, AppError> {
        self.inner.resell_item(item_id).await
    }
    async fn get_token_balance(&self) -> Result<i64, AppError> {
        self.inner.get_token_balance().await
    }
    async fn update_token_balance(&self, amount: i64) -> Result<i64, AppError> {
        self.inner.update_token_balance(amount).await
    }
    async fn get_app_state(&self) -> Result<AppStateRecord, AppError> {
        self.inner.get_app_state().await
    }
    async fn save_app_state(&self, state: &AppStateRecord) -> Result<(), AppError> {
        self.inner.save_app_state(state).await
    }
    async fn archive_current_game(
        &self,
        score: i64,
        token_balance: i64,
        items: Vec<Item>,
        telemetry: ArchiveTelemetry,
        scored_by_version: &str,
    ) -> Result<ArchivedGame, AppError> {
        self.archive_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.archive_failures) {
            return Err(AppError::DatabaseError("disk full".to_string()));
        }
        self.inner
            .archive_current_game(score, token_balance, items, telemetry, scored_by_version)
            .await
    }
    async fn get_archived_games(&self) -> Result<Vec<ArchivedGame>, AppError> {
        self.inner.get_archived_games().await
    }
    async fn get_archived_game(&self, archive_id: &str) -> Result<Option<ArchivedGame>, AppError> {
        self.inner.get_archived_game(archive_id).await
    }
    async fn clear_current_game_data(&self) -> Result<(), AppError> {
        self.inner.clear_current_game_data().await
    }
    async fn reset_game_after_archive(&self) -> Result<(), AppError> {
        if Self::take_failure(&self.reset_failures) {
            return Err(AppError::DatabaseError("connection reset".to_string()));
        }
        self.inner.reset_game_after_archive().await
    }
    async fn reset_entire_app_data(&self) -> Result<(), AppError> {
        self.inner.reset_entire_app_data().await
    }
}

/// Store that cannot be read at all.
pub struct BrokenStore;

#[async_trait]
impl GameStore for BrokenStore {
    async fn get_items(&self) -> Result<Vec<Item>, AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn add_item(&self, _item: &Item) -> Result<(), AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn update_item(&self, _item: &Item) -> Result<(), AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn resell_item(&self, _item_id: &str) -> Result<ResellReceipt, AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn get_token_balance(&self) -> Result<i64, AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn update_token_balance(&self, _amount: i64) -> Result<i64, AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn get_app_state(&self) -> Result<AppStateRecord, AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn save_app_state(&self, _state: &AppStateRecord) -> Result<(), AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn archive_current_game(
        &self,
        _score: i64,
        _token_balance: i64,
        _items: Vec<Item>,
        _telemetry: ArchiveTelemetry,
        _scored_by_version: &str,
    ) -> Result<ArchivedGame, AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn get_archived_games(&self) -> Result<Vec<ArchivedGame>, AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn get_archived_game(&self, _archive_id: &str) -> Result<Option<ArchivedGame>, AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn clear_current_game_data(&self) -> Result<(), AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn reset_game_after_archive(&self) -> Result<(), AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
    async fn reset_entire_app_data(&self) -> Result<(), AppError> {
        Err(AppError::DatabaseError("unavailable".to_string()))
    }
}
