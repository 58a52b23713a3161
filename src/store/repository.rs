use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument, warn};

use super::models::{
    AppStateRecord, ArchivedGame, ResellReceipt, APP_STATE_KEY, TOKEN_BALANCE_KEY,
};
use crate::{
    deck::{Item, ItemStatus},
    shared::AppError,
    telemetry::ArchiveTelemetry,
};

/// Balance a fresh store (or a reset session) starts with.
pub const DEFAULT_STARTING_TOKENS: i64 = 100;

/// Trait for the persistent game store.
///
/// Every method is atomic over the collections it touches. The multi
/// collection resets run inside a single transaction so a failure leaves
/// either the old or the new state, never a mix of both.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get_items(&self) -> Result<Vec<Item>, AppError>;
    async fn add_item(&self, item: &Item) -> Result<(), AppError>;

    /// Replaces the item with the same id. Unknown ids are rejected with
    /// `NotFound`, never upserted.
    async fn update_item(&self, item: &Item) -> Result<(), AppError>;

    /// Atomically marks an owned item as resold and credits its refund.
    /// Reselling an item twice fails with `Conflict`.
    async fn resell_item(&self, item_id: &str) -> Result<ResellReceipt, AppError>;

    /// Returns the balance, initialising it to the starting amount on first access.
    async fn get_token_balance(&self) -> Result<i64, AppError>;
    async fn update_token_balance(&self, amount: i64) -> Result<i64, AppError>;

    /// Returns the app state, initialising it to "no active game" on first access.
    async fn get_app_state(&self) -> Result<AppStateRecord, AppError>;
    async fn save_app_state(&self, state: &AppStateRecord) -> Result<(), AppError>;

    async fn archive_current_game(
        &self,
        score: i64,
        token_balance: i64,
        items: Vec<Item>,
        telemetry: ArchiveTelemetry,
        scored_by_version: &str,
    ) -> Result<ArchivedGame, AppError>;
    async fn get_archived_games(&self) -> Result<Vec<ArchivedGame>, AppError>;
    async fn get_archived_game(&self, archive_id: &str)
        -> Result<Option<ArchivedGame>, AppError>;

    /// Empties items, resets the balance and marks a game as active.
    async fn clear_current_game_data(&self) -> Result<(), AppError>;

    /// Empties items, resets the balance and marks no game as active.
    async fn reset_game_after_archive(&self) -> Result<(), AppError>;

    /// Wipes every collection, archives included. Irreversible.
    async fn reset_entire_app_data(&self) -> Result<(), AppError>;
}

pub(super) fn validate_balance(amount: i64) -> Result<(), AppError> {
    if amount < 0 {
        return Err(AppError::Validation(format!(
            "Token balance cannot be negative: {}",
            amount
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct Collections {
    items: Vec<Item>,
    settings: HashMap<String, i64>,
    app_state: HashMap<String, AppStateRecord>,
    archives: Vec<ArchivedGame>,
}

/// Stages writes against a copy of the touched collections and publishes
/// them together on `commit`. Dropping it without committing discards
/// every staged write.
struct UnitOfWork<'a> {
    guard: MutexGuard<'a, Collections>,
    items: Option<Vec<Item>>,
    settings: Option<HashMap<String, i64>>,
    app_state: Option<HashMap<String, AppStateRecord>>,
    archives: Option<Vec<ArchivedGame>>,
}

impl<'a> UnitOfWork<'a> {
    fn new(guard: MutexGuard<'a, Collections>) -> Self {
        Self {
            guard,
            items: None,
            settings: None,
            app_state: None,
            archives: None,
        }
    }

    fn items(&mut self) -> &mut Vec<Item> {
        let current = &self.guard.items;
        self.items.get_or_insert_with(|| current.clone())
    }

    fn settings(&mut self) -> &mut HashMap<String, i64> {
        let current = &self.guard.settings;
        self.settings.get_or_insert_with(|| current.clone())
    }

    fn app_state(&mut self) -> &mut HashMap<String, AppStateRecord> {
        let current = &self.guard.app_state;
        self.app_state.get_or_insert_with(|| current.clone())
    }

    fn archives(&mut self) -> &mut Vec<ArchivedGame> {
        let current = &self.guard.archives;
        self.archives.get_or_insert_with(|| current.clone())
    }

    fn reset_session(&mut self, starting_tokens: i64, has_active_game: bool) {
        self.items().clear();
        self.settings()
            .insert(TOKEN_BALANCE_KEY.to_string(), starting_tokens);
        let state = if has_active_game {
            AppStateRecord::active_now()
        } else {
            AppStateRecord::inactive_now()
        };
        self.app_state().insert(APP_STATE_KEY.to_string(), state);
    }

    fn commit(mut self) {
        if let Some(items) = self.items.take() {
            self.guard.items = items;
        }
        if let Some(settings) = self.settings.take() {
            self.guard.settings = settings;
        }
        if let Some(app_state) = self.app_state.take() {
            self.guard.app_state = app_state;
        }
        if let Some(archives) = self.archives.take() {
            self.guard.archives = archives;
        }
    }
}

/// In-memory implementation of GameStore for development and testing
///
/// All four collections sit behind one async mutex; every operation works
/// through a unit of work so partially applied resets are impossible.
/// Data is lost when the process exits.
pub struct InMemoryGameStore {
    collections: Mutex<Collections>,
    starting_tokens: i64,
}

impl Default for InMemoryGameStore {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_TOKENS)
    }
}

impl InMemoryGameStore {
    pub fn new(starting_tokens: i64) -> Self {
        Self {
            collections: Mutex::new(Collections::default()),
            starting_tokens,
        }
    }

    /// Creates a store with pre-populated archives, e.g. from an older schema
    pub fn with_archives(starting_tokens: i64, archives: Vec<ArchivedGame>) -> Self {
        Self {
            collections: Mutex::new(Collections {
                archives,
                ..Collections::default()
            }),
            starting_tokens,
        }
    }

    async fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self.collections.lock().await)
    }

    /// Number of live items (useful for debugging)
    pub async fn item_count(&self) -> usize {
        self.collections.lock().await.items.len()
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    #[instrument(skip(self))]
    async fn get_items(&self) -> Result<Vec<Item>, AppError> {
        let collections = self.collections.lock().await;
        debug!(count = collections.items.len(), "Fetched items from memory");
        Ok(collections.items.clone())
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn add_item(&self, item: &Item) -> Result<(), AppError> {
        let mut uow = self.begin().await;
        if uow.items().iter().any(|existing| existing.id == item.id) {
            warn!(item_id = %item.id, "Item already exists in memory");
            return Err(AppError::Conflict(format!("Item {} already exists", item.id)));
        }
        uow.items().push(item.clone());
        uow.commit();

        debug!(item_id = %item.id, "Item added to memory");
        Ok(())
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn update_item(&self, item: &Item) -> Result<(), AppError> {
        let mut uow = self.begin().await;
        let Some(slot) = uow.items().iter_mut().find(|existing| existing.id == item.id) else {
            warn!(item_id = %item.id, "Item not found for update in memory");
            return Err(AppError::NotFound(format!("Item {} not found", item.id)));
        };
        *slot = item.clone();
        uow.commit();

        debug!(item_id = %item.id, "Item updated in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn resell_item(&self, item_id: &str) -> Result<ResellReceipt, AppError> {
        let starting_tokens = self.starting_tokens;
        let mut uow = self.begin().await;

        let item = {
            let Some(slot) = uow.items().iter_mut().find(|existing| existing.id == item_id)
            else {
                warn!(item_id, "Item not found for resell in memory");
                return Err(AppError::NotFound(format!("Item {} not found", item_id)));
            };
            if slot.status == ItemStatus::Resold {
                warn!(item_id, "Item already resold");
                return Err(AppError::Conflict(format!(
                    "Item {} was already resold",
                    item_id
                )));
            }
            slot.status = ItemStatus::Resold;
            slot.clone()
        };

        let refund = item.rarity.resell_value() as i64;
        let balance = uow
            .settings()
            .entry(TOKEN_BALANCE_KEY.to_string())
            .or_insert(starting_tokens);
        *balance += refund;
        let new_balance = *balance;
        uow.commit();

        debug!(item_id, refund, new_balance, "Item resold in memory");
        Ok(ResellReceipt {
            item,
            refund,
            new_balance,
        })
    }

    #[instrument(skip(self))]
    async fn get_token_balance(&self) -> Result<i64, AppError> {
        let starting_tokens = self.starting_tokens;
        let mut uow = self.begin().await;
        if let Some(balance) = uow.guard.settings.get(TOKEN_BALANCE_KEY) {
            return Ok(*balance);
        }

        debug!(starting_tokens, "Initialising token balance in memory");
        uow.settings()
            .insert(TOKEN_BALANCE_KEY.to_string(), starting_tokens);
        uow.commit();
        Ok(starting_tokens)
    }

    #[instrument(skip(self))]
    async fn update_token_balance(&self, amount: i64) -> Result<i64, AppError> {
        validate_balance(amount)?;
        let mut uow = self.begin().await;
        uow.settings().insert(TOKEN_BALANCE_KEY.to_string(), amount);
        uow.commit();

        debug!(amount, "Token balance updated in memory");
        Ok(amount)
    }

    #[instrument(skip(self))]
    async fn get_app_state(&self) -> Result<AppStateRecord, AppError> {
        let mut uow = self.begin().await;
        if let Some(state) = uow.guard.app_state.get(APP_STATE_KEY) {
            return Ok(state.clone());
        }

        debug!("Initialising app state in memory");
        let state = AppStateRecord::default();
        uow.app_state()
            .insert(APP_STATE_KEY.to_string(), state.clone());
        uow.commit();
        Ok(state)
    }

    #[instrument(skip(self, state))]
    async fn save_app_state(&self, state: &AppStateRecord) -> Result<(), AppError> {
        let mut uow = self.begin().await;
        uow.app_state()
            .insert(APP_STATE_KEY.to_string(), state.clone());
        uow.commit();

        debug!(has_active_game = state.has_active_game, "App state saved in memory");
        Ok(())
    }

    #[instrument(skip(self, items, telemetry))]
    async fn archive_current_game(
        &self,
        score: i64,
        token_balance: i64,
        items: Vec<Item>,
        telemetry: ArchiveTelemetry,
        scored_by_version: &str,
    ) -> Result<ArchivedGame, AppError> {
        let archive = ArchivedGame::new(
            score,
            token_balance,
            items,
            telemetry,
            scored_by_version,
            chrono::Utc::now(),
        );

        let mut uow = self.begin().await;
        if uow.archives().iter().any(|existing| existing.id == archive.id) {
            warn!(archive_id = %archive.id, "Archive id collision in memory");
            return Err(AppError::Conflict(format!(
                "Archive {} already exists",
                archive.id
            )));
        }
        uow.archives().push(archive.clone());
        uow.commit();

        debug!(archive_id = %archive.id, score, items = archive.items.len(), "Game archived in memory");
        Ok(archive)
    }

    #[instrument(skip(self))]
    async fn get_archived_games(&self) -> Result<Vec<ArchivedGame>, AppError> {
        let collections = self.collections.lock().await;
        Ok(collections.archives.clone())
    }

    #[instrument(skip(self))]
    async fn get_archived_game(
        &self,
        archive_id: &str,
    ) -> Result<Option<ArchivedGame>, AppError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .archives
            .iter()
            .find(|archive| archive.id == archive_id)
            .cloned())
    }

    #[instrument(skip(self))]
    async fn clear_current_game_data(&self) -> Result<(), AppError> {
        let mut uow = self.begin().await;
        uow.reset_session(self.starting_tokens, true);
        uow.commit();

        debug!("Current game data cleared in memory, new game active");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset_game_after_archive(&self) -> Result<(), AppError> {
        let mut uow = self.begin().await;
        uow.reset_session(self.starting_tokens, false);
        uow.commit();

        debug!("Current game data reset in memory, no active game");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset_entire_app_data(&self) -> Result<(), AppError> {
        let mut collections = self.collections.lock().await;
        *collections = Collections::default();

        warn!("All app data wiped from memory");
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::{rarity::Rarity, style::StyleBadge};
    use chrono::Utc;

    /// Test helper functions for creating test data
    mod helpers {
        use super::*;

        pub fn create_item(id: &str, rarity: Rarity) -> Item {
            Item::new_owned(id, format!("mon-{}", id), rarity, "aGVsbG8=", Utc::now())
        }

        pub fn create_telemetry() -> ArchiveTelemetry {
            ArchiveTelemetry {
                rolls: 2,
                tokens_spent: 20,
                resell_count: 0,
                quick_flip_count: 0,
                sold_high_rarity: false,
                session_duration_seconds: 120,
                style_badge: StyleBadge::NoPlayer,
            }
        }
    }

    use helpers::*;

    #[tokio::test]
    async fn test_add_and_get_items() {
        let store = InMemoryGameStore::default();
        store.add_item(&create_item("a", Rarity::B)).await.unwrap();
        store.add_item(&create_item("b", Rarity::F)).await.unwrap();

        let items = store.get_items().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a");
    }

    #[tokio::test]
    async fn test_add_duplicate_item() {
        let store = InMemoryGameStore::default();
        let item = create_item("a", Rarity::B);
        store.add_item(&item).await.unwrap();

        let result = store.add_item(&item).await;
        assert!(matches!(result.unwrap_err(), AppError::Conflict(_)));
        assert_eq!(store.item_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_item_replaces_by_id() {
        let store = InMemoryGameStore::default();
        let mut item = create_item("a", Rarity::B);
        store.add_item(&item).await.unwrap();

        item.name = "renamed".to_string();
        store.update_item(&item).await.unwrap();

        let items = store.get_items().await.unwrap();
        assert_eq!(items[0].name, "renamed");
    }

    #[tokio::test]
    async fn test_update_nonexistent_item() {
        let store = InMemoryGameStore::default();
        let result = store.update_item(&create_item("ghost", Rarity::A)).await;

        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
        assert!(store.get_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_token_balance_initialises_once() {
        let store = InMemoryGameStore::new(100);
        assert_eq!(store.get_token_balance().await.unwrap(), 100);

        store.update_token_balance(40).await.unwrap();
        assert_eq!(store.get_token_balance().await.unwrap(), 40);
        assert_eq!(store.get_token_balance().await.unwrap(), 40);
    }

    #[tokio::test]
    async fn test_negative_balance_rejected() {
        let store = InMemoryGameStore::default();
        let result = store.update_token_balance(-1).await;

        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
        assert_eq!(store.get_token_balance().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_app_state_defaults_and_saves() {
        let store = InMemoryGameStore::default();
        assert!(!store.get_app_state().await.unwrap().has_active_game);

        store
            .save_app_state(&AppStateRecord::active_now())
            .await
            .unwrap();
        assert!(store.get_app_state().await.unwrap().has_active_game);
    }

    #[tokio::test]
    async fn test_resell_credits_refund_once() {
        let store = InMemoryGameStore::new(50);
        store.add_item(&create_item("s", Rarity::S)).await.unwrap();

        let receipt = store.resell_item("s").await.unwrap();
        assert_eq!(receipt.refund, 15);
        assert_eq!(receipt.new_balance, 65);
        assert_eq!(receipt.item.status, ItemStatus::Resold);

        let second = store.resell_item("s").await;
        assert!(matches!(second.unwrap_err(), AppError::Conflict(_)));
        assert_eq!(store.get_token_balance().await.unwrap(), 65);
    }

    #[tokio::test]
    async fn test_resell_unknown_item() {
        let store = InMemoryGameStore::default();
        let result = store.resell_item("missing").await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_archive_snapshot_survives_reset() {
        let store = InMemoryGameStore::default();
        store.add_item(&create_item("a", Rarity::A)).await.unwrap();
        store.add_item(&create_item("b", Rarity::C)).await.unwrap();

        let items = store.get_items().await.unwrap();
        let archive = store
            .archive_current_game(42, 80, items.clone(), create_telemetry(), "v2")
            .await
            .unwrap();
        assert_eq!(archive.items.len(), items.len());

        store.reset_game_after_archive().await.unwrap();

        assert!(store.get_items().await.unwrap().is_empty());
        assert_eq!(store.get_token_balance().await.unwrap(), 100);
        assert!(!store.get_app_state().await.unwrap().has_active_game);

        let stored = store.get_archived_game(&archive.id).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 2);
        assert_eq!(stored.score, 42);
    }

    #[tokio::test]
    async fn test_clear_current_game_marks_active() {
        let store = InMemoryGameStore::default();
        store.add_item(&create_item("a", Rarity::A)).await.unwrap();
        store.update_token_balance(3).await.unwrap();

        store.clear_current_game_data().await.unwrap();

        assert_eq!(store.item_count().await, 0);
        assert_eq!(store.get_token_balance().await.unwrap(), 100);
        let state = store.get_app_state().await.unwrap();
        assert!(state.has_active_game);
        assert!(state.last_played_date.is_some());
    }

    #[tokio::test]
    async fn test_uncommitted_unit_of_work_is_discarded() {
        let store = InMemoryGameStore::default();
        store.add_item(&create_item("a", Rarity::A)).await.unwrap();
        store.update_token_balance(7).await.unwrap();

        {
            let mut uow = store.begin().await;
            uow.reset_session(100, true);
            // dropped without commit
        }

        assert_eq!(store.item_count().await, 1);
        assert_eq!(store.get_token_balance().await.unwrap(), 7);
        assert!(!store.get_app_state().await.unwrap().has_active_game);
    }

    #[tokio::test]
    async fn test_reset_entire_app_data_wipes_archives() {
        let store = InMemoryGameStore::default();
        store.add_item(&create_item("a", Rarity::A)).await.unwrap();
        store
            .archive_current_game(1, 1, vec![], create_telemetry(), "v2")
            .await
            .unwrap();

        store.reset_entire_app_data().await.unwrap();

        assert!(store.get_archived_games().await.unwrap().is_empty());
        assert!(store.get_items().await.unwrap().is_empty());
        assert_eq!(store.get_token_balance().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_preloaded_archives_are_untouched() {
        let legacy: ArchivedGame = serde_json::from_str(
            r#"{"id":"archive-1","score":77,"tokenBalance":0,"minimons":[],"archiveDate":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let store = InMemoryGameStore::with_archives(100, vec![legacy]);

        let archives = store.get_archived_games().await.unwrap();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].score, 77);
        assert_eq!(archives[0].scored_by_version, "v1");
    }
}
