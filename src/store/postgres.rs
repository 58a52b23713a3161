use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use tracing::{debug, info, instrument, warn};

use super::{
    models::{
        AppStateRecord, ArchivedGame, ResellReceipt, APP_STATE_KEY, SCHEMA_VERSION,
        TOKEN_BALANCE_KEY,
    },
    repository::{validate_balance, GameStore},
};
use crate::{
    deck::{Item, ItemStatus},
    shared::AppError,
    telemetry::ArchiveTelemetry,
};

/// Ordered, additive migrations. A version may only create tables so
/// archives written under an older schema stay readable.
const MIGRATIONS: &[(u32, &[&str])] = &[
    (
        1,
        &[
            "CREATE TABLE IF NOT EXISTS minimons (
                seq BIGSERIAL,
                id TEXT PRIMARY KEY,
                payload TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value BIGINT NOT NULL
            )",
        ],
    ),
    (
        3,
        &[
            "CREATE TABLE IF NOT EXISTS archives (
                id TEXT PRIMARY KEY,
                archived_at TIMESTAMPTZ NOT NULL,
                payload TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS app_state (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL
            )",
        ],
    ),
];

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    warn!(error = %e, "{}", context);
    AppError::DatabaseError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| {
        warn!(error = %e, "Failed to encode payload");
        AppError::Internal
    })
}

fn decode_row<T: DeserializeOwned>(row: &PgRow) -> Result<T, AppError> {
    let payload: String = row.get("payload");
    decode(&payload)
}

fn decode<T: DeserializeOwned>(payload: &str) -> Result<T, AppError> {
    serde_json::from_str(payload).map_err(|e| {
        warn!(error = %e, "Stored payload could not be decoded");
        AppError::DatabaseError(format!("Corrupt payload: {}", e))
    })
}

/// PostgreSQL implementation of the game store
///
/// Each logical collection is its own table holding JSON payloads, so the
/// record shapes stay identical to the in-memory store. Anything touching
/// more than one table runs inside a single transaction.
pub struct PostgresGameStore {
    pool: PgPool,
    starting_tokens: i64,
}

impl PostgresGameStore {
    pub fn new(pool: PgPool, starting_tokens: i64) -> Self {
        Self {
            pool,
            starting_tokens,
        }
    }

    /// Brings the schema up to `SCHEMA_VERSION`, applying only the
    /// migrations that have not run yet.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<u32, AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create schema_version table", e))?;

        let current: i32 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("Failed to read schema version", e))?;
        let current = current as u32;

        for (version, statements) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            let mut tx = self.begin().await?;
            for statement in statements.iter() {
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| db_error("Failed to apply migration", e))?;
            }
            sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES ($1, $2)")
                .bind(*version as i32)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to record migration", e))?;
            self.commit(tx).await?;
            info!(version, "Applied store migration");
        }

        debug!(schema_version = SCHEMA_VERSION, "Store schema up to date");
        Ok(SCHEMA_VERSION.max(current))
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to open transaction", e))
    }

    async fn commit(&self, tx: Transaction<'static, Postgres>) -> Result<(), AppError> {
        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))
    }

    async fn reset_session(&self, has_active_game: bool) -> Result<(), AppError> {
        let state = if has_active_game {
            AppStateRecord::active_now()
        } else {
            AppStateRecord::inactive_now()
        };
        let payload = encode(&state)?;

        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM minimons")
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to clear items", e))?;
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(TOKEN_BALANCE_KEY)
        .bind(self.starting_tokens)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to reset token balance", e))?;
        sqlx::query(
            "INSERT INTO app_state (key, payload) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET payload = EXCLUDED.payload",
        )
        .bind(APP_STATE_KEY)
        .bind(payload)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to save app state", e))?;
        self.commit(tx).await
    }
}

#[async_trait]
impl GameStore for PostgresGameStore {
    #[instrument(skip(self))]
    async fn get_items(&self) -> Result<Vec<Item>, AppError> {
        let rows = sqlx::query("SELECT payload FROM minimons ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch items", e))?;

        let items = rows
            .iter()
            .map(decode_row::<Item>)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = items.len(), "Fetched items from database");
        Ok(items)
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn add_item(&self, item: &Item) -> Result<(), AppError> {
        let result = sqlx::query(
            "INSERT INTO minimons (id, payload) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(&item.id)
        .bind(encode(item)?)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert item", e))?;

        if result.rows_affected() == 0 {
            warn!(item_id = %item.id, "Item already exists in database");
            return Err(AppError::Conflict(format!("Item {} already exists", item.id)));
        }
        debug!(item_id = %item.id, "Item added to database");
        Ok(())
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn update_item(&self, item: &Item) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE minimons SET payload = $2 WHERE id = $1")
            .bind(&item.id)
            .bind(encode(item)?)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update item", e))?;

        if result.rows_affected() == 0 {
            warn!(item_id = %item.id, "Item not found for update");
            return Err(AppError::NotFound(format!("Item {} not found", item.id)));
        }
        debug!(item_id = %item.id, "Item updated in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn resell_item(&self, item_id: &str) -> Result<ResellReceipt, AppError> {
        let mut tx = self.begin().await?;

        let row = sqlx::query("SELECT payload FROM minimons WHERE id = $1 FOR UPDATE")
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to lock item for resell", e))?;
        let Some(row) = row else {
            warn!(item_id, "Item not found for resell");
            return Err(AppError::NotFound(format!("Item {} not found", item_id)));
        };

        let mut item: Item = decode_row(&row)?;
        if item.status == ItemStatus::Resold {
            warn!(item_id, "Item already resold");
            return Err(AppError::Conflict(format!(
                "Item {} was already resold",
                item_id
            )));
        }
        item.status = ItemStatus::Resold;
        let refund = item.rarity.resell_value() as i64;

        sqlx::query("UPDATE minimons SET payload = $2 WHERE id = $1")
            .bind(item_id)
            .bind(encode(&item)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to mark item resold", e))?;

        let new_balance: i64 = sqlx::query_scalar(
            "INSERT INTO settings (key, value) VALUES ($1, $2 + $3)
             ON CONFLICT (key) DO UPDATE SET value = settings.value + $3
             RETURNING value",
        )
        .bind(TOKEN_BALANCE_KEY)
        .bind(self.starting_tokens)
        .bind(refund)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to credit refund", e))?;

        self.commit(tx).await?;
        debug!(item_id, refund, new_balance, "Item resold in database");
        Ok(ResellReceipt {
            item,
            refund,
            new_balance,
        })
    }

    #[instrument(skip(self))]
    async fn get_token_balance(&self) -> Result<i64, AppError> {
        sqlx::query("INSERT INTO settings (key, value) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING")
            .bind(TOKEN_BALANCE_KEY)
            .bind(self.starting_tokens)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to initialise token balance", e))?;

        sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
            .bind(TOKEN_BALANCE_KEY)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch token balance", e))
    }

    #[instrument(skip(self))]
    async fn update_token_balance(&self, amount: i64) -> Result<i64, AppError> {
        validate_balance(amount)?;
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(TOKEN_BALANCE_KEY)
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update token balance", e))?;

        debug!(amount, "Token balance updated in database");
        Ok(amount)
    }

    #[instrument(skip(self))]
    async fn get_app_state(&self) -> Result<AppStateRecord, AppError> {
        let default_payload = encode(&AppStateRecord::default())?;
        sqlx::query("INSERT INTO app_state (key, payload) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING")
            .bind(APP_STATE_KEY)
            .bind(default_payload)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to initialise app state", e))?;

        let payload: String = sqlx::query_scalar("SELECT payload FROM app_state WHERE key = $1")
            .bind(APP_STATE_KEY)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch app state", e))?;
        decode(&payload)
    }

    #[instrument(skip(self, state))]
    async fn save_app_state(&self, state: &AppStateRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO app_state (key, payload) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET payload = EXCLUDED.payload",
        )
        .bind(APP_STATE_KEY)
        .bind(encode(state)?)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save app state", e))?;

        debug!(has_active_game = state.has_active_game, "App state saved in database");
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
            Utc::now(),
        );

        let result = sqlx::query(
            "INSERT INTO archives (id, archived_at, payload) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&archive.id)
        .bind(archive.archive_date)
        .bind(encode(&archive)?)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to archive game", e))?;

        if result.rows_affected() == 0 {
            warn!(archive_id = %archive.id, "Archive id collision in database");
            return Err(AppError::Conflict(format!(
                "Archive {} already exists",
                archive.id
            )));
        }
        debug!(archive_id = %archive.id, score, "Game archived in database");
        Ok(archive)
    }

    #[instrument(skip(self))]
    async fn get_archived_games(&self) -> Result<Vec<ArchivedGame>, AppError> {
        let rows = sqlx::query("SELECT payload FROM archives ORDER BY archived_at")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch archives", e))?;

        rows.iter()
            .map(decode_row)
            .collect()
    }

    #[instrument(skip(self))]
    async fn get_archived_game(
        &self,
        archive_id: &str,
    ) -> Result<Option<ArchivedGame>, AppError> {
        let row = sqlx::query("SELECT payload FROM archives WHERE id = $1")
            .bind(archive_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch archive", e))?;

        row.as_ref().map(decode_row).transpose()
    }

    #[instrument(skip(self))]
    async fn clear_current_game_data(&self) -> Result<(), AppError> {
        self.reset_session(true).await?;
        debug!("Current game data cleared in database, new game active");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset_game_after_archive(&self) -> Result<(), AppError> {
        self.reset_session(false).await?;
        debug!("Current game data reset in database, no active game");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset_entire_app_data(&self) -> Result<(), AppError> {
        let mut tx = self.begin().await?;
        for table in ["minimons", "settings", "app_state", "archives"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to wipe app data", e))?;
        }
        self.commit(tx).await?;

        warn!("All app data wiped from database");
        Ok(())
    }
}
