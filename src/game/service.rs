use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::models::{
    ContinueOutcome, DeckView, EndGameOutcome, GenerateOutcome, HallOfFameEntry, HallOfFameView,
    LaunchState, ResellOutcome, SessionPhase, StartOutcome,
};
use crate::{
    certify::{CertifyScoreRequest, CertifyScoreResponse, ScoreCertifier},
    config::GameConfig,
    deck::{sort_items, DeckSortOrder, Item},
    generator::{CreatureGenerator, GeneratorError},
    scoring::DeckScorer,
    shared::AppError,
    store::{AppStateRecord, ArchivedGame, GameStore},
    style::classify,
    telemetry::{ArchiveTelemetry, SessionTelemetry, TelemetrySnapshot},
};

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    viewing_hall_of_fame: bool,
    telemetry: SessionTelemetry,
    /// Archive written for the current session, if any
    archived_id: Option<String>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: SessionPhase::NoActiveGame,
            viewing_hall_of_fame: false,
            telemetry: SessionTelemetry::start_now(),
            archived_id: None,
        }
    }

    fn enter_active_game(&mut self) {
        self.phase = SessionPhase::ActiveGame;
        self.telemetry = SessionTelemetry::start_now();
        self.archived_id = None;
    }

    fn enter_no_active_game(&mut self) {
        self.phase = SessionPhase::NoActiveGame;
        self.telemetry = SessionTelemetry::start_now();
        self.archived_id = None;
    }

    fn require_active(&self, action: &str) -> Result<(), AppError> {
        if self.phase != SessionPhase::ActiveGame {
            return Err(AppError::InvalidState(format!(
                "Cannot {} while in state: {}",
                action, self.phase
            )));
        }
        Ok(())
    }

    /// The deck is frozen once archived: it must match the archive until
    /// the reset that follows has gone through.
    fn require_unarchived(&self, action: &str) -> Result<(), AppError> {
        if let Some(archive_id) = &self.archived_id {
            return Err(AppError::InvalidState(format!(
                "Cannot {} until archive {} is reset, end the game again to finish",
                action, archive_id
            )));
        }
        Ok(())
    }

    fn require_playable(&self, action: &str) -> Result<(), AppError> {
        self.require_active(action)?;
        self.require_unarchived(action)
    }
}

/// Drives one player's session lifecycle against the store, the creature
/// generator and the scorer.
///
/// Every state-changing call holds the session lock for its whole duration,
/// so actions from the same player are applied one at a time.
pub struct GameSessionController {
    store: Arc<dyn GameStore>,
    generator: Arc<dyn CreatureGenerator>,
    certifier: Option<Arc<dyn ScoreCertifier>>,
    scorer: DeckScorer,
    config: GameConfig,
    state: Mutex<SessionState>,
}

impl GameSessionController {
    pub fn new(
        store: Arc<dyn GameStore>,
        generator: Arc<dyn CreatureGenerator>,
        config: GameConfig,
    ) -> Self {
        Self {
            store,
            generator,
            certifier: None,
            scorer: DeckScorer::v2(),
            config,
            state: Mutex::new(SessionState::new()),
        }
    }

    pub fn with_certifier(mut self, certifier: Arc<dyn ScoreCertifier>) -> Self {
        self.certifier = Some(certifier);
        self
    }

    pub fn with_scorer(mut self, scorer: DeckScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase
    }

    pub async fn is_viewing_hall_of_fame(&self) -> bool {
        self.state.lock().await.viewing_hall_of_fame
    }

    pub async fn telemetry(&self) -> TelemetrySnapshot {
        self.state.lock().await.telemetry.snapshot(Utc::now())
    }

    /// Reads the persisted state for the launch screen. Never fails: any
    /// store error falls back to a fresh "no active game" screen. A game
    /// already running in this process stays active.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> LaunchState {
        let mut state = self.state.lock().await;
        if state.phase != SessionPhase::ActiveGame {
            state.phase = SessionPhase::NoActiveGame;
        }
        state.viewing_hall_of_fame = false;
        let phase = state.phase;

        let app_state = match self.store.get_app_state().await {
            Ok(app_state) => app_state,
            Err(e) => {
                warn!(error = %e, "Failed to read app state, starting fresh");
                return LaunchState {
                    phase,
                    ..LaunchState::fallback()
                };
            }
        };
        let items = match self.store.get_items().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to read items, starting fresh");
                return LaunchState {
                    phase,
                    ..LaunchState::fallback()
                };
            }
        };

        let launch = LaunchState {
            phase,
            can_continue: app_state.has_active_game && !items.is_empty(),
            has_unarchived_progress: !items.is_empty(),
        };
        info!(
            phase = %launch.phase,
            can_continue = launch.can_continue,
            items = items.len(),
            "Session controller initialised"
        );
        launch
    }

    /// Starts a fresh session, optionally archiving the unarchived progress first.
    #[instrument(skip(self))]
    pub async fn start_new_game(&self, archive_current: bool) -> Result<StartOutcome, AppError> {
        let mut state = self.state.lock().await;
        if state.phase == SessionPhase::Archiving {
            return Err(AppError::InvalidState(
                "An archive is already in progress".to_string(),
            ));
        }

        let archived = if archive_current {
            let items = self.store.get_items().await?;
            self.archive_unarchived(&mut state, items).await?
        } else {
            None
        };

        self.store.clear_current_game_data().await?;
        state.enter_active_game();

        let token_balance = self.store.get_token_balance().await?;
        info!(
            archived = archived.as_ref().map(|a| a.id.as_str()),
            token_balance, "New game started"
        );
        Ok(StartOutcome {
            archived,
            token_balance,
        })
    }

    /// Resumes the persisted session. Continuing a game that is already
    /// running keeps its telemetry.
    #[instrument(skip(self))]
    pub async fn continue_game(&self) -> Result<ContinueOutcome, AppError> {
        let mut state = self.state.lock().await;
        if state.phase == SessionPhase::ActiveGame {
            let item_count = self.store.get_items().await?.len();
            let token_balance = self.store.get_token_balance().await?;
            debug!(item_count, token_balance, "Game already active");
            return Ok(ContinueOutcome {
                item_count,
                token_balance,
            });
        }
        if state.phase != SessionPhase::NoActiveGame {
            return Err(AppError::InvalidState(format!(
                "Cannot continue while in state: {}",
                state.phase
            )));
        }
        state.require_unarchived("continue")?;

        let app_state = self.store.get_app_state().await?;
        let items = self.store.get_items().await?;
        if !app_state.has_active_game || items.is_empty() {
            return Err(AppError::InvalidState(
                "There is no game to continue".to_string(),
            ));
        }

        self.store
            .save_app_state(&AppStateRecord::active_now())
            .await?;
        state.enter_active_game();

        let token_balance = self.store.get_token_balance().await?;
        info!(items = items.len(), token_balance, "Game continued");
        Ok(ContinueOutcome {
            item_count: items.len(),
            token_balance,
        })
    }

    /// Spends the generation cost on a new creature. Any failure after the
    /// deduction restores the previous balance before the error is returned.
    #[instrument(skip(self))]
    pub async fn generate(&self) -> Result<GenerateOutcome, AppError> {
        let mut state = self.state.lock().await;
        state.require_playable("generate")?;

        let cost = self.config.generation_cost;
        let balance = self.store.get_token_balance().await?;
        if balance < cost {
            return Err(AppError::InsufficientTokens {
                required: cost,
                available: balance,
            });
        }

        let charged = self.store.update_token_balance(balance - cost).await?;
        debug!(cost, charged, "Generation cost deducted");

        let item = match self.request_item().await {
            Ok(item) => item,
            Err(e) => return Err(self.refund(balance, e).await),
        };
        if let Err(e) = self.store.add_item(&item).await {
            return Err(self.refund(balance, e).await);
        }

        state.telemetry.record_roll(cost);
        info!(item_id = %item.id, rarity = %item.rarity, token_balance = charged, "Creature added to deck");
        Ok(GenerateOutcome {
            item,
            token_balance: charged,
        })
    }

    async fn request_item(&self) -> Result<Item, AppError> {
        let deadline = self.config.generator_timeout;
        match tokio::time::timeout(deadline, self.generator.generate()).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => {
                warn!(timeout_secs = deadline.as_secs(), "Generator call abandoned");
                Err(GeneratorError::Timeout(deadline.as_secs()).into())
            }
        }
    }

    /// Restores the pre-generation balance and hands back the error to report.
    async fn refund(&self, balance: i64, cause: AppError) -> AppError {
        warn!(error = %cause, balance, "Generation failed, restoring balance");
        match self.store.update_token_balance(balance).await {
            Ok(_) => cause,
            Err(rollback) => {
                error!(error = %rollback, cause = %cause, "Failed to restore balance after generation failure");
                rollback
            }
        }
    }

    /// Sells an owned creature back for its refund.
    #[instrument(skip(self))]
    pub async fn resell(&self, item_id: &str) -> Result<ResellOutcome, AppError> {
        let mut state = self.state.lock().await;
        state.require_playable("resell")?;

        let receipt = self.store.resell_item(item_id).await?;
        let held_for = Utc::now() - receipt.item.generated_at;
        let quick_flip = held_for <= self.config.quick_flip_window;
        state.telemetry.record_resell(receipt.rarity(), quick_flip);

        info!(
            item_id,
            refund = receipt.refund,
            token_balance = receipt.new_balance,
            quick_flip,
            "Creature resold"
        );
        Ok(ResellOutcome::new(receipt, quick_flip))
    }

    /// Archives the session (when it has items) and then resets it. The
    /// reset never runs if the archive write failed.
    #[instrument(skip(self))]
    pub async fn end_game_and_archive(&self) -> Result<EndGameOutcome, AppError> {
        let mut state = self.state.lock().await;
        state.require_active("end the game")?;

        let items = self.store.get_items().await?;
        let archived = match state.archived_id.clone() {
            // Archived on an earlier attempt whose reset failed
            Some(archive_id) => self.store.get_archived_game(&archive_id).await?,
            None => self.archive_unarchived(&mut state, items).await?,
        };

        self.store.reset_game_after_archive().await?;
        state.enter_no_active_game();

        info!(
            archived = archived.as_ref().map(|a| a.id.as_str()),
            "Game ended"
        );
        Ok(EndGameOutcome { archived })
    }

    /// Runs the archive sequence unless there is nothing to archive or the
    /// session was already archived.
    async fn archive_unarchived(
        &self,
        state: &mut SessionState,
        items: Vec<Item>,
    ) -> Result<Option<ArchivedGame>, AppError> {
        if items.is_empty() || state.archived_id.is_some() {
            return Ok(None);
        }

        let previous = state.phase;
        state.phase = SessionPhase::Archiving;
        let result = self.write_archive(state, items).await;
        state.phase = previous;

        let archive = result?;
        state.archived_id = Some(archive.id.clone());
        Ok(Some(archive))
    }

    async fn write_archive(
        &self,
        state: &SessionState,
        items: Vec<Item>,
    ) -> Result<ArchivedGame, AppError> {
        let token_balance = self.store.get_token_balance().await?;
        let quick_flip_bonus = state
            .telemetry
            .quick_flip_bonus(self.config.quick_flip_bonus);
        let score = self
            .scorer
            .compute(&items, token_balance, quick_flip_bonus);

        let snapshot = state.telemetry.snapshot(Utc::now());
        let badge = classify(&items, &snapshot);
        let telemetry = ArchiveTelemetry::new(snapshot, badge);

        let archive = self
            .store
            .archive_current_game(
                score,
                token_balance,
                items,
                telemetry,
                self.scorer.version().as_str(),
            )
            .await
            .map_err(|e| {
                warn!(error = %e, "Archive write failed, live deck kept");
                e
            })?;

        info!(archive_id = %archive.id, score, badge = %badge, "Session archived");
        Ok(archive)
    }

    /// Current deck with its provisional score.
    #[instrument(skip(self))]
    pub async fn deck_view(&self, order: DeckSortOrder) -> Result<DeckView, AppError> {
        let state = self.state.lock().await;
        let items = self.store.get_items().await?;
        let token_balance = self.store.get_token_balance().await?;
        let quick_flip_bonus = state
            .telemetry
            .quick_flip_bonus(self.config.quick_flip_bonus);
        let score = self
            .scorer
            .breakdown(&items, token_balance, quick_flip_bonus);

        Ok(DeckView {
            phase: state.phase,
            items: sort_items(&items, order),
            token_balance,
            generation_cost: self.config.generation_cost,
            can_generate: state.phase == SessionPhase::ActiveGame
                && token_balance >= self.config.generation_cost,
            score,
        })
    }

    /// Lists archives newest first. Does not touch the running game.
    #[instrument(skip(self))]
    pub async fn view_hall_of_fame(&self) -> Result<HallOfFameView, AppError> {
        let mut archives = self.store.get_archived_games().await?;
        archives.sort_by(|a, b| b.archive_date.cmp(&a.archive_date));

        let mut state = self.state.lock().await;
        state.viewing_hall_of_fame = true;
        debug!(entries = archives.len(), "Viewing hall of fame");

        Ok(HallOfFameView {
            entries: archives.into_iter().map(HallOfFameEntry::from).collect(),
            return_to: state.phase,
        })
    }

    /// Returns to whichever phase was current before viewing.
    pub async fn leave_hall_of_fame(&self) -> SessionPhase {
        let mut state = self.state.lock().await;
        state.viewing_hall_of_fame = false;
        state.phase
    }

    /// Requests a signed attestation for an archived score.
    #[instrument(skip(self))]
    pub async fn certify_archive(
        &self,
        archive_id: &str,
        subject: Option<String>,
    ) -> Result<CertifyScoreResponse, AppError> {
        let certifier = self.certifier.as_ref().ok_or_else(|| {
            AppError::InvalidState("Score certification is not configured".to_string())
        })?;
        let archive = self
            .store
            .get_archived_game(archive_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Archive {} not found", archive_id)))?;

        let response = certifier
            .certify(CertifyScoreRequest::for_archive(&archive, subject))
            .await?;
        info!(archive_id, certificate_id = %response.signed.payload.id, "Archive certified");
        Ok(response)
    }

    /// Wipes everything, archives included.
    #[instrument(skip(self))]
    pub async fn reset_entire_app_data(&self) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        self.store.reset_entire_app_data().await?;
        state.enter_no_active_game();
        state.viewing_hall_of_fame = false;

        warn!("All app data reset");
        Ok(())
    }
}
