use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

use crate::{
    certify::CertifyScoreResponse,
    deck::DeckSortOrder,
    game::{
        ContinueOutcome, DeckView, EndGameOutcome, GenerateOutcome, HallOfFameView, LaunchState,
        ResellOutcome, SessionPhase, StartOutcome,
    },
    shared::{AppError, AppState},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameRequest {
    #[serde(default)]
    pub archive_current: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeckQuery {
    pub sort: Option<DeckSortOrder>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CertifyRequest {
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// Builds the HTTP surface over the session controller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/launch", get(launch))
        .route("/api/deck", get(deck))
        .route("/api/game/new", post(new_game))
        .route("/api/game/continue", post(continue_game))
        .route("/api/game/generate", post(generate))
        .route("/api/game/resell/:id", post(resell))
        .route("/api/game/end", post(end_game))
        .route("/api/hall-of-fame", get(hall_of_fame))
        .route("/api/hall-of-fame/leave", post(leave_hall_of_fame))
        .route("/api/hall-of-fame/:id/certify", post(certify))
        .route("/api/reset", post(reset))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/launch
#[instrument(name = "launch", skip(state))]
pub async fn launch(State(state): State<AppState>) -> Json<LaunchState> {
    Json(state.controller.initialize().await)
}

/// GET /api/deck?sort=rarity-desc
#[instrument(name = "deck", skip(state))]
pub async fn deck(
    State(state): State<AppState>,
    Query(query): Query<DeckQuery>,
) -> Result<Json<DeckView>, AppError> {
    let view = state
        .controller
        .deck_view(query.sort.unwrap_or_default())
        .await?;
    Ok(Json(view))
}

/// POST /api/game/new
///
/// Body is optional; `{"archiveCurrent": true}` archives unfinished progress first.
#[instrument(name = "new_game", skip(state))]
pub async fn new_game(
    State(state): State<AppState>,
    request: Option<Json<NewGameRequest>>,
) -> Result<Json<StartOutcome>, AppError> {
    let archive_current = request.map(|Json(r)| r.archive_current).unwrap_or(false);
    info!(archive_current, "Starting new game");
    Ok(Json(state.controller.start_new_game(archive_current).await?))
}

/// POST /api/game/continue
#[instrument(name = "continue_game", skip(state))]
pub async fn continue_game(
    State(state): State<AppState>,
) -> Result<Json<ContinueOutcome>, AppError> {
    Ok(Json(state.controller.continue_game().await?))
}

/// POST /api/game/generate
#[instrument(name = "generate", skip(state))]
pub async fn generate(State(state): State<AppState>) -> Result<Json<GenerateOutcome>, AppError> {
    Ok(Json(state.controller.generate().await?))
}

/// POST /api/game/resell/:id
#[instrument(name = "resell", skip(state))]
pub async fn resell(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<ResellOutcome>, AppError> {
    Ok(Json(state.controller.resell(&item_id).await?))
}

/// POST /api/game/end
#[instrument(name = "end_game", skip(state))]
pub async fn end_game(State(state): State<AppState>) -> Result<Json<EndGameOutcome>, AppError> {
    Ok(Json(state.controller.end_game_and_archive().await?))
}

/// GET /api/hall-of-fame
#[instrument(name = "hall_of_fame", skip(state))]
pub async fn hall_of_fame(
    State(state): State<AppState>,
) -> Result<Json<HallOfFameView>, AppError> {
    Ok(Json(state.controller.view_hall_of_fame().await?))
}

/// POST /api/hall-of-fame/leave
#[instrument(name = "leave_hall_of_fame", skip(state))]
pub async fn leave_hall_of_fame(State(state): State<AppState>) -> Json<SessionPhase> {
    Json(state.controller.leave_hall_of_fame().await)
}

/// POST /api/hall-of-fame/:id/certify
#[instrument(name = "certify", skip(state))]
pub async fn certify(
    State(state): State<AppState>,
    Path(archive_id): Path<String>,
    request: Option<Json<CertifyRequest>>,
) -> Result<Json<CertifyScoreResponse>, AppError> {
    let subject = request.and_then(|Json(r)| r.subject);
    Ok(Json(
        state.controller.certify_archive(&archive_id, subject).await?,
    ))
}

/// POST /api/reset
///
/// Irreversible; only honoured with `{"confirm": true}`.
#[instrument(name = "reset", skip(state))]
pub async fn reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<LaunchState>, AppError> {
    if !request.confirm {
        return Err(AppError::Validation(
            "Resetting all data requires confirmation".to_string(),
        ));
    }
    state.controller.reset_entire_app_data().await?;
    Ok(Json(state.controller.initialize().await))
}
