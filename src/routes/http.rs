//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use axum::{
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::error::GameError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

impl IntoResponse for GameError {
  fn into_response(self) -> Response {
    let status = match self {
      GameError::UnknownLevel(_) => StatusCode::NOT_FOUND,
      GameError::LevelLocked(_) => StatusCode::FORBIDDEN,
      GameError::NotPlaying | GameError::AlreadyPlaying { .. } => StatusCode::CONFLICT,
    };
    let body = ErrorOut { code: self.code().into(), message: self.to_string() };
    (status, Json(body)).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_levels(State(state): State<AppState>) -> impl IntoResponse {
  let game = state.game.lock().await;
  Json(levels_out(&game))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_state(State(state): State<AppState>) -> impl IntoResponse {
  Json(current_snapshot(&state).await)
}

#[instrument(level = "info", skip(state, body), fields(level_id = body.level_id))]
pub async fn http_post_play(
  State(state): State<AppState>,
  Json(body): Json<SelectIn>,
) -> Result<Json<GameSnapshot>, GameError> {
  let snap = select_level(&state, body.level_id).await?;
  info!(target: "game", level_id = body.level_id, "HTTP level selected");
  Ok(Json(snap))
}

#[instrument(level = "debug", skip(state, body), fields(code_len = body.code.len()))]
pub async fn http_put_code(
  State(state): State<AppState>,
  Json(body): Json<CodeIn>,
) -> Result<StatusCode, GameError> {
  edit_code(&state, body.code).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_run(State(state): State<AppState>) -> Result<Json<RunOut>, GameError> {
  let out = run_code(&state).await?;
  info!(target: "game", status = ?out.status, correct = ?out.result.as_ref().map(|r| r.correct), "HTTP run evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_hint(State(state): State<AppState>) -> Result<Json<HintOut>, GameError> {
  let out = request_hint(&state).await?;
  info!(target: "game", status = ?out.status, "HTTP hint served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_play(State(state): State<AppState>) -> Result<Json<GameSnapshot>, GameError> {
  Ok(Json(exit_level(&state).await?))
}
