//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Selecting/exiting levels and editing code
//!   - Running code through the judge (single-flight per play session)
//!   - Hints (fetched once per play session, then served from cache)
//!   - Completion and return-to-dashboard timers tied to the play session id
//!
//! The session lock is never held across a judge call or a timer sleep.
//! Every continuation re-checks the play session id before touching state.

use tokio::task::AbortHandle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::GameError;
use crate::play::{HintStep, RunStart};
use crate::protocol::{snapshot, GameSnapshot, HintOut, HintStatus, RunOut, RunStatus};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn select_level(state: &AppState, level_id: u32) -> Result<GameSnapshot, GameError> {
  let snap = {
    let mut game = state.game.lock().await;
    game.select_level(level_id)?;
    snapshot(&game)
  };
  state.notify();
  Ok(snap)
}

#[instrument(level = "debug", skip(state, code), fields(code_len = code.len()))]
pub async fn edit_code(state: &AppState, code: String) -> Result<(), GameError> {
  {
    let mut game = state.game.lock().await;
    game.play_mut().ok_or(GameError::NotPlaying)?.edit_code(code);
  }
  state.notify();
  Ok(())
}

/// Leave the level now. Pending verdicts, hints and timers for it are dropped.
#[instrument(level = "info", skip(state))]
pub async fn exit_level(state: &AppState) -> Result<GameSnapshot, GameError> {
  let snap = {
    let mut game = state.game.lock().await;
    let mut discarded = game.exit_level()?;
    discarded.cancel_timer();
    snapshot(&game)
  };
  state.notify();
  Ok(snap)
}

pub async fn current_snapshot(state: &AppState) -> GameSnapshot {
  let game = state.game.lock().await;
  snapshot(&game)
}

/// Run the current buffer through the judge. Single-flight per play session.
pub async fn run_code(state: &AppState) -> Result<RunOut, GameError> {
  let start = claim_run(state).await?;
  Ok(judge_run(state, start).await)
}

/// First half of a run: claims the single-flight slot under the lock.
/// Only `RunStart::Submit` needs a judge call; the rest resolve at once.
#[instrument(level = "info", skip(state))]
pub async fn claim_run(state: &AppState) -> Result<RunStart, GameError> {
  let start = {
    let mut game = state.game.lock().await;
    let play = game.play_mut().ok_or(GameError::NotPlaying)?;
    let start = play.begin_run();
    match &start {
      RunStart::Submit(_) => {}
      RunStart::AlreadySubmitting => {
        debug!(target: "game", session_id = %play.id, "Run ignored: verdict already outstanding");
      }
      RunStart::LevelCleared => {
        debug!(target: "game", session_id = %play.id, "Run ignored: level already cleared");
      }
    }
    start
  };
  if matches!(start, RunStart::Submit(_)) {
    state.notify();
  }
  Ok(start)
}

/// Second half of a run: waits for the verdict with the lock released and
/// applies it if the play session is still the one that submitted.
#[instrument(level = "info", skip_all)]
pub async fn judge_run(state: &AppState, start: RunStart) -> RunOut {
  let submission = match start {
    RunStart::Submit(s) => s,
    RunStart::AlreadySubmitting => return RunOut { status: RunStatus::AlreadySubmitting, result: None },
    RunStart::LevelCleared => return RunOut { status: RunStatus::LevelCleared, result: None },
  };

  let result = state.oracle.validate(&submission.code, &submission.objective, &submission.topic).await;

  {
    let mut game = state.game.lock().await;
    let Some(play) = game.play_for(submission.session_id) else {
      info!(target: "game", session_id = %submission.session_id, "Verdict arrived after the level was left; discarded");
      return RunOut { status: RunStatus::Discarded, result: None };
    };
    let level_id = play.level.id;
    if play.finish_run(result.clone()) {
      let timer = schedule_completion(state, submission.session_id, play.level.xp_reward);
      play.set_timer(timer);
      info!(target: "game", level_id, session_id = %submission.session_id, "Run passed; completion scheduled");
    } else {
      info!(target: "game", level_id, session_id = %submission.session_id, "Run failed");
    }
  }
  state.notify();
  RunOut { status: RunStatus::Judged, result: Some(result) }
}

/// Reveal the hint for the current play session, fetching it at most once.
pub async fn request_hint(state: &AppState) -> Result<HintOut, GameError> {
  let step = claim_hint(state).await?;
  Ok(resolve_hint(state, step).await)
}

/// First half of a hint request, under the lock. Only `HintStep::Fetch`
/// needs a judge call.
#[instrument(level = "info", skip(state))]
pub async fn claim_hint(state: &AppState) -> Result<HintStep, GameError> {
  let step = {
    let mut game = state.game.lock().await;
    game.play_mut().ok_or(GameError::NotPlaying)?.begin_hint()
  };
  if matches!(step, HintStep::Cached(_)) {
    state.notify();
  }
  Ok(step)
}

#[instrument(level = "info", skip_all)]
pub async fn resolve_hint(state: &AppState, step: HintStep) -> HintOut {
  let (session_id, code, objective) = match step {
    HintStep::Cached(text) => return HintOut { status: HintStatus::Revealed, text: Some(text) },
    HintStep::Pending => return HintOut { status: HintStatus::Pending, text: None },
    HintStep::Fetch { session_id, code, objective } => (session_id, code, objective),
  };

  let text = state.oracle.get_hint(&code, &objective).await;

  {
    let mut game = state.game.lock().await;
    let Some(play) = game.play_for(session_id) else {
      info!(target: "game", %session_id, "Hint arrived after the level was left; discarded");
      return HintOut { status: HintStatus::Discarded, text: None };
    };
    play.store_hint(text.clone());
  }
  state.notify();
  HintOut { status: HintStatus::Revealed, text: Some(text) }
}

/// After `completion_delay`, credit the level; then after `return_delay`, go
/// back to the dashboard. Both steps are no-ops if the session has changed.
fn schedule_completion(state: &AppState, session_id: Uuid, xp_reward: u32) -> AbortHandle {
  let state = state.clone();
  let task = tokio::spawn(async move {
    tokio::time::sleep(state.timing.completion_delay()).await;
    {
      let mut game = state.game.lock().await;
      if game.play_for(session_id).is_none() {
        debug!(target: "game", %session_id, "Completion timer fired for a stale session");
        return;
      }
      if game.complete_level(xp_reward).is_err() {
        return;
      }
      let timer = schedule_return(&state, session_id);
      if let Some(play) = game.play_for(session_id) {
        play.set_timer(timer);
      }
    }
    state.notify();
  });
  task.abort_handle()
}

fn schedule_return(state: &AppState, session_id: Uuid) -> AbortHandle {
  let state = state.clone();
  let task = tokio::spawn(async move {
    tokio::time::sleep(state.timing.return_delay()).await;
    let returned = state.game.lock().await.return_to_dashboard(session_id);
    if returned {
      info!(target: "game", %session_id, "Returned to dashboard");
      state.notify();
    }
  });
  task.abort_handle()
}
