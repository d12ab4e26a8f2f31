//! Per-level play session: code buffer, last verdict, cached hint, and the
//! single-flight guards around judge calls.
//!
//! Everything here is synchronous. The async side (calling the judge,
//! timers) lives in `logic` and re-enters through `finish_run` / `store_hint`.

use std::sync::Arc;

use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::domain::{Level, ValidationResult};

/// Shown in the output pane while a verdict is outstanding.
pub const RUNNING_OUTPUT: &str = "Initializing execution context...\nAnalyzing syntax...\n";

/// Snapshot of what gets sent to the judge. Carries the session id so the
/// reply can be matched against whatever session is active when it lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
  pub session_id: Uuid,
  pub code: String,
  pub objective: String,
  pub topic: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStart {
  Submit(Submission),
  /// A verdict is already outstanding.
  AlreadySubmitting,
  /// A previous run passed; completion is scheduled.
  LevelCleared,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HintStep {
  Cached(String),
  Fetch { session_id: Uuid, code: String, objective: String },
  /// First fetch still outstanding.
  Pending,
}

#[derive(Debug)]
pub struct PlaySession {
  pub id: Uuid,
  pub level: Arc<Level>,
  pub code_buffer: String,
  pub output: String,
  pub last_result: Option<ValidationResult>,
  pub hint_text: Option<String>,
  pub hint_revealed: bool,
  pub is_submitting: bool,
  hint_pending: bool,
  /// Set once a run passes. The session is then waiting on its timers.
  pub cleared: bool,
  timer: Option<AbortHandle>,
}

impl PlaySession {
  pub fn enter(level: Arc<Level>) -> Self {
    Self {
      id: Uuid::new_v4(),
      code_buffer: level.starter_code.clone(),
      level,
      output: String::new(),
      last_result: None,
      hint_text: None,
      hint_revealed: false,
      is_submitting: false,
      hint_pending: false,
      cleared: false,
      timer: None,
    }
  }

  /// Replace the buffer verbatim. No checks.
  pub fn edit_code(&mut self, text: String) {
    self.code_buffer = text;
  }

  pub fn begin_run(&mut self) -> RunStart {
    if self.is_submitting {
      return RunStart::AlreadySubmitting;
    }
    if self.cleared {
      return RunStart::LevelCleared;
    }
    self.is_submitting = true;
    self.last_result = None;
    self.output = RUNNING_OUTPUT.to_string();
    RunStart::Submit(Submission {
      session_id: self.id,
      code: self.code_buffer.clone(),
      objective: self.level.mission_objective.clone(),
      topic: self.level.topic.clone(),
    })
  }

  /// Store the verdict. Returns true when the level was just cleared.
  pub fn finish_run(&mut self, result: ValidationResult) -> bool {
    self.is_submitting = false;
    self.output = result.output.clone();
    let passed = result.correct;
    self.last_result = Some(result);
    if passed {
      self.cleared = true;
    }
    passed
  }

  pub fn begin_hint(&mut self) -> HintStep {
    if let Some(text) = &self.hint_text {
      self.hint_revealed = true;
      return HintStep::Cached(text.clone());
    }
    if self.hint_pending {
      return HintStep::Pending;
    }
    self.hint_pending = true;
    HintStep::Fetch {
      session_id: self.id,
      code: self.code_buffer.clone(),
      objective: self.level.mission_objective.clone(),
    }
  }

  pub fn store_hint(&mut self, text: String) {
    self.hint_pending = false;
    self.hint_revealed = true;
    self.hint_text = Some(text);
  }

  /// Replace the pending timer handle. The previous one is dropped, not aborted.
  pub fn set_timer(&mut self, handle: AbortHandle) {
    self.timer = Some(handle);
  }

  pub fn cancel_timer(&mut self) {
    if let Some(handle) = self.timer.take() {
      handle.abort();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::LevelCatalog;

  fn session() -> PlaySession {
    let catalog = LevelCatalog::seeded();
    PlaySession::enter(catalog.get(2).unwrap().clone())
  }

  fn verdict(correct: bool) -> ValidationResult {
    ValidationResult { correct, feedback: "fb".into(), output: "100".into() }
  }

  #[test]
  fn enter_loads_starter_code() {
    let s = session();
    assert_eq!(s.code_buffer, "power = 50\n# Calculate total_output below\n");
    assert!(s.last_result.is_none());
    assert!(s.hint_text.is_none());
    assert!(!s.is_submitting);
  }

  #[test]
  fn run_is_single_flight() {
    let mut s = session();
    s.edit_code("total_output = power * 2\nprint(total_output)".into());
    let RunStart::Submit(sub) = s.begin_run() else { panic!("expected a submission") };
    assert_eq!(sub.session_id, s.id);
    assert!(sub.code.starts_with("total_output"));
    assert_eq!(sub.topic, "Basic Arithmetic");
    assert_eq!(s.output, RUNNING_OUTPUT);
    assert_eq!(s.begin_run(), RunStart::AlreadySubmitting);
  }

  #[test]
  fn failed_run_allows_retry() {
    let mut s = session();
    assert!(matches!(s.begin_run(), RunStart::Submit(_)));
    assert!(!s.finish_run(verdict(false)));
    assert_eq!(s.output, "100");
    assert!(matches!(s.begin_run(), RunStart::Submit(_)));
    // Starting a new run clears the stale verdict.
    assert!(s.last_result.is_none());
  }

  #[test]
  fn passing_run_clears_level_once() {
    let mut s = session();
    assert!(matches!(s.begin_run(), RunStart::Submit(_)));
    assert!(s.finish_run(verdict(true)));
    assert_eq!(s.begin_run(), RunStart::LevelCleared);
    assert!(s.last_result.as_ref().unwrap().correct);
  }

  #[test]
  fn hint_is_fetched_once() {
    let mut s = session();
    assert!(matches!(s.begin_hint(), HintStep::Fetch { .. }));
    assert_eq!(s.begin_hint(), HintStep::Pending);
    s.store_hint("Multiply.".into());
    assert!(s.hint_revealed);
    assert_eq!(s.begin_hint(), HintStep::Cached("Multiply.".into()));
  }
}
