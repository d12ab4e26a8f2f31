//! Judge boundary: the `Oracle` transport seam and the normalizing `OracleClient`.
//!
//! Transports return raw, untrusted payloads and typed errors. The client
//! bounds every call with a timeout, checks the payload shape, and turns every
//! failure into the standard fallback verdict or hint. Callers never see an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::domain::ValidationResult;
use crate::error::OracleError;

pub const VALIDATION_FAILURE_FEEDBACK: &str =
  "SYSTEM ERROR: Connection to Neural Core unstable. Please retry validation.";
pub const VALIDATION_FAILURE_OUTPUT: &str = "Error: Connection Timeout";
pub const HINT_FALLBACK: &str = "System offline. Consult manual.";
pub const HINT_EMPTY: &str = "Hint unavailable.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidateRequest {
  pub code: String,
  pub objective: String,
  pub topic: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HintRequest {
  pub code: String,
  pub objective: String,
}

/// A judge transport. Implementations do no retries and no shape checking.
pub trait Oracle: Send + Sync {
  fn name(&self) -> &'static str;

  /// Returns the judge's reply as an untyped JSON payload.
  fn validate<'a>(&'a self, req: &'a ValidateRequest) -> BoxFuture<'a, Result<Value, OracleError>>;

  fn hint<'a>(&'a self, req: &'a HintRequest) -> BoxFuture<'a, Result<String, OracleError>>;
}

/// Stand-in used when no judge is configured. Every call fails.
pub struct OfflineOracle;

impl Oracle for OfflineOracle {
  fn name(&self) -> &'static str { "offline" }

  fn validate<'a>(&'a self, _req: &'a ValidateRequest) -> BoxFuture<'a, Result<Value, OracleError>> {
    Box::pin(async { Err(OracleError::Unavailable) })
  }

  fn hint<'a>(&'a self, _req: &'a HintRequest) -> BoxFuture<'a, Result<String, OracleError>> {
    Box::pin(async { Err(OracleError::Unavailable) })
  }
}

/// Check an untyped reply against the verdict shape. All fields are required.
pub fn parse_verdict(payload: Value) -> Result<ValidationResult, OracleError> {
  serde_json::from_value::<ValidationResult>(payload).map_err(|e| OracleError::MalformedReply(e.to_string()))
}

pub fn failure_result() -> ValidationResult {
  ValidationResult {
    correct: false,
    feedback: VALIDATION_FAILURE_FEEDBACK.into(),
    output: VALIDATION_FAILURE_OUTPUT.into(),
  }
}

#[derive(Clone)]
pub struct OracleClient {
  oracle: Arc<dyn Oracle>,
  timeout: Duration,
}

impl OracleClient {
  pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration) -> Self {
    Self { oracle, timeout }
  }

  /// Judge a submission. Never fails: transport, timeout and shape errors
  /// become `failure_result()`.
  #[instrument(level = "info", skip_all, fields(oracle = self.oracle.name(), topic = %topic, code_len = code.len()))]
  pub async fn validate(&self, code: &str, objective: &str, topic: &str) -> ValidationResult {
    let req = ValidateRequest { code: code.into(), objective: objective.into(), topic: topic.into() };
    let start = Instant::now();
    let reply = match tokio::time::timeout(self.timeout, self.oracle.validate(&req)).await {
      Ok(r) => r,
      Err(_) => Err(OracleError::Timeout(self.timeout)),
    };
    match reply.and_then(parse_verdict) {
      Ok(v) => {
        info!(target: "oracle", elapsed = ?start.elapsed(), correct = v.correct, output_len = v.output.len(), "Verdict received");
        v
      }
      Err(e) => {
        warn!(target: "oracle", elapsed = ?start.elapsed(), error = %e, "Validation failed; returning system error verdict");
        failure_result()
      }
    }
  }

  /// Fetch a short hint. Never fails: errors become `HINT_FALLBACK`,
  /// an empty reply becomes `HINT_EMPTY`.
  #[instrument(level = "info", skip_all, fields(oracle = self.oracle.name(), code_len = code.len()))]
  pub async fn get_hint(&self, code: &str, objective: &str) -> String {
    let req = HintRequest { code: code.into(), objective: objective.into() };
    let reply = match tokio::time::timeout(self.timeout, self.oracle.hint(&req)).await {
      Ok(r) => r,
      Err(_) => Err(OracleError::Timeout(self.timeout)),
    };
    match reply {
      Ok(text) => {
        let text = text.trim();
        debug!(target: "oracle", hint_len = text.len(), "Hint received");
        if text.is_empty() { HINT_EMPTY.to_string() } else { text.to_string() }
      }
      Err(e) => {
        warn!(target: "oracle", error = %e, "Hint request failed; returning fallback");
        HINT_FALLBACK.to_string()
      }
    }
  }
}

#[cfg(test)]
pub mod testing {
  //! Scripted judge for tests: fixed replies, call counters, optional gate.

  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  use tokio::sync::Semaphore;

  use super::*;

  pub struct ScriptedOracle {
    verdict: Mutex<Result<Value, String>>,
    hint: Mutex<Result<String, String>>,
    /// When set, each call waits for one permit before replying.
    gate: Option<Semaphore>,
    pub validate_calls: AtomicUsize,
    pub hint_calls: AtomicUsize,
  }

  impl ScriptedOracle {
    pub fn new(verdict: Value) -> Self {
      Self {
        verdict: Mutex::new(Ok(verdict)),
        hint: Mutex::new(Ok("Seek the print() conduit.".into())),
        gate: None,
        validate_calls: AtomicUsize::new(0),
        hint_calls: AtomicUsize::new(0),
      }
    }

    pub fn correct() -> Self {
      Self::new(serde_json::json!({ "correct": true, "feedback": "System Restored.", "output": "Active" }))
    }

    pub fn incorrect() -> Self {
      Self::new(serde_json::json!({ "correct": false, "feedback": "Variable `status` missing.", "output": "" }))
    }

    pub fn gated(mut self) -> Self {
      self.gate = Some(Semaphore::new(0));
      self
    }

    pub fn failing_hint(self) -> Self {
      *self.hint.lock().unwrap() = Err("boom".into());
      self
    }

    pub fn set_verdict(&self, verdict: Value) {
      *self.verdict.lock().unwrap() = Ok(verdict);
    }

    pub fn set_hint(&self, text: &str) {
      *self.hint.lock().unwrap() = Ok(text.into());
    }

    pub fn set_transport_error(&self) {
      *self.verdict.lock().unwrap() = Err("connection reset".into());
    }

    /// Let one gated call through.
    pub fn release(&self) {
      if let Some(g) = &self.gate {
        g.add_permits(1);
      }
    }

    pub fn validations(&self) -> usize {
      self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn hints(&self) -> usize {
      self.hint_calls.load(Ordering::SeqCst)
    }

    async fn wait_gate(&self) {
      if let Some(g) = &self.gate {
        if let Ok(permit) = g.acquire().await {
          permit.forget();
        }
      }
    }
  }

  impl Oracle for ScriptedOracle {
    fn name(&self) -> &'static str { "scripted" }

    fn validate<'a>(&'a self, _req: &'a ValidateRequest) -> BoxFuture<'a, Result<Value, OracleError>> {
      Box::pin(async move {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        let reply = self.verdict.lock().unwrap().clone();
        reply.map_err(OracleError::Transport)
      })
    }

    fn hint<'a>(&'a self, _req: &'a HintRequest) -> BoxFuture<'a, Result<String, OracleError>> {
      Box::pin(async move {
        self.hint_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        let reply = self.hint.lock().unwrap().clone();
        reply.map_err(OracleError::Transport)
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::testing::ScriptedOracle;
  use super::*;

  fn client(oracle: ScriptedOracle) -> (Arc<ScriptedOracle>, OracleClient) {
    let oracle = Arc::new(oracle);
    let client = OracleClient::new(oracle.clone(), Duration::from_secs(5));
    (oracle, client)
  }

  #[test]
  fn verdict_requires_every_field() {
    assert!(parse_verdict(json!({ "correct": true, "feedback": "ok", "output": "Active" })).is_ok());
    assert!(parse_verdict(json!({ "correct": true, "feedback": "ok" })).is_err());
    assert!(parse_verdict(json!({ "correct": "yes", "feedback": "ok", "output": "" })).is_err());
    assert!(parse_verdict(json!("System Restored")).is_err());
  }

  #[tokio::test]
  async fn passes_through_a_well_formed_verdict() {
    let (oracle, client) = client(ScriptedOracle::correct());
    let v = client.validate("status = \"Active\"\nprint(status)", "print status", "Variables & Print").await;
    assert!(v.correct);
    assert_eq!(v.output, "Active");
    assert_eq!(oracle.validations(), 1);
  }

  #[tokio::test]
  async fn transport_error_becomes_failure_verdict() {
    let (oracle, client) = client(ScriptedOracle::correct());
    oracle.set_transport_error();
    let v = client.validate("x", "o", "t").await;
    assert_eq!(v, failure_result());
    assert!(!v.feedback.is_empty() && !v.output.is_empty());
  }

  #[tokio::test]
  async fn malformed_reply_becomes_failure_verdict() {
    let (_oracle, client) = client(ScriptedOracle::new(json!({ "verdict": "pass" })));
    assert_eq!(client.validate("x", "o", "t").await, failure_result());
  }

  #[tokio::test(start_paused = true)]
  async fn hung_judge_times_out() {
    let (oracle, client) = client(ScriptedOracle::correct().gated());
    let v = client.validate("x", "o", "t").await;
    assert_eq!(v, failure_result());
    assert_eq!(oracle.validations(), 1);
    assert_eq!(client.get_hint("x", "o").await, HINT_FALLBACK);
  }

  #[tokio::test]
  async fn hint_fallbacks() {
    let (_oracle, client) = client(ScriptedOracle::correct().failing_hint());
    assert_eq!(client.get_hint("x", "o").await, HINT_FALLBACK);

    let offline = OracleClient::new(Arc::new(OfflineOracle), Duration::from_secs(1));
    assert_eq!(offline.get_hint("x", "o").await, HINT_FALLBACK);
    assert_eq!(offline.validate("x", "o", "t").await, failure_result());
  }

  #[tokio::test]
  async fn blank_hint_is_reported_unavailable() {
    let (oracle, client) = client(ScriptedOracle::correct());
    oracle.set_hint("   ");
    assert_eq!(client.get_hint("x", "o").await, HINT_EMPTY);
  }
}
