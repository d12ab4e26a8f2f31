//! Loading game configuration (prompts, timing, optional level catalog) from TOML.
//!
//! See `AppConfig`, `Prompts` and `Timing` for the expected schema. Every
//! section is optional; missing values fall back to the defaults below.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Level;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub timing: Timing,
  /// Replacement catalog. Same schema as the built-in seeds (camelCase keys).
  #[serde(default)]
  pub levels: Vec<Level>,
}

/// Prompts used by the remote judge. Placeholders are `{topic}`, `{objective}` and `{code}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub validation_system: String,
  pub validation_user_template: String,
  pub hint_system: String,
  pub hint_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      validation_system: "Act as a strict Python interpreter and Tutor AI. Respond ONLY with strict JSON.".into(),
      validation_user_template: "Topic: {topic}\nMission Objective: {objective}\n\nUser Code:\n{code}\n\nAnalyze the user's code.\n1. Does it run without syntax errors?\n2. Does it fulfill the specific Mission Objective?\n3. Simulate the output.\n\nReturn JSON {\"correct\": boolean, \"feedback\": string, \"output\": string}.\nfeedback: brief and in character (System AI). If incorrect, give a helpful hint. If correct, give a \"System Restored\" style success message.\noutput: the simulated output of the code execution.".into(),
      hint_system: "You are the cyberpunk AI system of a Python training simulator. Never reveal the full solution.".into(),
      hint_user_template: "The user is stuck on a Python coding task.\nObjective: {objective}\nCurrent Code: {code}\n\nProvide a short, cryptic but helpful hint in the style of a cyberpunk AI system. Max 20 words.".into(),
    }
  }
}

/// Delays and bounds around the judge, in milliseconds.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Timing {
  /// Successful run -> level completion. Gives the learner time to read the feedback.
  pub completion_delay_ms: u64,
  /// Level completion -> back to the dashboard.
  pub return_delay_ms: u64,
  /// Upper bound on a single judge call.
  pub oracle_timeout_ms: u64,
}

impl Default for Timing {
  fn default() -> Self {
    Self { completion_delay_ms: 2000, return_delay_ms: 1000, oracle_timeout_ms: 20_000 }
  }
}

impl Timing {
  pub fn completion_delay(&self) -> Duration { Duration::from_millis(self.completion_delay_ms) }
  pub fn return_delay(&self) -> Duration { Duration::from_millis(self.return_delay_ms) }
  pub fn oracle_timeout(&self) -> Duration { Duration::from_millis(self.oracle_timeout_ms) }
}

/// Attempt to load `AppConfig` from GAME_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("GAME_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "pyquest_backend", %path, levels = cfg.levels.len(), "Loaded game config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "pyquest_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "pyquest_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}
