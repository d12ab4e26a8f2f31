//! Domain models used by the backend: levels, learner profile, and judge verdicts.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How hard a level is. Purely informational; it does not affect XP.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Difficulty {
  Novice,
  Adept,
  Expert,
}

/// One static coding challenge. Owned by the level catalog and shared by `Arc`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Level {
  pub id: u32,
  pub title: String,
  pub description: String,
  pub topic: String,
  pub difficulty: Difficulty,
  pub xp_reward: u32,
  /// Seed display hint only. The unlock rule in `session` is authoritative.
  #[serde(default)]
  pub locked: bool,
  /// Sent verbatim to the judge.
  pub mission_objective: String,
  #[serde(default)]
  pub starter_code: String,
  #[serde(default)]
  pub hints: Vec<String>,
}

/// Verdict returned by the judge. All three fields are required on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
  pub correct: bool,
  pub feedback: String,
  pub output: String,
}

/// Learner profile for the lifetime of the process.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
  pub xp: u64,
  /// Profile tier. Reserved, no rule changes it.
  pub level: u32,
  /// Reserved, no rule changes it.
  pub streak: u32,
  pub completed_levels: BTreeSet<u32>,
}

impl Default for UserState {
  fn default() -> Self {
    Self { xp: 0, level: 1, streak: 0, completed_levels: BTreeSet::new() }
  }
}
