//! Error types for game transitions, the judge boundary, and seed data.
//!
//! `OracleError` never escapes `oracle::OracleClient`; callers above it only
//! ever see a normalized `ValidationResult` or hint string.

use std::time::Duration;

/// Rejected state-machine requests. None of these mutate `UserState`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Unknown level: {0}")]
    UnknownLevel(u32),

    #[error("Level {0} is locked: complete level {prev} first", prev = .0.saturating_sub(1))]
    LevelLocked(u32),

    #[error("No level is being played")]
    NotPlaying,

    #[error("Level {level_id} is already being played; exit it first")]
    AlreadyPlaying { level_id: u32 },
}

impl GameError {
    /// Short machine-readable code used in error payloads.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownLevel(_) => "unknown_level",
            Self::LevelLocked(_) => "level_locked",
            Self::NotPlaying => "not_playing",
            Self::AlreadyPlaying { .. } => "already_playing",
        }
    }
}

/// Failure modes of a single judge call.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    #[error("judge unavailable (no API key configured)")]
    Unavailable,
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Violations of the level seed schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("level catalog is empty")]
    Empty,

    #[error("level ids must be dense from 1: expected {expected}, found {found}")]
    NonDenseIds { expected: u32, found: u32 },

    #[error("level {0} has a zero xpReward")]
    ZeroReward(u32),
}
