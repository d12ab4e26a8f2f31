//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Difficulty, Level, UserState, ValidationResult};
use crate::play::PlaySession;
use crate::session::{Screen, Session};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Snapshot,
    SelectLevel {
        #[serde(rename = "levelId")]
        level_id: u32,
    },
    EditCode {
        code: String,
    },
    Run,
    Hint,
    ExitLevel,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Snapshot {
        snapshot: GameSnapshot,
    },
    RunResult(RunOut),
    Hint(HintOut),
    Error {
        code: String,
        message: String,
    },
}

/// Level as shown on the map: seed data plus derived lock/completion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelOut {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub xp_reward: u32,
    pub locked: bool,
    pub completed: bool,
    pub mission_objective: String,
    pub starter_code: String,
    pub hints: Vec<String>,
}

impl LevelOut {
    pub fn new(l: &Level, locked: bool, completed: bool) -> Self {
        Self {
            id: l.id,
            title: l.title.clone(),
            description: l.description.clone(),
            topic: l.topic.clone(),
            difficulty: l.difficulty,
            xp_reward: l.xp_reward,
            locked,
            completed,
            mission_objective: l.mission_objective.clone(),
            starter_code: l.starter_code.clone(),
            hints: l.hints.clone(),
        }
    }
}

/// The play screen. `hint` is only present once revealed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayOut {
    pub session_id: Uuid,
    pub level_id: u32,
    pub code: String,
    pub output: String,
    pub result: Option<ValidationResult>,
    pub hint: Option<String>,
    pub is_submitting: bool,
    pub cleared: bool,
}

impl From<&PlaySession> for PlayOut {
    fn from(p: &PlaySession) -> Self {
        Self {
            session_id: p.id,
            level_id: p.level.id,
            code: p.code_buffer.clone(),
            output: p.output.clone(),
            result: p.last_result.clone(),
            hint: if p.hint_revealed { p.hint_text.clone() } else { None },
            is_submitting: p.is_submitting,
            cleared: p.cleared,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScreenOut {
    Dashboard,
    Playing,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub screen: ScreenOut,
    pub profile: UserState,
    pub levels: Vec<LevelOut>,
    pub play: Option<PlayOut>,
}

pub fn levels_out(s: &Session) -> Vec<LevelOut> {
    s.levels()
        .map(|(l, locked)| LevelOut::new(l, locked, s.is_completed(l.id)))
        .collect()
}

pub fn snapshot(s: &Session) -> GameSnapshot {
    let screen = match s.screen() {
        Screen::Dashboard => ScreenOut::Dashboard,
        Screen::Playing(_) => ScreenOut::Playing,
    };
    GameSnapshot {
        screen,
        profile: s.user().clone(),
        levels: levels_out(s),
        play: s.play().map(PlayOut::from),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct SelectIn {
    #[serde(rename = "levelId")]
    pub level_id: u32,
}

#[derive(Debug, Deserialize)]
pub struct CodeIn {
    pub code: String,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Judged,
    AlreadySubmitting,
    LevelCleared,
    /// The level was exited before the verdict arrived.
    Discarded,
}

#[derive(Debug, Serialize)]
pub struct RunOut {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ValidationResult>,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HintStatus {
    Revealed,
    Pending,
    Discarded,
}

#[derive(Debug, Serialize)]
pub struct HintOut {
    pub status: HintStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::catalog::LevelCatalog;

    #[test]
    fn parses_client_messages() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"select_level","levelId":2}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::SelectLevel { level_id: 2 }));
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"edit_code","code":"x = 1"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::EditCode { .. }));
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"exit_level"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::ExitLevel));
    }

    #[test]
    fn run_result_is_flattened_into_the_tagged_message() {
        let msg = ServerWsMessage::RunResult(RunOut { status: RunStatus::AlreadySubmitting, result: None });
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v, json!({ "type": "run_result", "status": "already_submitting" }));
    }

    #[test]
    fn snapshot_uses_camel_case_and_derived_locks() {
        let mut s = Session::new(Arc::new(LevelCatalog::seeded()));
        s.select_level(1).unwrap();
        let v = serde_json::to_value(snapshot(&s)).unwrap();
        assert_eq!(v["screen"], "playing");
        assert_eq!(v["profile"]["completedLevels"], json!([]));
        assert_eq!(v["levels"][0]["locked"], false);
        assert_eq!(v["levels"][1]["locked"], true);
        assert_eq!(v["levels"][0]["xpReward"], 100);
        assert_eq!(v["play"]["levelId"], 1);
        assert_eq!(v["play"]["hint"], serde_json::Value::Null);
    }
}
