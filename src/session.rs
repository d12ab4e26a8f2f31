//! Session state machine: which screen is active, the learner profile, and
//! the unlock and XP rules.
//!
//! Transitions:
//! - `Dashboard` --select_level--> `Playing`
//! - `Playing` --complete_level--> `Playing` (cleared, XP awarded)
//! - `Playing` --return_to_dashboard / exit_level--> `Dashboard`
//!
//! Rejected transitions return `GameError` and leave `UserState` untouched.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::catalog::LevelCatalog;
use crate::domain::{Level, UserState};
use crate::error::GameError;
use crate::play::PlaySession;

#[derive(Debug)]
pub enum Screen {
    Dashboard,
    Playing(PlaySession),
}

/// Outcome of `complete_level`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Award {
    pub level_id: u32,
    pub replay: bool,
    pub xp_awarded: u32,
    pub total_xp: u64,
}

/// Replays earn a quarter of the reward, rounded down.
pub fn replay_xp(xp_earned: u32) -> u32 {
    xp_earned / 4
}

/// Apply a completion to the profile. Replays are discounted, never blocked.
pub fn award_xp(user: &mut UserState, level_id: u32, xp_earned: u32) -> Award {
    let replay = user.completed_levels.contains(&level_id);
    let xp_awarded = if replay { replay_xp(xp_earned) } else { xp_earned };
    user.completed_levels.insert(level_id);
    user.xp = user.xp.saturating_add(u64::from(xp_awarded));
    Award { level_id, replay, xp_awarded, total_xp: user.xp }
}

#[derive(Debug)]
pub struct Session {
    catalog: Arc<LevelCatalog>,
    user: UserState,
    screen: Screen,
}

impl Session {
    pub fn new(catalog: Arc<LevelCatalog>) -> Self {
        Self { catalog, user: UserState::default(), screen: Screen::Dashboard }
    }

    pub fn user(&self) -> &UserState {
        &self.user
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Level 1 is always open; level k opens once k-1 is completed.
    /// The seed `locked` flag plays no part.
    pub fn is_unlocked(&self, level_id: u32) -> bool {
        level_id == 1 || (level_id > 1 && self.user.completed_levels.contains(&(level_id - 1)))
    }

    pub fn is_completed(&self, level_id: u32) -> bool {
        self.user.completed_levels.contains(&level_id)
    }

    /// Catalog order, each level paired with its derived lock state.
    pub fn levels(&self) -> impl Iterator<Item = (&Arc<Level>, bool)> + '_ {
        self.catalog.list().iter().map(move |l| (l, !self.is_unlocked(l.id)))
    }

    pub fn play(&self) -> Option<&PlaySession> {
        match &self.screen {
            Screen::Playing(p) => Some(p),
            Screen::Dashboard => None,
        }
    }

    pub fn play_mut(&mut self) -> Option<&mut PlaySession> {
        match &mut self.screen {
            Screen::Playing(p) => Some(p),
            Screen::Dashboard => None,
        }
    }

    /// The active play session, only if it is the one identified by `id`.
    pub fn play_for(&mut self, id: Uuid) -> Option<&mut PlaySession> {
        self.play_mut().filter(|p| p.id == id)
    }

    pub fn select_level(&mut self, level_id: u32) -> Result<&mut PlaySession, GameError> {
        if let Screen::Playing(p) = &self.screen {
            return Err(GameError::AlreadyPlaying { level_id: p.level.id });
        }
        let level = self.catalog.get(level_id).cloned().ok_or(GameError::UnknownLevel(level_id))?;
        if !self.is_unlocked(level_id) {
            return Err(GameError::LevelLocked(level_id));
        }
        let play = PlaySession::enter(level);
        info!(target: "game", level_id, session_id = %play.id, "Level selected");
        self.screen = Screen::Playing(play);
        match &mut self.screen {
            Screen::Playing(p) => Ok(p),
            Screen::Dashboard => Err(GameError::NotPlaying),
        }
    }

    /// Credit the active level. The screen stays on the level until
    /// `return_to_dashboard` so the learner can read the verdict.
    pub fn complete_level(&mut self, xp_earned: u32) -> Result<Award, GameError> {
        let level_id = self.play().map(|p| p.level.id).ok_or(GameError::NotPlaying)?;
        let award = award_xp(&mut self.user, level_id, xp_earned);
        info!(
            target: "game",
            level_id,
            replay = award.replay,
            xp_awarded = award.xp_awarded,
            total_xp = award.total_xp,
            "Level completed"
        );
        Ok(award)
    }

    /// Timer-driven return after completion. No-op unless `session_id` is
    /// still the active session.
    pub fn return_to_dashboard(&mut self, session_id: Uuid) -> bool {
        if self.play().map(|p| p.id) != Some(session_id) {
            return false;
        }
        self.screen = Screen::Dashboard;
        true
    }

    /// Leave the level immediately without XP. Returns the discarded session
    /// so the caller can cancel its timers.
    pub fn exit_level(&mut self) -> Result<PlaySession, GameError> {
        match std::mem::replace(&mut self.screen, Screen::Dashboard) {
            Screen::Playing(p) => {
                info!(target: "game", level_id = p.level.id, session_id = %p.id, "Level exited");
                Ok(p)
            }
            Screen::Dashboard => Err(GameError::NotPlaying),
        }
    }
}
