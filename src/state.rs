//! Application state: the single learner session (which owns the level
//! catalog), the judge client, timing, and a change feed for push updates.
//!
//! There is exactly one `Session` per process. Every mutation goes through
//! `game` (a tokio mutex); judge calls are made with the lock released.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{info, instrument, warn};

use crate::catalog::LevelCatalog;
use crate::config::{load_config_from_env, Timing};
use crate::error::OracleError;
use crate::openai::OpenAI;
use crate::oracle::{OfflineOracle, Oracle, OracleClient};
use crate::session::Session;

#[derive(Clone)]
pub struct AppState {
    pub game: Arc<Mutex<Session>>,
    pub oracle: OracleClient,
    pub timing: Timing,
    /// Bumped after every state change; WebSocket clients push a fresh snapshot.
    changes: Arc<watch::Sender<u64>>,
}

impl AppState {
    /// Build state from env: load config, freeze the catalog, pick the judge.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg_opt = load_config_from_env();
        let prompts = cfg_opt.as_ref().map(|c| c.prompts.clone()).unwrap_or_default();
        let timing = cfg_opt.as_ref().map(|c| c.timing.clone()).unwrap_or_default();
        let catalog = Arc::new(LevelCatalog::from_config(cfg_opt.as_ref()));

        for level in catalog.list() {
            info!(target: "game", id = level.id, title = %level.title, difficulty = ?level.difficulty, xp_reward = level.xp_reward, "Startup level inventory");
        }

        let oracle = select_oracle(OpenAI::from_env(prompts, timing.oracle_timeout()));

        Self::with_parts(catalog, oracle, timing)
    }

    pub fn with_parts(catalog: Arc<LevelCatalog>, oracle: Arc<dyn Oracle>, timing: Timing) -> Self {
        let (changes, _) = watch::channel(0u64);
        Self {
            game: Arc::new(Mutex::new(Session::new(catalog))),
            oracle: OracleClient::new(oracle, timing.oracle_timeout()),
            timing,
            changes: Arc::new(changes),
        }
    }

    pub fn notify(&self) {
        self.changes.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

/// Use the OpenAI judge when it was built; otherwise every call fails offline.
fn select_oracle(built: Result<Option<OpenAI>, OracleError>) -> Arc<dyn Oracle> {
    match built {
        Ok(Some(oa)) => {
            info!(target: "pyquest_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI judge enabled.");
            Arc::new(oa)
        }
        Ok(None) => {
            info!(target: "pyquest_backend", "OpenAI disabled (no OPENAI_API_KEY). Every run will report a system error.");
            Arc::new(OfflineOracle)
        }
        Err(e) => {
            warn!(target: "pyquest_backend", error = %e, "OpenAI judge unavailable (client setup failed). Every run will report a system error.");
            Arc::new(OfflineOracle)
        }
    }
}
