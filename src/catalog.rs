//! Level catalog: the immutable, ordered set of levels for this process.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::AppConfig;
use crate::domain::Level;
use crate::error::CatalogError;
use crate::seeds::seed_levels;

#[derive(Debug)]
pub struct LevelCatalog {
  levels: Vec<Arc<Level>>,
}

impl LevelCatalog {
  /// Validate and freeze a level list. Ids must run 1..=n with no gaps
  /// (after sorting), since unlocking walks `id - 1`.
  pub fn new(mut levels: Vec<Level>) -> Result<Self, CatalogError> {
    if levels.is_empty() {
      return Err(CatalogError::Empty);
    }
    levels.sort_by_key(|l| l.id);
    for (idx, l) in levels.iter().enumerate() {
      let expected = idx as u32 + 1;
      if l.id != expected {
        return Err(CatalogError::NonDenseIds { expected, found: l.id });
      }
      if l.xp_reward == 0 {
        return Err(CatalogError::ZeroReward(l.id));
      }
    }
    Ok(Self { levels: levels.into_iter().map(Arc::new).collect() })
  }

  /// Levels from `[[levels]]` in the config when valid, otherwise the built-in seeds.
  pub fn from_config(cfg: Option<&AppConfig>) -> Self {
    if let Some(levels) = cfg.map(|c| &c.levels).filter(|l| !l.is_empty()) {
      match Self::new(levels.clone()) {
        Ok(catalog) => {
          info!(target: "game", count = catalog.len(), "Loaded level catalog from config");
          return catalog;
        }
        Err(e) => {
          error!(target: "game", error = %e, "Invalid [[levels]] in config; using built-in levels");
        }
      }
    }
    Self::seeded()
  }

  pub fn seeded() -> Self {
    let levels = seed_levels().into_iter().map(Arc::new).collect();
    Self { levels }
  }

  pub fn list(&self) -> &[Arc<Level>] {
    &self.levels
  }

  pub fn get(&self, id: u32) -> Option<&Arc<Level>> {
    // Dense ids make the index lookup exact.
    id.checked_sub(1).and_then(|idx| self.levels.get(idx as usize))
  }

  pub fn len(&self) -> usize {
    self.levels.len()
  }
}
