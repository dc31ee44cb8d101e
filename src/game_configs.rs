//! Read-only registry of weighted and keno game configurations
//!
//! Built once from [`EngineConfig`] plus any caller supplied configurations and
//! passed around by reference. Nothing here is persisted.

use crate::common::types::{CasinoGame, ChainId};
use crate::config::EngineConfig;
use crate::errors::ConfigurationError;
use crate::games::{KenoConfiguration, WeightedGameConfiguration};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct GameConfigRegistry {
    weighted: HashMap<(ChainId, CasinoGame), BTreeMap<u32, WeightedGameConfiguration>>,
    keno: HashMap<ChainId, KenoConfiguration>,
}

impl GameConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for chain in &config.chains {
            for weighted in &chain.weighted_configs {
                registry = registry.with_weighted(chain.chain_id, weighted.clone())?;
            }
            if let Some(keno) = &chain.keno {
                registry = registry.with_keno(chain.chain_id, keno.clone())?;
            }
        }
        Ok(registry)
    }

    /// Add or replace a weighted configuration
    pub fn with_weighted(
        mut self,
        chain_id: ChainId,
        config: WeightedGameConfiguration,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        self.weighted
            .entry((chain_id, config.game))
            .or_default()
            .insert(config.config_id, config);
        Ok(self)
    }

    pub fn with_keno(
        mut self,
        chain_id: ChainId,
        config: KenoConfiguration,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        self.keno.insert(chain_id, config);
        Ok(self)
    }

    pub fn weighted(
        &self,
        chain_id: ChainId,
        game: CasinoGame,
        config_id: u32,
    ) -> Option<&WeightedGameConfiguration> {
        self.weighted
            .get(&(chain_id, game))
            .and_then(|configs| configs.get(&config_id))
    }

    /// Every configuration of `game` on `chain_id`, by ascending id
    pub fn weighted_configs(
        &self,
        chain_id: ChainId,
        game: CasinoGame,
    ) -> Vec<&WeightedGameConfiguration> {
        self.weighted
            .get(&(chain_id, game))
            .map(|configs| configs.values().collect())
            .unwrap_or_default()
    }

    pub fn keno(&self, chain_id: ChainId) -> Option<&KenoConfiguration> {
        self.keno.get(&chain_id)
    }

    pub fn weighted_count(&self) -> usize {
        self.weighted.values().map(BTreeMap::len).sum()
    }
}
