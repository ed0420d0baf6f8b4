//! Append-only registry of batch configs.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use shutter_types::{Address, BatchConfig};
use std::collections::BTreeSet;

/// Ordered list of batch configs, keyed by their start batch index.
///
/// Slot 0 always holds the zero-valued guard, so every batch index resolves
/// to some config. Start batch indices are strictly increasing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<BatchConfig>", into = "Vec<BatchConfig>")]
pub struct ConfigRegistry {
    configs: Vec<BatchConfig>,
}

impl TryFrom<Vec<BatchConfig>> for ConfigRegistry {
    type Error = AppError;

    fn try_from(configs: Vec<BatchConfig>) -> Result<Self, Self::Error> {
        match configs.first() {
            Some(guard) if guard.start_batch_index == 0 => {}
            _ => return Err(AppError::InvalidConfig("registry must start with a guard at batch 0".into())),
        }
        for pair in configs.windows(2) {
            if pair[1].start_batch_index <= pair[0].start_batch_index {
                return Err(AppError::InvalidConfigOrder {
                    last: pair[0].start_batch_index,
                    got: pair[1].start_batch_index,
                });
            }
        }
        Ok(Self { configs })
    }
}

impl From<ConfigRegistry> for Vec<BatchConfig> {
    fn from(registry: ConfigRegistry) -> Self {
        registry.configs
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self {
            configs: vec![BatchConfig::default()],
        }
    }
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `config`. Its start batch index must exceed the last one.
    pub fn add_config(&mut self, config: BatchConfig) -> Result<(), AppError> {
        let last = self.last();
        if config.start_batch_index <= last.start_batch_index {
            return Err(AppError::InvalidConfigOrder {
                last: last.start_batch_index,
                got: config.start_batch_index,
            });
        }
        self.configs.push(config);
        Ok(())
    }

    /// The config with the largest start batch index `<= batch_index`.
    pub fn config_for_batch(&self, batch_index: u64) -> &BatchConfig {
        // The guard starts at 0, so at least one entry satisfies the predicate.
        let pos = self
            .configs
            .partition_point(|c| c.start_batch_index <= batch_index);
        &self.configs[pos.saturating_sub(1)]
    }

    /// The most recently added config, which defines who may vote.
    pub fn last(&self) -> &BatchConfig {
        // Never empty: the guard is inserted on construction.
        &self.configs[self.configs.len() - 1]
    }

    pub fn by_index(&self, config_index: u64) -> Option<&BatchConfig> {
        self.configs.iter().find(|c| c.config_index == config_index)
    }

    pub fn by_index_mut(&mut self, config_index: u64) -> Option<&mut BatchConfig> {
        self.configs.iter_mut().find(|c| c.config_index == config_index)
    }

    /// Every keyper of every registered config.
    pub fn all_keypers(&self) -> BTreeSet<Address> {
        self.configs
            .iter()
            .flat_map(|c| c.keypers.iter().copied())
            .collect()
    }

    pub fn configs(&self) -> &[BatchConfig] {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Whether only the guard is present.
    pub fn is_empty(&self) -> bool {
        self.configs.len() == 1
    }
}
