//! Chain configuration

use serde::{Deserialize, Serialize};

use crate::constants::{CUT_OFF_AGE, DEFAULT_COINBASE_REWARD};
use crate::error::{LedgerError, Result};
use crate::types::{Integer, Natural};

/// Tunable parameters for a `BlockChain`
///
/// Missing fields in JSON fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// How many layers behind the deepest block remain extendable
    pub cut_off_age: Natural,
    /// Value of the coinbase output in blocks assembled by `create_block`
    pub coinbase_reward: Integer,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            cut_off_age: CUT_OFF_AGE,
            coinbase_reward: DEFAULT_COINBASE_REWARD,
        }
    }
}

impl ChainConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ChainConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.coinbase_reward < 0 {
            return Err(LedgerError::InvalidConfig(format!(
                "coinbase_reward must be non-negative, got {}",
                self.coinbase_reward
            )));
        }
        Ok(())
    }
}
