use near_sdk::{near, NearToken};

use crate::error::SwapError;

const HOUR: u64 = 3600;

/// Network-wide constants fixed at deployment.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Minimum stake a market maker must attach to register.
    pub min_staked_value: NearToken,
    /// Cooling-off period (seconds) between retirement and stake withdrawal.
    pub min_retire_delay: u64,
    /// Slowest block interval (seconds) still considered normal block production.
    /// A swap's wall-clock expiry only counts once at least
    /// `valid_period / max_block_interval` blocks were produced since it was locked.
    pub max_block_interval: u64,
}

impl Config {
    pub fn testnet() -> Self {
        Self {
            min_staked_value: NearToken::from_millinear(100),
            min_retire_delay: 2 * HOUR,
            max_block_interval: 6,
        }
    }

    pub fn mainnet() -> Self {
        Self {
            min_staked_value: NearToken::from_near(1),
            min_retire_delay: 24 * HOUR,
            max_block_interval: 6,
        }
    }

    pub fn validate(&self) -> Result<(), SwapError> {
        if self.max_block_interval == 0 {
            return Err(SwapError::InvalidParameter("invalid-block-interval"));
        }
        Ok(())
    }

    /// Blocks that must follow a swap's start height before its `valid_period`
    /// is trusted to have really elapsed.
    pub fn required_blocks(&self, valid_period: u64) -> u64 {
        valid_period / self.max_block_interval
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::testnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert!(Config::testnet().validate().is_ok());
        assert!(Config::mainnet().validate().is_ok());
        assert_eq!(Config::default(), Config::testnet());
    }

    #[test]
    fn zero_block_interval_is_rejected() {
        let config = Config {
            max_block_interval: 0,
            ..Config::testnet()
        };
        assert_eq!(
            config.validate(),
            Err(SwapError::InvalidParameter("invalid-block-interval"))
        );
    }

    #[test]
    fn required_blocks_scale_with_period() {
        let config = Config::testnet();
        assert_eq!(config.required_blocks(12 * HOUR), 7200);
        assert_eq!(config.required_blocks(5), 0);
    }
}
