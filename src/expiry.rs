use near_sdk::{env, near, BlockHeight};

use crate::config::Config;
use crate::error::SwapError;

const NANOS_IN_SEC: u64 = 1_000_000_000;

/// Ledger clock as seen by a single call: block time in whole seconds and block height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerTime {
    pub now: u64,
    pub height: BlockHeight,
}

impl LedgerTime {
    pub fn new(now: u64, height: BlockHeight) -> Self {
        Self { now, height }
    }

    pub fn current() -> Self {
        Self {
            now: env::block_timestamp() / NANOS_IN_SEC,
            height: env::block_height(),
        }
    }
}

/// The sbch-side timelock of a swap, anchored at the time and height it was locked.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct Expiry {
    pub start_time: u64,
    pub start_height: BlockHeight,
    pub valid_period: u64,
}

impl Expiry {
    pub fn new(start: LedgerTime, valid_period: u64) -> Self {
        Self {
            start_time: start.now,
            start_height: start.height,
            valid_period,
        }
    }

    pub fn expires_at(&self) -> u64 {
        self.start_time.saturating_add(self.valid_period)
    }

    /// Wall-clock expiry.
    pub fn has_elapsed(&self, time: LedgerTime) -> bool {
        time.now >= self.expires_at()
    }

    /// Whether block production since the start height backs up the elapsed period.
    pub fn is_confirmed(&self, time: LedgerTime, config: &Config) -> bool {
        time.height.saturating_sub(self.start_height) >= config.required_blocks(self.valid_period)
    }

    /// Unlocking before expiry is always allowed. Past expiry it is only allowed
    /// when block production confirms the time really passed.
    pub fn check_unlock(&self, time: LedgerTime, config: &Config) -> Result<(), SwapError> {
        if self.has_elapsed(time) && !self.is_confirmed(time, config) {
            return Err(SwapError::ChainHalted);
        }
        Ok(())
    }

    pub fn check_refund(&self, time: LedgerTime, config: &Config) -> Result<(), SwapError> {
        if !self.has_elapsed(time) || !self.is_confirmed(time, config) {
            return Err(SwapError::NotRefundable);
        }
        Ok(())
    }
}
