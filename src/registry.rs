use near_sdk::json_types::{Base64VecU8, U128};
use near_sdk::store::{LookupMap, Vector};
use near_sdk::{log, near, AccountId, NearToken};

use crate::config::Config;
use crate::error::SwapError;
use crate::storage;

pub const MAX_BPS: u16 = 10_000;
pub const MAX_INTRO_LEN: usize = 32;

/// Parameters a market maker commits to when registering.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug)]
pub struct MarketMakerParams {
    pub intro: String,
    pub bch_pkh: Base64VecU8,
    /// External chain timelock, in that chain's blocks.
    pub bch_lock_time: u32,
    /// This side's timelock, in seconds.
    pub sbch_lock_time: u64,
    pub penalty_bps: u16,
    pub bch_price: U128,
    pub sbch_price: U128,
    pub min_swap_amt: NearToken,
    pub max_swap_amt: NearToken,
    pub status_checker: AccountId,
}

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct MarketMaker {
    pub addr: AccountId,
    /// 0 while active, else the retirement time in seconds.
    pub retired_at: u64,
    pub intro: String,
    pub bch_pkh: Base64VecU8,
    pub bch_lock_time: u32,
    pub sbch_lock_time: u64,
    pub penalty_bps: u16,
    pub bch_price: U128,
    pub sbch_price: U128,
    pub min_swap_amt: NearToken,
    pub max_swap_amt: NearToken,
    pub staked_value: NearToken,
    pub status_checker: AccountId,
    pub unavailable: bool,
}

impl MarketMaker {
    pub fn is_retired(&self) -> bool {
        self.retired_at > 0
    }

    pub fn accepts_value(&self, value: NearToken) -> bool {
        value >= self.min_swap_amt && value <= self.max_swap_amt
    }
}

fn validate_intro(intro: &str) -> Result<(), SwapError> {
    if intro.len() > MAX_INTRO_LEN {
        return Err(SwapError::InvalidParameter("intro-too-long"));
    }
    Ok(())
}

impl MarketMakerParams {
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.bch_lock_time == 0 {
            return Err(SwapError::InvalidParameter("invalid-bch-lock-time"));
        }
        if self.penalty_bps > MAX_BPS {
            return Err(SwapError::InvalidParameter("invalid-penalty-bps"));
        }
        if self.min_swap_amt > self.max_swap_amt {
            return Err(SwapError::InvalidParameter("invalid-swap-amt"));
        }
        validate_intro(&self.intro)
    }

    fn into_maker(self, addr: &AccountId, staked_value: NearToken) -> MarketMaker {
        MarketMaker {
            addr: addr.clone(),
            retired_at: 0,
            intro: self.intro,
            bch_pkh: self.bch_pkh,
            bch_lock_time: self.bch_lock_time,
            sbch_lock_time: self.sbch_lock_time,
            penalty_bps: self.penalty_bps,
            bch_price: self.bch_price,
            sbch_price: self.sbch_price,
            min_swap_amt: self.min_swap_amt,
            max_swap_amt: self.max_swap_amt,
            staked_value,
            status_checker: self.status_checker,
            unavailable: false,
        }
    }

    /// State a registration keeps for good: the record with room for the longest
    /// intro, its active-index slot and position, and an owed entry for the stake.
    pub fn storage_bytes(&self, addr: &AccountId) -> u64 {
        let mut maker = self.clone().into_maker(addr, NearToken::from_yoctonear(0));
        maker.intro = " ".repeat(MAX_INTRO_LEN.max(maker.intro.len()));

        let addr_len = storage::encoded_len(addr);
        storage::entry_bytes(addr_len, storage::encoded_len(&maker))
            + storage::entry_bytes(4, addr_len)
            + storage::entry_bytes(addr_len, 4)
            + storage::owed_entry_bytes(addr)
    }
}

/// Registered market makers plus a dense index of the ones still holding stake.
///
/// Removal from the active index swaps the last entry into the freed slot, so
/// listing order is insertion order only until the first withdrawal.
#[near(serializers = [borsh])]
pub struct MarketMakerRegistry {
    makers: LookupMap<AccountId, MarketMaker>,
    active: Vector<AccountId>,
    active_positions: LookupMap<AccountId, u32>,
}

impl MarketMakerRegistry {
    pub fn new(prefix: &[u8]) -> Self {
        let key = |suffix: u8| [prefix, &[suffix]].concat();
        Self {
            makers: LookupMap::new(key(b'm')),
            active: Vector::new(key(b'a')),
            active_positions: LookupMap::new(key(b'p')),
        }
    }

    pub fn get(&self, addr: &AccountId) -> Option<&MarketMaker> {
        self.makers.get(addr)
    }

    pub fn active_len(&self) -> u32 {
        self.active.len()
    }

    pub fn register(
        &mut self,
        caller: &AccountId,
        params: MarketMakerParams,
        staked_value: NearToken,
        config: &Config,
    ) -> Result<(), SwapError> {
        params.validate()?;
        if staked_value < config.min_staked_value {
            return Err(SwapError::InsufficientStake);
        }
        if self.makers.contains_key(caller) {
            return Err(SwapError::AlreadyRegistered);
        }

        let maker = params.into_maker(caller, staked_value);
        self.makers.insert(caller.clone(), maker);
        self.active_positions.insert(caller.clone(), self.active.len());
        self.active.push(caller.clone());

        log!(
            "Registered market maker {} with stake {} yoctoNEAR",
            caller,
            staked_value.as_yoctonear()
        );
        Ok(())
    }

    /// Only the label and prices are mutable; limits and lock times are fixed at registration.
    pub fn update(
        &mut self,
        caller: &AccountId,
        intro: String,
        bch_price: U128,
        sbch_price: U128,
    ) -> Result<(), SwapError> {
        let maker = self.makers.get_mut(caller).ok_or(SwapError::NotRegistered)?;
        validate_intro(&intro)?;
        maker.intro = intro;
        maker.bch_price = bch_price;
        maker.sbch_price = sbch_price;
        log!("Updated market maker {}", caller);
        Ok(())
    }

    pub fn retire(&mut self, caller: &AccountId, now: u64) -> Result<(), SwapError> {
        let maker = self.makers.get_mut(caller).ok_or(SwapError::NotRegistered)?;
        if maker.is_retired() {
            return Err(SwapError::AlreadyRetired);
        }
        // Keep the marker non-zero even for a genesis timestamp.
        maker.retired_at = now.max(1);
        log!("Market maker {} retired at {}", caller, maker.retired_at);
        Ok(())
    }

    /// Zeroes the stake and drops the maker from the active index, returning the amount to pay out.
    pub fn withdraw_stake(
        &mut self,
        caller: &AccountId,
        now: u64,
        config: &Config,
    ) -> Result<NearToken, SwapError> {
        let maker = self.makers.get_mut(caller).ok_or(SwapError::NotRegistered)?;
        if !maker.is_retired() {
            return Err(SwapError::NotRetired);
        }
        if now < maker.retired_at.saturating_add(config.min_retire_delay) {
            return Err(SwapError::CoolingOffNotElapsed);
        }
        if maker.staked_value.is_zero() {
            return Err(SwapError::NothingToWithdraw);
        }

        let amount = maker.staked_value;
        maker.staked_value = NearToken::from_yoctonear(0);
        self.remove_active(caller);

        log!(
            "Market maker {} withdrew stake of {} yoctoNEAR",
            caller,
            amount.as_yoctonear()
        );
        Ok(amount)
    }

    pub fn set_unavailable(
        &mut self,
        caller: &AccountId,
        addr: &AccountId,
        unavailable: bool,
    ) -> Result<(), SwapError> {
        let maker = self.makers.get_mut(addr).ok_or(SwapError::NotRegistered)?;
        if &maker.status_checker != caller {
            return Err(SwapError::Unauthorized);
        }
        maker.unavailable = unavailable;
        log!("Market maker {} unavailable={}", addr, unavailable);
        Ok(())
    }

    /// Up to `count` active makers starting at position `start` of the active index.
    pub fn list(&self, start: u64, count: u64) -> Vec<MarketMaker> {
        let len = u64::from(self.active.len());
        if start >= len {
            return Vec::new();
        }
        let end = start.saturating_add(count).min(len);
        (start..end)
            .filter_map(|i| self.active.get(i as u32))
            .filter_map(|addr| self.makers.get(addr))
            .cloned()
            .collect()
    }

    fn remove_active(&mut self, addr: &AccountId) {
        let Some(position) = self.active_positions.remove(addr) else {
            return;
        };
        self.active.swap_remove(position);
        if let Some(moved) = self.active.get(position).cloned() {
            self.active_positions.insert(moved, position);
        }
    }
}
