use near_sdk::json_types::{Base58CryptoHash, Base64VecU8, U128};
use near_sdk::store::IterableMap;
use near_sdk::{env, near, AccountId, CryptoHash, NearToken};

use crate::config::Config;
use crate::error::SwapError;
use crate::events::SwapEvent;
use crate::expiry::{Expiry, LedgerTime};
use crate::ledger::{EscrowLedger, Payout};
use crate::registry::{MarketMakerRegistry, MAX_BPS};
use crate::storage;

/// Swaps are keyed per sender, so distinct senders may reuse a hash-lock.
pub type SwapKey = (AccountId, CryptoHash);

/// Secrets are 32 bytes, matching the hash-lock they open.
pub const SECRET_LEN: usize = 32;

#[near(serializers = [json, borsh])]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapState {
    Invalid,
    Locked,
    Unlocked,
    Refunded,
}

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct Swap {
    pub hash_lock: Base58CryptoHash,
    pub sender: AccountId,
    pub receiver: AccountId,
    pub receiver_is_mm: bool,
    pub value: NearToken,
    // Opaque external-chain withdrawal key hash.
    pub receiver_bch_pkh: Base64VecU8,
    // Copied at lock time, independent of later registry changes.
    pub penalty_bps: u16,
    pub expected_price: U128,
    pub expiry: Expiry,
    pub secret_key: Option<Base64VecU8>,
    pub state: SwapState,
}

impl Swap {
    /// Splits a refunded value into (penalty for the receiver, remainder for the sender).
    pub fn penalty_split(&self) -> (NearToken, NearToken) {
        let value = self.value.as_yoctonear();
        let penalty = value * u128::from(self.penalty_bps) / u128::from(MAX_BPS);
        (
            NearToken::from_yoctonear(penalty),
            NearToken::from_yoctonear(value - penalty),
        )
    }
}

/// Arguments of `lock`, minus the attached value.
#[derive(Clone, Debug)]
pub struct LockRequest {
    pub receiver: AccountId,
    pub hash_lock: CryptoHash,
    pub lock_duration: u64,
    pub receiver_pkh: Base64VecU8,
    pub penalty_bps: u16,
    pub receiver_is_mm: bool,
    pub expected_price: U128,
}

impl LockRequest {
    fn into_swap(self, sender: &AccountId, value: NearToken, time: LedgerTime) -> Swap {
        Swap {
            hash_lock: self.hash_lock.into(),
            sender: sender.clone(),
            receiver: self.receiver,
            receiver_is_mm: self.receiver_is_mm,
            value,
            receiver_bch_pkh: self.receiver_pkh,
            penalty_bps: self.penalty_bps,
            expected_price: self.expected_price,
            expiry: Expiry::new(time, self.lock_duration),
            secret_key: None,
            state: SwapState::Locked,
        }
    }

    /// State the swap occupies over its whole life: both `IterableMap` entries with
    /// the secret revealed, plus the owed entries left if either payout fails.
    pub fn storage_bytes(&self, sender: &AccountId) -> u64 {
        let mut swap = self
            .clone()
            .into_swap(sender, NearToken::from_yoctonear(0), LedgerTime::new(0, 0));
        swap.secret_key = Some(Base64VecU8(vec![0; SECRET_LEN]));

        let key_len = storage::encoded_len(&(sender, &self.hash_lock));
        // Value entry carries the record plus its u32 slot in the key index.
        let value_len = storage::encoded_len(&swap) + 4;
        storage::entry_bytes(4, key_len)
            + storage::entry_bytes(key_len, value_len)
            + storage::owed_entry_bytes(sender)
            + storage::owed_entry_bytes(&self.receiver)
    }
}

#[near(serializers = [borsh])]
pub struct SwapBook {
    swaps: IterableMap<SwapKey, Swap>,
}

impl SwapBook {
    pub fn new(prefix: &[u8]) -> Self {
        Self {
            swaps: IterableMap::new(prefix),
        }
    }

    pub fn get(&self, sender: &AccountId, hash_lock: &CryptoHash) -> Option<&Swap> {
        self.swaps.get(&(sender.clone(), *hash_lock))
    }

    pub fn state(&self, sender: &AccountId, hash_lock: &CryptoHash) -> SwapState {
        self.get(sender, hash_lock)
            .map_or(SwapState::Invalid, |swap| swap.state)
    }

    pub fn len(&self) -> u32 {
        self.swaps.len()
    }

    /// Swaps in creation order.
    pub fn list(&self, start: u64, count: u64) -> Vec<Swap> {
        self.swaps
            .values()
            .skip(start.min(usize::MAX as u64) as usize)
            .take(count.min(usize::MAX as u64) as usize)
            .cloned()
            .collect()
    }

    /// Checks whether `sender` may open `request` against the registry.
    fn admit(
        &self,
        registry: &MarketMakerRegistry,
        sender: &AccountId,
        request: &LockRequest,
        value: NearToken,
    ) -> Result<(), SwapError> {
        if request.penalty_bps > MAX_BPS {
            return Err(SwapError::InvalidParameter("invalid-penalty-bps"));
        }

        let receiver = registry.get(&request.receiver);
        if request.receiver_is_mm {
            let maker = receiver.ok_or(SwapError::ReceiverNotMarketMaker)?;
            if maker.is_retired() {
                return Err(SwapError::MarketMakerRetired);
            }
            if maker.unavailable {
                return Err(SwapError::MarketMakerUnavailable);
            }
            if request.lock_duration != maker.sbch_lock_time {
                return Err(SwapError::LockDurationMismatch);
            }
            if request.penalty_bps != maker.penalty_bps {
                return Err(SwapError::PenaltyMismatch);
            }
            if !maker.accepts_value(value) {
                return Err(SwapError::ValueOutOfRange);
            }
        } else if receiver.is_some() {
            return Err(SwapError::ReceiverIsMarketMaker);
        }

        // Availability and retirement belong to the address, whatever side it takes.
        if let Some(maker) = registry.get(sender) {
            if request.receiver_is_mm {
                return Err(SwapError::SenderIsMarketMaker);
            }
            if maker.unavailable {
                return Err(SwapError::SenderUnavailable);
            }
            if maker.is_retired() {
                return Err(SwapError::SenderRetired);
            }
        }

        if self.state(sender, &request.hash_lock) != SwapState::Invalid {
            return Err(SwapError::DuplicateHashLock);
        }
        Ok(())
    }

    /// Opens a swap escrowing `value`, the part of the attached deposit left after storage.
    pub fn lock(
        &mut self,
        registry: &MarketMakerRegistry,
        ledger: &mut EscrowLedger,
        sender: &AccountId,
        request: LockRequest,
        value: NearToken,
        time: LedgerTime,
    ) -> Result<&Swap, SwapError> {
        self.admit(registry, sender, &request, value)?;

        let request_hash = request.hash_lock;
        let swap = request.into_swap(sender, value, time);
        ledger.deposit(value);

        SwapEvent::Lock {
            sender: swap.sender.clone(),
            receiver: swap.receiver.clone(),
            hash_lock: swap.hash_lock,
            start_time: swap.expiry.start_time,
            value,
            receiver_pkh: swap.receiver_bch_pkh.clone(),
            start_height: swap.expiry.start_height,
            penalty_bps: swap.penalty_bps,
            expected_price: swap.expected_price,
        }
        .emit();

        let key = (sender.clone(), request_hash);
        self.swaps.insert(key.clone(), swap);
        self.swaps
            .get(&key)
            .ok_or_else(|| env::panic_str("swap vanished after insert"))
    }

    /// Reveals the preimage and releases the full value to the receiver.
    pub fn unlock(
        &mut self,
        ledger: &mut EscrowLedger,
        config: &Config,
        sender: &AccountId,
        hash_lock: &CryptoHash,
        preimage: Vec<u8>,
        time: LedgerTime,
    ) -> Result<Payout, SwapError> {
        let swap = self.locked_mut(sender, hash_lock)?;
        if preimage.len() != SECRET_LEN || env::sha256_array(&preimage) != *hash_lock {
            return Err(SwapError::InvalidPreimage);
        }
        swap.expiry.check_unlock(time, config)?;

        swap.state = SwapState::Unlocked;
        swap.secret_key = Some(Base64VecU8(preimage.clone()));
        let payout = ledger.release(&swap.receiver, swap.value);

        SwapEvent::unlock(*hash_lock, preimage).emit();
        Ok(payout)
    }

    /// Returns a timed-out swap to its sender, less the penalty owed to the receiver.
    pub fn refund(
        &mut self,
        ledger: &mut EscrowLedger,
        config: &Config,
        sender: &AccountId,
        hash_lock: &CryptoHash,
        time: LedgerTime,
    ) -> Result<[Payout; 2], SwapError> {
        let swap = self.locked_mut(sender, hash_lock)?;
        swap.expiry.check_refund(time, config)?;

        swap.state = SwapState::Refunded;
        let (penalty, remainder) = swap.penalty_split();
        let payouts = [
            ledger.release(&swap.sender, remainder),
            ledger.release(&swap.receiver, penalty),
        ];

        SwapEvent::refund(*hash_lock).emit();
        Ok(payouts)
    }

    fn locked_mut(
        &mut self,
        sender: &AccountId,
        hash_lock: &CryptoHash,
    ) -> Result<&mut Swap, SwapError> {
        self.swaps
            .get_mut(&(sender.clone(), *hash_lock))
            .filter(|swap| swap.state == SwapState::Locked)
            .ok_or(SwapError::NotLocked)
    }
}
