//! Storage staking for records kept on behalf of callers.
//!
//! The runtime locks `storage_byte_cost` per byte of contract state out of the
//! contract's own balance, the same balance that holds custodied value. Every
//! call that creates a record therefore pays for its bytes up front, out of the
//! attached deposit, and only the rest of the deposit enters custody.

use near_sdk::borsh::{self, BorshSerialize};
use near_sdk::{env, AccountId, NearToken};

use crate::error::SwapError;

/// Bytes the runtime bills for every key-value entry on top of the key and value.
pub const RECORD_OVERHEAD_BYTES: u64 = 40;

/// Upper bound on the collection prefix and index tag in front of each key.
const KEY_PREFIX_BYTES: u64 = 8;

/// Borsh length of `value` as it will sit in storage.
pub fn encoded_len<T: BorshSerialize + ?Sized>(value: &T) -> u64 {
    let len = borsh::object_length(value)
        .unwrap_or_else(|_| env::panic_str("storage-size-unavailable"));
    len as u64
}

/// Billed size of one entry with a key of `key_len` and a value of `value_len` bytes.
pub fn entry_bytes(key_len: u64, value_len: u64) -> u64 {
    RECORD_OVERHEAD_BYTES + KEY_PREFIX_BYTES + key_len + value_len
}

/// An entry of the owed-payout map, which a failed transfer to `recipient` creates.
pub fn owed_entry_bytes(recipient: &AccountId) -> u64 {
    entry_bytes(encoded_len(recipient), encoded_len(&NearToken::from_yoctonear(0)))
}

pub fn cost(bytes: u64) -> NearToken {
    env::storage_byte_cost().saturating_mul(u128::from(bytes))
}

/// Takes the storage charge for `bytes` out of `attached`, returning what is left.
pub fn split_deposit(attached: NearToken, bytes: u64) -> Result<NearToken, SwapError> {
    attached
        .checked_sub(cost(bytes))
        .ok_or(SwapError::InsufficientStorageDeposit)
}
