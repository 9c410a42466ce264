use near_sdk::store::LookupMap;
use near_sdk::{env, log, near, AccountId, Gas, NearToken, Promise};

use crate::error::SwapError;
use crate::ext_self;

const GAS_FOR_PAYOUT_CALLBACK: Gas = Gas::from_tgas(10);

/// Value held by the contract on behalf of locked swaps and market maker stakes.
///
/// Every deposit and release goes through here so `custodied` always equals the
/// sum of LOCKED swap values, un-withdrawn stakes and owed payouts.
#[near(serializers = [borsh])]
pub struct EscrowLedger {
    custodied: NearToken,
    // Payouts whose transfer failed, claimable by the recipient.
    owed: LookupMap<AccountId, NearToken>,
}

/// A release of value from custody that still has to be transferred.
#[derive(Clone, Debug, PartialEq)]
pub struct Payout {
    pub recipient: AccountId,
    pub amount: NearToken,
}

impl Payout {
    /// Sends the transfer, with a callback that books it back into custody if it fails.
    pub fn dispatch(self) -> Option<Promise> {
        if self.amount.is_zero() {
            return None;
        }
        log!(
            "Paying {} yoctoNEAR to {}",
            self.amount.as_yoctonear(),
            self.recipient
        );
        let transfer = Promise::new(self.recipient.clone()).transfer(self.amount);
        Some(
            transfer.then(
                ext_self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_PAYOUT_CALLBACK)
                    .on_payout_settled(self.recipient, self.amount),
            ),
        )
    }
}

impl EscrowLedger {
    pub fn new(owed_prefix: &[u8]) -> Self {
        Self {
            custodied: NearToken::from_yoctonear(0),
            owed: LookupMap::new(owed_prefix),
        }
    }

    pub fn custodied(&self) -> NearToken {
        self.custodied
    }

    pub fn owed_to(&self, account_id: &AccountId) -> NearToken {
        self.owed
            .get(account_id)
            .copied()
            .unwrap_or(NearToken::from_yoctonear(0))
    }

    /// Books value attached to the current call into custody.
    pub fn deposit(&mut self, amount: NearToken) {
        self.custodied = self.custodied.saturating_add(amount);
    }

    /// Takes value out of custody for `recipient`.
    pub fn release(&mut self, recipient: &AccountId, amount: NearToken) -> Payout {
        self.custodied = self
            .custodied
            .checked_sub(amount)
            .unwrap_or_else(|| env::panic_str("custody-underflow"));
        Payout {
            recipient: recipient.clone(),
            amount,
        }
    }

    /// The runtime returned a failed transfer to the contract: hold it for the recipient.
    pub fn settle_failed(&mut self, recipient: AccountId, amount: NearToken) {
        self.custodied = self.custodied.saturating_add(amount);
        let owed = self.owed_to(&recipient).saturating_add(amount);
        log!(
            "Payout of {} yoctoNEAR to {} failed, now owed {}",
            amount.as_yoctonear(),
            recipient,
            owed.as_yoctonear()
        );
        self.owed.insert(recipient, owed);
    }

    pub fn claim_owed(&mut self, account_id: &AccountId) -> Result<Payout, SwapError> {
        let amount = self
            .owed
            .remove(account_id)
            .filter(|amount| !amount.is_zero())
            .ok_or(SwapError::NothingOwed)?;
        Ok(self.release(account_id, amount))
    }
}
