use near_sdk::json_types::{Base58CryptoHash, Base64VecU8, U128};
use near_sdk::{env, ext_contract, log, near, AccountId, CryptoHash, NearToken, PromiseError};

mod config;
mod error;
mod events;
mod expiry;
mod ledger;
mod registry;
mod storage;
mod swap;

pub use config::Config;
pub use error::SwapError;
pub use events::SwapEvent;
pub use expiry::{Expiry, LedgerTime};
pub use registry::{MarketMaker, MarketMakerParams};
pub use swap::{Swap, SwapState};

use ledger::EscrowLedger;
use registry::MarketMakerRegistry;
use swap::{LockRequest, SwapBook};

#[ext_contract(ext_self)]
pub trait SelfCallbacks {
    fn on_payout_settled(&mut self, recipient: AccountId, amount: NearToken);
}

// Define the contract structure
#[near(contract_state)]
pub struct Contract {
    pub config: Config,
    pub registry: MarketMakerRegistry,
    // In-flight and settled swaps, keyed by (sender, hash-lock)
    pub swaps: SwapBook,
    pub ledger: EscrowLedger,
}

impl Default for Contract {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl Contract {
    fn with_config(config: Config) -> Self {
        Self {
            config,
            registry: MarketMakerRegistry::new(b"r"),
            swaps: SwapBook::new(b"s"),
            ledger: EscrowLedger::new(b"o"),
        }
    }

    /// Books the outcome of a payout transfer. A failed transfer came back to the
    /// contract and stays in custody as an owed balance.
    fn settle_payout(&mut self, succeeded: bool, recipient: AccountId, amount: NearToken) {
        if succeeded {
            log!(
                "Payout of {} yoctoNEAR to {} settled",
                amount.as_yoctonear(),
                recipient
            );
        } else {
            self.ledger.settle_failed(recipient, amount);
        }
    }
}

#[near]
impl Contract {
    #[init]
    pub fn new(config: Config) -> Self {
        if let Err(err) = config.validate() {
            env::panic_str(err.as_ref());
        }
        Self::with_config(config)
    }

    // --- MARKET MAKERS ---

    /// Registers the caller as a market maker. The attached deposit, less the
    /// storage charge from `get_registration_storage_cost`, is the stake.
    #[payable]
    #[handle_result]
    pub fn register_market_maker(&mut self, params: MarketMakerParams) -> Result<(), SwapError> {
        let caller = env::predecessor_account_id();
        let stake =
            storage::split_deposit(env::attached_deposit(), params.storage_bytes(&caller))?;
        self.registry.register(&caller, params, stake, &self.config)?;
        self.ledger.deposit(stake);
        Ok(())
    }

    #[handle_result]
    pub fn update_market_maker(
        &mut self,
        intro: String,
        bch_price: U128,
        sbch_price: U128,
    ) -> Result<(), SwapError> {
        let caller = env::predecessor_account_id();
        self.registry.update(&caller, intro, bch_price, sbch_price)
    }

    /// Stops new swaps from matching the caller. Swaps already locked are unaffected.
    #[handle_result]
    pub fn retire_market_maker(&mut self) -> Result<(), SwapError> {
        let caller = env::predecessor_account_id();
        self.registry.retire(&caller, LedgerTime::current().now)
    }

    #[handle_result]
    pub fn withdraw_staked_value(&mut self) -> Result<(), SwapError> {
        let caller = env::predecessor_account_id();
        let amount =
            self.registry
                .withdraw_stake(&caller, LedgerTime::current().now, &self.config)?;
        self.ledger.release(&caller, amount).dispatch();
        Ok(())
    }

    /// Called by a market maker's status checker to pull it in or out of rotation.
    #[handle_result]
    pub fn set_unavailable(&mut self, addr: AccountId, unavailable: bool) -> Result<(), SwapError> {
        let caller = env::predecessor_account_id();
        self.registry.set_unavailable(&caller, &addr, unavailable)
    }

    pub fn get_market_makers(&self, start: u64, count: u64) -> Vec<MarketMaker> {
        self.registry.list(start, count)
    }

    pub fn get_market_maker(&self, addr: AccountId) -> Option<MarketMaker> {
        self.registry.get(&addr).cloned()
    }

    pub fn get_market_maker_count(&self) -> u32 {
        self.registry.active_len()
    }

    /// Part of the attached deposit `register_market_maker` keeps for storage.
    pub fn get_registration_storage_cost(
        &self,
        addr: AccountId,
        params: MarketMakerParams,
    ) -> NearToken {
        storage::cost(params.storage_bytes(&addr))
    }

    // --- SWAPS ---

    /// Locks the attached deposit for `receiver` until the preimage of `hash_lock`
    /// is revealed or `lock_duration` seconds pass. The storage charge from
    /// `get_lock_storage_cost` is taken off first; the rest is the swap value.
    #[payable]
    #[handle_result]
    #[allow(clippy::too_many_arguments)]
    pub fn lock(
        &mut self,
        receiver: AccountId,
        hash_lock: Base58CryptoHash,
        lock_duration: u64,
        receiver_pkh: Base64VecU8,
        penalty_bps: u16,
        receiver_is_mm: bool,
        expected_price: U128,
    ) -> Result<(), SwapError> {
        let sender = env::predecessor_account_id();
        let request = LockRequest {
            receiver,
            hash_lock: hash_lock.into(),
            lock_duration,
            receiver_pkh,
            penalty_bps,
            receiver_is_mm,
            expected_price,
        };
        let value =
            storage::split_deposit(env::attached_deposit(), request.storage_bytes(&sender))?;
        self.swaps.lock(
            &self.registry,
            &mut self.ledger,
            &sender,
            request,
            value,
            LedgerTime::current(),
        )?;
        Ok(())
    }

    /// Anyone holding the preimage may unlock; the value always goes to the receiver.
    #[handle_result]
    pub fn unlock(
        &mut self,
        sender: AccountId,
        hash_lock: Base58CryptoHash,
        preimage: Base64VecU8,
    ) -> Result<(), SwapError> {
        let hash_lock: CryptoHash = hash_lock.into();
        let payout = self.swaps.unlock(
            &mut self.ledger,
            &self.config,
            &sender,
            &hash_lock,
            preimage.0,
            LedgerTime::current(),
        )?;
        payout.dispatch();
        Ok(())
    }

    #[handle_result]
    pub fn refund(&mut self, sender: AccountId, hash_lock: Base58CryptoHash) -> Result<(), SwapError> {
        let hash_lock: CryptoHash = hash_lock.into();
        let payouts = self.swaps.refund(
            &mut self.ledger,
            &self.config,
            &sender,
            &hash_lock,
            LedgerTime::current(),
        )?;
        for payout in payouts {
            payout.dispatch();
        }
        Ok(())
    }

    pub fn get_swap_state(&self, sender: AccountId, hash_lock: Base58CryptoHash) -> SwapState {
        let hash_lock: CryptoHash = hash_lock.into();
        self.swaps.state(&sender, &hash_lock)
    }

    pub fn get_swap(&self, sender: AccountId, hash_lock: Base58CryptoHash) -> Option<Swap> {
        let hash_lock: CryptoHash = hash_lock.into();
        self.swaps.get(&sender, &hash_lock).cloned()
    }

    pub fn get_swaps(&self, start: u64, count: u64) -> Vec<Swap> {
        self.swaps.list(start, count)
    }

    pub fn get_swap_count(&self) -> u32 {
        self.swaps.len()
    }

    /// Part of the attached deposit `lock` keeps for storage.
    pub fn get_lock_storage_cost(
        &self,
        sender: AccountId,
        receiver: AccountId,
        receiver_pkh: Base64VecU8,
    ) -> NearToken {
        let request = LockRequest {
            receiver,
            hash_lock: CryptoHash::default(),
            lock_duration: 0,
            receiver_pkh,
            penalty_bps: 0,
            receiver_is_mm: false,
            expected_price: U128(0),
        };
        storage::cost(request.storage_bytes(&sender))
    }

    // --- LEDGER ---

    pub fn get_config(&self) -> Config {
        self.config.clone()
    }

    pub fn get_custodied_balance(&self) -> NearToken {
        self.ledger.custodied()
    }

    pub fn get_owed(&self, account_id: AccountId) -> NearToken {
        self.ledger.owed_to(&account_id)
    }

    /// Retries payouts whose transfer to the caller failed earlier.
    #[handle_result]
    pub fn claim_owed(&mut self) -> Result<(), SwapError> {
        let caller = env::predecessor_account_id();
        self.ledger.claim_owed(&caller)?.dispatch();
        Ok(())
    }

    // --- PRIVATE CALLBACKS ---
    #[private]
    pub fn on_payout_settled(
        &mut self,
        #[callback_result] result: Result<(), PromiseError>,
        recipient: AccountId,
        amount: NearToken,
    ) {
        self.settle_payout(result.is_ok(), recipient, amount);
    }
}
