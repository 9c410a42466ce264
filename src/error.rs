use std::fmt;

/// Every reason a call can be rejected. The string form is what the runtime
/// reports when a `#[handle_result]` method returns `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapError {
    // Malformed or out-of-bound input; carries the reason code.
    InvalidParameter(&'static str),

    // Registry lifecycle
    InsufficientStake,
    AlreadyRegistered,
    NotRegistered,
    AlreadyRetired,
    NotRetired,
    CoolingOffNotElapsed,
    NothingToWithdraw,
    Unauthorized,

    // Swap admission
    ReceiverNotMarketMaker,
    ReceiverIsMarketMaker,
    MarketMakerRetired,
    MarketMakerUnavailable,
    SenderIsMarketMaker,
    SenderUnavailable,
    SenderRetired,
    LockDurationMismatch,
    PenaltyMismatch,
    ValueOutOfRange,
    DuplicateHashLock,

    // Swap transitions
    NotLocked,
    InvalidPreimage,
    ChainHalted,
    NotRefundable,

    // Owed payouts
    NothingOwed,

    // Attached deposit does not cover the storage of the record it creates.
    InsufficientStorageDeposit,
}

impl AsRef<str> for SwapError {
    fn as_ref(&self) -> &str {
        match self {
            SwapError::InvalidParameter(reason) => reason,
            SwapError::InsufficientStake => "insufficient-staked-value",
            SwapError::AlreadyRegistered => "registered-address",
            SwapError::NotRegistered => "not-registered",
            SwapError::AlreadyRetired => "already-set-retire-time",
            SwapError::NotRetired => "not-retired",
            SwapError::CoolingOffNotElapsed => "not-ready-to-withdraw",
            SwapError::NothingToWithdraw => "nothing-to-withdraw",
            SwapError::Unauthorized => "not-status-checker",
            SwapError::ReceiverNotMarketMaker => "receiver-not-market-maker",
            SwapError::ReceiverIsMarketMaker => "receiver-is-market-maker",
            SwapError::MarketMakerRetired => "market-maker-retired",
            SwapError::MarketMakerUnavailable => "market-maker-unavailable",
            SwapError::SenderIsMarketMaker => "sender-is-market-maker",
            SwapError::SenderUnavailable => "sender-unavailable",
            SwapError::SenderRetired => "sender-retired",
            SwapError::LockDurationMismatch => "lock-time-mismatch",
            SwapError::PenaltyMismatch => "penalty-bps-mismatch",
            SwapError::ValueOutOfRange => "value-out-of-range",
            SwapError::DuplicateHashLock => "used-secret-lock",
            SwapError::NotLocked => "not-locked",
            SwapError::InvalidPreimage => "invalid-key",
            SwapError::ChainHalted => "chain-halted",
            SwapError::NotRefundable => "not-refundable",
            SwapError::NothingOwed => "nothing-owed",
            SwapError::InsufficientStorageDeposit => "insufficient-storage-deposit",
        }
    }
}

impl fmt::Display for SwapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl std::error::Error for SwapError {}
