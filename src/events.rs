use near_sdk::json_types::{Base58CryptoHash, Base64VecU8, U128};
use near_sdk::serde::Serialize;
use near_sdk::{env, near, serde_json, AccountId, BlockHeight, CryptoHash, NearToken};

pub const EVENT_STANDARD: &str = "atomic-swap";
pub const EVENT_VERSION: &str = "1.0.0";

/// Audit log entries, one per successful swap transition.
#[near(serializers = [json])]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[derive(Clone, Debug)]
pub enum SwapEvent {
    Lock {
        sender: AccountId,
        receiver: AccountId,
        hash_lock: Base58CryptoHash,
        start_time: u64,
        value: NearToken,
        receiver_pkh: Base64VecU8,
        start_height: BlockHeight,
        penalty_bps: u16,
        expected_price: U128,
    },
    Unlock {
        hash_lock: Base58CryptoHash,
        preimage: Base64VecU8,
    },
    Refund {
        hash_lock: Base58CryptoHash,
    },
}

#[derive(Serialize)]
#[serde(crate = "near_sdk::serde")]
struct EventLog<'a> {
    standard: &'static str,
    version: &'static str,
    #[serde(flatten)]
    event: &'a SwapEvent,
}

impl SwapEvent {
    pub fn unlock(hash_lock: CryptoHash, preimage: Vec<u8>) -> Self {
        SwapEvent::Unlock {
            hash_lock: hash_lock.into(),
            preimage: Base64VecU8(preimage),
        }
    }

    pub fn refund(hash_lock: CryptoHash) -> Self {
        SwapEvent::Refund {
            hash_lock: hash_lock.into(),
        }
    }

    /// Writes the event as a NEP-297 `EVENT_JSON:` log line.
    pub fn emit(&self) {
        let log = EventLog {
            standard: EVENT_STANDARD,
            version: EVENT_VERSION,
            event: self,
        };
        let json = serde_json::to_string(&log)
            .unwrap_or_else(|_| env::panic_str("event serialization failed"));
        env::log_str(&format!("EVENT_JSON:{json}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use near_sdk::test_utils::{get_logs, VMContextBuilder};
    use near_sdk::testing_env;

    #[test]
    fn emits_nep297_line() {
        testing_env!(VMContextBuilder::new().build());
        SwapEvent::refund([7u8; 32]).emit();

        let logs = get_logs();
        assert_eq!(logs.len(), 1);
        let body = logs[0].strip_prefix("EVENT_JSON:").unwrap();
        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(value["standard"], EVENT_STANDARD);
        assert_eq!(value["version"], EVENT_VERSION);
        assert_eq!(value["event"], "refund");
        let expected: Base58CryptoHash = [7u8; 32].into();
        assert_eq!(value["data"]["hash_lock"], serde_json::to_value(expected).unwrap());
    }
}
