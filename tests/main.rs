use anyhow::Result;
use base64::Engine;
use near_workspaces::network::Sandbox;
use near_workspaces::types::NearToken;
use near_workspaces::{Account, Contract, Worker};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

const HTLC_WASM_PATH: &str = "./target/near/atomic_swap_escrow.wasm";
const LOCK_TIME: u64 = 12 * 3600;

/// Helper function to set up the testing environment.
/// This will:
/// 1. Initialize a sandbox environment.
/// 2. Deploy and initialize the HTLC contract with a 1s retire delay.
/// 3. Create accounts for a market maker, its status checker and a user.
async fn setup() -> Result<(Worker<Sandbox>, Contract, Account, Account, Account)> {
    let worker = near_workspaces::sandbox().await?;
    let wasm = std::fs::read(HTLC_WASM_PATH)?;
    let htlc = worker.dev_deploy(&wasm).await?;

    htlc.call("new")
        .args_json(json!({
            "config": {
                "min_staked_value": NearToken::from_millinear(100),
                "min_retire_delay": 1,
                "max_block_interval": 6,
            }
        }))
        .transact()
        .await?
        .into_result()?;

    let bot = worker.dev_create_account().await?;
    let checker = worker.dev_create_account().await?;
    let user = worker.dev_create_account().await?;
    Ok((worker, htlc, bot, checker, user))
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn hash_lock(secret: &[u8]) -> String {
    near_sdk::bs58::encode(Sha256::digest(secret)).into_string()
}

/// Registers `bot` with a 1 NEAR stake, attaching the storage charge on top.
async fn register_bot(htlc: &Contract, bot: &Account, checker: &Account) -> Result<()> {
    let params = json!({
        "intro": "bot1",
        "bch_pkh": encode(&[0x4d; 20]),
        "bch_lock_time": 72,
        "sbch_lock_time": LOCK_TIME,
        "penalty_bps": 500,
        "bch_price": "1000000000000000000",
        "sbch_price": "999000000000000000",
        "min_swap_amt": NearToken::from_millinear(100),
        "max_swap_amt": NearToken::from_near(1),
        "status_checker": checker.id(),
    });
    let storage: NearToken = htlc
        .view("get_registration_storage_cost")
        .args_json(json!({ "addr": bot.id(), "params": params }))
        .await?
        .json()?;

    bot.call(htlc.id(), "register_market_maker")
        .args_json(json!({ "params": params }))
        .deposit(NearToken::from_near(1).saturating_add(storage))
        .max_gas()
        .transact()
        .await?
        .into_result()?;
    Ok(())
}

#[tokio::test]
#[ignore = "needs a near sandbox and the wasm from `cargo near build`"]
async fn test_lock_and_unlock_with_market_maker() -> Result<()> {
    // 1. ARRANGE
    let (_worker, htlc, bot, checker, user) = setup().await?;
    register_bot(&htlc, &bot, &checker).await?;

    let bots: Value = htlc
        .view("get_market_makers")
        .args_json(json!({ "start": 0, "count": 10 }))
        .await?
        .json()?;
    assert_eq!(bots.as_array().map(Vec::len), Some(1));

    let secret = [7u8; 32];
    let lock = hash_lock(&secret);
    let storage: NearToken = htlc
        .view("get_lock_storage_cost")
        .args_json(json!({
            "sender": user.id(),
            "receiver": bot.id(),
            "receiver_pkh": encode(&[0xa4; 20]),
        }))
        .await?
        .json()?;
    let deposit = NearToken::from_millinear(200).saturating_add(storage);

    // 2. ACT: user locks value for the bot.
    let result = user
        .call(htlc.id(), "lock")
        .args_json(json!({
            "receiver": bot.id(),
            "hash_lock": lock,
            "lock_duration": LOCK_TIME,
            "receiver_pkh": encode(&[0xa4; 20]),
            "penalty_bps": 500,
            "receiver_is_mm": true,
            "expected_price": "1000000000000000000",
        }))
        .deposit(deposit)
        .max_gas()
        .transact()
        .await?
        .into_result()?;
    assert!(result.logs().iter().any(|l| l.contains("\"event\":\"lock\"")));

    let swaps: Value = htlc
        .view("get_swaps")
        .args_json(json!({ "start": 0, "count": 10 }))
        .await?
        .json()?;
    assert_eq!(swaps[0]["hash_lock"], lock);

    // Same (sender, hash-lock) again is refused.
    let duplicate = user
        .call(htlc.id(), "lock")
        .args_json(json!({
            "receiver": bot.id(),
            "hash_lock": lock,
            "lock_duration": LOCK_TIME,
            "receiver_pkh": encode(&[0xa4; 20]),
            "penalty_bps": 500,
            "receiver_is_mm": true,
            "expected_price": "1000000000000000000",
        }))
        .deposit(deposit)
        .max_gas()
        .transact()
        .await?;
    assert!(duplicate.is_failure());

    // 3. ACT (Part 2): bot reveals the secret.
    let before = bot.view_account().await?.balance;
    let unlocked = bot
        .call(htlc.id(), "unlock")
        .args_json(json!({
            "sender": user.id(),
            "hash_lock": lock,
            "preimage": encode(&secret),
        }))
        .max_gas()
        .transact()
        .await?
        .into_result()?;
    let unlock_events: Vec<&str> = unlocked
        .logs()
        .into_iter()
        .filter(|l| l.starts_with("EVENT_JSON:"))
        .collect();
    assert_eq!(unlock_events.len(), 1);
    assert!(unlock_events[0].contains("\"event\":\"unlock\""));

    // 4. ASSERT
    let state: String = htlc
        .view("get_swap_state")
        .args_json(json!({ "sender": user.id(), "hash_lock": lock }))
        .await?
        .json()?;
    assert_eq!(state, "UNLOCKED");
    let after = bot.view_account().await?.balance;
    assert!(after > before);

    let custodied: NearToken = htlc.view("get_custodied_balance").await?.json()?;
    assert_eq!(custodied, NearToken::from_near(1));
    Ok(())
}

#[tokio::test]
#[ignore = "needs a near sandbox and the wasm from `cargo near build`"]
async fn test_retire_and_withdraw_stake() -> Result<()> {
    let (worker, htlc, bot, checker, _user) = setup().await?;
    register_bot(&htlc, &bot, &checker).await?;

    let early = bot
        .call(htlc.id(), "withdraw_staked_value")
        .max_gas()
        .transact()
        .await?;
    assert!(early.is_failure());

    bot.call(htlc.id(), "retire_market_maker")
        .max_gas()
        .transact()
        .await?
        .into_result()?;

    // Let the 1s cooling-off period pass.
    worker.fast_forward(10).await?;

    bot.call(htlc.id(), "withdraw_staked_value")
        .max_gas()
        .transact()
        .await?
        .into_result()?;

    let bots: Value = htlc
        .view("get_market_makers")
        .args_json(json!({ "start": 0, "count": 10 }))
        .await?
        .json()?;
    assert_eq!(bots.as_array().map(Vec::len), Some(0));

    let custodied: NearToken = htlc.view("get_custodied_balance").await?.json()?;
    assert!(custodied.is_zero());
    Ok(())
}
