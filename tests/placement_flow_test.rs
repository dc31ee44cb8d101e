//! Bet placement against the in-memory chain client
//! Covers value computation, allowance handling and receipt extraction failures

use casino_engine::{
    abi,
    config::{ChainConfig, EngineConfig, RetryConfig},
    games::CoinFace,
    mocks::{MockCasinoClient, MockFailure, MOCK_ACCOUNT},
    CasinoEngine, CasinoGame, GameChoice, PlaceBetParams, PlacementCallbacks, Token,
};
use casino_engine::games::EncodedInput;
use casino_engine::ContractCall;
use ethers::types::{Address, Bytes, Log, H256, U256};
use std::sync::{Arc, Mutex};

const CHAIN: u64 = 8453;
const COIN_TOSS: Address = Address::repeat_byte(0x21);
const ROULETTE: Address = Address::repeat_byte(0x22);
const WHEEL: Address = Address::repeat_byte(0x23);
const USDC: Address = Address::repeat_byte(0x55);

fn config() -> EngineConfig {
    let mut chain = ChainConfig::new(CHAIN, "Base");
    chain.polling_interval_ms = 10;
    chain.contracts.set(CasinoGame::CoinToss, COIN_TOSS);
    chain.contracts.set(CasinoGame::Roulette, ROULETTE);
    chain.contracts.set(CasinoGame::Wheel, WHEEL);

    let mut config = EngineConfig {
        chains: vec![chain],
        ..Default::default()
    };
    config.retry = RetryConfig {
        delays_ms: vec![1, 1],
        jitter: false,
    };
    config.placement.receipt_poll_interval_ms = 1;
    config
}

fn mock() -> MockCasinoClient {
    MockCasinoClient::new(CHAIN)
        .with_game(CasinoGame::CoinToss, COIN_TOSS)
        .with_game(CasinoGame::Roulette, ROULETTE)
        .with_game(CasinoGame::Wheel, WHEEL)
        .with_token(Token::erc20(USDC, "USDC", 6))
}

fn engine(mock: MockCasinoClient) -> CasinoEngine<MockCasinoClient> {
    CasinoEngine::new(Arc::new(mock), config()).expect("Failed to build engine")
}

fn heads(token: Address, amount: u64) -> PlaceBetParams {
    PlaceBetParams::new(
        CasinoGame::CoinToss,
        GameChoice::coin(CoinFace::Heads),
        token,
        U256::from(amount),
    )
}

fn reads_of(engine: &CasinoEngine<MockCasinoClient>, signature: &str) -> Vec<ContractCall> {
    let selector = abi::selector(signature);
    engine
        .client()
        .reads()
        .into_iter()
        .filter(|call| call.data.starts_with(&selector))
        .collect()
}

#[tokio::test]
async fn test_native_bet_sends_stake_plus_fee() {
    let engine = engine(mock());
    engine.client().set_vrf_cost(U256::from(5u64));

    let pending = Arc::new(Mutex::new(Vec::new()));
    let seen = pending.clone();
    let callbacks = PlacementCallbacks::new().on_bet_placed_pending(move |hash| {
        seen.lock().unwrap().push(hash);
    });

    let placed = engine
        .place_bet(&heads(Address::zero(), 100), &callbacks)
        .await
        .expect("Failed to place bet");

    let wagers = engine.client().wagers();
    assert_eq!(wagers.len(), 1);
    assert_eq!(wagers[0].value, U256::from(105u64));
    assert_eq!(wagers[0].call.bet.max_house_edge, 350);
    assert_eq!(wagers[0].call.affiliate, Address::zero());

    assert_eq!(placed.total_bet_amount, U256::from(100u64));
    assert_eq!(placed.charged_randomness_fee, U256::from(5u64));
    assert!(placed.token.is_native());
    assert_eq!(placed.token.symbol, "ETH");
    assert_eq!(placed.receiver, MOCK_ACCOUNT);
    assert_eq!(placed.encoded_input, EncodedInput::Bool(true));
    assert_eq!(placed.placement_tx_hash, wagers[0].tx_hash);
    assert_eq!(*pending.lock().unwrap(), vec![wagers[0].tx_hash]);

    assert!(engine.client().approvals().is_empty());
    assert_eq!(engine.metrics().bets_placed(CasinoGame::CoinToss), 1);
}

#[tokio::test]
async fn test_erc20_with_allowance_skips_approval() {
    let engine = engine(mock());
    engine.client().set_vrf_cost(U256::from(7u64));
    engine
        .client()
        .set_allowance(USDC, MOCK_ACCOUNT, COIN_TOSS, U256::from(100u64));

    let placed = engine
        .place_bet(&heads(USDC, 100), &PlacementCallbacks::default())
        .await
        .expect("Failed to place bet");

    assert!(engine.client().approvals().is_empty());
    assert_eq!(engine.client().writes().len(), 1);
    // ERC-20 stakes move through the allowance, only the fee is sent as value
    assert_eq!(engine.client().wagers()[0].value, U256::from(7u64));
    assert_eq!(placed.token.symbol, "USDC");
    assert_eq!(placed.token.decimals, 6);
    assert_eq!(engine.metrics().approvals_sent(), 0);
}

#[tokio::test]
async fn test_erc20_shortfall_approves_difference() {
    let engine = engine(mock());
    engine
        .client()
        .set_allowance(USDC, MOCK_ACCOUNT, COIN_TOSS, U256::from(40u64));

    let approved = Arc::new(Mutex::new(None));
    let seen = approved.clone();
    let callbacks = PlacementCallbacks::new().on_approved(move |hash| {
        *seen.lock().unwrap() = Some(hash);
    });

    engine
        .place_bet(&heads(USDC, 50).bet_count(2), &callbacks)
        .await
        .expect("Failed to place bet");

    let approvals = engine.client().approvals();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].token, USDC);
    assert_eq!(approvals[0].spender, COIN_TOSS);
    assert_eq!(approvals[0].amount, U256::from(60u64));
    assert!(approved.lock().unwrap().is_some());
    assert_eq!(engine.metrics().approvals_sent(), 1);

    // Approve first, then the wager
    let writes = engine.client().writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].to, USDC);
    assert_eq!(writes[1].to, COIN_TOSS);
}

#[tokio::test]
async fn test_allowance_check_can_be_disabled() {
    let engine = engine(mock());

    engine
        .place_bet(&heads(USDC, 100).check_allowance(false), &PlacementCallbacks::default())
        .await
        .expect("Failed to place bet");

    assert!(engine.client().approvals().is_empty());
}

#[tokio::test]
async fn test_foreign_logs_give_event_not_found() {
    let engine = engine(mock());
    let foreign = Log {
        address: Address::repeat_byte(0x99),
        topics: vec![abi::place_bet_topic(CasinoGame::CoinToss)],
        ..Default::default()
    };
    let garbled = Log {
        address: COIN_TOSS,
        topics: vec![abi::place_bet_topic(CasinoGame::CoinToss), H256::zero()],
        data: Bytes::from(vec![1, 2, 3]),
        ..Default::default()
    };
    engine.client().set_receipt_logs(vec![foreign, garbled]);

    let err = engine
        .place_bet(&heads(Address::zero(), 100), &PlacementCallbacks::default())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "EVENT_NOT_FOUND");
    let tx = err.as_transaction().unwrap();
    assert_eq!(tx.context.tx_hash, Some(engine.client().wagers()[0].tx_hash));
    assert_eq!(tx.context.game, Some(CasinoGame::CoinToss));
    assert_eq!(engine.metrics().bets_placed(CasinoGame::CoinToss), 0);
}

#[tokio::test]
async fn test_missing_account() {
    let engine = engine(mock().with_default_account(None));

    let err = engine
        .place_bet(&heads(Address::zero(), 100), &PlacementCallbacks::default())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "ACCOUNT_MISSING");
    assert!(engine.client().writes().is_empty());
}

#[tokio::test]
async fn test_receiver_pays_without_wallet_account() {
    let friend = Address::repeat_byte(0x77);
    let engine = engine(mock().with_default_account(None));

    let placed = engine
        .place_bet(&heads(Address::zero(), 100).receiver(friend), &PlacementCallbacks::default())
        .await
        .expect("Failed to place bet");

    assert_eq!(placed.receiver, friend);
    assert_eq!(engine.client().writes()[0].from, Some(friend));
}

#[tokio::test]
async fn test_undeployed_game() {
    let engine = engine(mock());
    let params = PlaceBetParams::new(
        CasinoGame::Dice,
        GameChoice::dice(50),
        Address::zero(),
        U256::from(100u64),
    );

    let err = engine
        .place_bet(&params, &PlacementCallbacks::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "GAME_UNSUPPORTED");
}

#[tokio::test]
async fn test_gas_price_failure_is_not_retried() {
    let engine = engine(mock());
    engine.client().fail_times(MockFailure::GasPrice, 1);

    let err = engine
        .place_bet(&heads(Address::zero(), 100), &PlacementCallbacks::default())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "GAS_PRICE_FAILED");
    assert!(engine.client().writes().is_empty());
}

#[tokio::test]
async fn test_vrf_quote_rides_the_retry_ladder() {
    let engine = engine(mock());
    engine.client().set_vrf_cost(U256::from(3u64));
    engine.client().fail_times(MockFailure::VrfCost, 2);

    engine
        .place_bet(&heads(Address::zero(), 100), &PlacementCallbacks::default())
        .await
        .expect("Failed to place bet");
    assert_eq!(engine.client().wagers()[0].value, U256::from(103u64));

    engine.client().fail_always(MockFailure::VrfCost);
    let err = engine
        .place_bet(&heads(Address::zero(), 100), &PlacementCallbacks::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VRF_COST_FAILED");
}

#[tokio::test]
async fn test_fixed_vrf_fee_skips_quote() {
    let engine = engine(mock());
    engine.client().fail_always(MockFailure::VrfCost);

    engine
        .place_bet(
            &heads(Address::zero(), 100).vrf_fee(U256::from(9u64)),
            &PlacementCallbacks::default(),
        )
        .await
        .expect("Failed to place bet");
    assert_eq!(engine.client().wagers()[0].value, U256::from(109u64));
}

#[tokio::test]
async fn test_rejected_by_bet_requirements() {
    let engine = engine(mock());
    engine.client().set_requirements(abi::BetRequirements {
        is_allowed: false,
        max_bet_amount: U256::MAX,
        max_bet_count: U256::from(100u64),
    });

    let err = engine
        .place_bet(&heads(Address::zero(), 100), &PlacementCallbacks::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TOKEN_NOT_ALLOWED");
    assert!(engine.client().writes().is_empty());

    // Same bet passes once the contract limits are skipped
    engine
        .place_bet(
            &heads(Address::zero(), 100).check_requirements(false),
            &PlacementCallbacks::default(),
        )
        .await
        .expect("Failed to place bet");
}

#[tokio::test]
async fn test_submit_failure_carries_context() {
    let engine = engine(mock());
    engine.client().fail_times(MockFailure::Wager, 1);

    let err = engine
        .place_bet(&heads(Address::zero(), 100).bet_count(3), &PlacementCallbacks::default())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "SUBMIT_FAILED");
    let context = &err.as_transaction().unwrap().context;
    assert_eq!(context.chain_id, Some(CHAIN));
    assert_eq!(context.bet_amount, Some(U256::from(100u64)));
    assert_eq!(context.bet_count, Some(3));
    assert_eq!(context.value, Some(U256::from(300u64)));
}

#[tokio::test]
async fn test_receipt_blip_is_retried() {
    let engine = engine(mock());
    engine.client().fail_times(MockFailure::Receipt, 1);

    engine
        .place_bet(&heads(Address::zero(), 100), &PlacementCallbacks::default())
        .await
        .expect("Failed to place bet");
}

#[tokio::test]
async fn test_roulette_selection_on_chain() {
    let engine = engine(mock());
    let params = PlaceBetParams::new(
        CasinoGame::Roulette,
        GameChoice::roulette((1..=18).collect::<Vec<u8>>()),
        Address::zero(),
        U256::from(1_000u64),
    );

    let placed = engine
        .place_bet(&params, &PlacementCallbacks::default())
        .await
        .expect("Failed to place bet");

    let EncodedInput::Mask(mask) = placed.encoded_input else {
        panic!("roulette input must be a mask");
    };
    assert_eq!(mask.count_ones(), 18);
}

#[tokio::test]
async fn test_recover_placed_bet() {
    let engine = engine(mock());
    let placed = engine
        .place_bet(&heads(USDC, 100), &PlacementCallbacks::default())
        .await
        .expect("Failed to place bet");

    let recovered = engine
        .recover_placed_bet(CasinoGame::CoinToss, placed.placement_tx_hash)
        .await
        .expect("Failed to recover bet");

    assert_eq!(recovered.key(), placed.key());
    assert_eq!(recovered.total_bet_amount, placed.total_bet_amount);
    assert_eq!(recovered.token, placed.token);
}

#[tokio::test]
async fn test_vrf_quote_uses_the_wager_gas_price() {
    let engine = engine(mock());
    let chosen = U256::from(42_000_000_000u64);

    engine
        .place_bet(&heads(Address::zero(), 100).gas_price(chosen), &PlacementCallbacks::default())
        .await
        .expect("Failed to place bet");

    let quotes = reads_of(&engine, abi::GET_VRF_COST);
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].gas_price, Some(chosen));
    assert_eq!(engine.client().wagers()[0].gas_price, Some(chosen));
}

#[tokio::test]
async fn test_vrf_quote_falls_back_to_client_gas_price() {
    let engine = engine(mock());
    let node_price = U256::from(3_000_000_000u64);
    engine.client().set_gas_price(node_price);

    engine
        .place_bet(&heads(Address::zero(), 100), &PlacementCallbacks::default())
        .await
        .expect("Failed to place bet");

    let quotes = reads_of(&engine, abi::GET_VRF_COST);
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].gas_price, Some(node_price));
}

#[tokio::test]
async fn test_unknown_token_metadata_fails_with_context() {
    let engine = engine(mock());
    let unknown = Address::repeat_byte(0x66);

    let err = engine
        .place_bet(&heads(unknown, 100).bet_count(2), &PlacementCallbacks::default())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "TOKEN_METADATA_FAILED");
    let tx = err.as_transaction().expect("transaction error");
    assert_eq!(tx.context.chain_id, Some(CHAIN));
    assert_eq!(tx.context.game, Some(CasinoGame::CoinToss));
    assert_eq!(tx.context.token, Some(unknown));
    assert_eq!(tx.context.bet_amount, Some(U256::from(100u64)));
    assert_eq!(tx.context.bet_count, Some(2));
    assert!(tx.source.is_some());
    assert!(engine.client().writes().is_empty());
    assert_eq!(engine.metrics().bets_placed(CasinoGame::CoinToss), 0);
}

#[tokio::test]
async fn test_stake_overflow_fails_with_context() {
    let engine = engine(mock());
    let huge = PlaceBetParams::new(
        CasinoGame::CoinToss,
        GameChoice::coin(CoinFace::Heads),
        Address::zero(),
        U256::MAX,
    );

    let err = engine
        .place_bet(&huge.bet_count(2), &PlacementCallbacks::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "AMOUNT_OVERFLOW");
    assert_eq!(err.as_transaction().unwrap().context.bet_amount, Some(U256::MAX));

    // A stake that fits alone but not together with the randomness fee
    let err = engine
        .place_bet(
            &heads(Address::zero(), 1).vrf_fee(U256::MAX),
            &PlacementCallbacks::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "AMOUNT_OVERFLOW");
    assert_eq!(err.as_transaction().unwrap().context.token, Some(Address::zero()));
    assert!(engine.client().writes().is_empty());
}

#[tokio::test]
async fn test_weighted_placement_sizes_limits_by_gross_multiplier() {
    let engine = engine(mock());
    engine
        .client()
        .set_game_config(3, vec![50, 30, 20], vec![0, 15_000, 30_000]);
    engine.client().set_house_edge(350);
    let params = PlaceBetParams::new(
        CasinoGame::Wheel,
        GameChoice::weighted(3),
        Address::zero(),
        U256::from(1_000u64),
    );

    let placed = engine
        .place_bet(&params, &PlacementCallbacks::default())
        .await
        .expect("Failed to place bet");

    assert_eq!(placed.encoded_input, EncodedInput::ConfigId(3));
    assert!(reads_of(&engine, abi::HOUSE_EDGE).is_empty());
    let requirements = reads_of(&engine, abi::GET_BET_REQUIREMENTS);
    assert_eq!(requirements.len(), 1);
    assert_eq!(U256::from_big_endian(&requirements[0].data[36..68]), U256::from(30_000u64));
}
