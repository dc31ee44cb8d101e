//! In-memory chain client
//!
//! Answers the contract reads the engine issues, mints receipts with a
//! `PlaceBet` log for every wager, serves scripted logs to history queries and
//! live subscriptions, and lets tests inject failures per operation.

use crate::abi::{self, BetRequirements, GameAbi, PlaceBetLog, WagerCall};
use crate::common::traits::{
    CasinoClient, ContractCall, EventFilter, EventSubscription, SubscriptionId, WriteRequest,
};
use crate::common::types::{CasinoGame, ChainId, Token};
use crate::errors::{ClientError, ClientResult};
use crate::games::KenoConfiguration;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U256, U64};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

/// Wallet account of a fresh mock
pub const MOCK_ACCOUNT: Address = Address::repeat_byte(0xaa);

/// Operations that can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockFailure {
    GasPrice,
    Allowance,
    Requirements,
    VrfCost,
    Approve,
    Wager,
    Receipt,
    BlockNumber,
    Logs,
    Watch,
}

/// A wager the mock accepted
#[derive(Debug, Clone)]
pub struct RecordedWager {
    pub game: CasinoGame,
    pub contract: Address,
    pub call: WagerCall,
    pub value: U256,
    pub gas_price: Option<U256>,
    pub tx_hash: H256,
}

/// An approve the mock accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedApproval {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub amount: U256,
}

struct Watcher {
    filter: EventFilter,
    /// `None` once the node side hung up
    sender: Option<mpsc::Sender<ClientResult<Vec<Log>>>>,
}

struct MockState {
    default_account: Option<Address>,
    gas_price: U256,
    vrf_cost: U256,
    house_edge: u16,
    requirements: BetRequirements,
    tokens: HashMap<Address, Token>,
    allowances: HashMap<(Address, Address, Address), U256>,
    game_configs: HashMap<u32, (Vec<u64>, Vec<u32>)>,
    keno: Option<KenoConfiguration>,
    contracts: HashMap<Address, CasinoGame>,
    failures: HashMap<MockFailure, usize>,
    receipts: HashMap<H256, TransactionReceipt>,
    receipt_logs: Option<Vec<Log>>,
    logs: Vec<Log>,
    reads: Vec<ContractCall>,
    writes: Vec<WriteRequest>,
    wagers: Vec<RecordedWager>,
    approvals: Vec<RecordedApproval>,
    watchers: HashMap<SubscriptionId, Watcher>,
    watch_calls: usize,
    unwatch_calls: usize,
    block: u64,
    next_tx: u64,
    next_bet_id: u64,
}

/// Scriptable [`CasinoClient`] for tests
pub struct MockCasinoClient {
    chain_id: ChainId,
    state: Mutex<MockState>,
}

impl MockCasinoClient {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            state: Mutex::new(MockState {
                default_account: Some(MOCK_ACCOUNT),
                gas_price: U256::from(1_000_000_000u64),
                vrf_cost: U256::zero(),
                house_edge: 0,
                requirements: BetRequirements {
                    is_allowed: true,
                    max_bet_amount: U256::MAX,
                    max_bet_count: U256::from(u16::MAX),
                },
                tokens: HashMap::new(),
                allowances: HashMap::new(),
                game_configs: HashMap::new(),
                keno: None,
                contracts: HashMap::new(),
                failures: HashMap::new(),
                receipts: HashMap::new(),
                receipt_logs: None,
                logs: Vec::new(),
                reads: Vec::new(),
                writes: Vec::new(),
                wagers: Vec::new(),
                approvals: Vec::new(),
                watchers: HashMap::new(),
                watch_calls: 0,
                unwatch_calls: 0,
                block: 100,
                next_tx: 1,
                next_bet_id: 1,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_game(self, game: CasinoGame, contract: Address) -> Self {
        self.state().contracts.insert(contract, game);
        self
    }

    pub fn with_default_account(self, account: Option<Address>) -> Self {
        self.state().default_account = account;
        self
    }

    pub fn with_token(self, token: Token) -> Self {
        self.state().tokens.insert(token.address, token);
        self
    }

    pub fn set_vrf_cost(&self, cost: U256) {
        self.state().vrf_cost = cost;
    }

    pub fn set_gas_price(&self, price: U256) {
        self.state().gas_price = price;
    }

    pub fn set_house_edge(&self, house_edge: u16) {
        self.state().house_edge = house_edge;
    }

    pub fn set_requirements(&self, requirements: BetRequirements) {
        self.state().requirements = requirements;
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state().allowances.insert((token, owner, spender), amount);
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state()
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_game_config(&self, config_id: u32, weights: Vec<u64>, multipliers: Vec<u32>) {
        self.state().game_configs.insert(config_id, (weights, multipliers));
    }

    pub fn set_keno(&self, config: KenoConfiguration) {
        self.state().keno = Some(config);
    }

    /// Replace the logs of every following wager receipt
    pub fn set_receipt_logs(&self, logs: Vec<Log>) {
        self.state().receipt_logs = Some(logs);
    }

    /// Fail the next `times` calls of `operation`
    pub fn fail_times(&self, operation: MockFailure, times: usize) {
        self.state().failures.insert(operation, times);
    }

    pub fn fail_always(&self, operation: MockFailure) {
        self.fail_times(operation, usize::MAX);
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Store a log for history queries only
    pub fn add_history(&self, log: Log) {
        self.state().logs.push(log);
    }

    /// Store a log and push it to every matching subscription
    pub fn emit_log(&self, log: Log) {
        let mut state = self.state();
        for watcher in state.watchers.values() {
            if let (true, Some(sender)) = (watcher.filter.matches(&log), &watcher.sender) {
                let _ = sender.try_send(Ok(vec![log.clone()]));
            }
        }
        state.logs.push(log);
    }

    /// Report an error on every live subscription
    pub fn push_subscription_error(&self, message: &str) {
        let state = self.state();
        for sender in state.watchers.values().filter_map(|w| w.sender.as_ref()) {
            let _ = sender.try_send(Err(ClientError::Subscription(message.to_string())));
        }
    }

    /// End every live stream while keeping the subscriptions registered
    pub fn close_subscriptions(&self) {
        for watcher in self.state().watchers.values_mut() {
            watcher.sender = None;
        }
    }

    pub fn reads(&self) -> Vec<ContractCall> {
        self.state().reads.clone()
    }

    pub fn writes(&self) -> Vec<WriteRequest> {
        self.state().writes.clone()
    }

    pub fn wagers(&self) -> Vec<RecordedWager> {
        self.state().wagers.clone()
    }

    pub fn approvals(&self) -> Vec<RecordedApproval> {
        self.state().approvals.clone()
    }

    pub fn watch_calls(&self) -> usize {
        self.state().watch_calls
    }

    pub fn unwatch_calls(&self) -> usize {
        self.state().unwatch_calls
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state().watchers.len()
    }

    pub fn current_block(&self) -> u64 {
        self.state().block
    }

    fn check(state: &mut MockState, operation: MockFailure) -> ClientResult<()> {
        match state.failures.get_mut(&operation) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                Err(ClientError::Rpc(format!("injected {:?} failure", operation)))
            }
            _ => Ok(()),
        }
    }

    fn next_hash(state: &mut MockState) -> H256 {
        let hash = H256::from_low_u64_be(state.next_tx);
        state.next_tx += 1;
        hash
    }

    fn mine(state: &mut MockState, request: &WriteRequest, hash: H256, logs: Vec<Log>) {
        state.block += 1;
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(U64::from(state.block)),
            status: Some(U64::one()),
            from: request.from.unwrap_or_default(),
            to: Some(request.to),
            logs,
            ..Default::default()
        };
        state.receipts.insert(hash, receipt);
    }

    fn wager_game(state: &MockState, request: &WriteRequest) -> Option<CasinoGame> {
        if let Some(game) = state.contracts.get(&request.to) {
            return Some(*game);
        }
        let prefix = request.data.get(..4)?;
        CasinoGame::ALL
            .into_iter()
            .find(|game| abi::selector(&GameAbi::of(*game).wager_signature()) == prefix)
    }

    fn accept_wager(
        state: &mut MockState,
        game: CasinoGame,
        request: &WriteRequest,
    ) -> ClientResult<H256> {
        Self::check(state, MockFailure::Wager)?;
        let call = abi::decode_wager_call(game, &request.data)
            .map_err(|e| ClientError::Rpc(format!("bad wager call data: {}", e)))?;
        let hash = Self::next_hash(state);
        let id = U256::from(state.next_bet_id);
        state.next_bet_id += 1;

        let stake = call
            .bet
            .bet_amount
            .saturating_mul(U256::from(call.bet.bet_count));
        let charged_vrf_cost = if call.bet.token.is_zero() {
            request.value.saturating_sub(stake)
        } else {
            request.value
        };

        let logs = match &state.receipt_logs {
            Some(logs) => logs.clone(),
            None => vec![abi::encode_place_bet_log(
                game,
                request.to,
                &PlaceBetLog {
                    id,
                    receiver: call.receiver,
                    affiliate: call.affiliate,
                    token: call.bet.token,
                    amount: call.bet.bet_amount,
                    charged_vrf_cost,
                    bet_count: call.bet.bet_count,
                    stop_gain: call.bet.stop_gain,
                    stop_loss: call.bet.stop_loss,
                    input: call.input,
                    tx_hash: hash,
                    block_number: state.block + 1,
                },
            )],
        };

        state.wagers.push(RecordedWager {
            game,
            contract: request.to,
            call,
            value: request.value,
            gas_price: request.gas_price,
            tx_hash: hash,
        });
        Self::mine(state, request, hash, logs);
        Ok(hash)
    }

    fn accept_approve(state: &mut MockState, request: &WriteRequest) -> ClientResult<H256> {
        Self::check(state, MockFailure::Approve)?;
        let (spender, amount) = abi::decode_approve_call(&request.data)
            .map_err(|e| ClientError::Rpc(format!("bad approve call data: {}", e)))?;
        let owner = request.from.unwrap_or_default();
        // ERC-20 approve overwrites the previous allowance
        state.allowances.insert((request.to, owner, spender), amount);
        state.approvals.push(RecordedApproval {
            token: request.to,
            owner,
            spender,
            amount,
        });
        let hash = Self::next_hash(state);
        Self::mine(state, request, hash, Vec::new());
        Ok(hash)
    }

    fn answer(state: &mut MockState, call: &ContractCall) -> ClientResult<Bytes> {
        let prefix = call
            .data
            .get(..4)
            .ok_or_else(|| ClientError::Rpc("call data too short".to_string()))?;
        let args = &call.data[4..];

        if prefix == abi::selector(abi::ERC20_ALLOWANCE) {
            Self::check(state, MockFailure::Allowance)?;
            let (owner, spender) = abi::decode_allowance_call(&call.data)
                .map_err(|e| ClientError::Rpc(e.to_string()))?;
            let current = state
                .allowances
                .get(&(call.to, owner, spender))
                .copied()
                .unwrap_or_default();
            return Ok(abi::encode_u256(current));
        }
        if prefix == abi::selector(abi::GET_BET_REQUIREMENTS) {
            Self::check(state, MockFailure::Requirements)?;
            return Ok(abi::encode_bet_requirements(&state.requirements));
        }
        if prefix == abi::selector(abi::GET_VRF_COST) {
            Self::check(state, MockFailure::VrfCost)?;
            return Ok(abi::encode_u256(state.vrf_cost));
        }
        if prefix == abi::selector(abi::HOUSE_EDGE) {
            return Ok(abi::encode_u256(U256::from(state.house_edge)));
        }
        if prefix == abi::selector(abi::GAME_CONFIGS) {
            let config_id = args
                .get(..32)
                .map(|word| U256::from_big_endian(word).low_u32())
                .ok_or_else(|| ClientError::Rpc("missing config id".to_string()))?;
            let (weights, multipliers) = state
                .game_configs
                .get(&config_id)
                .ok_or_else(|| ClientError::NotFound(format!("game config {}", config_id)))?;
            return Ok(abi::encode_game_config_response(weights, multipliers));
        }
        if prefix == abi::selector(abi::KENO_CONFIGURATION) {
            let keno = state
                .keno
                .as_ref()
                .ok_or_else(|| ClientError::NotFound("keno configuration".to_string()))?;
            return Ok(abi::encode_keno_configuration_response(keno));
        }
        if prefix == abi::selector(abi::ERC20_SYMBOL) {
            let token = state
                .tokens
                .get(&call.to)
                .ok_or_else(|| ClientError::NotFound(format!("token {:?}", call.to)))?;
            return Ok(abi::encode_string(&token.symbol));
        }
        if prefix == abi::selector(abi::ERC20_DECIMALS) {
            let token = state
                .tokens
                .get(&call.to)
                .ok_or_else(|| ClientError::NotFound(format!("token {:?}", call.to)))?;
            return Ok(abi::encode_u256(U256::from(token.decimals)));
        }
        Err(ClientError::Rpc(format!("unknown selector 0x{}", hex::encode(prefix))))
    }
}

#[async_trait]
impl CasinoClient for MockCasinoClient {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn default_account(&self) -> Option<Address> {
        self.state().default_account
    }

    async fn read_contract(&self, call: ContractCall) -> ClientResult<Bytes> {
        let mut state = self.state();
        state.reads.push(call.clone());
        Self::answer(&mut state, &call)
    }

    async fn write_contract(&self, request: WriteRequest) -> ClientResult<H256> {
        let mut state = self.state();
        state.writes.push(request.clone());

        if request.data.get(..4) == Some(&abi::selector(abi::ERC20_APPROVE)[..]) {
            return Self::accept_approve(&mut state, &request);
        }
        match Self::wager_game(&state, &request) {
            Some(game) => Self::accept_wager(&mut state, game, &request),
            None => Err(ClientError::Rpc(format!(
                "no contract behind {:?}",
                request.to
            ))),
        }
    }

    async fn wait_transaction(
        &self,
        hash: H256,
        _poll_interval: Duration,
    ) -> ClientResult<TransactionReceipt> {
        self.get_transaction_receipt(hash).await
    }

    async fn get_transaction_receipt(&self, hash: H256) -> ClientResult<TransactionReceipt> {
        let mut state = self.state();
        Self::check(&mut state, MockFailure::Receipt)?;
        state
            .receipts
            .get(&hash)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("receipt {:?}", hash)))
    }

    async fn gas_price(&self) -> ClientResult<U256> {
        let mut state = self.state();
        Self::check(&mut state, MockFailure::GasPrice)?;
        Ok(state.gas_price)
    }

    async fn block_number(&self) -> ClientResult<u64> {
        let mut state = self.state();
        Self::check(&mut state, MockFailure::BlockNumber)?;
        Ok(state.block)
    }

    async fn get_logs(&self, filter: EventFilter) -> ClientResult<Vec<Log>> {
        let mut state = self.state();
        Self::check(&mut state, MockFailure::Logs)?;
        Ok(state
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }

    async fn watch_contract_event(
        &self,
        filter: EventFilter,
        _poll_interval: Duration,
    ) -> ClientResult<EventSubscription> {
        let mut state = self.state();
        state.watch_calls += 1;
        Self::check(&mut state, MockFailure::Watch)?;

        let (sender, logs) = mpsc::channel(16);
        let id = SubscriptionId::new();
        state.watchers.insert(
            id,
            Watcher {
                filter,
                sender: Some(sender),
            },
        );
        Ok(EventSubscription { id, logs })
    }

    fn unwatch(&self, id: SubscriptionId) {
        let mut state = self.state();
        state.unwatch_calls += 1;
        state.watchers.remove(&id);
    }
}

impl std::fmt::Debug for MockCasinoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCasinoClient")
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failures_are_counted_down() {
        let mock = MockCasinoClient::new(1);
        mock.fail_times(MockFailure::GasPrice, 2);

        assert!(mock.gas_price().await.is_err());
        assert!(mock.gas_price().await.is_err());
        assert!(mock.gas_price().await.is_ok());
    }

    #[tokio::test]
    async fn test_token_metadata_reads() {
        let usdc = Token::erc20(Address::repeat_byte(7), "USDC", 6);
        let mock = MockCasinoClient::new(1).with_token(usdc.clone());

        let answers = mock
            .read_contracts(vec![
                ContractCall::new(usdc.address, abi::encode_symbol()),
                ContractCall::new(usdc.address, abi::encode_decimals()),
            ])
            .await
            .unwrap();
        let token = abi::decode_token_metadata(usdc.address, &answers[0], &answers[1]).unwrap();
        assert_eq!(token, usdc);
    }

    #[tokio::test]
    async fn test_unwatch_releases_subscription() {
        let mock = MockCasinoClient::new(1);
        let filter = EventFilter::new(Address::repeat_byte(1), H256::repeat_byte(2));
        let subscription = mock
            .watch_contract_event(filter, Duration::from_millis(10))
            .await
            .unwrap();

        assert_eq!(mock.active_subscriptions(), 1);
        mock.unwatch(subscription.id);
        assert_eq!(mock.active_subscriptions(), 0);
        assert_eq!(mock.unwatch_calls(), 1);
    }
}
