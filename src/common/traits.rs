//! Shared traits and interfaces
//!
//! [`CasinoClient`] is the capability set the engine needs from a chain: contract
//! reads and writes, receipts, logs and live event subscriptions. The engine never
//! talks to a node any other way, which keeps every pipeline testable in memory.

use crate::common::types::ChainId;
use crate::errors::ClientResult;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U256};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Read-only contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    pub from: Option<Address>,
    /// Gas price the call is evaluated at; the node default when unset
    pub gas_price: Option<U256>,
}

impl ContractCall {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            from: None,
            gas_price: None,
        }
    }

    pub fn gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }
}

/// State-changing contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_price: Option<U256>,
    pub from: Option<Address>,
}

impl WriteRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            value: U256::zero(),
            gas_price: None,
            from: None,
        }
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

/// Logs of one event on one contract, optionally narrowed by the first indexed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub address: Address,
    pub topic0: H256,
    pub topic1: Option<H256>,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

impl EventFilter {
    pub fn new(address: Address, topic0: H256) -> Self {
        Self {
            address,
            topic0,
            topic1: None,
            from_block: None,
            to_block: None,
        }
    }

    pub fn topic1(mut self, topic: H256) -> Self {
        self.topic1 = Some(topic);
        self
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    pub fn to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    /// Client-side equivalent of the node's log filter
    pub fn matches(&self, log: &Log) -> bool {
        if log.address != self.address || log.topics.first() != Some(&self.topic0) {
            return false;
        }
        if let Some(topic1) = &self.topic1 {
            if log.topics.get(1) != Some(topic1) {
                return false;
            }
        }
        let block = log.block_number.map(|number| number.as_u64());
        match (block, self.from_block, self.to_block) {
            (Some(block), Some(from), _) if block < from => false,
            (Some(block), _, Some(to)) if block > to => false,
            _ => true,
        }
    }
}

/// Handle of a live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live stream of matching log batches; errors do not end the stream
#[derive(Debug)]
pub struct EventSubscription {
    pub id: SubscriptionId,
    pub logs: mpsc::Receiver<ClientResult<Vec<Log>>>,
}

/// Chain access needed to place and resolve bets
#[async_trait]
pub trait CasinoClient: Send + Sync + 'static {
    fn chain_id(&self) -> ChainId;

    /// Account of the connected wallet, if any
    fn default_account(&self) -> Option<Address>;

    async fn read_contract(&self, call: ContractCall) -> ClientResult<Bytes>;

    /// Batch of reads; answers are in call order
    async fn read_contracts(&self, calls: Vec<ContractCall>) -> ClientResult<Vec<Bytes>> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.read_contract(call).await?);
        }
        Ok(results)
    }

    /// Sign and submit, returning the transaction hash
    async fn write_contract(&self, request: WriteRequest) -> ClientResult<H256>;

    /// Poll until the transaction is mined
    async fn wait_transaction(
        &self,
        hash: H256,
        poll_interval: Duration,
    ) -> ClientResult<TransactionReceipt>;

    /// Receipt of an already mined transaction
    async fn get_transaction_receipt(&self, hash: H256) -> ClientResult<TransactionReceipt>;

    async fn gas_price(&self) -> ClientResult<U256>;

    async fn block_number(&self) -> ClientResult<u64>;

    async fn get_logs(&self, filter: EventFilter) -> ClientResult<Vec<Log>>;

    async fn watch_contract_event(
        &self,
        filter: EventFilter,
        poll_interval: Duration,
    ) -> ClientResult<EventSubscription>;

    /// Release a subscription. Unknown ids are ignored.
    fn unwatch(&self, id: SubscriptionId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClientError;
    use ethers::types::U64;

    fn log_at(address: Address, topics: Vec<H256>, block: u64) -> Log {
        Log {
            address,
            topics,
            block_number: Some(U64::from(block)),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_matches_address_and_topics() {
        let address = Address::repeat_byte(1);
        let topic0 = H256::repeat_byte(2);
        let id = H256::from_low_u64_be(9);
        let filter = EventFilter::new(address, topic0).topic1(id);

        assert!(filter.matches(&log_at(address, vec![topic0, id], 10)));
        assert!(!filter.matches(&log_at(address, vec![topic0, H256::zero()], 10)));
        assert!(!filter.matches(&log_at(Address::repeat_byte(3), vec![topic0, id], 10)));
        assert!(!filter.matches(&log_at(address, vec![], 10)));
    }

    #[test]
    fn test_filter_block_range() {
        let address = Address::repeat_byte(1);
        let topic0 = H256::repeat_byte(2);
        let filter = EventFilter::new(address, topic0).from_block(5).to_block(8);

        assert!(!filter.matches(&log_at(address, vec![topic0], 4)));
        assert!(filter.matches(&log_at(address, vec![topic0], 5)));
        assert!(filter.matches(&log_at(address, vec![topic0], 8)));
        assert!(!filter.matches(&log_at(address, vec![topic0], 9)));
    }

    // Minimal client exercising the default batch read
    struct EchoClient;

    #[async_trait]
    impl CasinoClient for EchoClient {
        fn chain_id(&self) -> ChainId {
            1
        }

        fn default_account(&self) -> Option<Address> {
            None
        }

        async fn read_contract(&self, call: ContractCall) -> ClientResult<Bytes> {
            if call.data.is_empty() {
                return Err(ClientError::Rpc("empty call".to_string()));
            }
            Ok(call.data)
        }

        async fn write_contract(&self, _request: WriteRequest) -> ClientResult<H256> {
            Ok(H256::zero())
        }

        async fn wait_transaction(
            &self,
            hash: H256,
            _poll_interval: Duration,
        ) -> ClientResult<TransactionReceipt> {
            self.get_transaction_receipt(hash).await
        }

        async fn get_transaction_receipt(&self, hash: H256) -> ClientResult<TransactionReceipt> {
            Err(ClientError::NotFound(format!("{:?}", hash)))
        }

        async fn gas_price(&self) -> ClientResult<U256> {
            Ok(U256::one())
        }

        async fn block_number(&self) -> ClientResult<u64> {
            Ok(0)
        }

        async fn get_logs(&self, _filter: EventFilter) -> ClientResult<Vec<Log>> {
            Ok(vec![])
        }

        async fn watch_contract_event(
            &self,
            _filter: EventFilter,
            _poll_interval: Duration,
        ) -> ClientResult<EventSubscription> {
            let (_tx, logs) = mpsc::channel(1);
            Ok(EventSubscription {
                id: SubscriptionId::new(),
                logs,
            })
        }

        fn unwatch(&self, _id: SubscriptionId) {}
    }

    #[tokio::test]
    async fn test_default_batch_read_preserves_order() {
        let client = EchoClient;
        let to = Address::zero();
        let results = client
            .read_contracts(vec![
                ContractCall::new(to, vec![1u8]),
                ContractCall::new(to, vec![2u8]),
            ])
            .await
            .unwrap();
        assert_eq!(results, vec![Bytes::from(vec![1u8]), Bytes::from(vec![2u8])]);

        let failed = client
            .read_contracts(vec![ContractCall::new(to, Vec::<u8>::new())])
            .await;
        assert!(failed.is_err());
    }
}
