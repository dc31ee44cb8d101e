//! Roll resolution waiter
//!
//! Waits for the `Roll` event of a placed bet by racing a live subscription
//! against a historical log query. The first task to find a matching event
//! resolves the wait; anything arriving afterwards is discarded and counted.
//! Both tasks are aborted and the subscription released when the wait ends,
//! whatever the outcome.

use crate::abi::{self, RollLog};
use crate::common::traits::{CasinoClient, EventFilter, SubscriptionId};
use crate::common::types::{BetKey, CasinoGame, PlacedBet, RolledBet, SignedAmount};
use crate::config::EngineConfig;
use crate::errors::{ClientResult, DecodeError, EngineResult, TransactionContext, TransactionError};
use crate::games::{CodecContext, CodecRegistry, RolledOutcome};
use crate::metrics::EngineMetrics;
use crate::retry::RetryLadder;
use crate::tx_error;
use chrono::Utc;
use dashmap::DashMap;
use ethers::types::{Address, Log, U256};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Which lookup found the `Roll` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollSource {
    Live,
    Historical,
}

impl RollSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollSource::Live => "live",
            RollSource::Historical => "historical",
        }
    }
}

impl fmt::Display for RollSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type RollOutcome = Result<(RollLog, RollSource), TransactionError>;

/// Single-assignment slot shared by the racing lookups
pub(crate) struct ResolutionSlot<T> {
    resolved: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> ResolutionSlot<T> {
    pub(crate) fn new(sender: oneshot::Sender<T>) -> Self {
        Self {
            resolved: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Deliver `value` if nothing was delivered yet. Returns whether this call won.
    pub(crate) fn resolve(&self, value: T) -> bool {
        if self
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let sender = self.sender.lock().ok().and_then(|mut slot| slot.take());
        match sender {
            Some(sender) => sender.send(value).is_ok(),
            None => false,
        }
    }

    /// Refuse every later delivery
    pub(crate) fn close(&self) {
        self.resolved.store(true, Ordering::Release);
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}

/// Releases a live subscription exactly once
pub struct SubscriptionGuard<C: CasinoClient> {
    client: Arc<C>,
    id: Option<SubscriptionId>,
}

impl<C: CasinoClient> SubscriptionGuard<C> {
    pub fn new(client: Arc<C>, id: SubscriptionId) -> Self {
        Self {
            client,
            id: Some(id),
        }
    }

    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }
}

impl<C: CasinoClient> Drop for SubscriptionGuard<C> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            debug!(subscription = %id, "Releasing Roll subscription");
            self.client.unwatch(id);
        }
    }
}

/// Aborts the lookup tasks and forgets the pending entry when a wait ends
struct WaitScope<'a> {
    tasks: Vec<JoinHandle<()>>,
    pending: &'a DashMap<BetKey, Instant>,
    key: BetKey,
}

impl Drop for WaitScope<'_> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.pending.remove(&self.key);
    }
}

/// Resolves placed bets into rolled bets
pub struct RollWaiter<C: CasinoClient> {
    client: Arc<C>,
    timeout: Duration,
    poll_interval: Duration,
    historical: RetryLadder,
    metrics: Option<Arc<EngineMetrics>>,
    pending: DashMap<BetKey, Instant>,
}

impl<C: CasinoClient> RollWaiter<C> {
    pub fn new(client: Arc<C>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            client,
            timeout,
            poll_interval,
            historical: RetryLadder::none(),
            metrics: None,
            pending: DashMap::new(),
        }
    }

    /// Waiter using the engine's timeout and ladder and the chain's polling interval
    pub fn from_config(client: Arc<C>, config: &EngineConfig, poll_interval: Duration) -> Self {
        Self::new(client, config.roll_timeout(), poll_interval)
            .with_historical_retry(RetryLadder::from_config(&config.resolution.historical_retry))
    }

    pub fn with_historical_retry(mut self, ladder: RetryLadder) -> Self {
        self.historical = ladder;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of waits in flight
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, key: &BetKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Wait until `bet`'s `Roll` event shows up on `contract`, or the deadline passes
    pub async fn wait_for_roll(&self, bet: &PlacedBet, contract: Address) -> EngineResult<RolledBet> {
        let game = bet.game;
        let ctx = TransactionContext::for_bet(bet.chain_id, game, bet.token.address)
            .with_amounts(bet.bet_amount, bet.bet_count)
            .with_tx_hash(bet.placement_tx_hash)
            .with_bet_id(bet.id);
        let filter = EventFilter::new(contract, abi::roll_topic(game))
            .topic1(abi::uint_topic(bet.id))
            .from_block(bet.placement_block);

        let started = Instant::now();
        self.pending.insert(bet.key(), started);
        let mut scope = WaitScope {
            tasks: Vec::with_capacity(2),
            pending: &self.pending,
            key: bet.key(),
        };

        let (sender, receiver) = oneshot::channel::<RollOutcome>();
        let slot = Arc::new(ResolutionSlot::new(sender));

        let _subscription = match self
            .client
            .watch_contract_event(filter.clone(), self.poll_interval)
            .await
        {
            Ok(subscription) => {
                let guard = SubscriptionGuard::new(self.client.clone(), subscription.id);
                scope.tasks.push(tokio::spawn(watch_live(
                    game,
                    contract,
                    bet.id,
                    subscription.logs,
                    slot.clone(),
                    self.metrics.clone(),
                )));
                Some(guard)
            }
            Err(err) => {
                warn!(%game, bet_id = %bet.id, error = %err, "Live Roll subscription unavailable, relying on history");
                self.record(|m| m.record_subscription_error());
                None
            }
        };

        scope.tasks.push(tokio::spawn(query_history(
            self.client.clone(),
            game,
            filter,
            bet.id,
            self.historical.clone(),
            ctx.clone(),
            slot.clone(),
            self.metrics.clone(),
        )));

        debug!(%game, bet_id = %bet.id, timeout_ms = self.timeout.as_millis() as u64, "Waiting for Roll");
        let outcome = tokio::time::timeout(self.timeout, receiver).await;
        slot.close();
        drop(scope);

        match outcome {
            Ok(Ok(Ok((roll, source)))) => {
                let latency = started.elapsed();
                self.record(|m| m.record_roll_resolved(game, source.as_str(), latency));
                let rolled = rolled_bet_from_roll(bet, &roll);
                info!(
                    %game,
                    bet_id = %bet.id,
                    %source,
                    is_win = rolled.is_win,
                    payout = %rolled.payout,
                    latency_ms = latency.as_millis() as u64,
                    "Bet rolled"
                );
                Ok(rolled)
            }
            Ok(Ok(Err(err))) => Err(err.into()),
            Ok(Err(_)) => Err(tx_error!(RollQueryFailed, ctx, "roll lookups ended without a result").into()),
            Err(_) => {
                self.record(|m| m.record_roll_timeout());
                warn!(%game, bet_id = %bet.id, "Timed out waiting for Roll");
                Err(tx_error!(
                    RollEventTimeout,
                    ctx,
                    "no Roll event within {} ms",
                    self.timeout.as_millis()
                )
                .into())
            }
        }
    }

    fn record(&self, f: impl FnOnce(&EngineMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}

fn deliver(slot: &ResolutionSlot<RollOutcome>, outcome: RollOutcome, metrics: &Option<Arc<EngineMetrics>>) {
    if !slot.resolve(outcome) {
        debug!("Discarding late Roll result");
        if let Some(metrics) = metrics {
            metrics.record_late_result();
        }
    }
}

async fn watch_live(
    game: CasinoGame,
    contract: Address,
    id: U256,
    mut logs: mpsc::Receiver<ClientResult<Vec<Log>>>,
    slot: Arc<ResolutionSlot<RollOutcome>>,
    metrics: Option<Arc<EngineMetrics>>,
) {
    while let Some(batch) = logs.recv().await {
        match batch {
            Ok(batch) => {
                if let Some(roll) = abi::find_roll(game, contract, id, &batch) {
                    debug!(%game, bet_id = %id, "Roll found by live subscription");
                    deliver(&slot, Ok((roll, RollSource::Live)), &metrics);
                    return;
                }
            }
            Err(err) => {
                warn!(%game, bet_id = %id, error = %err, "Roll subscription error, still waiting");
                if let Some(metrics) = &metrics {
                    metrics.record_subscription_error();
                }
            }
        }
    }
    debug!(%game, bet_id = %id, "Roll subscription closed");
}

#[allow(clippy::too_many_arguments)]
async fn query_history<C: CasinoClient>(
    client: Arc<C>,
    game: CasinoGame,
    filter: EventFilter,
    id: U256,
    ladder: RetryLadder,
    ctx: TransactionContext,
    slot: Arc<ResolutionSlot<RollOutcome>>,
    metrics: Option<Arc<EngineMetrics>>,
) {
    let contract = filter.address;
    let result = ladder
        .run("roll_history", |_| {
            let client = client.clone();
            let filter = filter.clone();
            async move {
                let latest = client.block_number().await?;
                client.get_logs(filter.to_block(latest)).await
            }
        })
        .await;

    match result {
        Ok(logs) => match abi::find_roll(game, contract, id, &logs) {
            Some(roll) => {
                debug!(%game, bet_id = %id, "Roll found in history");
                deliver(&slot, Ok((roll, RollSource::Historical)), &metrics);
            }
            None => debug!(%game, bet_id = %id, "No Roll in history yet"),
        },
        Err(err) => {
            if slot.is_resolved() {
                return;
            }
            let err = tx_error!(RollQueryFailed, ctx, "historical Roll query failed").with_source(err);
            deliver(&slot, Err(err), &metrics);
        }
    }
}

/// Derive the rolled bet from the bet and its `Roll` event
pub fn rolled_bet_from_roll(placed: &PlacedBet, roll: &RollLog) -> RolledBet {
    let is_win = roll.payout >= roll.total_bet_amount;
    let rolled_bet_count = roll.rolled.len() as u32;
    let stop_triggered = rolled_bet_count != placed.bet_count;
    RolledBet {
        placed: placed.clone(),
        is_win,
        is_stop_loss_triggered: stop_triggered && !is_win,
        is_stop_gain_triggered: stop_triggered && is_win,
        rolled_bet_count,
        roll_total_bet_amount: roll.total_bet_amount,
        payout: roll.payout,
        benefit: SignedAmount::difference(roll.payout, roll.total_bet_amount),
        roll_tx_hash: roll.tx_hash,
        encoded_rolled: roll.rolled.clone(),
        resolved_at: Utc::now(),
    }
}

/// Decode every rolled value of `rolled` against the choice that was played
pub fn decode_rolled_bet(
    rolled: &RolledBet,
    registry: &CodecRegistry,
    ctx: &CodecContext<'_>,
) -> Result<Vec<RolledOutcome>, DecodeError> {
    registry.decode_rolled(
        rolled.placed.game,
        &rolled.placed.encoded_input,
        &rolled.encoded_rolled,
        ctx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Token;
    use crate::games::{CoinFace, EncodedInput, EncodedRolled};
    use ethers::types::H256;

    fn placed(bet_count: u32) -> PlacedBet {
        PlacedBet {
            id: U256::from(7u64),
            bet_amount: U256::from(100u64),
            bet_count,
            total_bet_amount: U256::from(100u64 * bet_count as u64),
            charged_randomness_fee: U256::from(5u64),
            token: Token::native("ETH", 18),
            affiliate: Address::zero(),
            receiver: Address::repeat_byte(1),
            stop_gain: U256::zero(),
            stop_loss: U256::zero(),
            placement_tx_hash: H256::repeat_byte(2),
            placement_block: 10,
            chain_id: 8453,
            game: CasinoGame::CoinToss,
            encoded_input: EncodedInput::Bool(true),
            placed_at: Utc::now(),
        }
    }

    fn roll(rolled: Vec<EncodedRolled>, total: u64, payout: u64) -> RollLog {
        RollLog {
            id: U256::from(7u64),
            receiver: Address::repeat_byte(1),
            token: Address::zero(),
            total_bet_amount: U256::from(total),
            input: EncodedInput::Bool(true),
            rolled,
            payout: U256::from(payout),
            tx_hash: H256::repeat_byte(3),
            block_number: 12,
        }
    }

    #[test]
    fn test_slot_resolves_once() {
        let (sender, mut receiver) = oneshot::channel();
        let slot = ResolutionSlot::new(sender);

        assert!(slot.resolve(1));
        assert!(!slot.resolve(2));
        assert!(slot.is_resolved());
        assert_eq!(receiver.try_recv().unwrap(), 1);
    }

    #[test]
    fn test_closed_slot_refuses() {
        let (sender, _receiver) = oneshot::channel::<u8>();
        let slot = ResolutionSlot::new(sender);
        slot.close();
        assert!(!slot.resolve(1));
    }

    #[test]
    fn test_full_sequence_win() {
        let rolled = rolled_bet_from_roll(
            &placed(2),
            &roll(vec![EncodedRolled::Bool(true), EncodedRolled::Bool(true)], 200, 392),
        );
        assert!(rolled.is_win);
        assert!(!rolled.is_stop_triggered());
        assert_eq!(rolled.rolled_bet_count, 2);
        assert_eq!(rolled.benefit.to_string(), "192");
        assert_eq!(rolled.roll_tx_hash, H256::repeat_byte(3));
    }

    #[test]
    fn test_stop_loss_truncates_sequence() {
        let rolled = rolled_bet_from_roll(
            &placed(5),
            &roll(vec![EncodedRolled::Bool(false), EncodedRolled::Bool(false)], 200, 0),
        );
        assert!(!rolled.is_win);
        assert!(rolled.is_stop_loss_triggered);
        assert!(!rolled.is_stop_gain_triggered);
        assert!(rolled.benefit.is_negative());
        assert!(rolled.roll_total_bet_amount <= rolled.placed.total_bet_amount);
    }

    #[test]
    fn test_stop_gain_truncates_sequence() {
        let rolled = rolled_bet_from_roll(
            &placed(5),
            &roll(vec![EncodedRolled::Bool(true)], 100, 196),
        );
        assert!(rolled.is_stop_gain_triggered);
        assert!(!rolled.is_stop_loss_triggered);
    }

    #[test]
    fn test_decode_rolled_bet() {
        let rolled = rolled_bet_from_roll(
            &placed(2),
            &roll(vec![EncodedRolled::Bool(true), EncodedRolled::Bool(false)], 200, 196),
        );
        let outcomes =
            decode_rolled_bet(&rolled, &CodecRegistry::new(), &CodecContext::default()).unwrap();
        assert_eq!(
            outcomes,
            vec![
                RolledOutcome::CoinToss {
                    face: CoinFace::Heads,
                    won: true
                },
                RolledOutcome::CoinToss {
                    face: CoinFace::Tails,
                    won: false
                },
            ]
        );
    }
}
