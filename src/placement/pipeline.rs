//! Sequential placement state machine
//!
//! One attempt per call: resolve the contract and accounts, price gas, check
//! limits and allowance, price the randomness fee, submit the wager, then wait
//! for the receipt and pull the `PlaceBet` event out of it.

use crate::abi::{self, BetData, PlaceBetLog};
use crate::common::traits::{CasinoClient, WriteRequest};
use crate::common::types::{CasinoGame, ChainId, PlacedBet, Token};
use crate::config::{ChainConfig, PlacementConfig, RetryConfig};
use crate::errors::{
    ClientError, ConfigurationError, EngineError, EngineResult, MathError, TransactionContext,
    TransactionError,
};
use crate::games::{CodecContext, CodecRegistry, GameChoice};
use crate::math;
use crate::metrics::EngineMetrics;
use crate::placement::allowance::ensure_allowance;
use crate::placement::requirements::check_bet_requirements;
use crate::placement::vrf_fee::quote_vrf_fee;
use crate::retry::RetryLadder;
use crate::tokens::TokenCache;
use crate::tx_error;
use chrono::Utc;
use ethers::types::{Address, TransactionReceipt, H256, U256, U64};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything a caller decides about one wager
#[derive(Debug, Clone)]
pub struct PlaceBetParams {
    pub game: CasinoGame,
    pub choice: GameChoice,
    /// Zero address for the native currency
    pub token: Address,
    pub bet_amount: U256,
    pub bet_count: u32,
    pub receiver: Option<Address>,
    pub affiliate: Option<Address>,
    pub stop_gain: U256,
    pub stop_loss: U256,
    pub max_house_edge: Option<u16>,
    pub gas_price: Option<U256>,
    /// Fixed randomness fee; skips the contract quote
    pub vrf_fee: Option<U256>,
    pub check_allowance: Option<bool>,
    pub check_requirements: Option<bool>,
}

impl PlaceBetParams {
    pub fn new(game: CasinoGame, choice: GameChoice, token: Address, bet_amount: U256) -> Self {
        Self {
            game,
            choice,
            token,
            bet_amount,
            bet_count: 1,
            receiver: None,
            affiliate: None,
            stop_gain: U256::zero(),
            stop_loss: U256::zero(),
            max_house_edge: None,
            gas_price: None,
            vrf_fee: None,
            check_allowance: None,
            check_requirements: None,
        }
    }

    pub fn bet_count(mut self, bet_count: u32) -> Self {
        self.bet_count = bet_count;
        self
    }

    pub fn receiver(mut self, receiver: Address) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn affiliate(mut self, affiliate: Address) -> Self {
        self.affiliate = Some(affiliate);
        self
    }

    pub fn stop_gain(mut self, stop_gain: U256) -> Self {
        self.stop_gain = stop_gain;
        self
    }

    pub fn stop_loss(mut self, stop_loss: U256) -> Self {
        self.stop_loss = stop_loss;
        self
    }

    pub fn max_house_edge(mut self, max_house_edge: u16) -> Self {
        self.max_house_edge = Some(max_house_edge);
        self
    }

    pub fn gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn vrf_fee(mut self, vrf_fee: U256) -> Self {
        self.vrf_fee = Some(vrf_fee);
        self
    }

    pub fn check_allowance(mut self, enabled: bool) -> Self {
        self.check_allowance = Some(enabled);
        self
    }

    pub fn check_requirements(mut self, enabled: bool) -> Self {
        self.check_requirements = Some(enabled);
        self
    }
}

type TxCallback = Box<dyn Fn(H256) + Send + Sync>;

/// Hooks fired as the pipeline makes progress
#[derive(Default)]
pub struct PlacementCallbacks {
    on_approved: Option<TxCallback>,
    on_bet_placed_pending: Option<TxCallback>,
}

impl PlacementCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the approve hash once its receipt is in
    pub fn on_approved(mut self, f: impl Fn(H256) + Send + Sync + 'static) -> Self {
        self.on_approved = Some(Box::new(f));
        self
    }

    /// Called with the wager hash right after submission
    pub fn on_bet_placed_pending(mut self, f: impl Fn(H256) + Send + Sync + 'static) -> Self {
        self.on_bet_placed_pending = Some(Box::new(f));
        self
    }

    fn approved(&self, hash: H256) {
        if let Some(f) = &self.on_approved {
            f(hash);
        }
    }

    fn pending(&self, hash: H256) {
        if let Some(f) = &self.on_bet_placed_pending {
            f(hash);
        }
    }
}

impl std::fmt::Debug for PlacementCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementCallbacks")
            .field("on_approved", &self.on_approved.is_some())
            .field("on_bet_placed_pending", &self.on_bet_placed_pending.is_some())
            .finish()
    }
}

/// Places bets on one chain
pub struct BetPlacer<'a, C: CasinoClient + ?Sized> {
    client: &'a C,
    chain: &'a ChainConfig,
    settings: &'a PlacementConfig,
    retry: RetryLadder,
    tokens: &'a TokenCache,
    metrics: Option<&'a EngineMetrics>,
    codecs: CodecRegistry,
}

impl<'a, C: CasinoClient + ?Sized> BetPlacer<'a, C> {
    pub fn new(
        client: &'a C,
        chain: &'a ChainConfig,
        settings: &'a PlacementConfig,
        retry: &RetryConfig,
        tokens: &'a TokenCache,
    ) -> Self {
        Self {
            client,
            chain,
            settings,
            retry: RetryLadder::from_config(retry),
            tokens,
            metrics: None,
            codecs: CodecRegistry::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: &'a EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_retry(mut self, retry: RetryLadder) -> Self {
        self.retry = retry;
        self
    }

    fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.settings.receipt_poll_interval_ms)
    }

    /// Run the whole pipeline for one wager
    pub async fn place(
        &self,
        params: &PlaceBetParams,
        codec_ctx: &CodecContext<'_>,
        callbacks: &PlacementCallbacks,
    ) -> EngineResult<PlacedBet> {
        let result = self.run(params, codec_ctx, callbacks).await;
        if let Some(metrics) = self.metrics {
            match &result {
                Ok(bet) => metrics.record_bet_placed(bet.game),
                Err(err) => metrics.record_placement_failure(err.code()),
            }
        }
        if let Err(err) = &result {
            warn!(game = %params.game, code = err.code(), error = %err, "Bet placement failed");
        }
        result
    }

    async fn run(
        &self,
        params: &PlaceBetParams,
        codec_ctx: &CodecContext<'_>,
        callbacks: &PlacementCallbacks,
    ) -> EngineResult<PlacedBet> {
        let game = params.game;
        let chain_id = self.chain.chain_id;
        let contract = self.chain.contract(game)?;
        let vrf_bet_count = validate_amounts(params)?;
        let ctx = TransactionContext::for_bet(chain_id, game, params.token)
            .with_amounts(params.bet_amount, params.bet_count);
        let total = math::total_bet_amount(params.bet_amount, params.bet_count)
            .map_err(|e| tx_error!(AmountOverflow, ctx, "total stake: {}", e))?;

        let (payer, receiver) = resolve_accounts(self.client.default_account(), params.receiver)?;
        let token = self
            .tokens
            .resolve(self.client, self.chain, params.token)
            .await
            .map_err(|e| token_metadata_failed(e, &ctx))?;
        debug!(%game, chain_id, token = %token.symbol, payer = ?payer, receiver = ?receiver, "Placing bet");

        let gas_price = match params.gas_price {
            Some(price) => price,
            None => self
                .client
                .gas_price()
                .await
                .map_err(|e| tx_error!(GasPriceFailed, ctx, "failed to read gas price").with_source(e))?,
        };

        let input = self.codecs.encode(game, &params.choice, codec_ctx)?;
        let multiplier = self.codecs.multiplier(game, &params.choice, codec_ctx)?;

        if params.check_requirements.unwrap_or(self.settings.check_requirements) {
            check_bet_requirements(
                self.client,
                game,
                contract,
                params.token,
                multiplier,
                params.bet_amount,
                params.bet_count,
                &ctx,
            )
            .await?;
        }

        if !token.is_native() && params.check_allowance.unwrap_or(self.settings.check_allowance) {
            let approval = ensure_allowance(
                self.client,
                params.token,
                payer,
                contract,
                total,
                self.receipt_poll_interval(),
                &ctx,
            )
            .await?;
            if let Some(hash) = approval {
                info!(%game, tx = ?hash, "Allowance approved");
                if let Some(metrics) = self.metrics {
                    metrics.record_approval();
                }
                callbacks.approved(hash);
            }
        }

        let vrf_fee = match params.vrf_fee {
            Some(fee) => fee,
            None => {
                quote_vrf_fee(
                    self.client,
                    contract,
                    params.token,
                    vrf_bet_count,
                    gas_price,
                    self.settings.vrf_fee_buffer_bp,
                    &self.retry,
                    &ctx,
                )
                .await?
            }
        };

        let value = if token.is_native() {
            total
                .checked_add(vrf_fee)
                .ok_or_else(|| {
                    tx_error!(AmountOverflow, ctx, "stake plus randomness fee: {}", MathError::Overflow)
                })?
        } else {
            vrf_fee
        };
        let ctx = ctx.with_value(value);

        let bet = BetData {
            token: params.token,
            bet_amount: params.bet_amount,
            bet_count: params.bet_count,
            stop_gain: params.stop_gain,
            stop_loss: params.stop_loss,
            max_house_edge: params
                .max_house_edge
                .unwrap_or(self.settings.default_max_house_edge),
        };
        let affiliate = params
            .affiliate
            .or(self.chain.affiliate)
            .unwrap_or_else(Address::zero);
        let data = abi::encode_wager(game, &input, receiver, affiliate, &bet);

        let request = WriteRequest::new(contract, data)
            .value(value)
            .gas_price(gas_price)
            .from(payer);
        let hash = self
            .client
            .write_contract(request)
            .await
            .map_err(|e| tx_error!(SubmitFailed, ctx, "wager submission failed").with_source(e))?;
        let ctx = ctx.with_tx_hash(hash);
        info!(%game, tx = ?hash, %value, %vrf_fee, "Wager submitted");
        callbacks.pending(hash);

        let receipt = self.await_receipt(hash, &ctx).await?;
        let event = find_place_bet_event(game, contract, &receipt, &ctx)?;
        let placed = placed_bet_from_event(chain_id, game, token, &event, &receipt)?;

        info!(%game, bet_id = %placed.id, block = placed.placement_block, "Bet placed");
        Ok(placed)
    }

    async fn await_receipt(
        &self,
        hash: H256,
        ctx: &TransactionContext,
    ) -> Result<TransactionReceipt, TransactionError> {
        let poll_interval = self.receipt_poll_interval();
        // Reverts are final, only transport failures go back up the ladder
        let outcome = self
            .retry
            .run("wager_receipt", |_| async move {
                match self.client.wait_transaction(hash, poll_interval).await {
                    Err(ClientError::Reverted(reverted)) => Ok(Err(reverted)),
                    other => other.map(Ok),
                }
            })
            .await
            .map_err(|e| tx_error!(ReceiptFailed, ctx, "wager receipt unavailable").with_source(e))?;

        match outcome {
            Ok(receipt) if receipt.status == Some(U64::zero()) => {
                Err(tx_error!(Reverted, ctx, "wager transaction reverted"))
            }
            Ok(receipt) => Ok(receipt),
            Err(reverted) => Err(tx_error!(Reverted, ctx, "wager transaction {:?} reverted", reverted)),
        }
    }

    /// Rebuild a bet from an already mined wager transaction
    pub async fn recover(&self, game: CasinoGame, hash: H256) -> EngineResult<PlacedBet> {
        let contract = self.chain.contract(game)?;
        let ctx = TransactionContext {
            chain_id: Some(self.chain.chain_id),
            game: Some(game),
            tx_hash: Some(hash),
            ..Default::default()
        };

        let receipt = self
            .client
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| tx_error!(ReceiptFailed, ctx, "receipt unavailable").with_source(e))?;
        if receipt.status == Some(U64::zero()) {
            return Err(tx_error!(Reverted, ctx, "wager transaction reverted").into());
        }

        let event = find_place_bet_event(game, contract, &receipt, &ctx)?;
        let token = self
            .tokens
            .resolve(self.client, self.chain, event.token)
            .await
            .map_err(|e| {
                let ctx = TransactionContext {
                    token: Some(event.token),
                    ..ctx.clone()
                };
                token_metadata_failed(e, &ctx)
            })?;
        let placed = placed_bet_from_event(self.chain.chain_id, game, token, &event, &receipt)?;
        info!(%game, bet_id = %placed.id, "Recovered placed bet");
        Ok(placed)
    }
}

fn token_metadata_failed(err: EngineError, ctx: &TransactionContext) -> TransactionError {
    let failure = tx_error!(TokenMetadataFailed, ctx, "token metadata unavailable: {}", err);
    match err {
        EngineError::Client(source) => failure.with_source(source),
        _ => failure,
    }
}

/// Checks amounts and returns the bet count as the VRF quote's `uint16`
fn validate_amounts(params: &PlaceBetParams) -> Result<u16, ConfigurationError> {
    if params.bet_amount.is_zero() {
        return Err(ConfigurationError::InvalidValue {
            field: "bet_amount".to_string(),
            value: params.bet_amount.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    match u16::try_from(params.bet_count) {
        Ok(count) if count >= 1 => Ok(count),
        _ => Err(ConfigurationError::InvalidValue {
            field: "bet_count".to_string(),
            value: params.bet_count.to_string(),
            reason: format!("must be between 1 and {}", u16::MAX),
        }),
    }
}

/// Payer is the wallet account, falling back to the receiver; the receiver falls back to the payer
fn resolve_accounts(
    default_account: Option<Address>,
    receiver: Option<Address>,
) -> Result<(Address, Address), ConfigurationError> {
    let payer = default_account
        .or(receiver)
        .ok_or(ConfigurationError::AccountMissing)?;
    Ok((payer, receiver.unwrap_or(payer)))
}

fn find_place_bet_event(
    game: CasinoGame,
    contract: Address,
    receipt: &TransactionReceipt,
    ctx: &TransactionContext,
) -> Result<PlaceBetLog, TransactionError> {
    abi::find_place_bet(game, contract, &receipt.logs).ok_or_else(|| {
        tx_error!(
            EventNotFound,
            ctx,
            "no PlaceBet event among {} receipt logs",
            receipt.logs.len()
        )
    })
}

fn placed_bet_from_event(
    chain_id: ChainId,
    game: CasinoGame,
    token: Token,
    event: &PlaceBetLog,
    receipt: &TransactionReceipt,
) -> Result<PlacedBet, EngineError> {
    Ok(PlacedBet {
        id: event.id,
        bet_amount: event.amount,
        bet_count: event.bet_count,
        total_bet_amount: math::total_bet_amount(event.amount, event.bet_count)?,
        charged_randomness_fee: event.charged_vrf_cost,
        token,
        affiliate: event.affiliate,
        receiver: event.receiver,
        stop_gain: event.stop_gain,
        stop_loss: event.stop_loss,
        placement_tx_hash: receipt.transaction_hash,
        placement_block: receipt
            .block_number
            .map(|n| n.as_u64())
            .unwrap_or(event.block_number),
        chain_id,
        game,
        encoded_input: event.input,
        placed_at: Utc::now(),
    })
}
