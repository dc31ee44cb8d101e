//! Engine facade
//!
//! [`CasinoEngine`] owns the chain client and everything shared between bets:
//! configuration, the game configuration registry, token metadata and metrics.
//! Placement and resolution are delegated to [`BetPlacer`] and [`RollWaiter`].

use crate::abi;
use crate::aggregator::{self, WeightedOutput};
use crate::common::traits::{CasinoClient, ContractCall};
use crate::common::types::{CasinoGame, ChainId, PlacedBet, RolledBet, Token};
use crate::config::{ChainConfig, EngineConfig};
use crate::errors::{DecodeError, EngineResult};
use crate::game_configs::GameConfigRegistry;
use crate::games::{
    CodecContext, CodecRegistry, EncodedInput, GameChoice, KenoConfiguration, RolledOutcome,
    WeightedGameConfiguration,
};
use crate::metrics::EngineMetrics;
use crate::placement::{BetPlacer, PlaceBetParams, PlacementCallbacks};
use crate::resolution::{self, RollWaiter};
use crate::tokens::TokenCache;
use dashmap::DashMap;
use ethers::types::{Address, H256};
use std::sync::Arc;
use tracing::{debug, info};

/// Bet lifecycle engine bound to one chain client
pub struct CasinoEngine<C: CasinoClient> {
    client: Arc<C>,
    config: EngineConfig,
    chain: ChainConfig,
    game_configs: GameConfigRegistry,
    tokens: TokenCache,
    metrics: Arc<EngineMetrics>,
    codecs: CodecRegistry,
    waiter: RollWaiter<C>,
    // Configurations read from the contracts, for ids and tokens the registry lacks
    chain_weighted: DashMap<(CasinoGame, u32), WeightedGameConfiguration>,
    chain_keno: DashMap<Address, KenoConfiguration>,
}

impl<C: CasinoClient> CasinoEngine<C> {
    /// Engine for the chain the client is connected to
    pub fn new(client: Arc<C>, config: EngineConfig) -> EngineResult<Self> {
        let game_configs = GameConfigRegistry::from_config(&config)?;
        Self::with_game_configs(client, config, game_configs)
    }

    /// Engine with a caller supplied configuration registry
    pub fn with_game_configs(
        client: Arc<C>,
        config: EngineConfig,
        game_configs: GameConfigRegistry,
    ) -> EngineResult<Self> {
        config.validate()?;
        let chain = config.chain(client.chain_id())?.clone();
        let metrics = Arc::new(EngineMetrics::new()?);
        let waiter = RollWaiter::from_config(client.clone(), &config, chain.polling_interval())
            .with_metrics(metrics.clone());

        info!(
            chain_id = chain.chain_id,
            chain = %chain.name,
            games = chain.contracts.deployed().len(),
            weighted_configs = game_configs.weighted_count(),
            "Casino engine ready"
        );

        Ok(Self {
            tokens: TokenCache::new(config.token_cache_capacity),
            client,
            config,
            chain,
            game_configs,
            metrics,
            codecs: CodecRegistry::new(),
            waiter,
            chain_weighted: DashMap::new(),
            chain_keno: DashMap::new(),
        })
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain.chain_id
    }

    pub fn game_configs(&self) -> &GameConfigRegistry {
        &self.game_configs
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    /// Prometheus text exposition of the engine metrics
    pub fn render_metrics(&self) -> EngineResult<String> {
        self.metrics.render()
    }

    /// Roll waits currently in flight
    pub fn pending_rolls(&self) -> usize {
        self.waiter.pending_count()
    }

    pub async fn token(&self, address: Address) -> EngineResult<Token> {
        self.tokens.resolve(self.client.as_ref(), &self.chain, address).await
    }

    /// House edge the game contract charges on `token`, in basis points
    pub async fn house_edge(&self, game: CasinoGame, token: Address) -> EngineResult<u16> {
        let contract = self.chain.contract(game)?;
        let answer = self
            .client
            .read_contract(ContractCall::new(contract, abi::encode_house_edge(token)))
            .await?;
        Ok(abi::decode_house_edge(&answer)?)
    }

    /// Weighted configuration from the registry, or from the contract's `gameConfigs`
    pub async fn fetch_weighted_config(
        &self,
        game: CasinoGame,
        config_id: u32,
    ) -> EngineResult<WeightedGameConfiguration> {
        if let Some(config) = self.game_configs.weighted(self.chain.chain_id, game, config_id) {
            return Ok(config.clone());
        }
        if let Some(config) = self.chain_weighted.get(&(game, config_id)) {
            return Ok(config.clone());
        }

        let contract = self.chain.contract(game)?;
        debug!(%game, config_id, "Reading weighted configuration from chain");
        let answer = self
            .client
            .read_contract(ContractCall::new(contract, abi::encode_game_config(config_id)))
            .await?;
        let (weights, multipliers) = abi::decode_game_config(&answer)?;
        let config = WeightedGameConfiguration::new(config_id, game, weights, multipliers);
        config.validate()?;
        self.chain_weighted.insert((game, config_id), config.clone());
        Ok(config)
    }

    /// Keno table from the registry, or from the contract's `kenoConfiguration`
    pub async fn fetch_keno_config(&self, token: Address) -> EngineResult<KenoConfiguration> {
        if let Some(config) = self.game_configs.keno(self.chain.chain_id) {
            return Ok(config.clone());
        }
        if let Some(config) = self.chain_keno.get(&token) {
            return Ok(config.clone());
        }

        let contract = self.chain.contract(CasinoGame::Keno)?;
        debug!(token = ?token, "Reading keno configuration from chain");
        let answer = self
            .client
            .read_contract(ContractCall::new(contract, abi::encode_keno_configuration(token)))
            .await?;
        let config = abi::decode_keno_configuration(&answer)?;
        config.validate()?;
        self.chain_keno.insert(token, config.clone());
        Ok(config)
    }

    /// Buckets a player sees for a weighted configuration
    pub async fn weighted_outputs(
        &self,
        game: CasinoGame,
        config_id: u32,
        house_edge: u16,
    ) -> EngineResult<Vec<WeightedOutput>> {
        let config = self.fetch_weighted_config(game, config_id).await?;
        Ok(aggregator::unique_outputs(&config, house_edge)?)
    }

    /// Place one wager and wait for it to be confirmed
    pub async fn place_bet(
        &self,
        params: &PlaceBetParams,
        callbacks: &PlacementCallbacks,
    ) -> EngineResult<PlacedBet> {
        let keno = match params.game {
            CasinoGame::Keno => Some(self.fetch_keno_config(params.token).await?),
            _ => None,
        };
        let weighted = match (&params.choice, params.game.is_weighted()) {
            (GameChoice::Weighted { config_id }, true) => {
                Some(self.fetch_weighted_config(params.game, *config_id).await?)
            }
            _ => None,
        };
        // Placement only encodes and sizes limits by the gross multiplier, so
        // the house edge is never read here; decode paths fetch it
        let ctx = codec_context(keno.as_ref(), weighted.as_ref(), 0);

        BetPlacer::new(
            self.client.as_ref(),
            &self.chain,
            &self.config.placement,
            &self.config.retry,
            &self.tokens,
        )
        .with_metrics(&self.metrics)
        .place(params, &ctx, callbacks)
        .await
    }

    /// Rebuild a placed bet from a mined wager transaction
    pub async fn recover_placed_bet(&self, game: CasinoGame, tx_hash: H256) -> EngineResult<PlacedBet> {
        BetPlacer::new(
            self.client.as_ref(),
            &self.chain,
            &self.config.placement,
            &self.config.retry,
            &self.tokens,
        )
        .recover(game, tx_hash)
        .await
    }

    /// Wait for the `Roll` event of a placed bet
    pub async fn wait_for_roll(&self, bet: &PlacedBet) -> EngineResult<RolledBet> {
        let contract = self.chain.contract(bet.game)?;
        self.waiter.wait_for_roll(bet, contract).await
    }

    /// Decode every rolled value of a resolved bet
    pub async fn decode_rolled_bet(&self, rolled: &RolledBet) -> EngineResult<Vec<RolledOutcome>> {
        let game = rolled.placed.game;
        let keno = match game {
            CasinoGame::Keno => Some(self.fetch_keno_config(rolled.placed.token.address).await?),
            _ => None,
        };
        let (weighted, house_edge) = if game.is_weighted() {
            let EncodedInput::ConfigId(config_id) = rolled.placed.encoded_input else {
                return Err(DecodeError::ChoiceMismatch { game }.into());
            };
            let config = self.fetch_weighted_config(game, config_id).await?;
            let house_edge = self.house_edge(game, rolled.placed.token.address).await?;
            (Some(config), house_edge)
        } else {
            (None, 0)
        };

        let ctx = codec_context(keno.as_ref(), weighted.as_ref(), house_edge);
        Ok(resolution::decode_rolled_bet(rolled, &self.codecs, &ctx)?)
    }
}

fn codec_context<'a>(
    keno: Option<&'a KenoConfiguration>,
    weighted: Option<&'a WeightedGameConfiguration>,
    house_edge: u16,
) -> CodecContext<'a> {
    CodecContext {
        house_edge,
        keno,
        weighted,
    }
}

impl<C: CasinoClient> std::fmt::Debug for CasinoEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CasinoEngine")
            .field("chain_id", &self.chain.chain_id)
            .field("tokens", &self.tokens)
            .field("pending_rolls", &self.waiter.pending_count())
            .finish_non_exhaustive()
    }
}
