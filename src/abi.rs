//! Contract ABI surface of the casino games and ERC-20 tokens
//!
//! Selectors and topics are the keccak256 of canonical signatures; every game
//! contract shares one layout and only differs in its input and rolled types.
//! Log extraction is an explicit filter-and-parse step: logs are filtered by
//! address and topic, then a typed decode is attempted and a failure means
//! "not this event".

use crate::common::types::{CasinoGame, Token};
use crate::errors::DecodeError;
use crate::games::{EncodedInput, EncodedRolled, KenoConfiguration};
use ethers::abi::{decode, encode, ParamType, Token as AbiToken};
use ethers::types::{Address, Bytes, Log, H256, U256, U64};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-game on-chain types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameAbi {
    pub input_type: &'static str,
    pub input_bits: Option<usize>,
    pub rolled_type: &'static str,
    pub rolled_bits: Option<usize>,
}

impl GameAbi {
    pub fn of(game: CasinoGame) -> Self {
        match game {
            CasinoGame::CoinToss => Self::new("bool", None, "bool", None),
            CasinoGame::Dice => Self::new("uint8", Some(8), "uint8", Some(8)),
            CasinoGame::Roulette => Self::new("uint40", Some(40), "uint8", Some(8)),
            CasinoGame::Keno => Self::new("uint40", Some(40), "uint40", Some(40)),
            CasinoGame::Wheel | CasinoGame::Plinko | CasinoGame::CustomWeightedGame => {
                Self::new("uint32", Some(32), "uint8", Some(8))
            }
        }
    }

    const fn new(
        input_type: &'static str,
        input_bits: Option<usize>,
        rolled_type: &'static str,
        rolled_bits: Option<usize>,
    ) -> Self {
        Self {
            input_type,
            input_bits,
            rolled_type,
            rolled_bits,
        }
    }

    fn param(bits: Option<usize>) -> ParamType {
        match bits {
            Some(bits) => ParamType::Uint(bits),
            None => ParamType::Bool,
        }
    }

    pub fn input_param(&self) -> ParamType {
        Self::param(self.input_bits)
    }

    pub fn rolled_param(&self) -> ParamType {
        Self::param(self.rolled_bits)
    }

    pub fn wager_signature(&self) -> String {
        format!(
            "wager({},address,address,(address,uint256,uint32,uint256,uint256,uint16))",
            self.input_type
        )
    }

    pub fn place_bet_signature(&self) -> String {
        format!(
            "PlaceBet(uint256,address,address,address,uint256,uint256,uint32,uint256,uint256,{})",
            self.input_type
        )
    }

    pub fn roll_signature(&self) -> String {
        format!(
            "Roll(uint256,address,address,uint256,{},{}[],uint256)",
            self.input_type, self.rolled_type
        )
    }
}

pub const GET_BET_REQUIREMENTS: &str = "getBetRequirements(address,uint256)";
pub const GET_VRF_COST: &str = "getChainlinkVRFCost(address,uint16)";
pub const GAME_CONFIGS: &str = "gameConfigs(uint32)";
pub const KENO_CONFIGURATION: &str = "kenoConfiguration(address)";
pub const HOUSE_EDGE: &str = "houseEdge(address)";
pub const ERC20_ALLOWANCE: &str = "allowance(address,address)";
pub const ERC20_APPROVE: &str = "approve(address,uint256)";
pub const ERC20_SYMBOL: &str = "symbol()";
pub const ERC20_DECIMALS: &str = "decimals()";

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn event_topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

pub fn place_bet_topic(game: CasinoGame) -> H256 {
    event_topic(&GameAbi::of(game).place_bet_signature())
}

pub fn roll_topic(game: CasinoGame) -> H256 {
    event_topic(&GameAbi::of(game).roll_signature())
}

/// Indexed `uint256` as a topic
pub fn uint_topic(value: U256) -> H256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    H256::from(bytes)
}

fn call_data(signature: &str, tokens: &[AbiToken]) -> Bytes {
    let mut data = selector(signature).to_vec();
    data.extend(encode(tokens));
    Bytes::from(data)
}

/// Split calldata into its arguments after checking the selector
fn call_args(signature: &str, data: &[u8], params: &[ParamType]) -> Result<Vec<AbiToken>, DecodeError> {
    if data.len() < 4 || data[..4] != selector(signature) {
        return Err(DecodeError::Abi(format!("calldata is not a {} call", signature)));
    }
    Ok(decode(params, &data[4..])?)
}

/// Ordered reader over decoded ABI tokens
struct Tokens {
    inner: std::vec::IntoIter<AbiToken>,
    what: &'static str,
}

impl Tokens {
    fn new(tokens: Vec<AbiToken>, what: &'static str) -> Self {
        Self {
            inner: tokens.into_iter(),
            what,
        }
    }

    fn next(&mut self) -> Result<AbiToken, DecodeError> {
        self.inner
            .next()
            .ok_or_else(|| DecodeError::Abi(format!("{}: missing field", self.what)))
    }

    fn mismatch(&self, expected: &str) -> DecodeError {
        DecodeError::Abi(format!("{}: expected {}", self.what, expected))
    }

    fn uint(&mut self) -> Result<U256, DecodeError> {
        let token = self.next()?;
        token.into_uint().ok_or_else(|| self.mismatch("uint"))
    }

    fn small_uint(&mut self, bits: usize) -> Result<u64, DecodeError> {
        let value = self.uint()?;
        fit_bits(value, bits, self.what)
    }

    fn address(&mut self) -> Result<Address, DecodeError> {
        let token = self.next()?;
        token.into_address().ok_or_else(|| self.mismatch("address"))
    }

    fn boolean(&mut self) -> Result<bool, DecodeError> {
        let token = self.next()?;
        token.into_bool().ok_or_else(|| self.mismatch("bool"))
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let token = self.next()?;
        token.into_string().ok_or_else(|| self.mismatch("string"))
    }

    fn array(&mut self) -> Result<Vec<AbiToken>, DecodeError> {
        let token = self.next()?;
        token.into_array().ok_or_else(|| self.mismatch("array"))
    }

    fn tuple(&mut self) -> Result<Tokens, DecodeError> {
        let token = self.next()?;
        let what = self.what;
        token
            .into_tuple()
            .map(|inner| Tokens::new(inner, what))
            .ok_or_else(|| self.mismatch("tuple"))
    }
}

/// `value` as `u64` if it fits in `bits`
fn fit_bits(value: U256, bits: usize, what: &'static str) -> Result<u64, DecodeError> {
    if value.bits() > bits.min(64) {
        return Err(DecodeError::ValueOutOfRange {
            what,
            value: value.to_string(),
        });
    }
    Ok(value.low_u64())
}

fn input_token(input: &EncodedInput) -> AbiToken {
    match input {
        EncodedInput::Bool(value) => AbiToken::Bool(*value),
        EncodedInput::Uint8(value) => AbiToken::Uint(U256::from(*value)),
        EncodedInput::Mask(value) => AbiToken::Uint(U256::from(*value)),
        EncodedInput::ConfigId(value) => AbiToken::Uint(U256::from(*value)),
    }
}

fn rolled_token(rolled: &EncodedRolled) -> AbiToken {
    match rolled {
        EncodedRolled::Bool(value) => AbiToken::Bool(*value),
        EncodedRolled::Uint8(value) => AbiToken::Uint(U256::from(*value)),
        EncodedRolled::Mask(value) => AbiToken::Uint(U256::from(*value)),
    }
}

fn read_input(game: CasinoGame, token: AbiToken) -> Result<EncodedInput, DecodeError> {
    let what = "game input";
    match game {
        CasinoGame::CoinToss => token
            .into_bool()
            .map(EncodedInput::Bool)
            .ok_or_else(|| DecodeError::Abi("coin toss input is not a bool".to_string())),
        other => {
            let value = token
                .into_uint()
                .ok_or_else(|| DecodeError::Abi(format!("{} input is not a uint", other)))?;
            match other {
                CasinoGame::Dice => Ok(EncodedInput::Uint8(fit_bits(value, 8, what)? as u8)),
                CasinoGame::Roulette | CasinoGame::Keno => {
                    Ok(EncodedInput::Mask(fit_bits(value, 40, what)?))
                }
                _ => Ok(EncodedInput::ConfigId(fit_bits(value, 32, what)? as u32)),
            }
        }
    }
}

fn read_rolled(game: CasinoGame, token: AbiToken) -> Result<EncodedRolled, DecodeError> {
    let what = "rolled value";
    match game {
        CasinoGame::CoinToss => token
            .into_bool()
            .map(EncodedRolled::Bool)
            .ok_or_else(|| DecodeError::Abi("coin toss roll is not a bool".to_string())),
        other => {
            let value = token
                .into_uint()
                .ok_or_else(|| DecodeError::Abi(format!("{} roll is not a uint", other)))?;
            match other {
                CasinoGame::Keno => Ok(EncodedRolled::Mask(fit_bits(value, 40, what)?)),
                _ => Ok(EncodedRolled::Uint8(fit_bits(value, 8, what)? as u8)),
            }
        }
    }
}

/// `betData` tuple of a wager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetData {
    pub token: Address,
    pub bet_amount: U256,
    pub bet_count: u32,
    pub stop_gain: U256,
    pub stop_loss: U256,
    pub max_house_edge: u16,
}

impl BetData {
    fn to_token(&self) -> AbiToken {
        AbiToken::Tuple(vec![
            AbiToken::Address(self.token),
            AbiToken::Uint(self.bet_amount),
            AbiToken::Uint(U256::from(self.bet_count)),
            AbiToken::Uint(self.stop_gain),
            AbiToken::Uint(self.stop_loss),
            AbiToken::Uint(U256::from(self.max_house_edge)),
        ])
    }

    fn param() -> ParamType {
        ParamType::Tuple(vec![
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::Uint(32),
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Uint(16),
        ])
    }
}

/// Arguments of a `wager` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WagerCall {
    pub input: EncodedInput,
    pub receiver: Address,
    pub affiliate: Address,
    pub bet: BetData,
}

pub fn encode_wager(
    game: CasinoGame,
    input: &EncodedInput,
    receiver: Address,
    affiliate: Address,
    bet: &BetData,
) -> Bytes {
    call_data(
        &GameAbi::of(game).wager_signature(),
        &[
            input_token(input),
            AbiToken::Address(receiver),
            AbiToken::Address(affiliate),
            bet.to_token(),
        ],
    )
}

pub fn decode_wager_call(game: CasinoGame, data: &[u8]) -> Result<WagerCall, DecodeError> {
    let abi = GameAbi::of(game);
    let tokens = call_args(
        &abi.wager_signature(),
        data,
        &[abi.input_param(), ParamType::Address, ParamType::Address, BetData::param()],
    )?;
    let mut tokens = Tokens::new(tokens, "wager call");
    let input = read_input(game, tokens.next()?)?;
    let receiver = tokens.address()?;
    let affiliate = tokens.address()?;
    let mut bet = tokens.tuple()?;
    Ok(WagerCall {
        input,
        receiver,
        affiliate,
        bet: BetData {
            token: bet.address()?,
            bet_amount: bet.uint()?,
            bet_count: bet.small_uint(32)? as u32,
            stop_gain: bet.uint()?,
            stop_loss: bet.uint()?,
            max_house_edge: bet.small_uint(16)? as u16,
        },
    })
}

/// Answer of `getBetRequirements`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetRequirements {
    pub is_allowed: bool,
    pub max_bet_amount: U256,
    pub max_bet_count: U256,
}

pub fn encode_get_bet_requirements(token: Address, multiplier: u32) -> Bytes {
    call_data(
        GET_BET_REQUIREMENTS,
        &[AbiToken::Address(token), AbiToken::Uint(U256::from(multiplier))],
    )
}

pub fn decode_bet_requirements(data: &[u8]) -> Result<BetRequirements, DecodeError> {
    let tokens = decode(
        &[ParamType::Bool, ParamType::Uint(256), ParamType::Uint(256)],
        data,
    )?;
    let mut tokens = Tokens::new(tokens, "bet requirements");
    Ok(BetRequirements {
        is_allowed: tokens.boolean()?,
        max_bet_amount: tokens.uint()?,
        max_bet_count: tokens.uint()?,
    })
}

pub fn encode_bet_requirements(requirements: &BetRequirements) -> Bytes {
    Bytes::from(encode(&[
        AbiToken::Bool(requirements.is_allowed),
        AbiToken::Uint(requirements.max_bet_amount),
        AbiToken::Uint(requirements.max_bet_count),
    ]))
}

pub fn encode_get_vrf_cost(token: Address, bet_count: u16) -> Bytes {
    call_data(
        GET_VRF_COST,
        &[AbiToken::Address(token), AbiToken::Uint(U256::from(bet_count))],
    )
}

pub fn encode_game_config(config_id: u32) -> Bytes {
    call_data(GAME_CONFIGS, &[AbiToken::Uint(U256::from(config_id))])
}

/// `(weights, multipliers)` of a weighted game configuration
pub fn decode_game_config(data: &[u8]) -> Result<(Vec<u64>, Vec<u32>), DecodeError> {
    let tokens = decode(
        &[
            ParamType::Array(Box::new(ParamType::Uint(256))),
            ParamType::Array(Box::new(ParamType::Uint(32))),
        ],
        data,
    )?;
    let mut tokens = Tokens::new(tokens, "game config");
    let weights = uint_array(tokens.array()?, 64, "slot weight")?;
    let multipliers = uint_array(tokens.array()?, 32, "slot multiplier")?
        .into_iter()
        .map(|value| value as u32)
        .collect();
    Ok((weights, multipliers))
}

pub fn encode_game_config_response(weights: &[u64], multipliers: &[u32]) -> Bytes {
    Bytes::from(encode(&[
        AbiToken::Array(weights.iter().map(|w| AbiToken::Uint(U256::from(*w))).collect()),
        AbiToken::Array(
            multipliers
                .iter()
                .map(|m| AbiToken::Uint(U256::from(*m)))
                .collect(),
        ),
    ]))
}

fn uint_array(tokens: Vec<AbiToken>, bits: usize, what: &'static str) -> Result<Vec<u64>, DecodeError> {
    tokens
        .into_iter()
        .map(|token| {
            let value = token
                .into_uint()
                .ok_or_else(|| DecodeError::Abi(format!("{} is not a uint", what)))?;
            fit_bits(value, bits, what)
        })
        .collect()
}

pub fn encode_keno_configuration(token: Address) -> Bytes {
    call_data(KENO_CONFIGURATION, &[AbiToken::Address(token)])
}

pub fn decode_keno_configuration(data: &[u8]) -> Result<KenoConfiguration, DecodeError> {
    let tokens = decode(
        &[
            ParamType::Uint(8),
            ParamType::Uint(8),
            ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::Uint(32))))),
            ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::Uint(64))))),
        ],
        data,
    )?;
    let mut tokens = Tokens::new(tokens, "keno configuration");
    let biggest_selectable_ball = tokens.small_uint(8)? as u8;
    let max_selectable_balls = tokens.small_uint(8)? as u8;

    let mut multipliers = Vec::new();
    for row in tokens.array()? {
        let row = row
            .into_array()
            .ok_or_else(|| DecodeError::Abi("keno multiplier row is not an array".to_string()))?;
        multipliers.push(
            uint_array(row, 32, "keno multiplier")?
                .into_iter()
                .map(|value| value as u32)
                .collect(),
        );
    }
    let mut chances = Vec::new();
    for row in tokens.array()? {
        let row = row
            .into_array()
            .ok_or_else(|| DecodeError::Abi("keno chance row is not an array".to_string()))?;
        chances.push(uint_array(row, 64, "keno chance")?);
    }

    Ok(KenoConfiguration {
        biggest_selectable_ball,
        max_selectable_balls,
        multipliers,
        chances,
    })
}

pub fn encode_keno_configuration_response(config: &KenoConfiguration) -> Bytes {
    let table = |rows: Vec<Vec<U256>>| {
        AbiToken::Array(
            rows.into_iter()
                .map(|row| AbiToken::Array(row.into_iter().map(AbiToken::Uint).collect()))
                .collect(),
        )
    };
    Bytes::from(encode(&[
        AbiToken::Uint(U256::from(config.biggest_selectable_ball)),
        AbiToken::Uint(U256::from(config.max_selectable_balls)),
        table(
            config
                .multipliers
                .iter()
                .map(|row| row.iter().map(|v| U256::from(*v)).collect())
                .collect(),
        ),
        table(
            config
                .chances
                .iter()
                .map(|row| row.iter().map(|v| U256::from(*v)).collect())
                .collect(),
        ),
    ]))
}

pub fn encode_house_edge(token: Address) -> Bytes {
    call_data(HOUSE_EDGE, &[AbiToken::Address(token)])
}

pub fn decode_house_edge(data: &[u8]) -> Result<u16, DecodeError> {
    let tokens = decode(&[ParamType::Uint(16)], data)?;
    Ok(Tokens::new(tokens, "house edge").small_uint(16)? as u16)
}

pub fn encode_allowance(owner: Address, spender: Address) -> Bytes {
    call_data(
        ERC20_ALLOWANCE,
        &[AbiToken::Address(owner), AbiToken::Address(spender)],
    )
}

pub fn decode_allowance_call(data: &[u8]) -> Result<(Address, Address), DecodeError> {
    let tokens = call_args(ERC20_ALLOWANCE, data, &[ParamType::Address, ParamType::Address])?;
    let mut tokens = Tokens::new(tokens, "allowance call");
    Ok((tokens.address()?, tokens.address()?))
}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    call_data(
        ERC20_APPROVE,
        &[AbiToken::Address(spender), AbiToken::Uint(amount)],
    )
}

pub fn decode_approve_call(data: &[u8]) -> Result<(Address, U256), DecodeError> {
    let tokens = call_args(ERC20_APPROVE, data, &[ParamType::Address, ParamType::Uint(256)])?;
    let mut tokens = Tokens::new(tokens, "approve call");
    Ok((tokens.address()?, tokens.uint()?))
}

pub fn encode_symbol() -> Bytes {
    call_data(ERC20_SYMBOL, &[])
}

pub fn encode_decimals() -> Bytes {
    call_data(ERC20_DECIMALS, &[])
}

pub fn decode_string(data: &[u8]) -> Result<String, DecodeError> {
    let tokens = decode(&[ParamType::String], data)?;
    Tokens::new(tokens, "string").string()
}

pub fn decode_u8(data: &[u8]) -> Result<u8, DecodeError> {
    let tokens = decode(&[ParamType::Uint(8)], data)?;
    Ok(Tokens::new(tokens, "uint8").small_uint(8)? as u8)
}

pub fn decode_u256(data: &[u8]) -> Result<U256, DecodeError> {
    let tokens = decode(&[ParamType::Uint(256)], data)?;
    Tokens::new(tokens, "uint256").uint()
}

pub fn encode_u256(value: U256) -> Bytes {
    Bytes::from(encode(&[AbiToken::Uint(value)]))
}

pub fn encode_string(value: &str) -> Bytes {
    Bytes::from(encode(&[AbiToken::String(value.to_string())]))
}

/// ERC-20 metadata read from `symbol()` and `decimals()`
pub fn decode_token_metadata(address: Address, symbol: &[u8], decimals: &[u8]) -> Result<Token, DecodeError> {
    Ok(Token::erc20(address, decode_string(symbol)?, decode_u8(decimals)?))
}

/// Decoded `PlaceBet` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceBetLog {
    pub id: U256,
    pub receiver: Address,
    pub affiliate: Address,
    pub token: Address,
    pub amount: U256,
    pub charged_vrf_cost: U256,
    pub bet_count: u32,
    pub stop_gain: U256,
    pub stop_loss: U256,
    pub input: EncodedInput,
    pub tx_hash: H256,
    pub block_number: u64,
}

/// Decoded `Roll` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollLog {
    pub id: U256,
    pub receiver: Address,
    pub token: Address,
    pub total_bet_amount: U256,
    pub input: EncodedInput,
    pub rolled: Vec<EncodedRolled>,
    pub payout: U256,
    pub tx_hash: H256,
    pub block_number: u64,
}

fn indexed(log: &Log, expected_topic: H256) -> Result<(U256, Address, Address), DecodeError> {
    if log.topics.len() != 4 || log.topics[0] != expected_topic {
        return Err(DecodeError::Abi("unexpected topics".to_string()));
    }
    Ok((
        U256::from_big_endian(log.topics[1].as_bytes()),
        Address::from(log.topics[2]),
        Address::from(log.topics[3]),
    ))
}

pub fn parse_place_bet(game: CasinoGame, log: &Log) -> Result<PlaceBetLog, DecodeError> {
    let abi = GameAbi::of(game);
    let (id, receiver, token) = indexed(log, place_bet_topic(game))?;
    let tokens = decode(
        &[
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Uint(32),
            ParamType::Uint(256),
            ParamType::Uint(256),
            abi.input_param(),
        ],
        &log.data,
    )?;
    let mut tokens = Tokens::new(tokens, "PlaceBet");
    Ok(PlaceBetLog {
        id,
        receiver,
        token,
        affiliate: tokens.address()?,
        amount: tokens.uint()?,
        charged_vrf_cost: tokens.uint()?,
        bet_count: tokens.small_uint(32)? as u32,
        stop_gain: tokens.uint()?,
        stop_loss: tokens.uint()?,
        input: read_input(game, tokens.next()?)?,
        tx_hash: log.transaction_hash.unwrap_or_default(),
        block_number: log.block_number.map(|n| n.as_u64()).unwrap_or_default(),
    })
}

pub fn parse_roll(game: CasinoGame, log: &Log) -> Result<RollLog, DecodeError> {
    let abi = GameAbi::of(game);
    let (id, receiver, token) = indexed(log, roll_topic(game))?;
    let tokens = decode(
        &[
            ParamType::Uint(256),
            abi.input_param(),
            ParamType::Array(Box::new(abi.rolled_param())),
            ParamType::Uint(256),
        ],
        &log.data,
    )?;
    let mut tokens = Tokens::new(tokens, "Roll");
    let total_bet_amount = tokens.uint()?;
    let input = read_input(game, tokens.next()?)?;
    let rolled = tokens
        .array()?
        .into_iter()
        .map(|token| read_rolled(game, token))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RollLog {
        id,
        receiver,
        token,
        total_bet_amount,
        input,
        rolled,
        payout: tokens.uint()?,
        tx_hash: log.transaction_hash.unwrap_or_default(),
        block_number: log.block_number.map(|n| n.as_u64()).unwrap_or_default(),
    })
}

/// First decodable `PlaceBet` emitted by `contract`
pub fn find_place_bet(game: CasinoGame, contract: Address, logs: &[Log]) -> Option<PlaceBetLog> {
    let topic = place_bet_topic(game);
    logs.iter()
        .filter(|log| log.address == contract && log.topics.first() == Some(&topic))
        .find_map(|log| match parse_place_bet(game, log) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                debug!(%game, error = %err, "Skipping undecodable PlaceBet log");
                None
            }
        })
}

/// First decodable `Roll` of bet `id` emitted by `contract`
pub fn find_roll(game: CasinoGame, contract: Address, id: U256, logs: &[Log]) -> Option<RollLog> {
    let topic = roll_topic(game);
    let id_topic = uint_topic(id);
    logs.iter()
        .filter(|log| {
            log.address == contract
                && log.topics.first() == Some(&topic)
                && log.topics.get(1) == Some(&id_topic)
        })
        .find_map(|log| match parse_roll(game, log) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(%game, bet_id = %id, error = %err, "Skipping undecodable Roll log");
                None
            }
        })
}

fn event_log(contract: Address, topics: Vec<H256>, data: Vec<u8>, tx_hash: H256, block: u64) -> Log {
    Log {
        address: contract,
        topics,
        data: Bytes::from(data),
        transaction_hash: Some(tx_hash),
        block_number: Some(U64::from(block)),
        ..Default::default()
    }
}

/// Build the log a game contract emits for a placed bet
pub fn encode_place_bet_log(game: CasinoGame, contract: Address, event: &PlaceBetLog) -> Log {
    let data = encode(&[
        AbiToken::Address(event.affiliate),
        AbiToken::Uint(event.amount),
        AbiToken::Uint(event.charged_vrf_cost),
        AbiToken::Uint(U256::from(event.bet_count)),
        AbiToken::Uint(event.stop_gain),
        AbiToken::Uint(event.stop_loss),
        input_token(&event.input),
    ]);
    event_log(
        contract,
        vec![
            place_bet_topic(game),
            uint_topic(event.id),
            H256::from(event.receiver),
            H256::from(event.token),
        ],
        data,
        event.tx_hash,
        event.block_number,
    )
}

/// Build the log a game contract emits once a bet is rolled
pub fn encode_roll_log(game: CasinoGame, contract: Address, event: &RollLog) -> Log {
    let data = encode(&[
        AbiToken::Uint(event.total_bet_amount),
        input_token(&event.input),
        AbiToken::Array(event.rolled.iter().map(rolled_token).collect()),
        AbiToken::Uint(event.payout),
    ]);
    event_log(
        contract,
        vec![
            roll_topic(game),
            uint_topic(event.id),
            H256::from(event.receiver),
            H256::from(event.token),
        ],
        data,
        event.tx_hash,
        event.block_number,
    )
}
