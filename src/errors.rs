//! Error types for the casino bet lifecycle engine
//!
//! Every failure surfaces as an [`EngineError`] with a machine-readable code and,
//! for transaction failures, the structured context of the bet that produced it.

use crate::common::types::{CasinoGame, ChainId};
use ethers::types::{Address, H256, U256};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Root error type for all engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unsupported chain or game
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Missing account, invalid configuration, rejected bet parameters
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Approval, submission, receipt, event decoding and roll timeout failures
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// Codec failures on choices and on-chain values
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Fixed-point arithmetic failures
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Chain reads outside a bet transaction
    #[error("Chain client error: {0}")]
    Client(#[from] ClientError),

    /// Metrics registry failures
    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl EngineError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Chain(e) => e.code(),
            EngineError::Configuration(e) => e.code(),
            EngineError::Transaction(e) => e.code.as_str(),
            EngineError::Decode(e) => e.code(),
            EngineError::Math(_) => "MATH_ERROR",
            EngineError::Client(_) => "CLIENT_ERROR",
            EngineError::Metrics(_) => "METRICS_ERROR",
        }
    }

    /// Transaction error details, if this is one
    pub fn as_transaction(&self) -> Option<&TransactionError> {
        match self {
            EngineError::Transaction(e) => Some(e),
            _ => None,
        }
    }
}

/// Unsupported chain/game errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("Chain {chain_id} is not supported")]
    UnsupportedChain { chain_id: ChainId },

    #[error("Game {game} is not deployed on chain {chain_id}")]
    UnsupportedGame { chain_id: ChainId, game: CasinoGame },
}

impl ChainError {
    pub fn code(&self) -> &'static str {
        match self {
            ChainError::UnsupportedChain { .. } => "CHAIN_UNSUPPORTED",
            ChainError::UnsupportedGame { .. } => "GAME_UNSUPPORTED",
        }
    }
}

/// Configuration and validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("No account available: pass a receiver or connect a wallet with a default account")]
    AccountMissing,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Token {token:?} is not allowed on {game}")]
    TokenNotAllowed { game: CasinoGame, token: Address },

    #[error("{field} {value} exceeds the contract limit {max}")]
    LimitExceeded {
        field: &'static str,
        value: U256,
        max: U256,
    },
}

impl ConfigurationError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigurationError::AccountMissing => "ACCOUNT_MISSING",
            ConfigurationError::ValidationFailed(_) => "CONFIG_INVALID",
            ConfigurationError::LoadFailed(_) => "CONFIG_LOAD_FAILED",
            ConfigurationError::InvalidValue { .. } => "INVALID_VALUE",
            ConfigurationError::TokenNotAllowed { .. } => "TOKEN_NOT_ALLOWED",
            ConfigurationError::LimitExceeded { .. } => "BET_LIMIT_EXCEEDED",
        }
    }
}

/// Machine-readable transaction failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionErrorCode {
    ApproveFailed,
    GasPriceFailed,
    VrfCostFailed,
    RequirementsFailed,
    TokenMetadataFailed,
    AmountOverflow,
    SubmitFailed,
    ReceiptFailed,
    Reverted,
    EventNotFound,
    RollEventTimeout,
    RollQueryFailed,
}

impl TransactionErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionErrorCode::ApproveFailed => "APPROVE_FAILED",
            TransactionErrorCode::GasPriceFailed => "GAS_PRICE_FAILED",
            TransactionErrorCode::VrfCostFailed => "VRF_COST_FAILED",
            TransactionErrorCode::RequirementsFailed => "REQUIREMENTS_FAILED",
            TransactionErrorCode::TokenMetadataFailed => "TOKEN_METADATA_FAILED",
            TransactionErrorCode::AmountOverflow => "AMOUNT_OVERFLOW",
            TransactionErrorCode::SubmitFailed => "SUBMIT_FAILED",
            TransactionErrorCode::ReceiptFailed => "RECEIPT_FAILED",
            TransactionErrorCode::Reverted => "REVERTED",
            TransactionErrorCode::EventNotFound => "EVENT_NOT_FOUND",
            TransactionErrorCode::RollEventTimeout => "ROLL_EVENT_TIMEOUT",
            TransactionErrorCode::RollQueryFailed => "ROLL_QUERY_FAILED",
        }
    }
}

impl fmt::Display for TransactionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured context attached to every transaction failure
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionContext {
    pub chain_id: Option<ChainId>,
    pub game: Option<CasinoGame>,
    pub token: Option<Address>,
    pub bet_amount: Option<U256>,
    pub bet_count: Option<u32>,
    pub value: Option<U256>,
    pub tx_hash: Option<H256>,
    pub bet_id: Option<U256>,
}

impl TransactionContext {
    pub fn for_bet(chain_id: ChainId, game: CasinoGame, token: Address) -> Self {
        Self {
            chain_id: Some(chain_id),
            game: Some(game),
            token: Some(token),
            ..Default::default()
        }
    }

    pub fn with_amounts(mut self, bet_amount: U256, bet_count: u32) -> Self {
        self.bet_amount = Some(bet_amount);
        self.bet_count = Some(bet_count);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_tx_hash(mut self, tx_hash: H256) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }

    pub fn with_bet_id(mut self, bet_id: U256) -> Self {
        self.bet_id = Some(bet_id);
        self
    }
}

impl fmt::Display for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(chain_id) = self.chain_id {
            parts.push(format!("chain={}", chain_id));
        }
        if let Some(game) = self.game {
            parts.push(format!("game={}", game));
        }
        if let Some(token) = self.token {
            parts.push(format!("token={:?}", token));
        }
        if let Some(amount) = self.bet_amount {
            parts.push(format!("amount={}", amount));
        }
        if let Some(count) = self.bet_count {
            parts.push(format!("count={}", count));
        }
        if let Some(value) = self.value {
            parts.push(format!("value={}", value));
        }
        if let Some(hash) = self.tx_hash {
            parts.push(format!("tx={:?}", hash));
        }
        if let Some(id) = self.bet_id {
            parts.push(format!("bet={}", id));
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Failure of one step of the placement pipeline or of a roll wait
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {message} ({context})")]
pub struct TransactionError {
    pub code: TransactionErrorCode,
    pub message: String,
    pub context: TransactionContext,
    #[source]
    pub source: Option<ClientError>,
}

impl TransactionError {
    pub fn new(
        code: TransactionErrorCode,
        message: impl Into<String>,
        context: TransactionContext,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            context,
            source: None,
        }
    }

    pub fn with_source(mut self, source: ClientError) -> Self {
        self.source = Some(source);
        self
    }
}

/// Codec failures: invalid choices and undecodable on-chain values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Bit {bit} is outside the {width}-bit mask")]
    MaskOutOfRange { bit: u32, width: u32 },

    #[error("{count} selections exceed the maximum of {max}")]
    SelectionTooLarge { count: usize, max: usize },

    #[error("Selection is empty")]
    EmptySelection,

    #[error("Value {value} is out of range for {what}")]
    ValueOutOfRange { what: &'static str, value: String },

    #[error("Rolled position {position} is outside a configuration of {slots} slots")]
    PositionOutOfRange { position: usize, slots: usize },

    #[error("Missing {0} configuration")]
    MissingConfiguration(&'static str),

    #[error("Choice does not belong to {game}")]
    ChoiceMismatch { game: CasinoGame },

    #[error("ABI decoding failed: {0}")]
    Abi(String),
}

impl DecodeError {
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::MaskOutOfRange { .. } => "MASK_OUT_OF_RANGE",
            DecodeError::SelectionTooLarge { .. } => "SELECTION_TOO_LARGE",
            DecodeError::EmptySelection => "EMPTY_SELECTION",
            DecodeError::ValueOutOfRange { .. } => "VALUE_OUT_OF_RANGE",
            DecodeError::PositionOutOfRange { .. } => "POSITION_OUT_OF_RANGE",
            DecodeError::MissingConfiguration(_) => "MISSING_CONFIGURATION",
            DecodeError::ChoiceMismatch { .. } => "CHOICE_MISMATCH",
            DecodeError::Abi(_) => "ABI_DECODE_FAILED",
        }
    }
}

impl From<ethers::abi::Error> for DecodeError {
    fn from(e: ethers::abi::Error) -> Self {
        DecodeError::Abi(e.to_string())
    }
}

/// Fixed-point arithmetic errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,
}

/// Errors reported by a chain client implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transaction {0:?} reverted")]
    Reverted(H256),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Subscription error: {0}")]
    Subscription(String),
}

impl From<prometheus::Error> for EngineError {
    fn from(e: prometheus::Error) -> Self {
        EngineError::Metrics(e.to_string())
    }
}

impl From<toml::de::Error> for ConfigurationError {
    fn from(e: toml::de::Error) -> Self {
        ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e))
    }
}

impl From<std::io::Error> for ConfigurationError {
    fn from(e: std::io::Error) -> Self {
        ConfigurationError::LoadFailed(e.to_string())
    }
}

// Convenience type aliases for Results
pub type EngineResult<T> = Result<T, EngineError>;
pub type ClientResult<T> = Result<T, ClientError>;

/// Macro for building a transaction error with context
#[macro_export]
macro_rules! tx_error {
    ($code:ident, $context:expr, $msg:expr) => {
        $crate::errors::TransactionError::new(
            $crate::errors::TransactionErrorCode::$code,
            $msg,
            $context.clone(),
        )
    };
    ($code:ident, $context:expr, $fmt:expr, $($args:tt)*) => {
        $crate::errors::TransactionError::new(
            $crate::errors::TransactionErrorCode::$code,
            format!($fmt, $($args)*),
            $context.clone(),
        )
    };
}
