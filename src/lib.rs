//! Casino Engine - on-chain casino bet lifecycle
//!
//! Translates player choices into contract inputs, places wagers with allowance
//! and randomness-fee handling, and resolves them by watching for their `Roll`
//! events. Contract math is reproduced exactly in basis points.

pub mod abi;
pub mod aggregator;
pub mod common;
pub mod config;
pub mod engine;
pub mod errors;
pub mod game_configs;
pub mod games;
pub mod math;
pub mod metrics;
pub mod placement;
pub mod resolution;
pub mod retry;
pub mod telemetry;
pub mod tokens;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use common::traits::{CasinoClient, ContractCall, EventFilter, EventSubscription, SubscriptionId, WriteRequest};
pub use common::types::{BetKey, CasinoGame, ChainId, PlacedBet, RolledBet, SignedAmount, Token};
pub use config::EngineConfig;
pub use engine::CasinoEngine;
pub use errors::{EngineError, EngineResult, TransactionError, TransactionErrorCode};
pub use game_configs::GameConfigRegistry;
pub use games::{CodecContext, CodecRegistry, GameChoice, RolledOutcome};
pub use placement::{PlaceBetParams, PlacementCallbacks};
pub use resolution::RollWaiter;
