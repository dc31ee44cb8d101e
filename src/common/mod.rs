//! Common types and the chain client interface shared across the engine

pub mod traits;
pub mod types;

pub use traits::{CasinoClient, ContractCall, EventFilter, EventSubscription, SubscriptionId, WriteRequest};
pub use types::{BetKey, CasinoGame, ChainId, PlacedBet, RolledBet, SignedAmount, Token};
