//! Bet placement pipeline
//!
//! [`BetPlacer`] drives a wager from a game choice to a confirmed [`PlacedBet`](crate::common::types::PlacedBet).
//! The individual contract interactions live in their own modules so they can be
//! reused and tested on their own.

pub mod allowance;
pub mod pipeline;
pub mod requirements;
pub mod vrf_fee;

pub use allowance::ensure_allowance;
pub use pipeline::{BetPlacer, PlaceBetParams, PlacementCallbacks};
pub use requirements::check_bet_requirements;
pub use vrf_fee::quote_vrf_fee;
