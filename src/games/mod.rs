//! Game codecs
//!
//! Each game family translates a player-facing [`GameChoice`] into the compact
//! value its contract expects and back. [`CodecRegistry`] dispatches by game tag.

pub mod bitmask;
pub mod coin_toss;
pub mod dice;
pub mod keno;
pub mod registry;
pub mod roulette;
pub mod types;
pub mod weighted;

pub use keno::{KenoConfiguration, KENO_CHANCE_SCALE};
pub use registry::{CodecContext, CodecRegistry, GameCodec};
pub use types::*;
pub use weighted::WeightedGameConfiguration;
