//! Shared type definitions for the casino engine
//!
//! Canonical bet records produced by the placement pipeline and the roll
//! waiter, plus the game and token identifiers every module speaks in.

use crate::games::types::{EncodedInput, EncodedRolled};
use chrono::{DateTime, Utc};
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// EVM chain identifier
pub type ChainId = u64;

/// Supported casino games
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CasinoGame {
    CoinToss,
    Dice,
    Roulette,
    Keno,
    Wheel,
    Plinko,
    CustomWeightedGame,
}

impl CasinoGame {
    pub const ALL: [CasinoGame; 7] = [
        CasinoGame::CoinToss,
        CasinoGame::Dice,
        CasinoGame::Roulette,
        CasinoGame::Keno,
        CasinoGame::Wheel,
        CasinoGame::Plinko,
        CasinoGame::CustomWeightedGame,
    ];

    /// Games driven by a weights/multipliers configuration
    pub fn is_weighted(&self) -> bool {
        matches!(
            self,
            CasinoGame::Wheel | CasinoGame::Plinko | CasinoGame::CustomWeightedGame
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CasinoGame::CoinToss => "coin_toss",
            CasinoGame::Dice => "dice",
            CasinoGame::Roulette => "roulette",
            CasinoGame::Keno => "keno",
            CasinoGame::Wheel => "wheel",
            CasinoGame::Plinko => "plinko",
            CasinoGame::CustomWeightedGame => "custom_weighted_game",
        }
    }
}

impl fmt::Display for CasinoGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CasinoGame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        CasinoGame::ALL
            .iter()
            .copied()
            .find(|game| game.as_str() == normalized)
            .ok_or_else(|| format!("unknown game '{}'", s))
    }
}

/// ERC-20 or native token; the zero address is the chain's native currency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    /// Native currency of a chain
    pub fn native(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address: Address::zero(),
            symbol: symbol.into(),
            decimals,
        }
    }

    pub fn erc20(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }

    pub fn is_native(&self) -> bool {
        self.address.is_zero()
    }
}

/// Unique key of a placed bet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BetKey {
    pub chain_id: ChainId,
    pub game: CasinoGame,
    pub id: U256,
}

impl fmt::Display for BetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.chain_id, self.game, self.id)
    }
}

/// A wager confirmed on chain, extracted from its `PlaceBet` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacedBet {
    pub id: U256,
    pub bet_amount: U256,
    pub bet_count: u32,
    pub total_bet_amount: U256,
    pub charged_randomness_fee: U256,
    pub token: Token,
    pub affiliate: Address,
    pub receiver: Address,
    pub stop_gain: U256,
    pub stop_loss: U256,
    pub placement_tx_hash: H256,
    pub placement_block: u64,
    pub chain_id: ChainId,
    pub game: CasinoGame,
    pub encoded_input: EncodedInput,
    pub placed_at: DateTime<Utc>,
}

impl PlacedBet {
    pub fn key(&self) -> BetKey {
        BetKey {
            chain_id: self.chain_id,
            game: self.game,
            id: self.id,
        }
    }
}

/// Signed token amount; payouts minus stakes can go negative
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedAmount {
    pub negative: bool,
    pub magnitude: U256,
}

impl SignedAmount {
    /// `lhs - rhs` without overflow
    pub fn difference(lhs: U256, rhs: U256) -> Self {
        if lhs >= rhs {
            Self {
                negative: false,
                magnitude: lhs - rhs,
            }
        } else {
            Self {
                negative: true,
                magnitude: rhs - lhs,
            }
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative && !self.magnitude.is_zero()
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

/// A placed bet after its `Roll` event was observed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RolledBet {
    #[serde(flatten)]
    pub placed: PlacedBet,
    pub is_win: bool,
    pub is_stop_loss_triggered: bool,
    pub is_stop_gain_triggered: bool,
    pub rolled_bet_count: u32,
    pub roll_total_bet_amount: U256,
    pub payout: U256,
    pub benefit: SignedAmount,
    pub roll_tx_hash: H256,
    pub encoded_rolled: Vec<EncodedRolled>,
    pub resolved_at: DateTime<Utc>,
}

impl RolledBet {
    pub fn key(&self) -> BetKey {
        self.placed.key()
    }

    pub fn is_stop_triggered(&self) -> bool {
        self.is_stop_gain_triggered || self.is_stop_loss_triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_round_trip_through_str() {
        for game in CasinoGame::ALL {
            assert_eq!(game.to_string().parse::<CasinoGame>().unwrap(), game);
        }
        assert_eq!("Coin-Toss".parse::<CasinoGame>().unwrap(), CasinoGame::CoinToss);
        assert!("blackjack".parse::<CasinoGame>().is_err());
    }

    #[test]
    fn test_weighted_games() {
        assert!(CasinoGame::Wheel.is_weighted());
        assert!(CasinoGame::Plinko.is_weighted());
        assert!(CasinoGame::CustomWeightedGame.is_weighted());
        assert!(!CasinoGame::Keno.is_weighted());
    }

    #[test]
    fn test_native_token() {
        let eth = Token::native("ETH", 18);
        assert!(eth.is_native());

        let usdc = Token::erc20(Address::repeat_byte(0x11), "USDC", 6);
        assert!(!usdc.is_native());
    }

    #[test]
    fn test_signed_amount() {
        let gain = SignedAmount::difference(U256::from(150u64), U256::from(100u64));
        assert!(!gain.is_negative());
        assert_eq!(gain.to_string(), "50");

        let loss = SignedAmount::difference(U256::from(0u64), U256::from(100u64));
        assert!(loss.is_negative());
        assert_eq!(loss.to_string(), "-100");

        let even = SignedAmount::difference(U256::from(7u64), U256::from(7u64));
        assert!(!even.is_negative());
        assert_eq!(even.to_string(), "0");
    }
}
