use crate::common::types::CasinoGame;
use crate::math::format_multiplier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coin toss face
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CoinFace {
    Heads,
    Tails,
}

impl CoinFace {
    pub fn opposite(&self) -> Self {
        match self {
            CoinFace::Heads => CoinFace::Tails,
            CoinFace::Tails => CoinFace::Heads,
        }
    }
}

impl fmt::Display for CoinFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinFace::Heads => write!(f, "Heads"),
            CoinFace::Tails => write!(f, "Tails"),
        }
    }
}

/// Player-facing input of a game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameChoice {
    CoinToss { face: CoinFace },
    /// Wins when the roll lands strictly above `cap`
    Dice { cap: u8 },
    Roulette { numbers: Vec<u8> },
    Keno { balls: Vec<u8> },
    /// Wheel, plinko and custom weighted games pick a configuration by id
    Weighted { config_id: u32 },
}

impl GameChoice {
    pub fn coin(face: CoinFace) -> Self {
        GameChoice::CoinToss { face }
    }

    pub fn dice(cap: u8) -> Self {
        GameChoice::Dice { cap }
    }

    pub fn roulette(numbers: impl Into<Vec<u8>>) -> Self {
        GameChoice::Roulette {
            numbers: numbers.into(),
        }
    }

    pub fn keno(balls: impl Into<Vec<u8>>) -> Self {
        GameChoice::Keno {
            balls: balls.into(),
        }
    }

    pub fn weighted(config_id: u32) -> Self {
        GameChoice::Weighted { config_id }
    }

    /// Whether this choice can be played on `game`
    pub fn fits(&self, game: CasinoGame) -> bool {
        match self {
            GameChoice::CoinToss { .. } => game == CasinoGame::CoinToss,
            GameChoice::Dice { .. } => game == CasinoGame::Dice,
            GameChoice::Roulette { .. } => game == CasinoGame::Roulette,
            GameChoice::Keno { .. } => game == CasinoGame::Keno,
            GameChoice::Weighted { .. } => game.is_weighted(),
        }
    }

    /// Human label
    pub fn label(&self) -> String {
        match self {
            GameChoice::CoinToss { face } => face.to_string(),
            GameChoice::Dice { cap } => format!("Over {}", cap),
            GameChoice::Roulette { numbers } => selection_label(numbers, "number"),
            GameChoice::Keno { balls } => selection_label(balls, "ball"),
            GameChoice::Weighted { config_id } => format!("Config #{}", config_id),
        }
    }
}

fn selection_label(values: &[u8], noun: &str) -> String {
    if values.len() == 1 {
        format!("{} {}", noun, values[0])
    } else {
        format!("{} {}s", values.len(), noun)
    }
}

/// Compact on-chain representation of a choice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EncodedInput {
    /// Coin toss face (`true` = heads)
    Bool(bool),
    /// Dice cap
    Uint8(u8),
    /// Roulette and keno selections
    Mask(u64),
    /// Weighted game configuration id
    ConfigId(u32),
}

/// One raw rolled value from a `Roll` event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EncodedRolled {
    /// Coin toss face
    Bool(bool),
    /// Dice number, roulette number or weighted slot position
    Uint8(u8),
    /// Keno drawn balls
    Mask(u64),
}

/// A rolled value decoded against the bet's choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum RolledOutcome {
    CoinToss {
        face: CoinFace,
        won: bool,
    },
    Dice {
        number: u8,
        won: bool,
    },
    Roulette {
        number: u8,
        won: bool,
    },
    Keno {
        drawn: Vec<u8>,
        matched: usize,
        multiplier: u32,
    },
    Weighted {
        position: usize,
        multiplier: u32,
        net_multiplier: u32,
        color: Option<String>,
    },
}

impl RolledOutcome {
    pub fn label(&self) -> String {
        match self {
            RolledOutcome::CoinToss { face, .. } => face.to_string(),
            RolledOutcome::Dice { number, .. } => number.to_string(),
            RolledOutcome::Roulette { number, .. } => number.to_string(),
            RolledOutcome::Keno { matched, drawn, .. } => {
                format!("{}/{} matched", matched, drawn.len())
            }
            RolledOutcome::Weighted { net_multiplier, .. } => format_multiplier(*net_multiplier),
        }
    }
}
