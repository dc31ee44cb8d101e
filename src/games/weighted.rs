//! Weighted games (wheel, plinko, custom): discrete slots with weights and multipliers

use crate::common::types::CasinoGame;
use crate::errors::{ConfigurationError, DecodeError};
use crate::games::registry::{CodecContext, GameCodec};
use crate::games::types::{EncodedInput, EncodedRolled, GameChoice, RolledOutcome};
use crate::math::{net_multiplier, round_to, BP_VALUE};
use serde::{Deserialize, Serialize};

/// Slot layout of a weighted game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeightedGameConfiguration {
    pub config_id: u32,
    pub game: CasinoGame,
    pub weights: Vec<u64>,
    /// Gross multipliers in basis points, one per slot
    pub multipliers: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl WeightedGameConfiguration {
    pub fn new(config_id: u32, game: CasinoGame, weights: Vec<u64>, multipliers: Vec<u32>) -> Self {
        Self {
            config_id,
            game,
            weights,
            multipliers,
            colors: None,
            label: None,
        }
    }

    pub fn with_colors(mut self, colors: Vec<String>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.game.is_weighted() {
            return Err(ConfigurationError::InvalidValue {
                field: "weighted_config.game".to_string(),
                value: self.game.to_string(),
                reason: "not a weighted game".to_string(),
            });
        }
        if self.weights.is_empty() {
            return Err(ConfigurationError::ValidationFailed(format!(
                "weighted config {} has no slots",
                self.config_id
            )));
        }
        if self.weights.len() != self.multipliers.len() {
            return Err(ConfigurationError::ValidationFailed(format!(
                "weighted config {} has {} weights but {} multipliers",
                self.config_id,
                self.weights.len(),
                self.multipliers.len()
            )));
        }
        if self.total_weight() == 0 {
            return Err(ConfigurationError::ValidationFailed(format!(
                "weighted config {} has zero total weight",
                self.config_id
            )));
        }
        if let Some(colors) = &self.colors {
            if colors.len() != self.weights.len() {
                return Err(ConfigurationError::ValidationFailed(format!(
                    "weighted config {} has {} colors for {} slots",
                    self.config_id,
                    colors.len(),
                    self.weights.len()
                )));
            }
        }
        Ok(())
    }

    pub fn slot_count(&self) -> usize {
        self.weights.len()
    }

    pub fn total_weight(&self) -> u128 {
        self.weights.iter().map(|weight| u128::from(*weight)).sum()
    }

    pub fn max_multiplier(&self) -> u32 {
        self.multipliers.iter().copied().max().unwrap_or(0)
    }

    pub fn color_at(&self, position: usize) -> Option<&str> {
        self.colors
            .as_ref()
            .and_then(|colors| colors.get(position))
            .map(String::as_str)
    }

    /// Percent chance of landing on a slot whose net multiplier returns the stake
    pub fn win_chance(&self, house_edge: u16) -> Result<f64, DecodeError> {
        let total = self.total_weight();
        if total == 0 {
            return Err(DecodeError::MissingConfiguration("weighted slot weights"));
        }
        let winning: u128 = self
            .weights
            .iter()
            .zip(&self.multipliers)
            .filter(|(_, multiplier)| net_multiplier(**multiplier, house_edge) >= BP_VALUE)
            .map(|(weight, _)| u128::from(*weight))
            .sum();
        Ok(round_to(winning as f64 / total as f64 * 100.0, 2))
    }
}

fn chosen_config<'a>(
    choice: &GameChoice,
    ctx: &CodecContext<'a>,
) -> Result<&'a WeightedGameConfiguration, DecodeError> {
    let config_id = match choice {
        GameChoice::Weighted { config_id } => *config_id,
        _ => {
            return Err(DecodeError::ChoiceMismatch {
                game: CasinoGame::CustomWeightedGame,
            })
        }
    };
    let config = ctx.require_weighted()?;
    if config.config_id != config_id {
        return Err(DecodeError::ValueOutOfRange {
            what: "weighted configuration id",
            value: config_id.to_string(),
        });
    }
    Ok(config)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedCodec;

impl GameCodec for WeightedCodec {
    fn encode(&self, choice: &GameChoice, _ctx: &CodecContext<'_>) -> Result<EncodedInput, DecodeError> {
        match choice {
            GameChoice::Weighted { config_id } => Ok(EncodedInput::ConfigId(*config_id)),
            _ => Err(DecodeError::ChoiceMismatch {
                game: CasinoGame::CustomWeightedGame,
            }),
        }
    }

    fn decode(&self, input: &EncodedInput, _ctx: &CodecContext<'_>) -> Result<GameChoice, DecodeError> {
        match input {
            EncodedInput::ConfigId(config_id) => Ok(GameChoice::weighted(*config_id)),
            other => Err(DecodeError::ValueOutOfRange {
                what: "weighted game input",
                value: format!("{:?}", other),
            }),
        }
    }

    fn multiplier(&self, choice: &GameChoice, ctx: &CodecContext<'_>) -> Result<u32, DecodeError> {
        Ok(chosen_config(choice, ctx)?.max_multiplier())
    }

    fn win_chance(&self, choice: &GameChoice, ctx: &CodecContext<'_>) -> Result<f64, DecodeError> {
        chosen_config(choice, ctx)?.win_chance(ctx.house_edge)
    }

    fn decode_rolled(
        &self,
        choice: &GameChoice,
        rolled: &EncodedRolled,
        ctx: &CodecContext<'_>,
    ) -> Result<RolledOutcome, DecodeError> {
        let config = chosen_config(choice, ctx)?;
        let position = match rolled {
            EncodedRolled::Uint8(position) => usize::from(*position),
            other => {
                return Err(DecodeError::ValueOutOfRange {
                    what: "weighted roll",
                    value: format!("{:?}", other),
                })
            }
        };
        let multiplier = config
            .multipliers
            .get(position)
            .copied()
            .ok_or(DecodeError::PositionOutOfRange {
                position,
                slots: config.slot_count(),
            })?;

        Ok(RolledOutcome::Weighted {
            position,
            multiplier,
            net_multiplier: net_multiplier(multiplier, ctx.house_edge),
            color: config.color_at(position).map(str::to_string),
        })
    }
}
