//! Keno: pick balls 1..=N, payouts come from the contract's lookup table
//!
//! Neither the multiplier nor the odds are computed locally. Both are read from
//! `table[selected][matched]` of the [`KenoConfiguration`] of the bet's token.

use crate::common::types::CasinoGame;
use crate::errors::{ConfigurationError, DecodeError};
use crate::games::bitmask::{count, pack, unpack};
use crate::games::registry::{CodecContext, GameCodec};
use crate::games::types::{EncodedInput, EncodedRolled, GameChoice, RolledOutcome};
use crate::math::{round_to, BP_VALUE};
use serde::{Deserialize, Serialize};

/// Fixed-point scale of keno chances (10^10 = 100%)
pub const KENO_CHANCE_SCALE: u64 = 10_000_000_000;

/// Keno masks travel as `uint40`
pub const MAX_KENO_BALLS: u8 = 40;

/// Payout table of a keno deployment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KenoConfiguration {
    pub biggest_selectable_ball: u8,
    pub max_selectable_balls: u8,
    /// `multipliers[selected][matched]` in basis points
    pub multipliers: Vec<Vec<u32>>,
    /// `chances[selected][matched]` scaled by [`KENO_CHANCE_SCALE`]
    pub chances: Vec<Vec<u64>>,
}

impl KenoConfiguration {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.biggest_selectable_ball == 0 || self.biggest_selectable_ball > MAX_KENO_BALLS {
            return Err(ConfigurationError::InvalidValue {
                field: "keno.biggest_selectable_ball".to_string(),
                value: self.biggest_selectable_ball.to_string(),
                reason: format!("must be between 1 and {}", MAX_KENO_BALLS),
            });
        }
        if self.max_selectable_balls == 0
            || self.max_selectable_balls > self.biggest_selectable_ball
        {
            return Err(ConfigurationError::InvalidValue {
                field: "keno.max_selectable_balls".to_string(),
                value: self.max_selectable_balls.to_string(),
                reason: "must be between 1 and biggest_selectable_ball".to_string(),
            });
        }

        let rows = usize::from(self.max_selectable_balls) + 1;
        if self.multipliers.len() != rows || self.chances.len() != rows {
            return Err(ConfigurationError::ValidationFailed(format!(
                "keno table must have {} rows, got {} multiplier rows and {} chance rows",
                rows,
                self.multipliers.len(),
                self.chances.len()
            )));
        }
        for selected in 0..rows {
            let expected = selected + 1;
            if self.multipliers[selected].len() != expected
                || self.chances[selected].len() != expected
            {
                return Err(ConfigurationError::ValidationFailed(format!(
                    "keno row {} must have {} entries",
                    selected, expected
                )));
            }
        }
        Ok(())
    }

    fn width(&self) -> u32 {
        u32::from(self.biggest_selectable_ball)
    }

    fn check_selected(&self, selected: usize) -> Result<(), DecodeError> {
        let max = usize::from(self.max_selectable_balls);
        if selected == 0 {
            Err(DecodeError::EmptySelection)
        } else if selected > max {
            Err(DecodeError::SelectionTooLarge {
                count: selected,
                max,
            })
        } else {
            Ok(())
        }
    }

    fn row<T>(table: &[Vec<T>], selected: usize) -> Result<&[T], DecodeError> {
        table
            .get(selected)
            .map(Vec::as_slice)
            .ok_or(DecodeError::MissingConfiguration("keno table row"))
    }

    pub fn multiplier_for(&self, selected: usize, matched: usize) -> Result<u32, DecodeError> {
        self.check_selected(selected)?;
        Self::row(&self.multipliers, selected)?
            .get(matched)
            .copied()
            .ok_or(DecodeError::ValueOutOfRange {
                what: "keno matched count",
                value: matched.to_string(),
            })
    }

    /// Top prize for `selected` balls
    pub fn max_multiplier(&self, selected: usize) -> Result<u32, DecodeError> {
        self.check_selected(selected)?;
        Ok(Self::row(&self.multipliers, selected)?
            .iter()
            .copied()
            .max()
            .unwrap_or(0))
    }

    /// Percent chance that `selected` balls return at least the stake
    pub fn win_chance(&self, selected: usize) -> Result<f64, DecodeError> {
        self.check_selected(selected)?;
        let multipliers = Self::row(&self.multipliers, selected)?;
        let chances = Self::row(&self.chances, selected)?;
        let winning: u128 = multipliers
            .iter()
            .zip(chances)
            .filter(|(multiplier, _)| **multiplier >= BP_VALUE)
            .map(|(_, chance)| u128::from(*chance))
            .sum();
        Ok(round_to(
            winning as f64 / KENO_CHANCE_SCALE as f64 * 100.0,
            2,
        ))
    }
}

fn chosen_mask(choice: &GameChoice, config: &KenoConfiguration) -> Result<u64, DecodeError> {
    match choice {
        GameChoice::Keno { balls } => {
            let mask = pack(balls, 1, config.width())?;
            config.check_selected(count(mask))?;
            Ok(mask)
        }
        _ => Err(DecodeError::ChoiceMismatch {
            game: CasinoGame::Keno,
        }),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KenoCodec;

impl GameCodec for KenoCodec {
    fn encode(&self, choice: &GameChoice, ctx: &CodecContext<'_>) -> Result<EncodedInput, DecodeError> {
        let config = ctx.require_keno()?;
        Ok(EncodedInput::Mask(chosen_mask(choice, config)?))
    }

    fn decode(&self, input: &EncodedInput, ctx: &CodecContext<'_>) -> Result<GameChoice, DecodeError> {
        let config = ctx.require_keno()?;
        match input {
            EncodedInput::Mask(mask) => {
                let balls = unpack(*mask, 1, config.width())?;
                config.check_selected(balls.len())?;
                Ok(GameChoice::keno(balls))
            }
            other => Err(DecodeError::ValueOutOfRange {
                what: "keno input",
                value: format!("{:?}", other),
            }),
        }
    }

    fn multiplier(&self, choice: &GameChoice, ctx: &CodecContext<'_>) -> Result<u32, DecodeError> {
        let config = ctx.require_keno()?;
        config.max_multiplier(count(chosen_mask(choice, config)?))
    }

    fn win_chance(&self, choice: &GameChoice, ctx: &CodecContext<'_>) -> Result<f64, DecodeError> {
        let config = ctx.require_keno()?;
        config.win_chance(count(chosen_mask(choice, config)?))
    }

    fn decode_rolled(
        &self,
        choice: &GameChoice,
        rolled: &EncodedRolled,
        ctx: &CodecContext<'_>,
    ) -> Result<RolledOutcome, DecodeError> {
        let config = ctx.require_keno()?;
        let selected = chosen_mask(choice, config)?;
        match rolled {
            EncodedRolled::Mask(drawn) => {
                let balls = unpack(*drawn, 1, config.width())?;
                let matched = count(selected & drawn);
                let multiplier = config.multiplier_for(count(selected), matched)?;
                Ok(RolledOutcome::Keno {
                    drawn: balls,
                    matched,
                    multiplier,
                })
            }
            other => Err(DecodeError::ValueOutOfRange {
                what: "keno roll",
                value: format!("{:?}", other),
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Ten balls, five drawn, up to two picks
    pub(crate) fn small_keno() -> KenoConfiguration {
        KenoConfiguration {
            biggest_selectable_ball: 10,
            max_selectable_balls: 2,
            multipliers: vec![vec![0], vec![0, 19_000], vec![0, 10_000, 36_000]],
            chances: vec![
                vec![KENO_CHANCE_SCALE],
                vec![5_000_000_000, 5_000_000_000],
                vec![2_222_222_222, 5_555_555_556, 2_222_222_222],
            ],
        }
    }

    #[test]
    fn test_configuration_validation() {
        assert!(small_keno().validate().is_ok());

        let mut ragged = small_keno();
        ragged.multipliers[2].pop();
        assert!(ragged.validate().is_err());

        let mut too_wide = small_keno();
        too_wide.biggest_selectable_ball = 41;
        assert!(too_wide.validate().is_err());
    }

    #[test]
    fn test_one_indexed_mask() {
        let config = small_keno();
        let ctx = CodecContext::default().with_keno(&config);

        let encoded = KenoCodec.encode(&GameChoice::keno(vec![10, 1]), &ctx).unwrap();
        assert_eq!(encoded, EncodedInput::Mask(1 | (1 << 9)));
        assert_eq!(
            KenoCodec.decode(&encoded, &ctx).unwrap(),
            GameChoice::keno(vec![1, 10])
        );
    }

    #[test]
    fn test_table_lookup() {
        let config = small_keno();
        let ctx = CodecContext::default().with_keno(&config);
        let choice = GameChoice::keno(vec![3, 4]);

        assert_eq!(KenoCodec.multiplier(&choice, &ctx).unwrap(), 36_000);
        assert_eq!(KenoCodec.win_chance(&choice, &ctx).unwrap(), 77.78);
    }

    #[test]
    fn test_selection_limits() {
        let config = small_keno();
        let ctx = CodecContext::default().with_keno(&config);

        assert_eq!(
            KenoCodec.encode(&GameChoice::keno(vec![1, 2, 3]), &ctx),
            Err(DecodeError::SelectionTooLarge { count: 3, max: 2 })
        );
        assert_eq!(
            KenoCodec.decode(&EncodedInput::Mask(0), &ctx),
            Err(DecodeError::EmptySelection)
        );
        assert!(matches!(
            KenoCodec.decode(&EncodedInput::Mask(1 << 10), &ctx),
            Err(DecodeError::MaskOutOfRange { .. })
        ));
        assert!(matches!(
            KenoCodec.encode(&GameChoice::keno(vec![11]), &ctx),
            Err(DecodeError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_missing_configuration() {
        let result = KenoCodec.encode(&GameChoice::keno(vec![1]), &CodecContext::default());
        assert_eq!(result, Err(DecodeError::MissingConfiguration("keno")));
    }

    #[test]
    fn test_rolled_draw() {
        let config = small_keno();
        let ctx = CodecContext::default().with_keno(&config);
        let choice = GameChoice::keno(vec![2, 5]);

        // Balls 1, 2, 3, 4, 6 drawn
        let drawn = pack(&[1, 2, 3, 4, 6], 1, 10).unwrap();
        let outcome = KenoCodec
            .decode_rolled(&choice, &EncodedRolled::Mask(drawn), &ctx)
            .unwrap();

        assert_eq!(
            outcome,
            RolledOutcome::Keno {
                drawn: vec![1, 2, 3, 4, 6],
                matched: 1,
                multiplier: 10_000,
            }
        );
    }
}
