//! Dice: roll 1..=100, win when the roll lands above the chosen cap

use crate::common::types::CasinoGame;
use crate::errors::DecodeError;
use crate::games::registry::{CodecContext, GameCodec};
use crate::games::types::{EncodedInput, EncodedRolled, GameChoice, RolledOutcome};
use crate::math::BP_VALUE;

pub const MIN_CAP: u8 = 1;
pub const MAX_CAP: u8 = 99;
pub const MAX_ROLL: u8 = 100;

fn check_cap(cap: u8) -> Result<u8, DecodeError> {
    if (MIN_CAP..=MAX_CAP).contains(&cap) {
        Ok(cap)
    } else {
        Err(DecodeError::ValueOutOfRange {
            what: "dice cap",
            value: cap.to_string(),
        })
    }
}

fn chosen_cap(choice: &GameChoice) -> Result<u8, DecodeError> {
    match choice {
        GameChoice::Dice { cap } => check_cap(*cap),
        _ => Err(DecodeError::ChoiceMismatch {
            game: CasinoGame::Dice,
        }),
    }
}

/// `round(BP_VALUE * 100 / (100 - cap))`
pub fn dice_multiplier(cap: u8) -> u32 {
    let winning = u32::from(MAX_ROLL - cap);
    (BP_VALUE * 100 + winning / 2) / winning
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiceCodec;

impl GameCodec for DiceCodec {
    fn encode(&self, choice: &GameChoice, _ctx: &CodecContext<'_>) -> Result<EncodedInput, DecodeError> {
        Ok(EncodedInput::Uint8(chosen_cap(choice)?))
    }

    fn decode(&self, input: &EncodedInput, _ctx: &CodecContext<'_>) -> Result<GameChoice, DecodeError> {
        match input {
            EncodedInput::Uint8(cap) => Ok(GameChoice::dice(check_cap(*cap)?)),
            other => Err(DecodeError::ValueOutOfRange {
                what: "dice input",
                value: format!("{:?}", other),
            }),
        }
    }

    fn multiplier(&self, choice: &GameChoice, _ctx: &CodecContext<'_>) -> Result<u32, DecodeError> {
        Ok(dice_multiplier(chosen_cap(choice)?))
    }

    fn win_chance(&self, choice: &GameChoice, _ctx: &CodecContext<'_>) -> Result<f64, DecodeError> {
        Ok(f64::from(MAX_ROLL - chosen_cap(choice)?))
    }

    fn decode_rolled(
        &self,
        choice: &GameChoice,
        rolled: &EncodedRolled,
        _ctx: &CodecContext<'_>,
    ) -> Result<RolledOutcome, DecodeError> {
        let cap = chosen_cap(choice)?;
        match rolled {
            EncodedRolled::Uint8(number) if (1..=MAX_ROLL).contains(number) => {
                Ok(RolledOutcome::Dice {
                    number: *number,
                    won: *number > cap,
                })
            }
            other => Err(DecodeError::ValueOutOfRange {
                what: "dice roll",
                value: format!("{:?}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_cap() {
        let ctx = CodecContext::default();
        for cap in MIN_CAP..=MAX_CAP {
            let choice = GameChoice::dice(cap);
            let expected = (1_000_000f64 / f64::from(100 - cap)).round() as u32;

            assert_eq!(DiceCodec.multiplier(&choice, &ctx).unwrap(), expected, "cap {}", cap);
            assert_eq!(DiceCodec.win_chance(&choice, &ctx).unwrap(), f64::from(100 - cap));

            let encoded = DiceCodec.encode(&choice, &ctx).unwrap();
            assert_eq!(DiceCodec.decode(&encoded, &ctx).unwrap(), choice);
        }
    }

    #[test]
    fn test_known_multipliers() {
        assert_eq!(dice_multiplier(50), 20_000);
        assert_eq!(dice_multiplier(1), 10_101);
        assert_eq!(dice_multiplier(99), 1_000_000);
        // 1_000_000 / 3 = 333_333.33
        assert_eq!(dice_multiplier(97), 333_333);
    }

    #[test]
    fn test_cap_bounds() {
        let ctx = CodecContext::default();
        assert!(DiceCodec.encode(&GameChoice::dice(0), &ctx).is_err());
        assert!(DiceCodec.encode(&GameChoice::dice(100), &ctx).is_err());
        assert!(DiceCodec.decode(&EncodedInput::Uint8(100), &ctx).is_err());
    }

    #[test]
    fn test_rolled_number_must_exceed_cap() {
        let ctx = CodecContext::default();
        let choice = GameChoice::dice(50);

        let at_cap = DiceCodec
            .decode_rolled(&choice, &EncodedRolled::Uint8(50), &ctx)
            .unwrap();
        assert_eq!(at_cap, RolledOutcome::Dice { number: 50, won: false });

        let above = DiceCodec
            .decode_rolled(&choice, &EncodedRolled::Uint8(51), &ctx)
            .unwrap();
        assert_eq!(above, RolledOutcome::Dice { number: 51, won: true });

        assert!(DiceCodec
            .decode_rolled(&choice, &EncodedRolled::Uint8(0), &ctx)
            .is_err());
        assert!(DiceCodec
            .decode_rolled(&choice, &EncodedRolled::Uint8(101), &ctx)
            .is_err());
    }
}
