//! European roulette: any set of numbers 0..=36 packed as a 37-bit mask

use crate::common::types::CasinoGame;
use crate::errors::DecodeError;
use crate::games::bitmask::{count, pack, unpack};
use crate::games::registry::{CodecContext, GameCodec};
use crate::games::types::{EncodedInput, EncodedRolled, GameChoice, RolledOutcome};
use crate::math::{round_to, BP_VALUE};

pub const ROULETTE_SLOTS: u32 = 37;
/// Covering every number is rejected by the contract
pub const MAX_SELECTED: usize = 36;

fn chosen_mask(choice: &GameChoice) -> Result<u64, DecodeError> {
    match choice {
        GameChoice::Roulette { numbers } => {
            let mask = pack(numbers, 0, ROULETTE_SLOTS)?;
            check_count(mask)?;
            Ok(mask)
        }
        _ => Err(DecodeError::ChoiceMismatch {
            game: CasinoGame::Roulette,
        }),
    }
}

fn check_count(mask: u64) -> Result<usize, DecodeError> {
    match count(mask) {
        0 => Err(DecodeError::EmptySelection),
        n if n > MAX_SELECTED => Err(DecodeError::SelectionTooLarge {
            count: n,
            max: MAX_SELECTED,
        }),
        n => Ok(n),
    }
}

/// `BP_VALUE * 37 / selected` (truncating)
pub fn roulette_multiplier(selected: usize) -> Result<u32, DecodeError> {
    if selected == 0 {
        return Err(DecodeError::EmptySelection);
    }
    Ok(BP_VALUE * ROULETTE_SLOTS / selected as u32)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouletteCodec;

impl GameCodec for RouletteCodec {
    fn encode(&self, choice: &GameChoice, _ctx: &CodecContext<'_>) -> Result<EncodedInput, DecodeError> {
        Ok(EncodedInput::Mask(chosen_mask(choice)?))
    }

    fn decode(&self, input: &EncodedInput, _ctx: &CodecContext<'_>) -> Result<GameChoice, DecodeError> {
        match input {
            EncodedInput::Mask(mask) => {
                let numbers = unpack(*mask, 0, ROULETTE_SLOTS)?;
                check_count(*mask)?;
                Ok(GameChoice::roulette(numbers))
            }
            other => Err(DecodeError::ValueOutOfRange {
                what: "roulette input",
                value: format!("{:?}", other),
            }),
        }
    }

    fn multiplier(&self, choice: &GameChoice, _ctx: &CodecContext<'_>) -> Result<u32, DecodeError> {
        roulette_multiplier(count(chosen_mask(choice)?))
    }

    fn win_chance(&self, choice: &GameChoice, _ctx: &CodecContext<'_>) -> Result<f64, DecodeError> {
        let selected = count(chosen_mask(choice)?) as f64;
        Ok(round_to(selected / f64::from(ROULETTE_SLOTS) * 100.0, 1))
    }

    fn decode_rolled(
        &self,
        choice: &GameChoice,
        rolled: &EncodedRolled,
        _ctx: &CodecContext<'_>,
    ) -> Result<RolledOutcome, DecodeError> {
        let mask = chosen_mask(choice)?;
        match rolled {
            EncodedRolled::Uint8(number) if u32::from(*number) < ROULETTE_SLOTS => {
                Ok(RolledOutcome::Roulette {
                    number: *number,
                    won: mask & (1u64 << number) != 0,
                })
            }
            other => Err(DecodeError::ValueOutOfRange {
                what: "roulette roll",
                value: format!("{:?}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_eighteen() {
        let ctx = CodecContext::default();
        let numbers: Vec<u8> = (1..=18).collect();
        let choice = GameChoice::roulette(numbers.clone());

        let encoded = RouletteCodec.encode(&choice, &ctx).unwrap();
        let EncodedInput::Mask(mask) = encoded else {
            panic!("roulette encodes to a mask");
        };
        assert_eq!(mask.count_ones(), 18);
        assert_eq!(mask, 0b111_1111_1111_1111_1110);

        assert_eq!(
            RouletteCodec.decode(&encoded, &ctx).unwrap(),
            GameChoice::roulette(numbers)
        );
        assert_eq!(RouletteCodec.multiplier(&choice, &ctx).unwrap(), 20_555);
        assert_eq!(RouletteCodec.win_chance(&choice, &ctx).unwrap(), 48.6);
    }

    #[test]
    fn test_single_number() {
        let ctx = CodecContext::default();
        let choice = GameChoice::roulette(vec![0]);
        assert_eq!(RouletteCodec.encode(&choice, &ctx).unwrap(), EncodedInput::Mask(1));
        assert_eq!(RouletteCodec.multiplier(&choice, &ctx).unwrap(), 370_000);
        assert_eq!(RouletteCodec.win_chance(&choice, &ctx).unwrap(), 2.7);
    }

    #[test]
    fn test_decode_sorts_and_deduplicates() {
        let ctx = CodecContext::default();
        let encoded = RouletteCodec
            .encode(&GameChoice::roulette(vec![36, 4, 4, 19]), &ctx)
            .unwrap();
        assert_eq!(
            RouletteCodec.decode(&encoded, &ctx).unwrap(),
            GameChoice::roulette(vec![4, 19, 36])
        );
    }

    #[test]
    fn test_invalid_masks() {
        let ctx = CodecContext::default();
        assert_eq!(
            RouletteCodec.decode(&EncodedInput::Mask(0), &ctx),
            Err(DecodeError::EmptySelection)
        );
        assert!(matches!(
            RouletteCodec.decode(&EncodedInput::Mask(1 << 37), &ctx),
            Err(DecodeError::MaskOutOfRange { .. })
        ));
        let everything = (1u64 << 37) - 1;
        assert_eq!(
            RouletteCodec.decode(&EncodedInput::Mask(everything), &ctx),
            Err(DecodeError::SelectionTooLarge { count: 37, max: 36 })
        );
    }

    #[test]
    fn test_rolled_number() {
        let ctx = CodecContext::default();
        let choice = GameChoice::roulette(vec![7, 8]);
        let hit = RouletteCodec
            .decode_rolled(&choice, &EncodedRolled::Uint8(8), &ctx)
            .unwrap();
        assert_eq!(hit, RolledOutcome::Roulette { number: 8, won: true });

        let miss = RouletteCodec
            .decode_rolled(&choice, &EncodedRolled::Uint8(0), &ctx)
            .unwrap();
        assert_eq!(miss, RolledOutcome::Roulette { number: 0, won: false });

        assert!(RouletteCodec
            .decode_rolled(&choice, &EncodedRolled::Uint8(37), &ctx)
            .is_err());
    }
}
