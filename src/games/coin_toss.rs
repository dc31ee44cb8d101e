//! Coin toss: heads or tails at even odds

use crate::errors::DecodeError;
use crate::games::registry::{CodecContext, GameCodec};
use crate::games::types::{CoinFace, EncodedInput, EncodedRolled, GameChoice, RolledOutcome};

/// Gross multiplier of a coin toss (2x)
pub const COIN_TOSS_MULTIPLIER: u32 = 20_000;
pub const COIN_TOSS_WIN_CHANCE: f64 = 50.0;

fn face_of(heads: bool) -> CoinFace {
    if heads {
        CoinFace::Heads
    } else {
        CoinFace::Tails
    }
}

fn chosen_face(choice: &GameChoice) -> Result<CoinFace, DecodeError> {
    match choice {
        GameChoice::CoinToss { face } => Ok(*face),
        _ => Err(DecodeError::ChoiceMismatch {
            game: crate::common::types::CasinoGame::CoinToss,
        }),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoinTossCodec;

impl GameCodec for CoinTossCodec {
    fn encode(&self, choice: &GameChoice, _ctx: &CodecContext<'_>) -> Result<EncodedInput, DecodeError> {
        let face = chosen_face(choice)?;
        Ok(EncodedInput::Bool(face == CoinFace::Heads))
    }

    fn decode(&self, input: &EncodedInput, _ctx: &CodecContext<'_>) -> Result<GameChoice, DecodeError> {
        match input {
            EncodedInput::Bool(heads) => Ok(GameChoice::coin(face_of(*heads))),
            other => Err(DecodeError::ValueOutOfRange {
                what: "coin toss input",
                value: format!("{:?}", other),
            }),
        }
    }

    fn multiplier(&self, choice: &GameChoice, _ctx: &CodecContext<'_>) -> Result<u32, DecodeError> {
        chosen_face(choice)?;
        Ok(COIN_TOSS_MULTIPLIER)
    }

    fn win_chance(&self, choice: &GameChoice, _ctx: &CodecContext<'_>) -> Result<f64, DecodeError> {
        chosen_face(choice)?;
        Ok(COIN_TOSS_WIN_CHANCE)
    }

    fn decode_rolled(
        &self,
        choice: &GameChoice,
        rolled: &EncodedRolled,
        _ctx: &CodecContext<'_>,
    ) -> Result<RolledOutcome, DecodeError> {
        let chosen = chosen_face(choice)?;
        match rolled {
            EncodedRolled::Bool(heads) => {
                let face = face_of(*heads);
                Ok(RolledOutcome::CoinToss {
                    face,
                    won: face == chosen,
                })
            }
            other => Err(DecodeError::ValueOutOfRange {
                what: "coin toss roll",
                value: format!("{:?}", other),
            }),
        }
    }
}
