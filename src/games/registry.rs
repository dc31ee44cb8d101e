//! Codec capability interface and the per-game lookup table

use crate::common::types::CasinoGame;
use crate::errors::DecodeError;
use crate::games::coin_toss::CoinTossCodec;
use crate::games::dice::DiceCodec;
use crate::games::keno::{KenoCodec, KenoConfiguration};
use crate::games::roulette::RouletteCodec;
use crate::games::types::{EncodedInput, EncodedRolled, GameChoice, RolledOutcome};
use crate::games::weighted::{WeightedCodec, WeightedGameConfiguration};

/// Configuration a codec may need beyond the choice itself
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecContext<'a> {
    /// House edge in basis points, used for net multipliers
    pub house_edge: u16,
    pub keno: Option<&'a KenoConfiguration>,
    pub weighted: Option<&'a WeightedGameConfiguration>,
}

impl<'a> CodecContext<'a> {
    pub fn with_house_edge(mut self, house_edge: u16) -> Self {
        self.house_edge = house_edge;
        self
    }

    pub fn with_keno(mut self, keno: &'a KenoConfiguration) -> Self {
        self.keno = Some(keno);
        self
    }

    pub fn with_weighted(mut self, weighted: &'a WeightedGameConfiguration) -> Self {
        self.weighted = Some(weighted);
        self
    }

    pub(crate) fn require_keno(&self) -> Result<&'a KenoConfiguration, DecodeError> {
        self.keno.ok_or(DecodeError::MissingConfiguration("keno"))
    }

    pub(crate) fn require_weighted(&self) -> Result<&'a WeightedGameConfiguration, DecodeError> {
        self.weighted
            .ok_or(DecodeError::MissingConfiguration("weighted game"))
    }
}

/// Per-game translation between choices and on-chain values
pub trait GameCodec: Send + Sync {
    /// Choice to its on-chain form
    fn encode(&self, choice: &GameChoice, ctx: &CodecContext<'_>)
        -> Result<EncodedInput, DecodeError>;

    /// On-chain form back to the choice
    fn decode(&self, input: &EncodedInput, ctx: &CodecContext<'_>)
        -> Result<GameChoice, DecodeError>;

    /// Gross multiplier of the choice in basis points (top prize for table games)
    fn multiplier(&self, choice: &GameChoice, ctx: &CodecContext<'_>) -> Result<u32, DecodeError>;

    /// Chance of a winning roll, in percent
    fn win_chance(&self, choice: &GameChoice, ctx: &CodecContext<'_>) -> Result<f64, DecodeError>;

    /// Interpret one rolled value against the choice that was played
    fn decode_rolled(
        &self,
        choice: &GameChoice,
        rolled: &EncodedRolled,
        ctx: &CodecContext<'_>,
    ) -> Result<RolledOutcome, DecodeError>;
}

static COIN_TOSS: CoinTossCodec = CoinTossCodec;
static DICE: DiceCodec = DiceCodec;
static ROULETTE: RouletteCodec = RouletteCodec;
static KENO: KenoCodec = KenoCodec;
static WEIGHTED: WeightedCodec = WeightedCodec;

/// Lookup table from game tag to codec
#[derive(Clone, Copy)]
pub struct CodecRegistry {
    table: [&'static dyn GameCodec; 7],
}

impl CodecRegistry {
    pub fn new() -> Self {
        // Indexed in `CasinoGame` declaration order
        Self {
            table: [&COIN_TOSS, &DICE, &ROULETTE, &KENO, &WEIGHTED, &WEIGHTED, &WEIGHTED],
        }
    }

    pub fn codec(&self, game: CasinoGame) -> &'static dyn GameCodec {
        self.table[game as usize]
    }

    pub fn encode(
        &self,
        game: CasinoGame,
        choice: &GameChoice,
        ctx: &CodecContext<'_>,
    ) -> Result<EncodedInput, DecodeError> {
        Self::check_fits(game, choice)?;
        self.codec(game).encode(choice, ctx)
    }

    pub fn decode(
        &self,
        game: CasinoGame,
        input: &EncodedInput,
        ctx: &CodecContext<'_>,
    ) -> Result<GameChoice, DecodeError> {
        self.codec(game).decode(input, ctx)
    }

    pub fn multiplier(
        &self,
        game: CasinoGame,
        choice: &GameChoice,
        ctx: &CodecContext<'_>,
    ) -> Result<u32, DecodeError> {
        Self::check_fits(game, choice)?;
        self.codec(game).multiplier(choice, ctx)
    }

    pub fn win_chance(
        &self,
        game: CasinoGame,
        choice: &GameChoice,
        ctx: &CodecContext<'_>,
    ) -> Result<f64, DecodeError> {
        Self::check_fits(game, choice)?;
        self.codec(game).win_chance(choice, ctx)
    }

    /// Decode every rolled value of a bet whose on-chain input is `input`
    pub fn decode_rolled(
        &self,
        game: CasinoGame,
        input: &EncodedInput,
        rolled: &[EncodedRolled],
        ctx: &CodecContext<'_>,
    ) -> Result<Vec<RolledOutcome>, DecodeError> {
        let codec = self.codec(game);
        let choice = codec.decode(input, ctx)?;
        rolled
            .iter()
            .map(|value| codec.decode_rolled(&choice, value, ctx))
            .collect()
    }

    fn check_fits(game: CasinoGame, choice: &GameChoice) -> Result<(), DecodeError> {
        if choice.fits(game) {
            Ok(())
        } else {
            Err(DecodeError::ChoiceMismatch { game })
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::CoinFace;

    #[test]
    fn test_registry_dispatches_by_game() {
        let registry = CodecRegistry::new();
        let ctx = CodecContext::default();

        let coin = registry
            .encode(CasinoGame::CoinToss, &GameChoice::coin(CoinFace::Heads), &ctx)
            .unwrap();
        assert_eq!(coin, EncodedInput::Bool(true));

        let dice = registry
            .encode(CasinoGame::Dice, &GameChoice::dice(50), &ctx)
            .unwrap();
        assert_eq!(dice, EncodedInput::Uint8(50));

        let wheel = registry
            .encode(CasinoGame::Wheel, &GameChoice::weighted(4), &ctx)
            .unwrap();
        assert_eq!(wheel, EncodedInput::ConfigId(4));
    }

    #[test]
    fn test_registry_rejects_mismatched_choice() {
        let registry = CodecRegistry::new();
        let result = registry.encode(
            CasinoGame::Roulette,
            &GameChoice::dice(10),
            &CodecContext::default(),
        );
        assert_eq!(
            result,
            Err(DecodeError::ChoiceMismatch {
                game: CasinoGame::Roulette
            })
        );
    }

    #[test]
    fn test_decode_rolled_batch() {
        let registry = CodecRegistry::new();
        let outcomes = registry
            .decode_rolled(
                CasinoGame::Dice,
                &EncodedInput::Uint8(50),
                &[EncodedRolled::Uint8(12), EncodedRolled::Uint8(77)],
                &CodecContext::default(),
            )
            .unwrap();

        assert_eq!(
            outcomes,
            vec![
                RolledOutcome::Dice { number: 12, won: false },
                RolledOutcome::Dice { number: 77, won: true },
            ]
        );
    }
}
