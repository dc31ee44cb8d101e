//! Contract-side bet limits

use crate::abi::{self, BetRequirements};
use crate::common::traits::{CasinoClient, ContractCall};
use crate::common::types::CasinoGame;
use crate::errors::{ConfigurationError, EngineError, TransactionContext};
use crate::tx_error;
use ethers::types::{Address, U256};
use tracing::debug;

/// Read `getBetRequirements` and reject bets the contract would refuse
#[allow(clippy::too_many_arguments)]
pub async fn check_bet_requirements<C: CasinoClient + ?Sized>(
    client: &C,
    game: CasinoGame,
    contract: Address,
    token: Address,
    multiplier: u32,
    bet_amount: U256,
    bet_count: u32,
    ctx: &TransactionContext,
) -> Result<BetRequirements, EngineError> {
    let answer = client
        .read_contract(ContractCall::new(
            contract,
            abi::encode_get_bet_requirements(token, multiplier),
        ))
        .await
        .map_err(|e| tx_error!(RequirementsFailed, ctx, "failed to read bet requirements").with_source(e))?;
    let requirements = abi::decode_bet_requirements(&answer)
        .map_err(|e| tx_error!(RequirementsFailed, ctx, "undecodable bet requirements: {}", e))?;

    debug!(
        %game,
        allowed = requirements.is_allowed,
        max_bet_amount = %requirements.max_bet_amount,
        max_bet_count = %requirements.max_bet_count,
        "Bet requirements"
    );
    enforce(game, token, &requirements, bet_amount, bet_count)?;
    Ok(requirements)
}

fn enforce(
    game: CasinoGame,
    token: Address,
    requirements: &BetRequirements,
    bet_amount: U256,
    bet_count: u32,
) -> Result<(), ConfigurationError> {
    if !requirements.is_allowed {
        return Err(ConfigurationError::TokenNotAllowed { game, token });
    }
    if bet_amount > requirements.max_bet_amount {
        return Err(ConfigurationError::LimitExceeded {
            field: "bet_amount",
            value: bet_amount,
            max: requirements.max_bet_amount,
        });
    }
    let count = U256::from(bet_count);
    if count > requirements.max_bet_count {
        return Err(ConfigurationError::LimitExceeded {
            field: "bet_count",
            value: count,
            max: requirements.max_bet_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(allowed: bool) -> BetRequirements {
        BetRequirements {
            is_allowed: allowed,
            max_bet_amount: U256::from(1_000u64),
            max_bet_count: U256::from(10u64),
        }
    }

    #[test]
    fn test_within_limits() {
        let token = Address::repeat_byte(1);
        assert!(enforce(CasinoGame::Dice, token, &limits(true), U256::from(1_000u64), 10).is_ok());
    }

    #[test]
    fn test_disallowed_token() {
        let token = Address::repeat_byte(1);
        let err = enforce(CasinoGame::Dice, token, &limits(false), U256::one(), 1).unwrap_err();
        assert_eq!(err.code(), "TOKEN_NOT_ALLOWED");
    }

    #[test]
    fn test_limits_exceeded() {
        let token = Address::repeat_byte(1);
        let err = enforce(CasinoGame::Keno, token, &limits(true), U256::from(1_001u64), 1).unwrap_err();
        assert!(matches!(err, ConfigurationError::LimitExceeded { field: "bet_amount", .. }));

        let err = enforce(CasinoGame::Keno, token, &limits(true), U256::one(), 11).unwrap_err();
        assert!(matches!(err, ConfigurationError::LimitExceeded { field: "bet_count", .. }));
    }
}
