//! Randomness fee pricing

use crate::abi;
use crate::common::traits::{CasinoClient, ContractCall};
use crate::errors::{TransactionContext, TransactionError};
use crate::math::apply_buffer;
use crate::retry::RetryLadder;
use crate::tx_error;
use ethers::types::{Address, U256};
use tracing::debug;

/// Current VRF cost of `bet_count` rolls at `gas_price`, raised by `buffer_bp`
#[allow(clippy::too_many_arguments)]
pub async fn quote_vrf_fee<C: CasinoClient + ?Sized>(
    client: &C,
    contract: Address,
    token: Address,
    bet_count: u16,
    gas_price: U256,
    buffer_bp: u32,
    ladder: &RetryLadder,
    ctx: &TransactionContext,
) -> Result<U256, TransactionError> {
    let call = ContractCall::new(contract, abi::encode_get_vrf_cost(token, bet_count)).gas_price(gas_price);

    let answer = ladder
        .run("vrf_cost", |_| {
            let call = call.clone();
            async move { client.read_contract(call).await }
        })
        .await
        .map_err(|e| tx_error!(VrfCostFailed, ctx, "failed to quote randomness fee").with_source(e))?;

    let quoted = abi::decode_u256(&answer)
        .map_err(|e| tx_error!(VrfCostFailed, ctx, "undecodable randomness fee: {}", e))?;
    let fee = apply_buffer(quoted, buffer_bp)
        .map_err(|e| tx_error!(VrfCostFailed, ctx, "randomness fee buffer: {}", e))?;

    debug!(%quoted, %fee, %gas_price, buffer_bp, "Randomness fee quoted");
    Ok(fee)
}
