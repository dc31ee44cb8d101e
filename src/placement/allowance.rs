//! ERC-20 allowance step

use crate::abi;
use crate::common::traits::{CasinoClient, ContractCall, WriteRequest};
use crate::errors::{TransactionContext, TransactionError};
use crate::tx_error;
use ethers::types::{Address, H256, U256, U64};
use std::time::Duration;
use tracing::{debug, info};

/// Approve `spender` for the missing part of `needed`.
///
/// Returns the approve transaction hash, or `None` when the allowance already covers the stake.
pub async fn ensure_allowance<C: CasinoClient + ?Sized>(
    client: &C,
    token: Address,
    owner: Address,
    spender: Address,
    needed: U256,
    poll_interval: Duration,
    ctx: &TransactionContext,
) -> Result<Option<H256>, TransactionError> {
    let answer = client
        .read_contract(ContractCall::new(token, abi::encode_allowance(owner, spender)))
        .await
        .map_err(|e| tx_error!(ApproveFailed, ctx, "failed to read allowance").with_source(e))?;
    let current = abi::decode_u256(&answer)
        .map_err(|e| tx_error!(ApproveFailed, ctx, "undecodable allowance: {}", e))?;

    if current >= needed {
        debug!(%current, %needed, "Allowance sufficient");
        return Ok(None);
    }

    let shortfall = needed - current;
    info!(%current, %needed, %shortfall, token = ?token, "Approving allowance shortfall");

    let hash = client
        .write_contract(WriteRequest::new(token, abi::encode_approve(spender, shortfall)).from(owner))
        .await
        .map_err(|e| tx_error!(ApproveFailed, ctx, "approve submission failed").with_source(e))?;

    let receipt = client
        .wait_transaction(hash, poll_interval)
        .await
        .map_err(|e| {
            tx_error!(ApproveFailed, ctx.clone().with_tx_hash(hash), "approve receipt unavailable")
                .with_source(e)
        })?;
    if receipt.status == Some(U64::zero()) {
        return Err(tx_error!(
            ApproveFailed,
            ctx.clone().with_tx_hash(hash),
            "approve transaction reverted"
        ));
    }

    Ok(Some(hash))
}
