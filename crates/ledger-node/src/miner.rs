//! Mining a block on behalf of the HTTP layer.

use crate::state::AppState;
use anyhow::Context;
use ledger_core::{
    constants::{COINBASE_SENDER, MINING_REWARD, POW_DIFFICULTY},
    pow, Block, Hash,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MineError {
    #[error("mining aborted: the chain was replaced during the proof search")]
    Aborted,
    #[error("mining discarded: the tip moved during the proof search")]
    StaleTip,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Search a proof for the current tip and mint the pending pool on top of it.
///
/// The search runs on the blocking pool with no chain lock held. A proof found
/// for a tip that has since been replaced is thrown away.
pub async fn mine_next(state: &AppState) -> Result<Block, MineError> {
    mine_with_difficulty(state, POW_DIFFICULTY).await
}

pub(crate) async fn mine_with_difficulty(
    state: &AppState,
    difficulty: u32,
) -> Result<Block, MineError> {
    let _running = state.miner.running().lock().await;
    state.miner.rearm();

    let last = state.chain.read().await.last_block().clone();
    let previous_hash = last.hash().context("hashing tip")?;

    let abort = state.miner.abort_flag();
    let last_proof = last.proof;
    let proof = tokio::task::spawn_blocking(move || {
        pow::search_parallel_with_difficulty(last_proof, difficulty, &abort)
    })
    .await
    .context("proof search task")?
    .ok_or(MineError::Aborted)?;

    mint_on_tip(state, &last, previous_hash, proof).await
}

/// Mint under the write lock, but only if `last` is still the tip.
async fn mint_on_tip(
    state: &AppState,
    last: &Block,
    previous_hash: Hash,
    proof: u64,
) -> Result<Block, MineError> {
    let mut chain = state.chain.write().await;
    if chain.last_block() != last {
        return Err(MineError::StaleTip);
    }
    chain.append_transaction(COINBASE_SENDER, &*state.node_id, MINING_REWARD);
    let block = chain
        .mint_block(proof, Some(previous_hash))
        .context("minting block")?
        .clone();
    info!(index = block.index, proof, "new block forged");
    Ok(block)
}
