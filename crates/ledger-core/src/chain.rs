//! The in-memory chain, its pending pool, and the chain-wide validator.

use crate::block::{Block, Transaction};
use crate::constants::{
    COINBASE_SENDER, ISSUANCE_CAP, MAX_FUTURE_DRIFT_SECS, REWARD_AMOUNT,
    REWARD_PERIOD,
};
use crate::error::{ChainFault, Result};
use crate::hasher::Hash;
use crate::pow;
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Smallest step used to keep minted timestamps strictly increasing.
const TIMESTAMP_EPSILON: f64 = 1e-6;

/// Coin issuance rules applied when transactions enter the pending pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuancePolicy {
    /// A bonus is paid while the tip index is a multiple of this.
    pub reward_period: u64,
    pub reward_amount: u64,
    /// Once the issued total passes this, the pending pool is discarded.
    pub cap: u64,
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            reward_period: REWARD_PERIOD,
            reward_amount: REWARD_AMOUNT,
            cap: ISSUANCE_CAP,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    issued: u64,
    policy: IssuancePolicy,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// A chain holding only the genesis block.
    pub fn new() -> Self {
        Self::with_policy(IssuancePolicy::default())
    }

    pub fn with_policy(policy: IssuancePolicy) -> Self {
        Self {
            blocks: vec![Block::genesis()],
            pending: vec![],
            issued: 0,
            policy,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn last_block(&self) -> &Block {
        // never empty: construction always seeds genesis and adoption only
        // accepts validated, non-empty chains
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        self.blocks.iter().find(|b| b.index == index)
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Running total of every amount accepted into the pending pool.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Queue a transaction and return the index of the block that will carry it.
    pub fn append_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> u64 {
        let tx = Transaction::new(sender, recipient, amount);
        let tip = self.last_block().index;

        self.issued = self.issued.saturating_add(tx.amount);
        if self.policy.reward_period > 0 && tip % self.policy.reward_period == 0 {
            let bonus = Transaction::new(COINBASE_SENDER, tx.sender.clone(), self.policy.reward_amount);
            debug!(tip, recipient = %bonus.recipient, "paying periodic reward");
            self.pending.push(tx);
            self.issued = self.issued.saturating_add(bonus.amount);
            self.pending.push(bonus);
        } else {
            self.pending.push(tx);
        }

        if self.issued > self.policy.cap {
            warn!(
                issued = self.issued,
                cap = self.policy.cap,
                dropped = self.pending.len(),
                "issuance cap exceeded, discarding pending transactions"
            );
            self.pending.clear();
        }

        tip + 1
    }

    /// Seal the pending pool into a new block and append it.
    ///
    /// `previous_hash` defaults to the hash of the current tip. The proof is
    /// taken as given; validity is only established by [`Chain::validate`].
    pub fn mint_block(&mut self, proof: u64, previous_hash: Option<Hash>) -> Result<&Block> {
        let last = self.last_block();
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => last.hash()?,
        };
        let timestamp = next_timestamp(last.timestamp, unix_now());
        let block = Block::assemble(
            last.index + 1,
            timestamp,
            self.pending.clone(),
            proof,
            previous_hash,
        )?;
        self.pending.clear();

        info!(
            index = block.index,
            proof = block.proof,
            txs = block.transactions.len(),
            "minted block"
        );
        self.blocks.push(block);
        Ok(self.last_block())
    }

    /// Swap in a chain that has already been validated.
    pub(crate) fn adopt(&mut self, blocks: Vec<Block>) {
        debug_assert!(!blocks.is_empty());
        info!(from = self.blocks.len(), to = blocks.len(), "replacing local chain");
        self.blocks = blocks;
    }

    /// True iff `blocks` is a well-formed chain.
    ///
    /// # Panics
    /// On an empty slice; every chain holds at least its genesis block.
    pub fn validate(blocks: &[Block]) -> bool {
        match Self::check(blocks) {
            Ok(()) => true,
            Err(fault) => {
                debug!(%fault, "chain rejected");
                false
            }
        }
    }

    /// Like [`Chain::validate`] but names the first broken rule.
    pub fn check(blocks: &[Block]) -> std::result::Result<(), ChainFault> {
        Self::check_at(blocks, unix_now())
    }

    /// Validation against an explicit clock reading, in seconds since the epoch.
    pub fn check_at(blocks: &[Block], now: f64) -> std::result::Result<(), ChainFault> {
        assert!(!blocks.is_empty(), "a chain always holds its genesis block");

        if !blocks[0].is_genesis() {
            return Err(ChainFault::ForeignGenesis);
        }

        for pair in blocks.windows(2) {
            let (prior, current) = (&pair[0], &pair[1]);

            if current.index != prior.index + 1 {
                return Err(ChainFault::IndexGap {
                    previous: prior.index,
                    index: current.index,
                });
            }

            match prior.hash() {
                Ok(hash) if hash == current.previous_hash => {}
                _ => return Err(ChainFault::BrokenLink { index: current.index }),
            }

            if !pow::valid(prior.proof, current.proof) {
                return Err(ChainFault::InvalidProof {
                    index: current.index,
                    last_proof: prior.proof,
                    proof: current.proof,
                });
            }

            if current.timestamp >= now + MAX_FUTURE_DRIFT_SECS {
                return Err(ChainFault::TimestampInFuture {
                    index: current.index,
                    timestamp: current.timestamp,
                });
            }
            if current.timestamp.partial_cmp(&prior.timestamp) != Some(Ordering::Greater) {
                return Err(ChainFault::TimestampNotIncreasing {
                    index: current.index,
                    previous: prior.timestamp,
                    timestamp: current.timestamp,
                });
            }

            check_merkle_root(current)?;
        }
        Ok(())
    }
}

fn check_merkle_root(block: &Block) -> std::result::Result<(), ChainFault> {
    match block.recomputed_merkle_root() {
        Ok(root) if root == block.merkle_root => Ok(()),
        _ => Err(ChainFault::MerkleMismatch { index: block.index }),
    }
}

pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Clock reading for a new block, nudged past `previous` when the clock has
/// not moved on.
fn next_timestamp(previous: f64, now: f64) -> f64 {
    if now > previous {
        now
    } else {
        previous + TIMESTAMP_EPSILON.max(previous.abs() * f64::EPSILON * 2.0)
    }
}
