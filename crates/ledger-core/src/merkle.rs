//! Binary hash tree over an ordered batch of records.
//!
//! Levels are built bottom-up with an explicit loop and all of them are kept
//! so inclusion proofs can be cut from the tree after construction. A level of
//! odd length pairs its last node with itself.

use crate::error::{LedgerError, Result};
use crate::hasher::{digest, hash_pair, Hash};
use serde::{Deserialize, Serialize};

/// One hop of an inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Hash,
    /// True when the sibling sits to the left of the running hash.
    pub sibling_is_left: bool,
}

/// Sibling path from a leaf up to (not including) the root.
pub type MerkleProof = Vec<ProofStep>;

#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// `levels[0]` holds the leaf hashes, the last level holds only the root.
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    pub fn build<T: Serialize>(leaves: &[T]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(LedgerError::EmptyTree);
        }
        let mut level = leaves.iter().map(digest).collect::<Result<Vec<Hash>>>()?;
        let mut levels = Vec::new();

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                let (a, b) = if pair.len() == 2 {
                    (&pair[0], &pair[1])
                } else {
                    (&pair[0], &pair[0])
                };
                next.push(hash_pair(a, b));
            }
            levels.push(level);
            level = next;
        }
        levels.push(level);
        Ok(Self { levels })
    }

    pub fn root(&self) -> Hash {
        self.levels[self.levels.len() - 1][0]
    }

    /// Position of the first leaf whose hash matches `leaf`.
    ///
    /// Records with identical canonical encodings are indistinguishable, so a
    /// duplicate always resolves to its earliest occurrence.
    pub fn position_of<T: Serialize>(&self, leaf: &T) -> Result<usize> {
        let target = digest(leaf)?;
        self.levels[0]
            .iter()
            .position(|h| *h == target)
            .ok_or(LedgerError::LeafNotFound)
    }

    pub fn proof_for<T: Serialize>(&self, leaf: &T) -> Result<MerkleProof> {
        let position = self.position_of(leaf)?;
        Ok(self.proof_at(position))
    }

    fn proof_at(&self, position: usize) -> MerkleProof {
        let mut proof = Vec::with_capacity(self.levels.len() - 1);
        let mut idx = position;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_is_left = idx % 2 == 1;
            let sibling_idx = if sibling_is_left { idx - 1 } else { idx + 1 };
            // the unpaired tail of an odd level is its own sibling
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            proof.push(ProofStep {
                sibling,
                sibling_is_left,
            });
            idx /= 2;
        }
        proof
    }

    /// Recompute the root from `leaf` along `proof` and compare with `root`.
    pub fn verify<T: Serialize>(proof: &[ProofStep], leaf: &T, root: &Hash) -> bool {
        let Ok(mut running) = digest(leaf) else {
            return false;
        };
        for step in proof {
            running = if step.sibling_is_left {
                hash_pair(&step.sibling, &running)
            } else {
                hash_pair(&running, &step.sibling)
            };
        }
        running == *root
    }
}

/// Root over `leaves`, or `None` for an empty batch.
pub fn merkle_root<T: Serialize>(leaves: &[T]) -> Result<Option<Hash>> {
    if leaves.is_empty() {
        return Ok(None);
    }
    Ok(Some(MerkleTree::build(leaves)?.root()))
}
