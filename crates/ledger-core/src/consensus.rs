//! Longest-valid-chain resolution across peer snapshots.

use crate::block::Block;
use crate::chain::Chain;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A peer's chain as served by its export endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl PeerSnapshot {
    pub fn of(chain: &Chain) -> Self {
        Self {
            chain: chain.blocks().to_vec(),
            length: chain.len(),
        }
    }

    /// The advertised length must match the blocks actually sent.
    fn is_well_formed(&self) -> bool {
        !self.chain.is_empty() && self.length == self.chain.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOutcome {
    pub adopted: bool,
    pub length: usize,
}

/// Pick the first strictly longest valid chain among `snapshots`.
///
/// Snapshots are scanned in the order given, so on a tie the earliest one
/// wins. Malformed or invalid snapshots are skipped.
pub fn select_longest<I>(local_length: usize, snapshots: I) -> Option<Vec<Block>>
where
    I: IntoIterator<Item = PeerSnapshot>,
{
    let mut best_length = local_length;
    let mut best_chain = None;

    for (position, snapshot) in snapshots.into_iter().enumerate() {
        if !snapshot.is_well_formed() {
            warn!(
                position,
                advertised = snapshot.length,
                actual = snapshot.chain.len(),
                "skipping malformed peer snapshot"
            );
            continue;
        }
        if snapshot.length <= best_length {
            debug!(position, length = snapshot.length, best_length, "peer chain not longer");
            continue;
        }
        if !Chain::validate(&snapshot.chain) {
            warn!(position, length = snapshot.length, "skipping invalid peer chain");
            continue;
        }
        best_length = snapshot.length;
        best_chain = Some(snapshot.chain);
    }
    best_chain
}

/// Replace `chain` wholesale with the best peer candidate, if any.
pub fn resolve<I>(chain: &mut Chain, snapshots: I) -> ResolvedOutcome
where
    I: IntoIterator<Item = PeerSnapshot>,
{
    match select_longest(chain.len(), snapshots) {
        Some(blocks) => {
            chain.adopt(blocks);
            info!(length = chain.len(), "adopted longer peer chain");
            ResolvedOutcome {
                adopted: true,
                length: chain.len(),
            }
        }
        None => ResolvedOutcome {
            adopted: false,
            length: chain.len(),
        },
    }
}
