use crate::constants::{GENESIS_INDEX, GENESIS_PROOF, GENESIS_TIMESTAMP};
use crate::error::Result;
use crate::hasher::{digest, Hash};
use crate::merkle::merkle_root;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

}

/// A block as stored and exported. Field order is the wire order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// `None` only for a block without transactions.
    pub merkle_root: Option<Hash>,
    pub proof: u64,
    /// [`Hash::ZERO`] marks the genesis block, which has no predecessor.
    pub previous_hash: Hash,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// The committed part of a block. Transactions enter through `merkle_root`.
#[derive(Serialize)]
struct HashedFields<'a> {
    index: u64,
    timestamp: f64,
    merkle_root: &'a Option<Hash>,
    proof: u64,
    previous_hash: &'a Hash,
}

impl Block {
    /// Build a block, computing its merkle root from `transactions`.
    pub fn assemble(
        index: u64,
        timestamp: f64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: Hash,
    ) -> Result<Self> {
        Ok(Self {
            index,
            timestamp,
            merkle_root: merkle_root(&transactions)?,
            proof,
            previous_hash,
            transactions,
        })
    }

    /// The fixed first block shared by every node.
    pub fn genesis() -> Self {
        Self {
            index: GENESIS_INDEX,
            timestamp: GENESIS_TIMESTAMP,
            merkle_root: None,
            proof: GENESIS_PROOF,
            previous_hash: Hash::ZERO,
            transactions: vec![],
        }
    }

    /// True only for the exact block returned by [`Block::genesis`].
    pub fn is_genesis(&self) -> bool {
        *self == Self::genesis()
    }

    pub fn hash(&self) -> Result<Hash> {
        digest(&HashedFields {
            index: self.index,
            timestamp: self.timestamp,
            merkle_root: &self.merkle_root,
            proof: self.proof,
            previous_hash: &self.previous_hash,
        })
    }

    /// Merkle root derived from the block's own transactions.
    pub fn recomputed_merkle_root(&self) -> Result<Option<Hash>> {
        merkle_root(&self.transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::MerkleTree;

    fn sample_txs() -> Vec<Transaction> {
        vec![
            Transaction::new("A", "B", 10),
            Transaction::new("B", "C", 5),
            Transaction::new("C", "A", 1),
        ]
    }

    #[test]
    fn genesis_block_example() {
        let genesis = Block::genesis();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, 100);
        assert_eq!(genesis.previous_hash, Hash::ZERO);
        assert_eq!(genesis.merkle_root, None);
        assert!(genesis.transactions.is_empty());
        assert!(genesis.is_genesis());
        assert_eq!(genesis.hash().unwrap(), Block::genesis().hash().unwrap());
    }

    #[test]
    fn transaction_canonical_form_sorts_fields() {
        let tx = Transaction::new("Alice", "Bob", 10);
        let bytes = crate::hasher::canonical_bytes(&tx).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"amount":10,"recipient":"Bob","sender":"Alice"}"#
        );
    }

    #[test]
    fn assemble_computes_merkle_root() {
        let txs = sample_txs();
        let block = Block::assemble(2, 1_600_000_000.5, txs.clone(), 35293, Hash::ZERO).unwrap();
        assert_eq!(
            block.merkle_root,
            Some(MerkleTree::build(&txs).unwrap().root())
        );
        assert_eq!(block.recomputed_merkle_root().unwrap(), block.merkle_root);

        let empty = Block::assemble(2, 1_600_000_000.5, vec![], 35293, Hash::ZERO).unwrap();
        assert_eq!(empty.merkle_root, None);
    }

    #[test]
    fn block_hash_changes_with_proof() {
        let mut block = Block::assemble(2, 1_600_000_000.5, sample_txs(), 1, Hash::ZERO).unwrap();
        let before = block.hash().unwrap();
        assert_eq!(before, block.hash().unwrap());
        block.proof += 1;
        assert_ne!(before, block.hash().unwrap());
    }

    #[test]
    fn block_hash_commits_to_transactions_through_root() {
        let mut block = Block::assemble(2, 1_600_000_000.5, sample_txs(), 1, Hash::ZERO).unwrap();
        let before = block.hash().unwrap();
        // editing a transaction alone leaves the header untouched
        block.transactions[0].amount = 99;
        assert_eq!(before, block.hash().unwrap());
        assert_ne!(block.recomputed_merkle_root().unwrap(), block.merkle_root);
    }

    #[test]
    fn block_serialization_uses_wire_order() {
        let json = serde_json::to_string(&Block::genesis()).unwrap();
        let expected = format!(
            r#"{{"index":1,"timestamp":0.0,"merkle_root":null,"proof":100,"previous_hash":"{}","transactions":[]}}"#,
            "0".repeat(64)
        );
        assert_eq!(json, expected);
    }

    #[test]
    fn block_deserializes_without_transactions() {
        let json = format!(
            r#"{{"index":1,"timestamp":0.0,"merkle_root":null,"proof":100,"previous_hash":"{}"}}"#,
            "0".repeat(64)
        );
        let block: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block, Block::genesis());
    }

    #[test]
    fn block_serialization_round_trip_keeps_hash() {
        let block = Block::assemble(2, 1_712_345_678.123456, sample_txs(), 42, Hash::ZERO).unwrap();
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.hash().unwrap(), block.hash().unwrap());
    }
}
