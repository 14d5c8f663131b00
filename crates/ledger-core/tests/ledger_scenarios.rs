use ledger_core::{
    consensus::{resolve, select_longest, PeerSnapshot},
    pow, Block, Chain, Hash, MerkleTree, Transaction,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::thread;

fn mine(chain: &mut Chain) -> Block {
    let proof = pow::search(chain.last_block().proof);
    chain.mint_block(proof, None).unwrap().clone()
}

fn chain_of(len: usize, tag: &str) -> Chain {
    let mut chain = Chain::new();
    while chain.len() < len {
        chain.append_transaction(tag, "bob", 1);
        mine(&mut chain);
    }
    chain
}

#[test]
fn genesis_and_three_transaction_block() {
    let genesis = Block::genesis();
    assert_eq!(genesis.index, 1);
    assert_eq!(genesis.proof, 100);
    assert_eq!(genesis.previous_hash, Hash::ZERO);
    assert_eq!(genesis.merkle_root, None);
    assert!(Chain::validate(&[genesis.clone()]));

    let txs = vec![
        Transaction::new("A", "B", 10),
        Transaction::new("B", "C", 5),
        Transaction::new("C", "A", 1),
    ];
    let proof = pow::search(100);
    assert!(pow::valid(100, proof));
    let second = Block::assemble(
        2,
        genesis.timestamp + 1.0,
        txs.clone(),
        proof,
        genesis.hash().unwrap(),
    )
    .unwrap();
    let blocks = vec![genesis, second];
    assert!(Chain::validate(&blocks));

    for i in 0..txs.len() {
        let mut tampered = blocks.clone();
        tampered[1].transactions[i].amount += 1;
        assert!(!Chain::validate(&tampered), "flip of tx {i} went unnoticed");
    }
}

#[test]
fn extending_a_valid_chain_keeps_it_valid() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut chain = Chain::new();
    for _ in 0..4 {
        for _ in 0..rng.gen_range(0..6) {
            let amount = rng.gen_range(1..100);
            chain.append_transaction("alice", "bob", amount);
        }
        mine(&mut chain);
        assert!(Chain::validate(chain.blocks()));
    }
    assert_eq!(chain.len(), 5);
}

#[test]
fn every_stored_transaction_proves_against_its_block_root() {
    let mut chain = Chain::new();
    for i in 0..5u64 {
        chain.append_transaction(format!("user-{i}"), "carol", i + 1);
    }
    let block = mine(&mut chain);
    let root = block.merkle_root.unwrap();
    let tree = MerkleTree::build(&block.transactions).unwrap();
    assert_eq!(tree.root(), root);
    for tx in &block.transactions {
        let proof = tree.proof_for(tx).unwrap();
        assert!(MerkleTree::verify(&proof, tx, &root));
    }
}

#[test]
fn consensus_adopts_valid_four_over_invalid_five() {
    let mut local = chain_of(3, "local");

    let mut peer_a = PeerSnapshot::of(&chain_of(5, "a"));
    peer_a.chain[4].previous_hash = Hash::ZERO;
    let peer_b = PeerSnapshot::of(&chain_of(4, "b"));

    let outcome = resolve(&mut local, vec![peer_a, peer_b.clone()]);
    assert!(outcome.adopted);
    assert_eq!(outcome.length, 4);
    assert_eq!(local.len(), 4);
    assert_eq!(local.blocks(), peer_b.chain.as_slice());
    assert!(Chain::validate(local.blocks()));
}

#[test]
fn adopted_chain_keeps_accepting_blocks() {
    let mut local = Chain::new();
    let peer = PeerSnapshot::of(&chain_of(3, "peer"));
    assert!(resolve(&mut local, vec![peer]).adopted);

    local.append_transaction("dave", "erin", 9);
    let block = mine(&mut local);
    assert_eq!(block.index, 4);
    assert!(Chain::validate(local.blocks()));
}

#[test]
fn snapshot_survives_the_wire() {
    let snapshot = PeerSnapshot::of(&chain_of(3, "wire"));
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: PeerSnapshot = serde_json::from_str(&json).unwrap();
    assert!(Chain::validate(&back.chain));
    assert_eq!(select_longest(1, vec![back]).map(|c| c.len()), Some(3));
}

#[test]
fn serialized_appends_lose_nothing() {
    let chain = Arc::new(Mutex::new(Chain::new()));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let chain = Arc::clone(&chain);
            thread::spawn(move || {
                for i in 0..25u64 {
                    chain
                        .lock()
                        .unwrap()
                        .append_transaction(format!("thread-{t}"), "sink", i + 1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut chain = chain.lock().unwrap();
    assert_eq!(chain.pending().len(), 200);
    let block = mine(&mut chain);
    assert_eq!(block.transactions.len(), 200);
    assert!(chain.pending().is_empty());
    assert!(Chain::validate(chain.blocks()));
}
