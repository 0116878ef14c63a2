//! End-to-end properties of the ledger at the production difficulty.

use petchain::blockchain::{canonical_hash, validate_chain, Block, Ledger, LoadPolicy, Payload};
use petchain::error::ChainError;
use petchain::miner::{find_proof, valid_proof};
use petchain::persistence::{Database, InMemoryPersistence, Persistence};

/// Genesis plus two blocks mined at difficulty 5.
fn three_block_chain() -> Ledger {
    let mut ledger = Ledger::new().unwrap();
    for payload in [Payload::new("Pikachu", "Ada"), Payload::new("Gengar", "Bo")] {
        let last = ledger.last_block().clone();
        let proof = find_proof(last.proof);
        ledger
            .create_block(proof, canonical_hash(&last), Some(payload))
            .unwrap();
    }
    ledger
}

#[test]
fn test_fresh_ledger_has_genesis_only() {
    let ledger = Ledger::new().unwrap();
    assert_eq!(ledger.len(), 1);
    let genesis = &ledger.chain()[0];
    assert_eq!(genesis.index, 1);
    assert_eq!(genesis.previous_hash, "0");
    assert_eq!(genesis.proof, 1);
}

#[test]
fn test_mine_second_block_from_genesis() {
    let mut ledger = Ledger::new().unwrap();
    let genesis = ledger.last_block().clone();

    let proof = find_proof(genesis.proof);
    assert_eq!(proof, 632238);
    assert!(valid_proof(genesis.proof, proof));
    assert!((1..proof).all(|p| !valid_proof(genesis.proof, p)));

    ledger
        .create_block(proof, canonical_hash(&genesis), Some(Payload::new("Mew", "Cy")))
        .unwrap();
    let chain = ledger.chain();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].index, 2);
    assert_eq!(chain[1].previous_hash, canonical_hash(&chain[0]));
    assert!(validate_chain(chain));
}

#[test]
fn test_three_block_chain_and_tampering() {
    let ledger = three_block_chain();
    let chain = ledger.chain().to_vec();
    // The second search solves below the previous proof.
    assert_eq!(chain[2].proof, 403091);
    assert!(validate_chain(&chain));

    let mut tampered = chain.clone();
    tampered[1].proof = 12345;
    assert!(!validate_chain(&tampered));

    let mut tampered = chain.clone();
    tampered[1].payload.animal_type = "Magikarp".to_string();
    assert!(!validate_chain(&tampered));

    let mut tampered = chain.clone();
    tampered[1].previous_hash = canonical_hash(&tampered[1]);
    assert!(!validate_chain(&tampered));

    let mut tampered = chain;
    tampered[0].payload.pet_name = "Eve".to_string();
    assert!(!validate_chain(&tampered));
}

#[test]
fn test_final_block_tampering() {
    let chain = three_block_chain().chain().to_vec();
    let last = chain.len() - 1;

    // p == l hashes "0", which has no leading zeros.
    let mut tampered = chain.clone();
    tampered[last].proof = chain[last - 1].proof;
    assert!(!validate_chain(&tampered));

    let mut tampered = chain.clone();
    tampered[last].previous_hash = "0".to_string();
    assert!(!validate_chain(&tampered));

    // Nothing hashes the final block's payload.
    let mut tampered = chain;
    tampered[last].payload = Payload::new("Ditto", "Zed");
    assert!(validate_chain(&tampered));
}

#[test]
fn test_restore_from_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let path = path.to_str().unwrap();

    let original = {
        let db = Database::open(path).unwrap();
        let mut ledger = Ledger::open(Box::new(db), 2, LoadPolicy::Trust).unwrap();
        ledger.mine(Some(Payload::new("Chansey", "Dot"))).unwrap();
        ledger.mine(None).unwrap();
        ledger.chain().to_vec()
    };

    let db = Database::open(path).unwrap();
    let restored = Ledger::open(Box::new(db), 2, LoadPolicy::Verify).unwrap();
    assert_eq!(restored.chain(), original.as_slice());
    assert!(restored.is_valid());
}

#[test]
fn test_trust_on_read_keeps_corrupt_history() {
    let mut blocks: Vec<Block> = {
        let mut ledger = Ledger::with_difficulty(1).unwrap();
        ledger.mine(None).unwrap();
        ledger.mine(None).unwrap();
        ledger.chain().to_vec()
    };
    blocks[1].payload.pet_name = "Forged".to_string();

    let store = InMemoryPersistence::with_blocks(blocks.clone());
    let trusted = Ledger::open(Box::new(store.clone()), 1, LoadPolicy::Trust).unwrap();
    assert_eq!(trusted.chain(), blocks.as_slice());
    assert!(!trusted.is_valid());

    let err = Ledger::open(Box::new(store), 1, LoadPolicy::Verify).unwrap_err();
    assert!(matches!(err, ChainError::CorruptLedger(_)));
}

#[test]
fn test_verify_rejects_gaps() {
    let mut ledger = Ledger::with_difficulty(1).unwrap();
    ledger.mine(None).unwrap();
    let genesis = ledger.chain()[0].clone();
    let mut second = ledger.chain()[1].clone();
    second.index = 3;

    let store = InMemoryPersistence::new();
    store.save_block(&genesis).unwrap();
    store.save_block(&second).unwrap();

    let err = Ledger::open(Box::new(store), 1, LoadPolicy::Verify).unwrap_err();
    assert_eq!(
        err,
        ChainError::CorruptLedger("expected block index 2, found 3".to_string())
    );
}
