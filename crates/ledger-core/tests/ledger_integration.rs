mod helpers;

use helpers::{assert_linked, ledger_with_difficulty, random_payloads};
use ledger_core::{
    constants::{DEFAULT_DIFFICULTY, GENESIS_PREVIOUS_HASH, GENESIS_PROOF},
    digest,
    mine::find_proof_parallel,
    pow, Block, CancelToken, Ledger, LedgerError, Miner, SharedLedger,
};

#[test]
fn fresh_ledger_holds_only_genesis() {
    let ledger = Ledger::new();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.blocks()[0].previous_hash, GENESIS_PREVIOUS_HASH);
    assert_eq!(ledger.blocks()[0].proof, GENESIS_PROOF);
    assert!(ledger.validate_chain(DEFAULT_DIFFICULTY));
}

#[test]
fn mining_two_transactions() {
    let mut ledger = Ledger::new();
    ledger.mine_block("Transaction A");
    ledger.mine_block("Transaction B");

    assert_eq!(ledger.len(), 3);
    assert!(ledger.validate_chain(4));
    let chain = ledger.blocks();
    assert_eq!(chain[2].previous_hash, digest(&chain[1]));
    assert_eq!(chain[1].data, "Transaction A");
    assert_eq!(chain[2].data, "Transaction B");
}

#[test]
fn independent_ledgers_agree_except_for_timestamps() {
    let mut first = Ledger::new();
    let mut second = Ledger::new();
    for _ in 0..3 {
        first.mine_block("X");
        second.mine_block("X");
    }

    assert_eq!(first.len(), second.len());
    for (a, b) in first.blocks().iter().zip(second.blocks()) {
        assert_eq!(a.index, b.index);
        assert_eq!(a.data, b.data);
        assert_eq!(a.proof, b.proof);
    }
    assert!(first.is_valid());
    assert!(second.is_valid());
}

#[test]
fn chain_links_hold_for_random_payloads() {
    let mut ledger = ledger_with_difficulty(2);
    let payloads = random_payloads(42, 20);
    for data in &payloads {
        ledger.mine_block(data.as_str());
    }

    assert_eq!(ledger.len(), payloads.len() + 1);
    assert_linked(&ledger);
    assert!(ledger.validate_chain(2));
    for (block, data) in ledger.blocks()[1..].iter().zip(&payloads) {
        assert_eq!(&block.data, data);
    }
}

#[test]
fn every_mined_proof_meets_difficulty() {
    let mut ledger = ledger_with_difficulty(3);
    for data in random_payloads(7, 5) {
        let previous = ledger.last_block().proof.clone();
        let block = ledger.mine_block(data);
        assert!(pow::valid_proof(&block.proof, &previous, 3));
        let hex = hex::encode(pow::proof_hash(&block.proof, &previous));
        assert!(hex.starts_with("000"));
    }
}

#[test]
fn rejected_proof_leaves_chain_untouched() {
    let mut ledger = Ledger::new();
    ledger.mine_block("Transaction A");
    let tip = ledger.last_block().clone();

    let err = ledger
        .append_block("not-a-valid-proof", "Transaction B")
        .unwrap_err();
    assert!(matches!(err, LedgerError::ProofRejected { .. }));
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.last_block(), &tip);
    assert!(ledger.is_valid());
}

#[test]
fn externally_found_proof_can_be_appended() {
    let mut ledger = Ledger::new();
    let proof = pow::find_proof(&ledger.last_block().proof, DEFAULT_DIFFICULTY);
    let block = ledger.append_block(proof.clone(), "external").unwrap();
    assert_eq!(block.proof, proof);
    assert_eq!(block.index, 1);
}

#[test]
fn out_of_range_access() {
    let ledger = Ledger::new();
    let err = ledger.get_block(5).unwrap_err();
    assert_eq!(err, LedgerError::IndexOutOfRange { index: 5, len: 1 });
    assert_eq!(err.to_string(), "block index 5 out of range (chain length 1)");
}

#[test]
fn exported_chain_recomputes_the_same_digests() {
    let mut ledger = ledger_with_difficulty(2);
    ledger.mine_block("caf\u{e9}");
    ledger.mine_block("plain");

    let exported = serde_json::to_string(ledger.blocks()).unwrap();
    let imported: Vec<Block> = serde_json::from_str(&exported).unwrap();
    for (original, copy) in ledger.blocks().iter().zip(&imported) {
        assert_eq!(original.digest(), copy.digest());
    }
    for pair in imported.windows(2) {
        assert_eq!(pair[1].previous_hash, pair[0].digest());
    }
}

#[test]
fn parallel_search_is_deterministic() {
    let token = CancelToken::new();
    for previous in ["0", "563", "2832"] {
        assert_eq!(
            find_proof_parallel(previous, 3, &token).unwrap(),
            pow::find_proof(previous, 3)
        );
    }
}

#[test]
fn shared_ledger_with_parallel_miner() {
    let shared = SharedLedger::new(ledger_with_difficulty(3));
    let miner = Miner::new(3).parallel(true);
    for data in ["A", "B", "C"] {
        shared.mine_block_with(&miner, data).unwrap();
    }
    assert_eq!(shared.len(), 4);
    assert!(shared.validate_chain(3));
}
