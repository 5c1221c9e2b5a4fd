use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod canonical;
pub mod chain;
pub mod constants;
pub mod error;
pub mod mine;

pub use canonical::canonical_bytes;
pub use chain::{Ledger, LedgerConfig, SharedLedger};
pub use error::{ChainViolation, LedgerError, Result};
pub use mine::{CancelToken, Miner};

pub type Hash = [u8; 32];

/// One ledger entry. Blocks are never changed once the ledger appends them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub data: String,
    pub proof: String,
    pub previous_hash: String,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: u64,
        data: impl Into<String>,
        proof: impl Into<String>,
        previous_hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            timestamp,
            data: data.into(),
            proof: proof.into(),
            previous_hash: previous_hash.into(),
        }
    }

    /// The fixed first block: proof `"0"`, previous hash `"0"`.
    pub fn genesis(data: impl Into<String>, timestamp: u64) -> Self {
        Self::new(
            0,
            timestamp,
            data,
            constants::GENESIS_PROOF,
            constants::GENESIS_PREVIOUS_HASH,
        )
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
            && self.proof == constants::GENESIS_PROOF
            && self.previous_hash == constants::GENESIS_PREVIOUS_HASH
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical::canonical_bytes(self)
    }

    /// Lowercase hex SHA-256 of the canonical encoding.
    pub fn digest(&self) -> String {
        digest(self)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.canonical_bytes()))
    }
}

/// Digest of a block: 64 lowercase hex characters.
pub fn digest(block: &Block) -> String {
    hex::encode(sha256(&canonical_bytes(block)))
}

pub fn sha256(bytes: &[u8]) -> Hash {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub mod pow {
    use super::Hash;
    use sha2::{Digest, Sha256};

    /// Hash of `previous_proof` immediately followed by `candidate`.
    pub fn proof_hash(candidate: &str, previous_proof: &str) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(previous_proof.as_bytes());
        hasher.update(candidate.as_bytes());
        let digest = hasher.finalize();
        let mut h = [0u8; 32];
        h.copy_from_slice(&digest[..]);
        h
    }

    /// True iff the hex digest of `previous_proof ++ candidate` starts with
    /// `difficulty` zeros. A difficulty above 64 can never be met.
    pub fn valid_proof(candidate: &str, previous_proof: &str, difficulty: u32) -> bool {
        count_leading_zero_nibbles(&proof_hash(candidate, previous_proof)) >= difficulty
    }

    /// Search nonces 0, 1, 2, ... and return the first one (as a decimal string)
    /// accepted by [`valid_proof`]. Runs until it succeeds.
    pub fn find_proof(previous_proof: &str, difficulty: u32) -> String {
        let mut nonce: u64 = 0;
        loop {
            let candidate = nonce.to_string();
            if valid_proof(&candidate, previous_proof, difficulty) {
                return candidate;
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    /// Number of leading `'0'` characters in the hex rendering of `hash`.
    pub fn count_leading_zero_nibbles(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 2;
            } else {
                if *b < 0x10 {
                    total += 1;
                }
                break;
            }
        }
        total
    }
}
