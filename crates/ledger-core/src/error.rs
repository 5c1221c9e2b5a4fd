use thiserror::Error;

/// Errors surfaced by ledger operations. All of them leave the chain untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("proof {proof:?} rejected against previous proof {previous_proof:?} at difficulty {difficulty}")]
    ProofRejected {
        proof: String,
        previous_proof: String,
        difficulty: u32,
    },

    #[error("block index {index} out of range (chain length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("proof search cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },
}

/// First integrity violation found while walking the chain from genesis to tip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    #[error("block {index} links to {found} but its predecessor digests to {expected}")]
    BrokenLink {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("block {index} carries proof {proof:?} which does not satisfy previous proof {previous_proof:?}")]
    InvalidProof {
        index: usize,
        proof: String,
        previous_proof: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
