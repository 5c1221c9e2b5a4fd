use crate::{
    constants::{CANCEL_CHECK_INTERVAL, DEFAULT_DIFFICULTY, PARALLEL_BATCH_SIZE},
    error::{LedgerError, Result},
    pow::valid_proof,
};
use rayon::prelude::*;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;
use tracing::debug;

/// Shared stop flag for an in-flight proof search. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Same search as [`crate::pow::find_proof`], but gives up once `cancel` is set.
/// The token is polled every [`CANCEL_CHECK_INTERVAL`] attempts, starting with
/// the first one.
pub fn find_proof_cancellable(
    previous_proof: &str,
    difficulty: u32,
    cancel: &CancelToken,
) -> Result<String> {
    let mut nonce: u64 = 0;
    loop {
        if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            debug!(attempts = nonce, previous_proof, "proof search cancelled");
            return Err(LedgerError::MiningCancelled { attempts: nonce });
        }
        let candidate = nonce.to_string();
        if valid_proof(&candidate, previous_proof, difficulty) {
            return Ok(candidate);
        }
        nonce = nonce.wrapping_add(1);
    }
}

/// Searches nonces in parallel, one batch of [`PARALLEL_BATCH_SIZE`] at a
/// time. `find_first` keeps sequential order within a batch and batches run in
/// ascending order, so the result is the same nonce the single-threaded search
/// returns. The token is checked before every batch.
pub fn find_proof_parallel(
    previous_proof: &str,
    difficulty: u32,
    cancel: &CancelToken,
) -> Result<String> {
    search_batches(previous_proof, difficulty, cancel, PARALLEL_BATCH_SIZE)
}

fn search_batches(
    previous_proof: &str,
    difficulty: u32,
    cancel: &CancelToken,
    batch_size: u64,
) -> Result<String> {
    let mut start: u64 = 0;
    while start < u64::MAX {
        if cancel.is_cancelled() {
            debug!(attempts = start, previous_proof, "parallel proof search cancelled");
            return Err(LedgerError::MiningCancelled { attempts: start });
        }
        let end = start.saturating_add(batch_size);
        let found = (start..end)
            .into_par_iter()
            .find_first(|nonce| valid_proof(&nonce.to_string(), previous_proof, difficulty));
        if let Some(nonce) = found {
            return Ok(nonce.to_string());
        }
        start = end;
    }
    panic!("nonce space exhausted (practically impossible)")
}

/// Settings for one or more proof searches.
#[derive(Clone, Debug)]
pub struct Miner {
    difficulty: u32,
    parallel: bool,
    cancel: CancelToken,
}

impl Default for Miner {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl Miner {
    pub fn new(difficulty: u32) -> Self {
        Self {
            difficulty,
            parallel: false,
            cancel: CancelToken::new(),
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn find_proof(&self, previous_proof: &str) -> Result<String> {
        let started = Instant::now();
        let proof = if self.parallel {
            find_proof_parallel(previous_proof, self.difficulty, &self.cancel)?
        } else {
            find_proof_cancellable(previous_proof, self.difficulty, &self.cancel)?
        };
        debug!(
            previous_proof,
            %proof,
            difficulty = self.difficulty,
            parallel = self.parallel,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "proof found"
        );
        Ok(proof)
    }
}
