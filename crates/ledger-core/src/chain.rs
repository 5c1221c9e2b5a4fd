//! The ledger: an append-only chain of blocks gated by proof-of-work.

use crate::{
    constants::{DEFAULT_DIFFICULTY, GENESIS_DATA},
    error::{ChainViolation, LedgerError, Result},
    mine::Miner,
    now_millis, pow, Block,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Leading hex zeros required of every proof after genesis.
    pub difficulty: u32,
    /// Payload stored in the genesis block.
    pub genesis_data: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            genesis_data: GENESIS_DATA.to_string(),
        }
    }
}

/// Single-writer chain. Appending is the only way to change it, and every
/// append after genesis must carry a proof valid against the current tip.
#[derive(Clone, Debug)]
pub struct Ledger {
    config: LedgerConfig,
    chain: Vec<Block>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Create a ledger seeded with its genesis block. Genesis is not proof-checked.
    pub fn with_config(config: LedgerConfig) -> Self {
        let genesis = Block::genesis(config.genesis_data.clone(), now_millis());
        debug!(digest = %genesis.digest(), "genesis block created");
        Self {
            config,
            chain: vec![genesis],
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger always holds a genesis block")
    }

    pub fn get_block(&self, index: usize) -> Result<&Block> {
        self.chain.get(index).ok_or(LedgerError::IndexOutOfRange {
            index,
            len: self.chain.len(),
        })
    }

    /// Append a block carrying `proof`, which must satisfy the configured
    /// difficulty against the tip's proof. On rejection the chain is unchanged.
    pub fn append_block(
        &mut self,
        proof: impl Into<String>,
        data: impl Into<String>,
    ) -> Result<Block> {
        let proof = proof.into();
        let difficulty = self.config.difficulty;
        let previous_proof = &self.last_block().proof;
        if !pow::valid_proof(&proof, previous_proof, difficulty) {
            debug!(%proof, %previous_proof, difficulty, "proof rejected");
            return Err(LedgerError::ProofRejected {
                proof,
                previous_proof: previous_proof.clone(),
                difficulty,
            });
        }
        Ok(self.push_block(proof, data.into()))
    }

    /// Search for a proof against the tip and append `data` with it.
    pub fn mine_block(&mut self, data: impl Into<String>) -> Block {
        let proof = pow::find_proof(&self.last_block().proof, self.config.difficulty);
        self.append_block(proof, data)
            .expect("search returns a proof valid at the ledger's difficulty")
    }

    /// Like [`Ledger::mine_block`] but searches with `miner`, which may run in
    /// parallel or be cancelled. The proof is still checked at the ledger's
    /// own difficulty before appending.
    pub fn mine_block_with(&mut self, miner: &Miner, data: impl Into<String>) -> Result<Block> {
        let proof = miner.find_proof(&self.last_block().proof)?;
        self.append_block(proof, data)
    }

    /// True when every block links to its predecessor's digest and carries a
    /// proof valid at `difficulty`. Chains of length 0 or 1 are valid.
    pub fn validate_chain(&self, difficulty: u32) -> bool {
        self.verify_chain(difficulty).is_ok()
    }

    /// [`Ledger::validate_chain`] at the configured difficulty.
    pub fn is_valid(&self) -> bool {
        self.validate_chain(self.config.difficulty)
    }

    /// Walk the chain from index 1 and report the earliest violation.
    pub fn verify_chain(&self, difficulty: u32) -> std::result::Result<(), ChainViolation> {
        for (offset, pair) in self.chain.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let index = offset + 1;

            let expected = previous.digest();
            if current.previous_hash != expected {
                debug!(index, %expected, found = %current.previous_hash, "broken link");
                return Err(ChainViolation::BrokenLink {
                    index,
                    expected,
                    found: current.previous_hash.clone(),
                });
            }

            if !pow::valid_proof(&current.proof, &previous.proof, difficulty) {
                debug!(index, proof = %current.proof, "invalid proof in chain");
                return Err(ChainViolation::InvalidProof {
                    index,
                    proof: current.proof.clone(),
                    previous_proof: previous.proof.clone(),
                });
            }
        }
        Ok(())
    }

    fn push_block(&mut self, proof: String, data: String) -> Block {
        let tip = self.last_block();
        let block = Block::new(
            self.chain.len() as u64,
            now_millis().max(tip.timestamp),
            data,
            proof,
            tip.digest(),
        );
        info!(
            index = block.index,
            proof = %block.proof,
            previous_hash = %block.previous_hash,
            "block appended"
        );
        self.chain.push(block.clone());
        block
    }
}

/// Cloneable handle for miners on several threads. Searches run outside the
/// lock; only reading the tip and appending are serialized.
#[derive(Clone, Debug, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl From<Ledger> for SharedLedger {
    fn from(ledger: Ledger) -> Self {
        Self::new(ledger)
    }
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Chain length, tip proof and difficulty, read under one lock.
    fn tip(&self) -> (usize, String, u32) {
        let ledger = self.lock();
        (
            ledger.len(),
            ledger.last_block().proof.clone(),
            ledger.difficulty(),
        )
    }

    /// Mine against the current tip. If another writer appends while the
    /// search runs, the proof is re-checked against the new tip and the search
    /// restarts when it no longer fits.
    pub fn mine_block(&self, data: impl Into<String>) -> Block {
        let data = data.into();
        loop {
            let (len, previous_proof, difficulty) = self.tip();
            let proof = pow::find_proof(&previous_proof, difficulty);
            let mut ledger = self.lock();
            if ledger.len() == len {
                return ledger
                    .append_block(proof, data)
                    .expect("search returns a proof valid against the unchanged tip");
            }
            match ledger.append_block(proof, data.clone()) {
                Ok(block) => return block,
                Err(err) => debug!(%err, "tip moved during search, retrying"),
            }
        }
    }

    /// Mine with `miner`. Cancellation is returned to the caller, and so is a
    /// rejected proof unless another writer moved the tip during the search.
    pub fn mine_block_with(&self, miner: &Miner, data: impl Into<String>) -> Result<Block> {
        let data = data.into();
        loop {
            let (len, previous_proof, _) = self.tip();
            let proof = miner.find_proof(&previous_proof)?;
            let mut ledger = self.lock();
            let tip_moved = ledger.len() != len;
            match ledger.append_block(proof, data.clone()) {
                Err(err @ LedgerError::ProofRejected { .. }) if tip_moved => {
                    debug!(%err, "tip moved during search, retrying")
                }
                other => return other,
            }
        }
    }

    pub fn append_block(&self, proof: impl Into<String>, data: impl Into<String>) -> Result<Block> {
        self.lock().append_block(proof, data)
    }

    pub fn validate_chain(&self, difficulty: u32) -> bool {
        self.lock().validate_chain(difficulty)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn last_block(&self) -> Block {
        self.lock().last_block().clone()
    }

    pub fn snapshot(&self) -> Vec<Block> {
        self.lock().blocks().to_vec()
    }
}
