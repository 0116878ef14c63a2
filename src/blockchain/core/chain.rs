use crate::blockchain::core::validation::{validate_chain_with, verify_persisted};
use crate::crypto::canonical_digest;
use crate::error::{ChainError, Result};
use crate::miner::{self, ProofBudget, DIFFICULTY, MAX_DIFFICULTY};
use crate::persistence::{InMemoryPersistence, Persistence};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// `previous_hash` carried by the first block of every ledger.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
/// Proof carried by the first block of every ledger.
pub const GENESIS_PROOF: i64 = 1;

pub const DEFAULT_ANIMAL_TYPE: &str = "Charizard";
pub const DEFAULT_PET_NAME: &str = "Ash";

/// Descriptive fields carried by a block.
///
/// They take part in the block hash and nothing else. Field names are part of
/// the canonical form and must not be renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub animal_type: String,
    pub pet_name: String,
}

impl Payload {
    pub fn new(animal_type: impl Into<String>, pet_name: impl Into<String>) -> Self {
        Self {
            animal_type: animal_type.into(),
            pet_name: pet_name.into(),
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::new(DEFAULT_ANIMAL_TYPE, DEFAULT_PET_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based position in the chain.
    pub index: u64,
    /// Canonical hash of the preceding block, `"0"` for genesis.
    pub previous_hash: String,
    pub proof: i64,
    #[serde(flatten)]
    pub payload: Payload,
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS[.ffffff]`.
    pub timestamp: String,
}

impl Block {
    /// Build a block stamped with the current time.
    pub fn new(index: u64, previous_hash: impl Into<String>, proof: i64, payload: Payload) -> Self {
        Block {
            index,
            previous_hash: previous_hash.into(),
            proof,
            payload,
            timestamp: now_timestamp(),
        }
    }

    pub fn hash(&self) -> String {
        canonical_hash(self)
    }
}

/// SHA-256 over the block's canonical, key-sorted text form; 64 lowercase hex
/// characters.
pub fn canonical_hash(block: &Block) -> String {
    // Strings and integers only: lowering a block into JSON cannot fail.
    canonical_digest(block).expect("block fields always serialize")
}

/// Render a timestamp the way the persisted history does: microseconds are
/// shown only when non-zero.
pub fn format_timestamp(at: &NaiveDateTime) -> String {
    if at.nanosecond() / 1_000 == 0 {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

pub fn now_timestamp() -> String {
    format_timestamp(&Local::now().naive_local())
}

/// How persisted history is treated when a ledger is reopened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPolicy {
    /// Restore exactly what the store returns.
    #[default]
    Trust,
    /// Reject history that is not index-contiguous from 1 or fails validation.
    Verify,
}

/// The in-memory chain plus the backend every appended block is written to.
///
/// The ledger performs no locking: callers sharing one ledger must serialize
/// the read-last-block, find-proof, append sequence themselves (see
/// [`crate::node::LedgerHandle`]).
pub struct Ledger {
    blocks: Vec<Block>,
    difficulty: usize,
    persistence: Box<dyn Persistence>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("blocks", &self.blocks.len())
            .field("difficulty", &self.difficulty)
            .finish()
    }
}

impl Ledger {
    /// Fresh ledger backed by in-memory persistence at the default difficulty.
    pub fn new() -> Result<Self> {
        Self::with_difficulty(DIFFICULTY)
    }

    /// Fresh in-memory ledger with a custom difficulty, mostly for tests.
    pub fn with_difficulty(difficulty: usize) -> Result<Self> {
        Self::open(
            Box::new(InMemoryPersistence::new()),
            difficulty,
            LoadPolicy::Trust,
        )
    }

    /// Restore a ledger from `persistence`, or start one with a genesis block
    /// when the store is empty.
    pub fn open(
        persistence: Box<dyn Persistence>,
        difficulty: usize,
        policy: LoadPolicy,
    ) -> Result<Self> {
        if difficulty == 0 || difficulty > MAX_DIFFICULTY {
            return Err(ChainError::Config(format!(
                "difficulty must be between 1 and {}, got {}",
                MAX_DIFFICULTY, difficulty
            )));
        }

        let blocks = persistence.load_blocks()?;
        if blocks.is_empty() {
            let mut ledger = Ledger {
                blocks: Vec::new(),
                difficulty,
                persistence,
            };
            let genesis = ledger.create_block(GENESIS_PROOF, GENESIS_PREVIOUS_HASH, None)?;
            info!(hash = %genesis.hash(), "Created genesis block");
            return Ok(ledger);
        }

        if policy == LoadPolicy::Verify {
            verify_persisted(&blocks, difficulty)?;
        }
        info!(blocks = blocks.len(), ?policy, "Restored ledger from persistence");

        Ok(Ledger {
            blocks,
            difficulty,
            persistence,
        })
    }

    pub fn chain(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false once constructed; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn last_block(&self) -> &Block {
        // A genesis block exists from construction onward.
        &self.blocks[self.blocks.len() - 1]
    }

    fn next_index(&self) -> u64 {
        self.blocks.len() as u64 + 1
    }

    /// Append a block without checking `proof` or `previous_hash`.
    ///
    /// `None` stands for the default payload. The block is persisted before it
    /// becomes visible in memory, so a backend failure leaves the chain as it
    /// was.
    pub fn create_block(
        &mut self,
        proof: i64,
        previous_hash: impl Into<String>,
        payload: Option<Payload>,
    ) -> Result<Block> {
        let block = Block::new(
            self.next_index(),
            previous_hash,
            proof,
            payload.unwrap_or_default(),
        );
        self.persistence.save_block(&block)?;
        debug!(index = block.index, proof = block.proof, "Appended block");
        self.blocks.push(block.clone());
        Ok(block)
    }

    /// Like [`Ledger::create_block`], but refuses blocks that would not link to
    /// the current last block.
    pub fn create_block_checked(
        &mut self,
        proof: i64,
        previous_hash: impl Into<String>,
        payload: Option<Payload>,
    ) -> Result<Block> {
        let previous_hash = previous_hash.into();
        let index = self.next_index();
        let last = self.last_block();

        if previous_hash != last.hash() {
            return Err(ChainError::InvalidBlockLinkage { index });
        }
        if !miner::valid_proof_with(self.difficulty, last.proof, proof) {
            return Err(ChainError::InvalidProofOfWork { index });
        }

        self.create_block(proof, previous_hash, payload)
    }

    /// Find a proof for the last block and append a block carrying `payload`.
    pub fn mine(&mut self, payload: Option<Payload>) -> Result<Block> {
        self.mine_with_budget(payload, ProofBudget::unlimited())
    }

    pub fn mine_with_budget(
        &mut self,
        payload: Option<Payload>,
        budget: ProofBudget,
    ) -> Result<Block> {
        let last = self.last_block();
        let proof = miner::find_proof_bounded(self.difficulty, last.proof, budget)?;
        let previous_hash = last.hash();
        self.create_block(proof, previous_hash, payload)
    }

    pub fn is_valid(&self) -> bool {
        validate_chain_with(&self.blocks, self.difficulty)
    }
}
