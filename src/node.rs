use crate::blockchain::{validate_chain_with, Block, Ledger, Payload};
use crate::config::Config;
use crate::error::{ChainError, Result};
use crate::miner::{self, ProofBudget};
use crate::persistence::{Database, Persistence, MEMORY_DB_PATH};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

/// Shared, explicitly guarded access to one [`Ledger`].
///
/// Readers take the read lock just long enough to clone what they need.
/// Appenders hold the mining guard across read-last-block, find-proof and
/// append, so two concurrent miners never build on the same last block.
pub struct LedgerHandle {
    ledger: RwLock<Ledger>,
    mining: Mutex<()>,
    difficulty: usize,
    budget: ProofBudget,
}

impl LedgerHandle {
    pub fn new(ledger: Ledger) -> Self {
        let difficulty = ledger.difficulty();
        Self {
            ledger: RwLock::new(ledger),
            mining: Mutex::new(()),
            difficulty,
            budget: ProofBudget::unlimited(),
        }
    }

    /// Budget applied by [`LedgerHandle::mine`].
    pub fn with_budget(mut self, budget: ProofBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Snapshot of the whole chain.
    pub async fn chain(&self) -> Vec<Block> {
        self.ledger.read().await.chain().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.ledger.read().await.len()
    }

    pub async fn last_block(&self) -> Block {
        self.ledger.read().await.last_block().clone()
    }

    /// Validate a snapshot; appends may proceed meanwhile.
    pub async fn is_valid(&self) -> bool {
        let snapshot = self.chain().await;
        validate_chain_with(&snapshot, self.difficulty)
    }

    /// Append without validation, serialized with miners.
    pub async fn create_block(
        &self,
        proof: i64,
        previous_hash: String,
        payload: Option<Payload>,
    ) -> Result<Block> {
        let _guard = self.mining.lock().await;
        self.ledger
            .write()
            .await
            .create_block(proof, previous_hash, payload)
    }

    pub async fn mine(&self, payload: Payload) -> Result<Block> {
        self.mine_with_budget(payload, self.budget).await
    }

    /// Search for a proof on a blocking worker and append the mined block.
    pub async fn mine_with_budget(&self, payload: Payload, budget: ProofBudget) -> Result<Block> {
        let _guard = self.mining.lock().await;

        let last = self.last_block().await;
        let proof = miner::spawn_find_proof(self.difficulty, last.proof, budget)
            .await
            .map_err(|e| ChainError::Worker(e.to_string()))??;
        let previous_hash = last.hash();

        let block = self
            .ledger
            .write()
            .await
            .create_block(proof, previous_hash, Some(payload))?;
        info!(index = block.index, proof = block.proof, "A block is mined");
        Ok(block)
    }
}

/// Process-level wiring: configuration, storage and the shared ledger.
pub struct Node {
    pub config: Config,
    pub ledger: Arc<LedgerHandle>,
}

impl Node {
    pub fn init(config: Config) -> Result<Self> {
        config.validate()?;

        let db_path = std::path::Path::new(&config.database.path);
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // An unreachable store is fatal; ":memory:" is the only ephemeral mode.
        let persistence: Box<dyn Persistence> = match Database::open(&config.database.path) {
            Ok(db) => Box::new(db),
            Err(e) => {
                error!("Failed to open DB at {}: {}", config.database.path, e);
                return Err(e);
            }
        };
        if config.database.path == MEMORY_DB_PATH {
            warn!("Using an in-memory database; blocks will not survive a restart");
        }

        let ledger = Ledger::open(
            persistence,
            config.ledger.difficulty,
            config.ledger.load_policy(),
        )?;
        if !ledger.is_valid() {
            warn!("Restored chain does not validate");
        }
        info!(
            blocks = ledger.len(),
            difficulty = ledger.difficulty(),
            "Ledger ready"
        );

        let budget = match config.ledger.mining_deadline_secs {
            Some(secs) => ProofBudget::within(Duration::from_secs(secs)),
            None => ProofBudget::unlimited(),
        };
        let ledger = Arc::new(LedgerHandle::new(ledger).with_budget(budget));

        Ok(Self { config, ledger })
    }

    #[cfg(feature = "api")]
    pub async fn start(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Starting axum API server on {}", addr);

        let app = crate::api::build_api_router(self.ledger.clone());
        axum::serve(listener, app).await?;
        Ok(())
    }
}
