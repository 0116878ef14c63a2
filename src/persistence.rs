//! Database persistence layer for PetChain

use crate::blockchain::{Block, Payload};
use crate::error::ChainError;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// SQLite path that opens a private, non-durable database.
pub const MEMORY_DB_PATH: &str = ":memory:";

/// Abstraction for persistence backends.
///
/// `load_blocks` returns every stored block ordered by ascending index;
/// `save_block` stores one block keyed by its index.
pub trait Persistence: Send + Sync {
    fn load_blocks(&self) -> Result<Vec<Block>, ChainError>;
    fn save_block(&self, block: &Block) -> Result<(), ChainError>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the SQLite file at `path`; `":memory:"` opens a
    /// private in-memory database.
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                \"index\" INTEGER PRIMARY KEY,
                previous_hash TEXT NOT NULL,
                proof INTEGER NOT NULL,
                animal_type TEXT NOT NULL,
                pet_name TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::Database(format!("Failed to create blocks table: {}", e)))?;

        debug!(path, "Opened block database");
        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| ChainError::Database("Mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO blocks (\"index\", previous_hash, proof, animal_type, pet_name, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                block.index as i64,
                block.previous_hash,
                block.proof,
                block.payload.animal_type,
                block.payload.pet_name,
                block.timestamp,
            ],
        )
        .map_err(|e| ChainError::Database(format!("Failed to save block {}: {}", block.index, e)))?;

        Ok(())
    }

    pub fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| ChainError::Database("Mutex poisoned".to_string()))?;
        let mut stmt = conn
            .prepare(
                "SELECT \"index\", previous_hash, proof, animal_type, pet_name, timestamp
                 FROM blocks ORDER BY \"index\" ASC",
            )
            .map_err(|e| ChainError::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let index: i64 = row.get(0)?;
                Ok(Block {
                    index: index as u64,
                    previous_hash: row.get(1)?,
                    proof: row.get(2)?,
                    payload: Payload {
                        animal_type: row.get(3)?,
                        pet_name: row.get(4)?,
                    },
                    timestamp: row.get(5)?,
                })
            })
            .map_err(|e| ChainError::Database(format!("Failed to query blocks: {}", e)))?;

        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(
                row.map_err(|e| ChainError::Database(format!("Failed to load block: {}", e)))?,
            );
        }
        Ok(blocks)
    }
}

impl Persistence for Database {
    fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        Database::load_blocks(self)
    }

    fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        Database::save_block(self, block)
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
/// Clones share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    pub blocks: Arc<Mutex<Vec<Block>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with previously persisted blocks, in the given order.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Arc::new(Mutex::new(blocks)),
        }
    }
}

impl Persistence for InMemoryPersistence {
    fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        let blocks = self
            .blocks
            .lock()
            .map_err(|_| ChainError::Database("Mutex poisoned".to_string()))?;
        let mut out = blocks.clone();
        out.sort_by_key(|b| b.index);
        Ok(out)
    }

    fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        let mut blocks = self
            .blocks
            .lock()
            .map_err(|_| ChainError::Database("Mutex poisoned".to_string()))?;
        if blocks.iter().any(|b| b.index == block.index) {
            return Err(ChainError::Database(format!(
                "Block {} already exists",
                block.index
            )));
        }
        blocks.push(block.clone());
        Ok(())
    }
}
