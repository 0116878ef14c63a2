use crate::blockchain::core::chain::{canonical_hash, Block};
use crate::error::{ChainError, Result};
use crate::miner::{valid_proof_with, DIFFICULTY};

/// Whether every block links to its predecessor by hash and proof.
///
/// Sequences shorter than two blocks are vacuously valid. The final block's
/// own contents are not covered by any later hash.
pub fn validate_chain(chain: &[Block]) -> bool {
    validate_chain_with(chain, DIFFICULTY)
}

pub fn validate_chain_with(chain: &[Block], difficulty: usize) -> bool {
    first_invalid_block(chain, difficulty).is_none()
}

/// Position of the first block that fails to link to the one before it.
pub fn first_invalid_block(chain: &[Block], difficulty: usize) -> Option<usize> {
    chain
        .windows(2)
        .position(|pair| !links_to(&pair[0], &pair[1], difficulty))
        .map(|position| position + 1)
}

fn links_to(previous: &Block, block: &Block, difficulty: usize) -> bool {
    block.previous_hash == canonical_hash(previous)
        && valid_proof_with(difficulty, previous.proof, block.proof)
}

/// Check restored history before trusting it.
pub fn verify_persisted(blocks: &[Block], difficulty: usize) -> Result<()> {
    for (position, block) in blocks.iter().enumerate() {
        let expected = position as u64 + 1;
        if block.index != expected {
            return Err(ChainError::CorruptLedger(format!(
                "expected block index {}, found {}",
                expected, block.index
            )));
        }
    }

    if let Some(position) = first_invalid_block(blocks, difficulty) {
        return Err(ChainError::CorruptLedger(format!(
            "block {} does not link to its predecessor",
            blocks[position].index
        )));
    }
    Ok(())
}
