use serde::{Deserialize, Serialize};

use crate::crypto::{hash_value, merkle_root, Hash};
use crate::error::CoreError;
use crate::types::transaction::Transaction;

/// Block header containing metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height (0 for genesis)
    pub height: i32,
    /// Hash of the previous block (zeros for genesis)
    pub prev_hash: Hash,
    /// Unix timestamp
    pub timestamp: u64,
    /// Merkle root of transactions
    pub tx_root: Hash,
}

impl BlockHeader {
    /// Compute the hash of this header
    pub fn hash(&self) -> Result<Hash, CoreError> {
        hash_value(self)
    }
}

/// A main-chain block, reduced to what the state engine consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub txs: Vec<Transaction>,
}

impl Block {
    pub fn new(header: BlockHeader, txs: Vec<Transaction>) -> Self {
        Block { header, txs }
    }

    /// Compute the block hash (hash of header)
    pub fn hash(&self) -> Result<Hash, CoreError> {
        self.header.hash()
    }

    /// Compute the merkle root of transactions
    pub fn compute_tx_root(&self) -> Result<Hash, CoreError> {
        let tx_hashes: Result<Vec<Hash>, _> = self.txs.iter().map(|tx| tx.hash()).collect();
        Ok(merkle_root(&tx_hashes?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::PayloadKind;

    #[test]
    fn test_block_hash_deterministic() {
        let block = Block::default();
        assert_eq!(block.hash().unwrap(), block.hash().unwrap());
    }

    #[test]
    fn test_tx_root_tracks_contents() {
        let empty = Block::default();
        let mut block = Block::default();
        block
            .txs
            .push(Transaction::new(PayloadKind::Transparent, 1, vec![]));

        assert_ne!(
            empty.compute_tx_root().unwrap(),
            block.compute_tx_root().unwrap()
        );
    }
}
