use std::collections::HashMap;

use mooring_core::{Hash, Transaction};
use parking_lot::RwLock;
use tracing::debug;

/// Configuration for the mempool
#[derive(Debug, Clone)]
pub struct MempoolConfig {
    /// Maximum number of transactions in the pool
    pub max_size: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        MempoolConfig { max_size: 10_000 }
    }
}

/// The transaction mempool
pub struct Mempool {
    config: MempoolConfig,
    /// Transactions indexed by hash
    by_hash: RwLock<HashMap<Hash, Transaction>>,
}

impl Mempool {
    pub fn new(config: MempoolConfig) -> Self {
        Mempool {
            config,
            by_hash: RwLock::new(HashMap::new()),
        }
    }

    /// Add a transaction to the mempool
    pub fn add(&self, tx: Transaction) -> Result<Hash, MempoolError> {
        let hash = tx.hash().map_err(|_| MempoolError::InvalidTransaction)?;

        let mut by_hash = self.by_hash.write();

        if by_hash.contains_key(&hash) {
            return Err(MempoolError::AlreadyExists);
        }
        if by_hash.len() >= self.config.max_size {
            return Err(MempoolError::PoolFull);
        }

        by_hash.insert(hash, tx);
        debug!("Added transaction {} to mempool", hash);

        Ok(hash)
    }

    /// Remove a transaction from the mempool
    pub fn remove(&self, hash: &Hash) -> Option<Transaction> {
        let removed = self.by_hash.write().remove(hash);
        if removed.is_some() {
            debug!("Removed transaction {} from mempool", hash);
        }
        removed
    }

    /// Remove transactions that have been included in a block
    pub fn remove_committed(&self, tx_hashes: &[Hash]) {
        let mut by_hash = self.by_hash.write();
        for hash in tx_hashes {
            if by_hash.remove(hash).is_some() {
                debug!("Removed committed transaction {} from mempool", hash);
            }
        }
    }

    /// Get a transaction by hash
    pub fn get(&self, hash: &Hash) -> Option<Transaction> {
        self.by_hash.read().get(hash).cloned()
    }

    /// Check if a transaction exists
    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.read().contains_key(hash)
    }

    /// Snapshot of every pending transaction, for conflict scans
    pub fn transactions(&self) -> Vec<Transaction> {
        self.by_hash.read().values().cloned().collect()
    }

    /// Get current pool size
    pub fn len(&self) -> usize {
        self.by_hash.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.read().is_empty()
    }
}

/// Mempool errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MempoolError {
    #[error("Transaction already exists in mempool")]
    AlreadyExists,

    #[error("Mempool is full")]
    PoolFull,

    #[error("Invalid transaction")]
    InvalidTransaction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mooring_core::{Amount, Hash, PayloadKind, ScOutput};

    fn create_test_tx(nonce: u64, sc_id: &str, amount: Amount) -> Transaction {
        let sc_id = Hash::from_hex(sc_id).unwrap();
        Transaction::new(
            PayloadKind::Transparent,
            nonce,
            vec![
                ScOutput::Creation {
                    sc_id,
                    data: vec![],
                },
                ScOutput::Forward { sc_id, amount },
            ],
        )
    }

    #[test]
    fn test_add_and_get() {
        let mempool = Mempool::new(MempoolConfig::default());
        let tx = create_test_tx(1, "1492", 100);
        let hash = tx.hash().unwrap();

        mempool.add(tx.clone()).unwrap();

        let retrieved = mempool.get(&hash).unwrap();
        assert_eq!(retrieved, tx);
        assert!(mempool.contains(&hash));
    }

    #[test]
    fn test_duplicate_rejection() {
        let mempool = Mempool::new(MempoolConfig::default());
        let tx = create_test_tx(1, "1492", 100);

        mempool.add(tx.clone()).unwrap();
        let result = mempool.add(tx);

        assert!(matches!(result, Err(MempoolError::AlreadyExists)));
    }

    #[test]
    fn test_remove() {
        let mempool = Mempool::new(MempoolConfig::default());
        let tx = create_test_tx(1, "1492", 100);
        let hash = tx.hash().unwrap();

        mempool.add(tx).unwrap();
        assert!(mempool.contains(&hash));

        mempool.remove(&hash);
        assert!(!mempool.contains(&hash));
        assert!(mempool.is_empty());
    }

    #[test]
    fn test_pool_full() {
        let mempool = Mempool::new(MempoolConfig { max_size: 2 });

        mempool.add(create_test_tx(1, "01", 5)).unwrap();
        mempool.add(create_test_tx(2, "02", 5)).unwrap();
        let result = mempool.add(create_test_tx(3, "03", 5));

        assert!(matches!(result, Err(MempoolError::PoolFull)));
    }

    #[test]
    fn test_remove_committed() {
        let mempool = Mempool::new(MempoolConfig::default());
        let tx1 = create_test_tx(1, "01", 5);
        let tx2 = create_test_tx(2, "02", 5);
        let hash1 = tx1.hash().unwrap();
        let hash2 = tx2.hash().unwrap();

        mempool.add(tx1).unwrap();
        mempool.add(tx2).unwrap();

        mempool.remove_committed(&[hash1]);
        assert!(!mempool.contains(&hash1));
        assert!(mempool.contains(&hash2));
        assert_eq!(mempool.len(), 1);
    }

    #[test]
    fn test_transactions_snapshot() {
        let mempool = Mempool::new(MempoolConfig::default());
        mempool.add(create_test_tx(1, "01", 5)).unwrap();
        mempool.add(create_test_tx(2, "02", 5)).unwrap();

        let snapshot = mempool.transactions();
        assert_eq!(snapshot.len(), 2);
    }
}
