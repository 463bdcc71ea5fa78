//! Pending transactions proposed for future blocks

use std::collections::HashMap;

use crate::types::{Hash, Transaction};

/// Transaction Pool: hash → Transaction
///
/// Holds no UTXO state and performs no validation; it only records what
/// has been proposed and not yet included in an accepted block.
#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    transactions: HashMap<Hash, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a transaction with the same hash was already pending
    pub fn add_transaction(&mut self, tx: Transaction) -> bool {
        self.transactions.insert(*tx.hash(), tx).is_none()
    }

    pub fn remove_transaction(&mut self, hash: &Hash) -> Option<Transaction> {
        self.transactions.remove(hash)
    }

    pub fn get_transaction(&self, hash: &Hash) -> Option<&Transaction> {
        self.transactions.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.transactions.contains_key(hash)
    }

    /// Snapshot of every pending transaction, in no particular order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
