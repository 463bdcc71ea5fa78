//! Unspent transaction output pool

use std::collections::HashMap;

use crate::error::{LedgerError, Result};
use crate::types::*;

/// UTXO Pool: OutPoint → TransactionOutput
///
/// Every key is an output that is spendable from the point of view of this
/// pool. `Clone` produces a fully independent copy, which is how chain
/// branches and speculative validation avoid sharing state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoPool {
    utxos: HashMap<OutPoint, TransactionOutput>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool holding every output of a coinbase transaction
    pub fn from_coinbase(coinbase: &Transaction) -> Self {
        let mut pool = Self::new();
        for (i, output) in coinbase.outputs().iter().enumerate() {
            pool.add(coinbase.outpoint(i), output.clone());
        }
        pool
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    /// Output at `outpoint`. Callers are expected to check `contains` first;
    /// a miss is a caller bug and reported as `NotFound`.
    pub fn get(&self, outpoint: &OutPoint) -> Result<&TransactionOutput> {
        self.utxos.get(outpoint).ok_or_else(|| {
            LedgerError::NotFound(format!(
                "UTXO {}:{}",
                hex_prefix(&outpoint.hash),
                outpoint.index
            ))
        })
    }

    /// Insert or overwrite
    pub fn add(&mut self, outpoint: OutPoint, output: TransactionOutput) {
        self.utxos.insert(outpoint, output);
    }

    pub fn remove(&mut self, outpoint: &OutPoint) -> Option<TransactionOutput> {
        self.utxos.remove(outpoint)
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn outpoints(&self) -> Vec<OutPoint> {
        self.utxos.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TransactionOutput)> {
        self.utxos.iter()
    }

    /// Sum of all unspent values, `None` on overflow
    pub fn total_value(&self) -> Option<Integer> {
        self.utxos
            .values()
            .try_fold(0i64, |acc, output| acc.checked_add(output.value))
    }
}

fn hex_prefix(hash: &Hash) -> String {
    hash.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outpoint(byte: u8, index: Natural) -> OutPoint {
        OutPoint::new([byte; 32], index)
    }

    fn output(value: Integer) -> TransactionOutput {
        TransactionOutput::new(value, vec![0x02; 33])
    }

    #[test]
    fn test_add_contains_get() {
        let mut pool = UtxoPool::new();
        assert!(pool.is_empty());

        pool.add(outpoint(1, 0), output(10));
        assert!(pool.contains(&outpoint(1, 0)));
        assert!(!pool.contains(&outpoint(1, 1)));
        assert_eq!(pool.get(&outpoint(1, 0)).unwrap().value, 10);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let pool = UtxoPool::new();
        let err = pool.get(&outpoint(0xab, 3)).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(ref msg) if msg.contains("abababab:3")));
    }

    #[test]
    fn test_add_overwrites() {
        let mut pool = UtxoPool::new();
        pool.add(outpoint(1, 0), output(10));
        pool.add(outpoint(1, 0), output(7));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(&outpoint(1, 0)).unwrap().value, 7);
    }

    #[test]
    fn test_remove() {
        let mut pool = UtxoPool::new();
        pool.add(outpoint(1, 0), output(10));
        assert_eq!(pool.remove(&outpoint(1, 0)).map(|o| o.value), Some(10));
        assert!(pool.remove(&outpoint(1, 0)).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_copy_is_independent() {
        let mut original = UtxoPool::new();
        original.add(outpoint(1, 0), output(10));

        let mut copy = original.clone();
        copy.remove(&outpoint(1, 0));
        copy.add(outpoint(2, 0), output(5));

        assert!(original.contains(&outpoint(1, 0)));
        assert!(!original.contains(&outpoint(2, 0)));
        assert_eq!(original.len(), 1);
        assert_eq!(copy.outpoints(), vec![outpoint(2, 0)]);
    }

    #[test]
    fn test_from_coinbase() {
        let coinbase = Transaction::coinbase(25, vec![0x03; 33]);
        let pool = UtxoPool::from_coinbase(&coinbase);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(&coinbase.outpoint(0)).unwrap().value, 25);
        assert_eq!(pool.total_value(), Some(25));
    }
}
