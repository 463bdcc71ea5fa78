//! Batch confirmation of unordered candidate transactions

use tracing::debug;

use crate::crypto::SignatureVerifier;
use crate::types::*;
use crate::utxo_pool::UtxoPool;
use crate::validation::{check_transaction, is_valid_tx, valid_tx_fee};

/// Order in which confirmed transactions are returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitPolicy {
    /// Confirmation order
    #[default]
    FirstValid,
    /// Ascending fee, ties in confirmation order. Fees are taken from the
    /// pool as it stood immediately before each transaction was applied.
    MaxFee,
}

/// HandleTxs: 𝒯𝒳* × 𝒰𝒫 → 𝒯𝒳* × 𝒰𝒫
///
/// Repeats full passes over the not-yet-confirmed candidates until a pass
/// confirms nothing. Each candidate is checked against the current pool,
/// which already reflects every earlier confirmation, including those made
/// earlier in the same pass. A confirmed transaction is applied to `pool`
/// immediately.
///
/// Candidates that never become valid (bad signature, spent inputs, a
/// dependency cycle, insufficient funds) are left out of the result. At most
/// `candidates.len() + 1` passes are made.
pub fn commit_transactions<V>(
    candidates: &[Transaction],
    pool: &mut UtxoPool,
    verifier: &V,
    policy: CommitPolicy,
) -> Vec<Transaction>
where
    V: SignatureVerifier + ?Sized,
{
    commit_with_passes(candidates, pool, verifier, policy).0
}

/// [`commit_transactions`] plus the number of passes that confirmed at
/// least one transaction. The final pass, which confirms nothing, is not
/// counted.
fn commit_with_passes<V>(
    candidates: &[Transaction],
    pool: &mut UtxoPool,
    verifier: &V,
    policy: CommitPolicy,
) -> (Vec<Transaction>, usize)
where
    V: SignatureVerifier + ?Sized,
{
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    let mut confirmed: Vec<(Integer, &Transaction)> = Vec::with_capacity(candidates.len());
    let mut passes = 0usize;

    loop {
        let before = remaining.len();

        remaining.retain(|&i| {
            let tx = &candidates[i];
            match valid_tx_fee(tx, pool, verifier) {
                Some(fee) => {
                    apply_transaction(tx, pool);
                    confirmed.push((fee, tx));
                    false
                }
                None => true,
            }
        });

        if remaining.len() == before {
            break;
        }
        passes += 1;
    }

    debug!(
        candidates = candidates.len(),
        confirmed = confirmed.len(),
        passes,
        ?policy,
        "batch committed"
    );

    if policy == CommitPolicy::MaxFee {
        confirmed.sort_by_key(|(fee, _)| *fee);
    }

    let confirmed = confirmed.into_iter().map(|(_, tx)| tx.clone()).collect();
    (confirmed, passes)
}

/// ApplyTransaction: 𝒯𝒳 × 𝒰𝒫 → 𝒰𝒫
///
/// up' = (up \ {i.prevout : i ∈ tx.inputs}) ∪ {(tx.hash, j) ↦ tx.outputs[j]}
pub fn apply_transaction(tx: &Transaction, pool: &mut UtxoPool) {
    for input in tx.inputs() {
        pool.remove(&input.prevout);
    }
    for (j, output) in tx.outputs().iter().enumerate() {
        pool.add(tx.outpoint(j), output.clone());
    }
}

/// A ledger over a private copy of a UTXO pool that confirms batches of
/// transactions against it.
pub struct TxHandler<'v, V: SignatureVerifier + ?Sized> {
    utxo_pool: UtxoPool,
    verifier: &'v V,
    policy: CommitPolicy,
}

impl<'v, V: SignatureVerifier + ?Sized> TxHandler<'v, V> {
    pub fn new(utxo_pool: UtxoPool, verifier: &'v V) -> Self {
        Self::with_policy(utxo_pool, verifier, CommitPolicy::FirstValid)
    }

    pub fn with_policy(utxo_pool: UtxoPool, verifier: &'v V, policy: CommitPolicy) -> Self {
        Self {
            utxo_pool,
            verifier,
            policy,
        }
    }

    pub fn is_valid_tx(&self, tx: &Transaction) -> bool {
        is_valid_tx(tx, &self.utxo_pool, self.verifier)
    }

    pub fn check_transaction(&self, tx: &Transaction) -> ValidationResult {
        check_transaction(tx, &self.utxo_pool, self.verifier)
            .unwrap_or_else(|err| ValidationResult::Invalid(err.to_string()))
    }

    /// Confirm a mutually valid subset of `candidates` and apply it to the
    /// handler's pool
    pub fn handle_txs(&mut self, candidates: &[Transaction]) -> Vec<Transaction> {
        commit_transactions(candidates, &mut self.utxo_pool, self.verifier, self.policy)
    }

    pub fn policy(&self) -> CommitPolicy {
        self.policy
    }

    pub fn utxo_pool(&self) -> &UtxoPool {
        &self.utxo_pool
    }

    pub fn into_utxo_pool(self) -> UtxoPool {
        self.utxo_pool
    }
}
