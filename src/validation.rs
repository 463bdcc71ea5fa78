//! Transaction admissibility against a UTXO pool

use std::collections::HashSet;

use tracing::trace;

use crate::crypto::SignatureVerifier;
use crate::error::{LedgerError, Result};
use crate::types::*;
use crate::utxo_pool::UtxoPool;

/// CheckTransaction: 𝒯𝒳 × 𝒰𝒫 → {valid, invalid}
///
/// A transaction tx is valid against pool up if and only if:
/// 1. ∀i ∈ tx.inputs: i.prevout ∈ up
/// 2. ∀i ∈ tx.inputs: verify(up(i.prevout).owner, rawDataToSign(i), i.signature)
/// 3. no prevout is claimed by two inputs of tx
/// 4. ∀o ∈ tx.outputs: o.value ≥ 0
/// 5. Σᵢ up(i.prevout).value ≥ Σₒ o.value
///
/// Rule 1 runs first because every later rule that reads the pool relies on
/// the referenced outputs being present. The pool is never modified.
pub fn check_transaction<V>(
    tx: &Transaction,
    pool: &UtxoPool,
    verifier: &V,
) -> Result<ValidationResult>
where
    V: SignatureVerifier + ?Sized,
{
    check_transaction_fee(tx, pool, verifier).map(|(result, _)| result)
}

/// [`check_transaction`] that also returns the fee, Σ inputs − Σ outputs,
/// computed from the same sums as rule 5. The fee is 0 whenever the
/// transaction is invalid.
pub fn check_transaction_fee<V>(
    tx: &Transaction,
    pool: &UtxoPool,
    verifier: &V,
) -> Result<(ValidationResult, Integer)>
where
    V: SignatureVerifier + ?Sized,
{
    // 1. Every claimed output is unspent
    for (i, input) in tx.inputs().iter().enumerate() {
        if !pool.contains(&input.prevout) {
            return Ok(invalid(format!("Input {} not found in UTXO pool", i)));
        }
    }

    // 2. Every input is signed by the owner of the output it spends
    for (i, input) in tx.inputs().iter().enumerate() {
        let owner = &pool.get(&input.prevout)?.owner;
        let message = tx.raw_data_to_sign(i)?;
        if !verifier.verify_signature(owner, &message, &input.signature) {
            return Ok(invalid(format!("Invalid signature at input {}", i)));
        }
    }

    // 3. No output is claimed twice
    let mut seen = HashSet::with_capacity(tx.num_inputs());
    for (i, input) in tx.inputs().iter().enumerate() {
        if !seen.insert(input.prevout) {
            return Ok(invalid(format!(
                "Input {} claims an output already claimed by this transaction",
                i
            )));
        }
    }

    // 4. Output values are non-negative
    for (i, output) in tx.outputs().iter().enumerate() {
        if output.value < 0 {
            return Ok(invalid(format!(
                "Negative output value {} at index {}",
                output.value, i
            )));
        }
    }

    // 5. Inputs cover outputs
    let total_in = match total_input_value(tx, pool)? {
        Some(total) => total,
        None => return Ok(invalid("Input value overflow".to_string())),
    };
    let total_out = match tx.total_output_value() {
        Some(total) => total,
        None => return Ok(invalid("Output value overflow".to_string())),
    };
    if total_in < total_out {
        return Ok(invalid(format!(
            "Insufficient input value: {} < {}",
            total_in, total_out
        )));
    }

    Ok((ValidationResult::Valid, total_in - total_out))
}

fn invalid(reason: String) -> (ValidationResult, Integer) {
    (ValidationResult::Invalid(reason), 0)
}

/// Predicate form of [`check_transaction`]
pub fn is_valid_tx<V>(tx: &Transaction, pool: &UtxoPool, verifier: &V) -> bool
where
    V: SignatureVerifier + ?Sized,
{
    valid_tx_fee(tx, pool, verifier).is_some()
}

/// Fee of `tx` if it is valid against `pool`, `None` otherwise
pub fn valid_tx_fee<V>(tx: &Transaction, pool: &UtxoPool, verifier: &V) -> Option<Integer>
where
    V: SignatureVerifier + ?Sized,
{
    match check_transaction_fee(tx, pool, verifier) {
        Ok((ValidationResult::Valid, fee)) => Some(fee),
        Ok((ValidationResult::Invalid(reason), _)) => {
            trace!(tx = %short_hash(tx.hash()), %reason, "transaction rejected");
            None
        }
        Err(err) => {
            trace!(tx = %short_hash(tx.hash()), %err, "transaction check failed");
            None
        }
    }
}

/// An absent transaction is never valid
pub fn is_valid_tx_opt<V>(tx: Option<&Transaction>, pool: &UtxoPool, verifier: &V) -> bool
where
    V: SignatureVerifier + ?Sized,
{
    tx.map_or(false, |tx| is_valid_tx(tx, pool, verifier))
}

/// Fee = Σ input values − Σ output values
///
/// Every input must be present in `pool`.
pub fn calculate_fee(tx: &Transaction, pool: &UtxoPool) -> Result<Integer> {
    let total_in = total_input_value(tx, pool)?
        .ok_or_else(|| LedgerError::EconomicValidation("Input value overflow".to_string()))?;
    let total_out = tx
        .total_output_value()
        .ok_or_else(|| LedgerError::EconomicValidation("Output value overflow".to_string()))?;

    let fee = total_in - total_out;
    if fee < 0 {
        return Err(LedgerError::EconomicValidation("Negative fee".to_string()));
    }
    Ok(fee)
}

/// Σ of the values referenced by tx's inputs. `Ok(None)` on overflow.
fn total_input_value(tx: &Transaction, pool: &UtxoPool) -> Result<Option<Integer>> {
    let mut total = 0i64;
    for input in tx.inputs() {
        let value = pool.get(&input.prevout)?.value;
        total = match total.checked_add(value) {
            Some(sum) => sum,
            None => return Ok(None),
        };
    }
    Ok(Some(total))
}

pub(crate) fn short_hash(hash: &Hash) -> String {
    hash.iter().take(6).map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: u8 = 0xa1;
    const BOB: u8 = 0xb0;

    /// Accepts a signature iff it equals the owner key, so tests can forge
    /// "valid" and "invalid" signatures without real keys.
    fn echo_verifier(public_key: &[u8], _message: &[u8], signature: &[u8]) -> bool {
        public_key == signature
    }

    fn key(owner: u8) -> ByteString {
        vec![owner; 33]
    }

    fn funded_pool(values: &[Integer]) -> (UtxoPool, Vec<Transaction>) {
        let mut pool = UtxoPool::new();
        let mut funding = Vec::new();
        for (i, value) in values.iter().enumerate() {
            let mut builder = TransactionBuilder::new();
            builder.add_output(*value, key(ALICE));
            // distinct hashes for equal values
            builder.add_output(0, vec![i as u8]);
            let tx = builder.finalize();
            pool.add(tx.outpoint(0), tx.output(0).unwrap().clone());
            funding.push(tx);
        }
        (pool, funding)
    }

    fn spend(inputs: &[(&Transaction, u8)], outputs: &[Integer]) -> Transaction {
        let mut builder = TransactionBuilder::new();
        for (prev, _) in inputs {
            builder.add_input(*prev.hash(), 0);
        }
        for value in outputs {
            builder.add_output(*value, key(BOB));
        }
        for (i, (_, signer)) in inputs.iter().enumerate() {
            builder.add_signature(i, key(*signer)).unwrap();
        }
        builder.finalize()
    }

    #[test]
    fn test_valid_transaction() {
        let (pool, funding) = funded_pool(&[10]);
        let tx = spend(&[(&funding[0], ALICE)], &[4, 5]);
        assert_eq!(
            check_transaction(&tx, &pool, &echo_verifier).unwrap(),
            ValidationResult::Valid
        );
        assert!(is_valid_tx(&tx, &pool, &echo_verifier));
        assert_eq!(calculate_fee(&tx, &pool).unwrap(), 1);
    }

    #[test]
    fn test_fee_comes_from_the_validity_check() {
        let (pool, funding) = funded_pool(&[10, 5]);
        let tx = spend(&[(&funding[0], ALICE), (&funding[1], ALICE)], &[4, 8]);
        assert_eq!(
            check_transaction_fee(&tx, &pool, &echo_verifier).unwrap(),
            (ValidationResult::Valid, 3)
        );
        assert_eq!(valid_tx_fee(&tx, &pool, &echo_verifier), Some(3));
        assert_eq!(calculate_fee(&tx, &pool).unwrap(), 3);

        let forged = spend(&[(&funding[0], BOB)], &[1]);
        let (result, fee) = check_transaction_fee(&forged, &pool, &echo_verifier).unwrap();
        assert!(!result.is_valid());
        assert_eq!(fee, 0);
        assert_eq!(valid_tx_fee(&forged, &pool, &echo_verifier), None);
    }

    #[test]
    fn test_missing_input() {
        let (pool, _) = funded_pool(&[10]);
        let (_, other) = funded_pool(&[20, 30]);
        let tx = spend(&[(&other[1], ALICE)], &[5]);
        assert!(matches!(
            check_transaction(&tx, &pool, &echo_verifier).unwrap(),
            ValidationResult::Invalid(reason) if reason.contains("not found")
        ));
        assert!(matches!(calculate_fee(&tx, &pool), Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_missing_input_checked_before_signatures() {
        let (pool, _) = funded_pool(&[10]);
        let (_, other) = funded_pool(&[20, 30]);
        let tx = spend(&[(&other[1], BOB)], &[5]);
        let panicking = |_: &[u8], _: &[u8], _: &[u8]| -> bool {
            panic!("signature check reached for a missing input")
        };
        assert!(!is_valid_tx(&tx, &pool, &panicking));
    }

    #[test]
    fn test_bad_signature() {
        let (pool, funding) = funded_pool(&[10]);
        let tx = spend(&[(&funding[0], BOB)], &[5]);
        assert!(matches!(
            check_transaction(&tx, &pool, &echo_verifier).unwrap(),
            ValidationResult::Invalid(reason) if reason.contains("signature")
        ));
    }

    #[test]
    fn test_duplicate_input_rejected_even_with_valid_signatures() {
        let (pool, funding) = funded_pool(&[10]);
        let tx = spend(&[(&funding[0], ALICE), (&funding[0], ALICE)], &[5]);
        assert!(matches!(
            check_transaction(&tx, &pool, &echo_verifier).unwrap(),
            ValidationResult::Invalid(reason) if reason.contains("already claimed")
        ));
        let accept_all = |_: &[u8], _: &[u8], _: &[u8]| true;
        assert!(!is_valid_tx(&tx, &pool, &accept_all));
    }

    #[test]
    fn test_negative_output() {
        let (pool, funding) = funded_pool(&[10]);
        let tx = spend(&[(&funding[0], ALICE)], &[12, -3]);
        assert!(matches!(
            check_transaction(&tx, &pool, &echo_verifier).unwrap(),
            ValidationResult::Invalid(reason) if reason.contains("Negative")
        ));
    }

    #[test]
    fn test_outputs_exceed_inputs() {
        let (pool, funding) = funded_pool(&[10]);
        let tx = spend(&[(&funding[0], ALICE)], &[6, 5]);
        assert!(!is_valid_tx(&tx, &pool, &echo_verifier));
    }

    #[test]
    fn test_zero_fee_is_valid() {
        let (pool, funding) = funded_pool(&[10, 5]);
        let tx = spend(&[(&funding[0], ALICE), (&funding[1], ALICE)], &[15]);
        assert!(is_valid_tx(&tx, &pool, &echo_verifier));
        assert_eq!(calculate_fee(&tx, &pool).unwrap(), 0);
    }

    #[test]
    fn test_output_overflow_is_invalid() {
        let (pool, funding) = funded_pool(&[10]);
        let tx = spend(&[(&funding[0], ALICE)], &[i64::MAX, 1]);
        assert!(!is_valid_tx(&tx, &pool, &echo_verifier));
    }

    #[test]
    fn test_no_inputs_no_outputs() {
        let pool = UtxoPool::new();
        let tx = TransactionBuilder::new().finalize();
        assert!(is_valid_tx(&tx, &pool, &echo_verifier));
    }

    #[test]
    fn test_absent_transaction_is_invalid() {
        let pool = UtxoPool::new();
        assert!(!is_valid_tx_opt(None, &pool, &echo_verifier));
    }

    #[test]
    fn test_pool_unchanged_by_validation() {
        let (pool, funding) = funded_pool(&[10]);
        let before = pool.clone();
        let tx = spend(&[(&funding[0], ALICE)], &[9]);
        assert!(is_valid_tx(&tx, &pool, &echo_verifier));
        assert_eq!(pool, before);
    }
}
