//! Core ledger types: outputs, transactions and blocks

use serde::{Deserialize, Serialize};

use crate::crypto::sha256d_hash;
use crate::error::{LedgerError, Result};

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Natural number type
pub type Natural = u64;

/// Integer type, used for amounts in base units
pub type Integer = i64;

/// OutPoint: a spendable output, identified by the hash of the producing
/// transaction and the output's position in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: Natural,
}

impl OutPoint {
    pub fn new(hash: Hash, index: Natural) -> Self {
        Self { hash, index }
    }
}

/// Transaction Input: the output being spent and the signature authorizing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub signature: ByteString,
}

/// Transaction Output: a value and the public key allowed to spend it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Integer,
    pub owner: ByteString,
}

impl TransactionOutput {
    pub fn new(value: Integer, owner: ByteString) -> Self {
        Self { value, owner }
    }
}

/// A finalized transaction. The hash is computed once by
/// [`TransactionBuilder::finalize`] and the transaction cannot be mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
    lock_time: Natural,
    hash: Hash,
}

impl Transaction {
    /// Coinbase transaction minting `value` to `owner`: no inputs, one output
    pub fn coinbase(value: Integer, owner: ByteString) -> Self {
        Self::coinbase_at(0, value, owner)
    }

    /// Coinbase for the block at `height`. The height is carried in
    /// `lock_time`, so coinbases paying the same miner at different heights
    /// of one branch have distinct hashes and outpoints.
    pub fn coinbase_at(height: Natural, value: Integer, owner: ByteString) -> Self {
        let mut builder = TransactionBuilder::new();
        builder.add_output(value, owner).set_lock_time(height);
        builder.finalize()
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn inputs(&self) -> &[TransactionInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TransactionOutput] {
        &self.outputs
    }

    pub fn input(&self, index: usize) -> Option<&TransactionInput> {
        self.inputs.get(index)
    }

    pub fn output(&self, index: usize) -> Option<&TransactionOutput> {
        self.outputs.get(index)
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Hashed but never interpreted by validation
    pub fn lock_time(&self) -> Natural {
        self.lock_time
    }

    /// Bytes signed by input `index`: that input's outpoint followed by
    /// every output. The signature itself is never part of the message.
    pub fn raw_data_to_sign(&self, index: usize) -> Result<ByteString> {
        signing_data(&self.inputs, &self.outputs, index)
    }

    /// Full serialization, signatures included. The hash is computed over this.
    pub fn raw_tx(&self) -> ByteString {
        raw_tx(&self.inputs, &self.outputs, self.lock_time)
    }

    /// OutPoint of this transaction's output at `index`
    pub fn outpoint(&self, index: usize) -> OutPoint {
        OutPoint::new(self.hash, index as Natural)
    }

    /// Sum of output values, `None` on overflow
    pub fn total_output_value(&self) -> Option<Integer> {
        self.outputs
            .iter()
            .try_fold(0i64, |acc, output| acc.checked_add(output.value))
    }
}

/// Accumulates inputs, outputs and signatures for a transaction under
/// construction.
///
/// ```
/// use utxo_ledger::types::*;
///
/// let funding = Transaction::coinbase(10, vec![2; 33]);
///
/// let mut builder = TransactionBuilder::new();
/// builder.add_input(*funding.hash(), 0);
/// builder.add_output(4, vec![3; 33]);
/// builder.add_output(5, vec![4; 33]);
/// let message = builder.raw_data_to_sign(0).unwrap();
/// assert!(!message.is_empty());
/// builder.add_signature(0, vec![0x30]).unwrap();
///
/// let tx = builder.finalize();
/// assert_eq!(tx.num_inputs(), 1);
/// assert_eq!(tx.num_outputs(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
    lock_time: Natural,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, prev_hash: Hash, index: Natural) -> &mut Self {
        self.inputs.push(TransactionInput {
            prevout: OutPoint::new(prev_hash, index),
            signature: Vec::new(),
        });
        self
    }

    pub fn add_output(&mut self, value: Integer, owner: ByteString) -> &mut Self {
        self.outputs.push(TransactionOutput::new(value, owner));
        self
    }

    pub fn set_lock_time(&mut self, lock_time: Natural) -> &mut Self {
        self.lock_time = lock_time;
        self
    }

    pub fn remove_input(&mut self, index: usize) -> Result<TransactionInput> {
        if index >= self.inputs.len() {
            return Err(input_out_of_range(index, self.inputs.len()));
        }
        Ok(self.inputs.remove(index))
    }

    pub fn raw_data_to_sign(&self, index: usize) -> Result<ByteString> {
        signing_data(&self.inputs, &self.outputs, index)
    }

    pub fn add_signature(&mut self, index: usize, signature: ByteString) -> Result<()> {
        let len = self.inputs.len();
        let input = self
            .inputs
            .get_mut(index)
            .ok_or_else(|| input_out_of_range(index, len))?;
        input.signature = signature;
        Ok(())
    }

    /// Compute the hash and freeze the transaction
    pub fn finalize(self) -> Transaction {
        let hash = sha256d_hash(&raw_tx(&self.inputs, &self.outputs, self.lock_time));
        Transaction {
            inputs: self.inputs,
            outputs: self.outputs,
            lock_time: self.lock_time,
            hash,
        }
    }
}

/// A block: previous-block hash (absent only for genesis), a coinbase and
/// the ordered regular transactions. Hashed on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    prev_block_hash: Option<Hash>,
    coinbase: Transaction,
    transactions: Vec<Transaction>,
    hash: Hash,
}

impl Block {
    pub fn new(
        prev_block_hash: Option<Hash>,
        coinbase: Transaction,
        transactions: Vec<Transaction>,
    ) -> Self {
        let mut data = Vec::with_capacity(1 + 32 * (transactions.len() + 2));
        match &prev_block_hash {
            Some(prev) => {
                data.push(1);
                data.extend_from_slice(prev);
            }
            None => data.push(0),
        }
        data.extend_from_slice(coinbase.hash());
        for tx in &transactions {
            data.extend_from_slice(tx.hash());
        }
        let hash = sha256d_hash(&data);

        Self {
            prev_block_hash,
            coinbase,
            transactions,
            hash,
        }
    }

    pub fn genesis(coinbase: Transaction) -> Self {
        Self::new(None, coinbase, Vec::new())
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn prev_block_hash(&self) -> Option<&Hash> {
        self.prev_block_hash.as_ref()
    }

    pub fn coinbase(&self) -> &Transaction {
        &self.coinbase
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

// ============================================================================
// ENCODING
// ============================================================================

fn signing_data(
    inputs: &[TransactionInput],
    outputs: &[TransactionOutput],
    index: usize,
) -> Result<ByteString> {
    let input = inputs
        .get(index)
        .ok_or_else(|| input_out_of_range(index, inputs.len()))?;

    let mut data = Vec::new();
    encode_outpoint(&mut data, &input.prevout);
    encode_outputs(&mut data, outputs);
    Ok(data)
}

fn raw_tx(
    inputs: &[TransactionInput],
    outputs: &[TransactionOutput],
    lock_time: Natural,
) -> ByteString {
    let mut data = Vec::new();

    data.extend_from_slice(&encode_varint(inputs.len() as u64));
    for input in inputs {
        encode_outpoint(&mut data, &input.prevout);
        data.extend_from_slice(&encode_varint(input.signature.len() as u64));
        data.extend_from_slice(&input.signature);
    }
    encode_outputs(&mut data, outputs);
    data.extend_from_slice(&lock_time.to_le_bytes());

    data
}

fn encode_outpoint(data: &mut ByteString, outpoint: &OutPoint) {
    data.extend_from_slice(&outpoint.hash);
    data.extend_from_slice(&outpoint.index.to_le_bytes());
}

fn encode_outputs(data: &mut ByteString, outputs: &[TransactionOutput]) {
    data.extend_from_slice(&encode_varint(outputs.len() as u64));
    for output in outputs {
        data.extend_from_slice(&output.value.to_le_bytes());
        data.extend_from_slice(&encode_varint(output.owner.len() as u64));
        data.extend_from_slice(&output.owner);
    }
}

/// Encode a number as a Bitcoin-style varint
fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffffffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}

fn input_out_of_range(index: usize, len: usize) -> LedgerError {
    LedgerError::NotFound(format!("input {} (transaction has {} inputs)", index, len))
}
