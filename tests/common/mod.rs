//! Shared helpers for integration tests: deterministic secp256k1 keys and
//! signed transaction construction

#![allow(dead_code)]

use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use utxo_ledger::crypto::message_digest;
use utxo_ledger::*;

pub struct Keys {
    pub secret: SecretKey,
    pub public: PublicKey,
}

impl Keys {
    pub fn from_seed(seed: u8) -> Self {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[seed; 32]).expect("non-zero seed is a valid key");
        let public = PublicKey::from_secret_key(&secp, &secret);
        Self { secret, public }
    }

    pub fn owner(&self) -> ByteString {
        self.public.serialize().to_vec()
    }

    pub fn sign(&self, message: &[u8]) -> ByteString {
        let secp = Secp256k1::new();
        let msg = Message::from_digest_slice(&message_digest(message)).expect("32-byte digest");
        secp.sign_ecdsa(&msg, &self.secret).serialize_der().to_vec()
    }
}

/// Signed transaction spending `inputs` (outpoint, owner keys) into `outputs`
pub fn signed_tx(inputs: &[(OutPoint, &Keys)], outputs: &[(Integer, &Keys)]) -> Transaction {
    let mut builder = TransactionBuilder::new();
    for (outpoint, _) in inputs {
        builder.add_input(outpoint.hash, outpoint.index);
    }
    for (value, owner) in outputs {
        builder.add_output(*value, owner.owner());
    }
    for (i, (_, signer)) in inputs.iter().enumerate() {
        let message = builder.raw_data_to_sign(i).expect("input exists");
        builder.add_signature(i, signer.sign(&message)).expect("input exists");
    }
    builder.finalize()
}

pub fn block_on(parent: &Block, miner: &Keys, transactions: Vec<Transaction>) -> Block {
    Block::new(
        Some(*parent.hash()),
        Transaction::coinbase(DEFAULT_COINBASE_REWARD, miner.owner()),
        transactions,
    )
}
