//! Content hashing and signature verification

use bitcoin_hashes::{sha256d, Hash as BitcoinHash};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, VerifyOnly};
use sha2::{Digest, Sha256};

use crate::types::Hash;

/// Verifies that `signature` was produced over `message` by the holder of
/// `public_key`.
///
/// Implementations must be deterministic and must report every failure,
/// including unparseable keys or signatures, as `false`.
pub trait SignatureVerifier {
    fn verify_signature(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&[u8], &[u8], &[u8]) -> bool,
{
    fn verify_signature(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        self(public_key, message, signature)
    }
}

/// ECDSA over secp256k1: SEC1-encoded public keys, DER-encoded signatures,
/// and SHA-256 of the message as the signed digest.
#[derive(Debug, Clone)]
pub struct Secp256k1Verifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify_signature(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let pubkey = match PublicKey::from_slice(public_key) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let signature = match Signature::from_der(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        let message = match Message::from_digest_slice(&message_digest(message)) {
            Ok(msg) => msg,
            Err(_) => return false,
        };

        self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }
}

/// SHA-256 digest of a message, the value actually signed
pub fn message_digest(message: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(message);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Double SHA-256, used for transaction and block hashes
pub fn sha256d_hash(data: &[u8]) -> Hash {
    sha256d::Hash::hash(data).into_inner()
}
