//! # UTXO Ledger
//!
//! Transaction validation and block-tree maintenance for a UTXO-based ledger.
//!
//! The crate answers two questions:
//! - given a pool of unspent outputs, which transactions of an unordered
//!   batch are jointly valid, and what does the pool look like afterwards
//! - given a tree of competing blocks, which block is the current tip, while
//!   keeping only a bounded window of recent blocks in memory
//!
//! ## Architecture
//!
//! Leaf first:
//! - [`utxo_pool`]: the set of spendable outputs
//! - [`validation`]: whether one transaction is admissible against a pool
//! - [`handler`]: confirming a batch to a fixed point, in confirmation or fee order
//! - [`chain`]: the block tree, its retention window and the pending pool
//!
//! Signature checking sits behind [`crypto::SignatureVerifier`];
//! [`crypto::Secp256k1Verifier`] is the default implementation.
//!
//! ## Design Principles
//!
//! 1. **Invalid input is not an error**: rejected transactions and blocks are
//!    reported through `bool`, [`ValidationResult`] or omission
//! 2. **Errors are caller bugs**: [`LedgerError`] is reserved for broken
//!    preconditions and configuration problems
//! 3. **No shared mutable pools**: every block and every handler owns its own
//!    copy of the UTXO pool
//!
//! ## Usage
//!
//! ```rust
//! use utxo_ledger::chain::BlockChain;
//! use utxo_ledger::crypto::Secp256k1Verifier;
//! use utxo_ledger::types::*;
//!
//! let genesis = Block::genesis(Transaction::coinbase(25, vec![0x02; 33]));
//! let mut chain = BlockChain::new(genesis.clone(), Secp256k1Verifier::new());
//!
//! let next = Block::new(
//!     Some(*genesis.hash()),
//!     Transaction::coinbase(25, vec![0x03; 33]),
//!     vec![],
//! );
//! assert!(chain.add_block(next));
//! assert_eq!(chain.max_height(), 2);
//! ```

pub mod types;
pub mod constants;
pub mod crypto;
pub mod utxo_pool;
pub mod validation;
pub mod handler;
pub mod tx_pool;
pub mod chain;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{LedgerError, Result};
pub use utxo_pool::UtxoPool;
pub use tx_pool::TransactionPool;
pub use handler::{CommitPolicy, TxHandler};
pub use chain::{BlockChain, BlockNode};
pub use config::ChainConfig;
pub use crypto::{Secp256k1Verifier, SignatureVerifier};
