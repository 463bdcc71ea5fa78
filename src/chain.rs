//! Block tree maintenance with a bounded retention window
//!
//! Blocks form a tree rooted at genesis. Each retained node owns the UTXO
//! pool as of that block. Only the last `cut_off_age + 1` layers are kept:
//! once the deepest block is more than `cut_off_age` layers below the
//! shallowest retained layer (the heads), that layer is evicted and its
//! children become the new heads. Evicted nodes can never be extended,
//! since `add_block` only accepts parents that are still retained.
//!
//! Nodes live in an arena keyed by block hash; parent and child links are
//! hashes into that arena.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::ChainConfig;
use crate::constants::GENESIS_HEIGHT;
use crate::crypto::SignatureVerifier;
use crate::error::{LedgerError, Result};
use crate::handler::{commit_transactions, CommitPolicy};
use crate::tx_pool::TransactionPool;
use crate::types::*;
use crate::utxo_pool::UtxoPool;
use crate::validation::short_hash;

/// A retained block together with the UTXO pool after applying it
#[derive(Debug, Clone)]
pub struct BlockNode {
    block: Block,
    parent: Option<Hash>,
    children: Vec<Hash>,
    utxo_pool: UtxoPool,
    height: Natural,
}

impl BlockNode {
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Parent hash, `None` for genesis and for heads whose parent was evicted
    pub fn parent(&self) -> Option<&Hash> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[Hash] {
        &self.children
    }

    pub fn utxo_pool(&self) -> &UtxoPool {
        &self.utxo_pool
    }

    pub fn height(&self) -> Natural {
        self.height
    }
}

pub struct BlockChain<V: SignatureVerifier> {
    nodes: HashMap<Hash, BlockNode>,
    heads: Vec<Hash>,
    max_height_hash: Hash,
    max_height: Natural,
    transaction_pool: TransactionPool,
    verifier: V,
    config: ChainConfig,
}

impl<V: SignatureVerifier> BlockChain<V> {
    /// Chain holding only `genesis`, which is trusted as-is
    pub fn new(genesis: Block, verifier: V) -> Self {
        Self::with_config(genesis, verifier, ChainConfig::default())
    }

    pub fn with_config(genesis: Block, verifier: V, config: ChainConfig) -> Self {
        let hash = *genesis.hash();
        let utxo_pool = UtxoPool::from_coinbase(genesis.coinbase());
        let node = BlockNode {
            block: genesis,
            parent: None,
            children: Vec::new(),
            utxo_pool,
            height: GENESIS_HEIGHT,
        };

        let mut nodes = HashMap::new();
        nodes.insert(hash, node);

        Self {
            nodes,
            heads: vec![hash],
            max_height_hash: hash,
            max_height: GENESIS_HEIGHT,
            transaction_pool: TransactionPool::new(),
            verifier,
            config,
        }
    }

    /// Block at the tip of the deepest branch. When several branches share
    /// the greatest height, the first to reach it wins.
    pub fn max_height_block(&self) -> Option<&Block> {
        self.nodes.get(&self.max_height_hash).map(|node| &node.block)
    }

    /// Independent copy of the UTXO pool at the deepest block, the pool a new
    /// block on top of the tip is validated against
    pub fn max_height_utxo_pool(&self) -> Option<UtxoPool> {
        self.nodes
            .get(&self.max_height_hash)
            .map(|node| node.utxo_pool.clone())
    }

    pub fn max_height(&self) -> Natural {
        self.max_height
    }

    pub fn transaction_pool(&self) -> &TransactionPool {
        &self.transaction_pool
    }

    pub fn transaction_pool_mut(&mut self) -> &mut TransactionPool {
        &mut self.transaction_pool
    }

    /// Record a proposed transaction. No validation is performed.
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transaction_pool.add_transaction(tx);
    }

    /// Add `block` if its parent is retained and every one of its
    /// transactions is valid against the parent's pool, in some order.
    ///
    /// Returns false, with no state change, when the block has no parent
    /// hash, its parent is unknown or evicted, it is already present, or any
    /// of its transactions cannot be confirmed.
    pub fn add_block(&mut self, block: Block) -> bool {
        let hash = *block.hash();

        let prev_hash = match block.prev_block_hash() {
            Some(prev) => *prev,
            None => {
                debug!(block = %short_hash(&hash), "rejected block without parent hash");
                return false;
            }
        };

        if self.nodes.contains_key(&hash) {
            debug!(block = %short_hash(&hash), "rejected duplicate block");
            return false;
        }

        let (mut utxo_pool, parent_height) = match self.nodes.get(&prev_hash) {
            Some(parent) => (parent.utxo_pool.clone(), parent.height),
            None => {
                debug!(
                    block = %short_hash(&hash),
                    parent = %short_hash(&prev_hash),
                    "rejected block with unknown or evicted parent"
                );
                return false;
            }
        };

        let declared = block.transactions().len();
        let confirmed = commit_transactions(
            block.transactions(),
            &mut utxo_pool,
            &self.verifier,
            CommitPolicy::FirstValid,
        );
        if confirmed.len() != declared {
            debug!(
                block = %short_hash(&hash),
                declared,
                confirmed = confirmed.len(),
                "rejected block with invalid transactions"
            );
            return false;
        }

        let coinbase = block.coinbase();
        for (i, output) in coinbase.outputs().iter().enumerate() {
            utxo_pool.add(coinbase.outpoint(i), output.clone());
        }

        for tx in block.transactions() {
            self.transaction_pool.remove_transaction(tx.hash());
        }

        let height = parent_height + 1;
        self.nodes.insert(
            hash,
            BlockNode {
                block,
                parent: Some(prev_hash),
                children: Vec::new(),
                utxo_pool,
                height,
            },
        );
        if let Some(parent) = self.nodes.get_mut(&prev_hash) {
            parent.children.push(hash);
        }

        if height > self.max_height {
            self.max_height = height;
            self.max_height_hash = hash;
        }

        debug!(block = %short_hash(&hash), height, transactions = declared, "block added");

        self.prune();
        true
    }

    /// Assemble a block on the deepest node from the pending pool, paying
    /// the configured coinbase reward to `miner`, and add it. Pending
    /// transactions that are not valid against the tip are left out.
    ///
    /// The coinbase commits to the new block's height, so repeated rewards
    /// to one miner never share an outpoint.
    pub fn create_block(&mut self, miner: ByteString) -> Option<Block> {
        let (parent_hash, height, mut utxo_pool) = match self.max_height_node() {
            Ok(node) => (*node.block.hash(), node.height + 1, node.utxo_pool.clone()),
            Err(err) => {
                debug!(%err, "cannot assemble block");
                return None;
            }
        };

        let candidates = self.transaction_pool.transactions();
        let transactions = commit_transactions(
            &candidates,
            &mut utxo_pool,
            &self.verifier,
            CommitPolicy::FirstValid,
        );

        let coinbase = Transaction::coinbase_at(height, self.config.coinbase_reward, miner);
        let block = Block::new(Some(parent_hash), coinbase, transactions);
        if self.add_block(block.clone()) {
            Some(block)
        } else {
            None
        }
    }

    pub fn max_height_node(&self) -> Result<&BlockNode> {
        self.nodes.get(&self.max_height_hash).ok_or_else(|| {
            LedgerError::InvalidState(format!(
                "deepest block {} is not retained",
                short_hash(&self.max_height_hash)
            ))
        })
    }

    pub fn get_block(&self, hash: &Hash) -> Option<&Block> {
        self.nodes.get(hash).map(|node| &node.block)
    }

    pub fn get_node(&self, hash: &Hash) -> Option<&BlockNode> {
        self.nodes.get(hash)
    }

    pub fn contains_block(&self, hash: &Hash) -> bool {
        self.nodes.contains_key(hash)
    }

    pub fn height_of(&self, hash: &Hash) -> Option<Natural> {
        self.nodes.get(hash).map(|node| node.height)
    }

    /// Number of retained blocks
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The shallowest retained layer
    pub fn head_hashes(&self) -> &[Hash] {
        &self.heads
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Evict head layers until the deepest block is at most `cut_off_age`
    /// layers below them. All heads share one height.
    fn prune(&mut self) {
        loop {
            let head_height = match self.heads.first().and_then(|h| self.nodes.get(h)) {
                Some(head) => head.height,
                None => return,
            };
            if self.max_height.saturating_sub(head_height) <= self.config.cut_off_age {
                return;
            }

            let old_heads = std::mem::take(&mut self.heads);
            let mut new_heads = Vec::new();
            for head in &old_heads {
                if let Some(node) = self.nodes.remove(head) {
                    new_heads.extend(node.children);
                }
            }
            for child in &new_heads {
                if let Some(node) = self.nodes.get_mut(child) {
                    node.parent = None;
                }
            }

            info!(
                evicted = old_heads.len(),
                heads = new_heads.len(),
                head_height = head_height + 1,
                max_height = self.max_height,
                "pruned block tree"
            );
            self.heads = new_heads;
        }
    }
}
