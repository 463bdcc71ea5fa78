//! Ledger constants

/// Base units per coin
pub const COIN: i64 = 100_000_000;

/// Number of layers behind the deepest block that may still be extended.
/// A node more than this many blocks shallower than the tip is evicted.
pub const CUT_OFF_AGE: u64 = 10;

/// Height of the genesis block
pub const GENESIS_HEIGHT: u64 = 1;

/// Coinbase reward paid by blocks assembled through `BlockChain::create_block`
pub const DEFAULT_COINBASE_REWARD: i64 = 25 * COIN;
