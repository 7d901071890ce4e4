//! Typed access to the AMD distributor contract.
//!
//! The pipeline and the claim listener talk to [`DistributorChain`]; the
//! live implementation signs with a keystore-protected key on BSC, the mock
//! keeps everything in memory for development and tests.

pub mod bsc;
pub mod mock;

pub use bsc::BscDistributorClient;
pub use mock::MockChain;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

/// Structured chain failure taxonomy. Callers branch on these variants, not
/// on error message contents.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("network error: {0}")]
    Network(String),
    #[error("contract reverted: {0}")]
    RevertWithReason(String),
    #[error("contract reverted with no reason")]
    Revert,
    #[error("transaction {0} failed on-chain")]
    TransactionFailed(String),
    #[error("chain configuration error: {0}")]
    Config(String),
}

/// Outcome of a confirmed root-update transaction.
#[derive(Debug, Clone)]
pub struct RootUpdate {
    pub transaction_hash: B256,
    /// Whether the receipt carried the expected `MerkleRootUpdated` event.
    /// Absence on a successful receipt is suspicious but not fatal.
    pub event_seen: bool,
}

/// One decoded `Claimed` log.
#[derive(Debug, Clone)]
pub struct ClaimedEvent {
    pub wallet: Address,
    pub amount: U256,
    pub transaction_hash: B256,
    pub block_number: u64,
}

/// Result of scanning for `Claimed` events from a block cursor.
#[derive(Debug, Clone)]
pub struct ClaimScan {
    pub events: Vec<ClaimedEvent>,
    /// Cursor to resume from on the next scan.
    pub next_block: u64,
}

#[async_trait]
pub trait DistributorChain: Send + Sync {
    /// Cheap pre-flight check that this client could sign and submit a root
    /// update. Run before the pipeline performs any chain or store write so
    /// configuration mistakes abort early.
    fn ensure_writable(&self) -> Result<(), ChainError>;

    /// Read the merkle root currently stored in the distributor contract.
    async fn merkle_root(&self) -> Result<[u8; 32], ChainError>;

    /// Sign and submit a root update, then wait for the receipt.
    async fn update_merkle_root(&self, new_root: [u8; 32]) -> Result<RootUpdate, ChainError>;

    /// Scan for `Claimed` events starting at `from_block` (inclusive).
    async fn claimed_events(&self, from_block: u64) -> Result<ClaimScan, ChainError>;
}
