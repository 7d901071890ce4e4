//! Record types and the storage abstraction consumed by the pipeline.
//!
//! The pipeline only needs a narrow transactional record store; everything
//! here is expressed against the [`DistributorStore`] trait so tests and the
//! binaries can share the JSON-snapshot-backed [`MemoryStore`].

pub mod memory;

pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type UserId = u64;
pub type AllocationId = u64;
pub type DistributionId = u64;
pub type ClaimId = u64;
pub type ProofId = u64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("constraint violation: {0}")]
    Conflict(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationKind {
    SpendingReward,
    ReferralReward,
    Airdrop,
}

/// One granted point allocation, in human token units ("12.5").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub user_id: UserId,
    pub amount: String,
    pub kind: AllocationKind,
    pub is_claimed: bool,
    pub claim_id: Option<ClaimId>,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub wallet_address: String,
    pub referrer_id: Option<UserId>,
    pub total_spending_for_allocation: String,
    pub total_spent_money: String,
    pub is_paid_member: bool,
    pub paid_member_tier: Option<u8>,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: DistributionId,
    pub merkle_root: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: u64,
}

/// A proof record scoped to one distribution. `amount` is the cumulative
/// scaled amount as a base-10 decimal string; `proof` is the ordered 0x-hex
/// sibling path. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProof {
    pub id: ProofId,
    pub distribution_id: DistributionId,
    pub user_id: UserId,
    pub amount: String,
    pub proof: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub user_id: UserId,
    pub amount: String,
    pub total_claimed_amount: String,
    pub transaction_hash: String,
    pub status: ClaimStatus,
    pub claim_date: u64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub wallet_address: String,
    pub referrer_id: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct NewAllocation {
    pub user_id: UserId,
    pub amount: String,
    pub kind: AllocationKind,
}

#[derive(Debug, Clone)]
pub struct NewProof {
    pub distribution_id: DistributionId,
    pub user_id: UserId,
    pub amount: String,
    pub proof: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewClaim {
    pub user_id: UserId,
    pub amount: String,
    pub transaction_hash: String,
}

/// Narrow transactional record store over the five record types.
///
/// Only the persister may rotate distributions and write proofs; only the
/// claim listener may record claims. The trait does not enforce that split,
/// the pipeline wiring does.
pub trait DistributorStore: Send + Sync {
    fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;
    fn update_user_wallet(&self, id: UserId, wallet_address: String) -> Result<(), StoreError>;
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    /// Lookup tolerant of legacy whitespace/casing in stored rows.
    fn user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>, StoreError>;
    fn users(&self) -> Result<Vec<User>, StoreError>;

    fn insert_allocation(&self, allocation: NewAllocation) -> Result<Allocation, StoreError>;
    fn unclaimed_allocations(&self) -> Result<Vec<Allocation>, StoreError>;
    fn allocations_for_user(&self, user_id: UserId) -> Result<Vec<Allocation>, StoreError>;

    fn active_distribution(&self) -> Result<Option<Distribution>, StoreError>;
    fn deactivate_active_distribution(&self) -> Result<(), StoreError>;
    fn insert_distribution(
        &self,
        merkle_root: String,
        name: String,
    ) -> Result<Distribution, StoreError>;

    fn insert_proof(&self, proof: NewProof) -> Result<StoredProof, StoreError>;
    fn proof_count(&self, distribution_id: DistributionId) -> Result<usize, StoreError>;
    fn proof_for(
        &self,
        distribution_id: DistributionId,
        user_id: UserId,
    ) -> Result<Option<StoredProof>, StoreError>;

    /// Records an observed on-chain claim and marks the user's unclaimed
    /// allocations claimed. Idempotent per transaction hash: a hash that was
    /// already recorded returns `Ok(None)` and writes nothing.
    fn record_claim(&self, claim: NewClaim) -> Result<Option<Claim>, StoreError>;

    /// Re-points every dependent row (allocations, claims, proofs, referrer
    /// references) from `merged` onto `kept`, folds the spending totals into
    /// `kept`, and deletes `merged`.
    fn merge_users(&self, kept: UserId, merged: UserId) -> Result<(), StoreError>;
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
