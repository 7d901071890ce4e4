use amd_merkle_tree::error::MerkleTreeError;
use thiserror::Error;

use crate::{
    chain::ChainError,
    store::{DistributionId, StoreError, UserId},
};

#[derive(Error, Debug)]
pub enum DistributorError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    MerkleTree(#[from] MerkleTreeError),

    #[error("invalid wallet address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("invalid allocation amount {amount:?} for user {user_id}")]
    InvalidAmount { user_id: UserId, amount: String },

    #[error(
        "distribution {distribution_id} is active with {actual} of {expected} proofs stored; \
         manual repair required before users can claim"
    )]
    IncompleteProofSet {
        distribution_id: DistributionId,
        expected: usize,
        actual: usize,
    },

    #[error("a distribution generation is already in progress")]
    GenerationInProgress,
}
