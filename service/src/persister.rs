use amd_merkle_tree::{
    distribution_merkle_tree::DistributionMerkleTree,
    error::MerkleTreeError,
    utils::encode_hash,
};
use tracing::{error, info};

use crate::{
    aggregator::AggregatedEntry,
    error::DistributorError,
    store::{Distribution, DistributorStore, NewProof},
};

/// Rotates the active distribution and stores one proof record per
/// aggregated user. Must only run after [`crate::reconciler::reconcile_root`]
/// confirmed the root is live on-chain.
///
/// If a proof insert fails partway, the new distribution is already active
/// with partial coverage; that state is surfaced as
/// [`DistributorError::IncompleteProofSet`] so an operator repairs it before
/// affected users hit unverifiable claims.
pub fn persist_distribution(
    store: &dyn DistributorStore,
    tree: &DistributionMerkleTree,
    entries: &[AggregatedEntry],
    name: &str,
) -> Result<Distribution, DistributorError> {
    store.deactivate_active_distribution()?;
    let distribution =
        store.insert_distribution(encode_hash(&tree.merkle_root), name.to_string())?;

    for entry in entries {
        let node = tree.get_node(&entry.wallet).ok_or_else(|| {
            MerkleTreeError::MerkleValidationError(format!(
                "tree is missing a node for wallet {}",
                entry.wallet
            ))
        })?;
        let proof = node.proof.as_ref().ok_or(MerkleTreeError::MerkleRootError)?;
        let record = NewProof {
            distribution_id: distribution.id,
            user_id: entry.user_id,
            amount: entry.amount.to_string(),
            proof: proof.iter().map(encode_hash).collect(),
        };
        if let Err(err) = store.insert_proof(record) {
            error!(
                %err,
                user_id = entry.user_id,
                distribution_id = distribution.id,
                "proof insert failed mid-batch"
            );
            let actual = store.proof_count(distribution.id).unwrap_or(0);
            return Err(DistributorError::IncompleteProofSet {
                distribution_id: distribution.id,
                expected: entries.len(),
                actual,
            });
        }
    }

    // Coverage check: the stored proof count must equal the aggregated user
    // count before this distribution may be reported as complete.
    let stored = store.proof_count(distribution.id)?;
    if stored != entries.len() {
        return Err(DistributorError::IncompleteProofSet {
            distribution_id: distribution.id,
            expected: entries.len(),
            actual: stored,
        });
    }

    info!(
        distribution_id = distribution.id,
        proofs = stored,
        root = %distribution.merkle_root,
        "activated distribution"
    );
    Ok(distribution)
}
