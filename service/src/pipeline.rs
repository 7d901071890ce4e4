use std::sync::Arc;

use amd_merkle_tree::{
    distribution_merkle_tree::DistributionMerkleTree, tree_node::TreeNode, utils::encode_hash,
};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    aggregator::aggregate_unclaimed,
    chain::DistributorChain,
    error::DistributorError,
    persister::persist_distribution,
    reconciler::{reconcile_root, Reconciliation},
    store::DistributorStore,
};

/// Result of a successful "regenerate distribution" run.
#[derive(Debug, Clone)]
pub struct RegenerateOutcome {
    pub merkle_root: String,
    pub message: String,
}

/// Orchestrates one full generation: aggregate, build, reconcile, persist.
///
/// The pipeline is one logical operation and must never race itself: two
/// concurrent runs could deactivate each other's distributions and publish
/// two roots back to back. `regenerate` refuses to start while another run
/// holds the guard; deployments must additionally ensure a single writer
/// process.
pub struct DistributionPipeline<S: DistributorStore> {
    store: Arc<S>,
    chain: Arc<dyn DistributorChain>,
    running: Mutex<()>,
}

impl<S: DistributorStore> DistributionPipeline<S> {
    pub fn new(store: Arc<S>, chain: Arc<dyn DistributorChain>) -> Self {
        Self {
            store,
            chain,
            running: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn regenerate(&self, name: &str) -> Result<RegenerateOutcome, DistributorError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| DistributorError::GenerationInProgress)?;

        // Configuration problems must abort before any chain or store write.
        self.chain.ensure_writable()?;

        let entries = aggregate_unclaimed(self.store.as_ref())?;
        info!(users = entries.len(), "aggregated unclaimed allocations");

        let tree_nodes = entries
            .iter()
            .map(|entry| TreeNode {
                wallet: entry.wallet,
                amount: entry.amount,
                proof: None,
            })
            .collect::<Vec<_>>();
        let tree = DistributionMerkleTree::new(tree_nodes)?;

        let reconciliation = reconcile_root(self.chain.as_ref(), tree.merkle_root).await?;
        let distribution = persist_distribution(self.store.as_ref(), &tree, &entries, name)?;

        let message = match reconciliation {
            Reconciliation::RootUnchanged => format!(
                "root unchanged; refreshed {} proofs for distribution {}",
                entries.len(),
                distribution.id
            ),
            Reconciliation::RootUpdated { transaction_hash } => format!(
                "root updated in tx {transaction_hash:#x}; stored {} proofs for distribution {}",
                entries.len(),
                distribution.id
            ),
        };

        Ok(RegenerateOutcome {
            merkle_root: encode_hash(&tree.merkle_root),
            message,
        })
    }
}
