use alloy_primitives::B256;
use amd_merkle_tree::utils::encode_hash;
use tracing::{error, info, warn};

use crate::{chain::DistributorChain, error::DistributorError};

/// How the computed root relates to the on-chain state after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// On-chain root already equals the computed root; no transaction sent.
    RootUnchanged,
    /// An update transaction was submitted and confirmed.
    RootUpdated { transaction_hash: B256 },
}

/// Compares `computed_root` with the contract's stored root and publishes an
/// update when they differ.
///
/// A failed read is treated as "root unknown, assume stale" so a flaky RPC
/// can only cause a redundant re-publish, never a silently skipped root
/// change. A reverted or failed update transaction is fatal: proofs for a
/// root that never landed on-chain must not reach storage.
pub async fn reconcile_root(
    chain: &dyn DistributorChain,
    computed_root: [u8; 32],
) -> Result<Reconciliation, DistributorError> {
    let on_chain_root = match chain.merkle_root().await {
        Ok(root) => Some(root),
        Err(err) => {
            warn!(%err, "failed to read on-chain merkle root, assuming it is stale");
            None
        }
    };

    if on_chain_root == Some(computed_root) {
        info!(
            root = %encode_hash(&computed_root),
            "on-chain root already matches, skipping update transaction"
        );
        return Ok(Reconciliation::RootUnchanged);
    }

    let update = chain
        .update_merkle_root(computed_root)
        .await
        .map_err(|err| {
            error!(
                %err,
                computed_root = %encode_hash(&computed_root),
                on_chain_root = on_chain_root.as_ref().map(encode_hash),
                "root update transaction failed, aborting generation"
            );
            err
        })?;

    if !update.event_seen {
        warn!(
            tx = %format!("{:#x}", update.transaction_hash),
            "successful receipt did not emit MerkleRootUpdated; continuing"
        );
    }
    info!(
        root = %encode_hash(&computed_root),
        tx = %format!("{:#x}", update.transaction_hash),
        "published new merkle root"
    );

    Ok(Reconciliation::RootUpdated {
        transaction_hash: update.transaction_hash,
    })
}
