use amd_merkle_tree::{distribution_merkle_tree::DistributionMerkleTree, utils::encode_hash};
use anyhow::Result;

use crate::VerifyArgs;

pub fn process_verify(verify_args: &VerifyArgs) -> Result<()> {
    let merkle_tree = DistributionMerkleTree::new_from_file(&verify_args.merkle_tree_path)?;

    merkle_tree.verify_proof()?;

    println!(
        "verified {} proofs against root {}",
        merkle_tree.max_num_nodes,
        encode_hash(&merkle_tree.merkle_root)
    );
    Ok(())
}
