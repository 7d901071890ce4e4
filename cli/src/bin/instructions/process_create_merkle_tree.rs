use amd_merkle_tree::{distribution_merkle_tree::DistributionMerkleTree, utils::encode_hash};
use anyhow::{Context, Result};

use crate::CreateMerkleTreeArgs;

pub fn process_create_merkle_tree(merkle_tree_args: &CreateMerkleTreeArgs) -> Result<()> {
    let merkle_tree = DistributionMerkleTree::new_from_csv(&merkle_tree_args.csv_path)
        .with_context(|| format!("failed to build tree from {}", merkle_tree_args.csv_path.display()))?;

    merkle_tree.write_to_file(&merkle_tree_args.merkle_tree_path)?;

    println!(
        "wrote tree with {} nodes, root {}, to {}",
        merkle_tree.max_num_nodes,
        encode_hash(&merkle_tree.merkle_root),
        merkle_tree_args.merkle_tree_path.display()
    );
    Ok(())
}
