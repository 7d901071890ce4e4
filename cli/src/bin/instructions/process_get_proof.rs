use amd_distributor_service::address::normalize_wallet_address;
use amd_merkle_tree::{
    distribution_merkle_tree::DistributionMerkleTree,
    utils::{encode_hash, format_token_amount},
};
use anyhow::{anyhow, Result};

use crate::GetProofArgs;

pub fn process_get_proof(get_proof_args: &GetProofArgs) -> Result<()> {
    let merkle_tree = DistributionMerkleTree::new_from_file(&get_proof_args.merkle_tree_path)?;
    let wallet = normalize_wallet_address(&get_proof_args.wallet)?;

    let node = merkle_tree
        .get_node(&wallet)
        .ok_or_else(|| anyhow!("wallet {} not in tree", get_proof_args.wallet))?;

    println!("wallet: {}", node.wallet.to_checksum(None));
    println!(
        "amount: {} ({} tokens)",
        node.amount(),
        format_token_amount(node.amount())
    );
    match &node.proof {
        Some(proof) => {
            println!("proof ({} hashes):", proof.len());
            for hash in proof {
                println!("  {}", encode_hash(hash));
            }
        }
        None => println!("proof: none"),
    }
    Ok(())
}
