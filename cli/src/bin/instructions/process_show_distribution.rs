use amd_distributor_service::store::{DistributorStore, MemoryStore};
use anyhow::Result;

use crate::Args;

pub fn process_show_distribution(args: &Args) -> Result<()> {
    let store = MemoryStore::load_from_file(&args.store_path)?;

    let Some(distribution) = store.active_distribution()? else {
        println!("no active distribution");
        return Ok(());
    };
    let proof_count = store.proof_count(distribution.id)?;

    println!("id:          {}", distribution.id);
    println!("name:        {}", distribution.name);
    println!("merkle root: {}", distribution.merkle_root);
    println!("created at:  {}", distribution.created_at);
    println!("proofs:      {proof_count}");
    Ok(())
}
