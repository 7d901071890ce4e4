use std::sync::Arc;

use amd_distributor_service::{pipeline::DistributionPipeline, store::MemoryStore};
use anyhow::Result;

use crate::{Args, RegenerateArgs};

pub async fn process_regenerate(args: &Args, regenerate_args: &RegenerateArgs) -> Result<()> {
    let store = Arc::new(MemoryStore::load_from_file(&args.store_path)?);
    let chain = args.get_chain_client();

    let pipeline = DistributionPipeline::new(store.clone(), chain);
    let outcome = pipeline.regenerate(&regenerate_args.name).await?;

    store.write_to_file(&args.store_path)?;

    println!("{}", outcome.message);
    println!("merkle root: {}", outcome.merkle_root);
    Ok(())
}
