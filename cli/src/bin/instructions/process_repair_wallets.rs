use amd_distributor_service::{repair::repair_duplicate_wallets, store::MemoryStore};
use anyhow::Result;

use crate::Args;

pub fn process_repair_wallets(args: &Args) -> Result<()> {
    let store = MemoryStore::load_from_file(&args.store_path)?;

    let report = repair_duplicate_wallets(&store)?;

    store.write_to_file(&args.store_path)?;

    for (kept, merged) in &report.merged {
        println!("merged user {merged} into {kept}");
    }
    for user_id in &report.rewritten {
        println!("rewrote wallet of user {user_id} to checksummed form");
    }
    println!(
        "repair complete: {} merged, {} rewritten",
        report.merged.len(),
        report.rewritten.len()
    );
    Ok(())
}
