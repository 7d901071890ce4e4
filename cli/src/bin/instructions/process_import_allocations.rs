use amd_distributor_service::{
    address::{checksummed, normalize_wallet_address},
    store::{AllocationKind, DistributorStore, MemoryStore, NewAllocation, NewUser},
};
use amd_merkle_tree::csv_entry::CsvEntry;
use anyhow::{bail, Context, Result};

use crate::{Args, ImportAllocationsArgs};

pub fn process_import_allocations(args: &Args, import_args: &ImportAllocationsArgs) -> Result<()> {
    let kind = match import_args.kind.as_str() {
        "spending-reward" => AllocationKind::SpendingReward,
        "referral-reward" => AllocationKind::ReferralReward,
        "airdrop" => AllocationKind::Airdrop,
        other => bail!("unknown allocation kind: {other}"),
    };

    let entries = CsvEntry::new_from_file(&import_args.csv_path)
        .with_context(|| format!("failed to read {}", import_args.csv_path.display()))?;
    let store = MemoryStore::load_from_file(&args.store_path)?;

    let mut created_users = 0usize;
    for entry in &entries {
        let wallet = checksummed(&normalize_wallet_address(&entry.wallet)?);
        let user = match store.user_by_wallet(&wallet)? {
            Some(user) => user,
            None => {
                created_users += 1;
                store.insert_user(NewUser {
                    wallet_address: wallet,
                    referrer_id: None,
                })?
            }
        };
        store.insert_allocation(NewAllocation {
            user_id: user.id,
            amount: entry.amount.clone(),
            kind,
        })?;
    }

    store.write_to_file(&args.store_path)?;
    println!(
        "imported {} allocations ({} new users) into {}",
        entries.len(),
        created_users,
        args.store_path.display()
    );
    Ok(())
}
