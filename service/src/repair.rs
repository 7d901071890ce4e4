use alloy_primitives::Address;
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::{
    address::{checksummed, normalize_wallet_address},
    error::DistributorError,
    store::{DistributorStore, User, UserId},
};

/// Outcome of a duplicate-wallet repair pass.
#[derive(Debug, Default)]
pub struct RepairReport {
    /// `(kept, merged)` user id pairs, in merge order.
    pub merged: Vec<(UserId, UserId)>,
    /// Users whose stored wallet string was rewritten to canonical form.
    pub rewritten: Vec<UserId>,
}

/// Finds user rows whose wallet addresses are equal after normalization
/// (trim + case) and merges each group into its earliest-created row,
/// re-pointing all dependent records and rewriting the surviving wallet in
/// checksummed form.
///
/// A malformed stored address is an error: repairing must never guess what
/// an invalid address was meant to be.
pub fn repair_duplicate_wallets(
    store: &dyn DistributorStore,
) -> Result<RepairReport, DistributorError> {
    let users = store.users()?;

    let mut by_wallet: IndexMap<Address, Vec<User>> = IndexMap::new();
    for user in users {
        let wallet = normalize_wallet_address(&user.wallet_address)?;
        by_wallet.entry(wallet).or_default().push(user);
    }

    let mut report = RepairReport::default();
    for (wallet, mut group) in by_wallet {
        group.sort_by_key(|u| (u.created_at, u.id));
        let keeper = group.remove(0);

        let canonical = checksummed(&wallet);
        if keeper.wallet_address != canonical {
            store.update_user_wallet(keeper.id, canonical.clone())?;
            report.rewritten.push(keeper.id);
        }

        for duplicate in group {
            warn!(
                kept = keeper.id,
                merged = duplicate.id,
                wallet = %canonical,
                "merging duplicate wallet rows"
            );
            store.merge_users(keeper.id, duplicate.id)?;
            report.merged.push((keeper.id, duplicate.id));
        }
    }

    if report.merged.is_empty() {
        info!("no duplicate wallets found");
    } else {
        info!(merged = report.merged.len(), "duplicate wallet repair complete");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AllocationKind, MemoryStore, NewAllocation, NewUser};

    const CHECKSUMMED: &str = "0x41347A026E28f532Ca464bd4FfFa451bF1aA5307";

    fn insert_user(store: &MemoryStore, wallet: &str) -> UserId {
        store
            .insert_user(NewUser {
                wallet_address: wallet.to_string(),
                referrer_id: None,
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_merges_whitespace_and_case_variants() {
        let store = MemoryStore::new();
        let original = insert_user(&store, CHECKSUMMED);
        let padded = insert_user(&store, &format!(" {CHECKSUMMED} "));
        let lowered = insert_user(&store, &CHECKSUMMED.to_lowercase());
        store
            .insert_allocation(NewAllocation {
                user_id: padded,
                amount: "3".to_string(),
                kind: AllocationKind::ReferralReward,
            })
            .unwrap();

        let report = repair_duplicate_wallets(&store).unwrap();

        assert_eq!(report.merged.len(), 2);
        assert!(store.user(padded).unwrap().is_none());
        assert!(store.user(lowered).unwrap().is_none());

        let survivor = store.user(original).unwrap().unwrap();
        assert_eq!(survivor.wallet_address, CHECKSUMMED);
        // The duplicate's allocation followed the surviving user.
        assert_eq!(store.allocations_for_user(original).unwrap().len(), 1);
    }

    #[test]
    fn test_earliest_created_row_survives() {
        let store = MemoryStore::new();
        // Same created_at second is likely in tests; the id tiebreak keeps
        // the first insert.
        let first = insert_user(&store, &CHECKSUMMED.to_lowercase());
        let second = insert_user(&store, CHECKSUMMED);

        let report = repair_duplicate_wallets(&store).unwrap();
        assert_eq!(report.merged, vec![(first, second)]);
        // Survivor's legacy lowercase form was rewritten to checksummed.
        assert_eq!(
            store.user(first).unwrap().unwrap().wallet_address,
            CHECKSUMMED
        );
    }

    #[test]
    fn test_clean_store_is_untouched() {
        let store = MemoryStore::new();
        let a = insert_user(&store, CHECKSUMMED);
        let b = insert_user(&store, "0x1111111111111111111111111111111111111111");

        let report = repair_duplicate_wallets(&store).unwrap();
        assert!(report.merged.is_empty());
        assert!(store.user(a).unwrap().is_some());
        assert!(store.user(b).unwrap().is_some());
    }

    #[test]
    fn test_malformed_stored_address_raises() {
        let store = MemoryStore::new();
        insert_user(&store, "0xnot-a-wallet");
        assert!(matches!(
            repair_duplicate_wallets(&store),
            Err(DistributorError::InvalidAddress { .. })
        ));
    }
}
