use alloy_primitives::{Address, U256};
use amd_merkle_tree::utils::parse_token_amount;
use indexmap::IndexMap;
use tracing::warn;

use crate::{
    address::normalize_wallet_address,
    error::DistributorError,
    store::{Allocation, DistributorStore, UserId},
};

/// One user's cumulative unclaimed amount, ready for leaf encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedEntry {
    pub user_id: UserId,
    pub wallet: Address,
    /// Sum of the user's unclaimed allocations, scaled to 18 decimals.
    pub amount: U256,
}

/// Sums every unclaimed allocation per user. Read-only.
///
/// An allocation pointing at a missing user record is logged and skipped so
/// one orphaned row cannot block everyone else's distribution; malformed
/// wallet addresses or amounts on a live user are errors, since skipping
/// them would silently drop real balances.
pub fn aggregate_unclaimed(
    store: &dyn DistributorStore,
) -> Result<Vec<AggregatedEntry>, DistributorError> {
    let allocations = store.unclaimed_allocations()?;

    let mut grouped: IndexMap<UserId, Vec<Allocation>> = IndexMap::new();
    for allocation in allocations {
        grouped
            .entry(allocation.user_id)
            .or_default()
            .push(allocation);
    }

    let mut entries = Vec::with_capacity(grouped.len());
    for (user_id, allocations) in grouped {
        let Some(user) = store.user(user_id)? else {
            warn!(
                user_id,
                count = allocations.len(),
                "allocations reference a missing user record, excluding from distribution"
            );
            continue;
        };

        let wallet = normalize_wallet_address(&user.wallet_address)?;

        let mut total = U256::ZERO;
        for allocation in &allocations {
            let amount = parse_token_amount(&allocation.amount).map_err(|_| {
                DistributorError::InvalidAmount {
                    user_id,
                    amount: allocation.amount.clone(),
                }
            })?;
            total = total
                .checked_add(amount)
                .ok_or_else(|| DistributorError::InvalidAmount {
                    user_id,
                    amount: allocation.amount.clone(),
                })?;
        }

        entries.push(AggregatedEntry {
            user_id,
            wallet,
            amount: total,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AllocationKind, MemoryStore, NewAllocation, NewUser};

    fn user_with_allocations(
        store: &MemoryStore,
        wallet: &str,
        amounts: &[&str],
    ) -> UserId {
        let user = store
            .insert_user(NewUser {
                wallet_address: wallet.to_string(),
                referrer_id: None,
            })
            .unwrap();
        for amount in amounts {
            store
                .insert_allocation(NewAllocation {
                    user_id: user.id,
                    amount: amount.to_string(),
                    kind: AllocationKind::Airdrop,
                })
                .unwrap();
        }
        user.id
    }

    #[test]
    fn test_sums_per_user_at_18_decimals() {
        let store = MemoryStore::new();
        let user_id = user_with_allocations(
            &store,
            "0x1111111111111111111111111111111111111111",
            &["1", "2.5", "0.5"],
        );

        let entries = aggregate_unclaimed(&store).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, user_id);
        assert_eq!(
            entries[0].amount,
            U256::from(4) * U256::from(10).pow(U256::from(18))
        );
    }

    #[test]
    fn test_claimed_allocations_are_excluded() {
        let store = MemoryStore::new();
        let user_id = user_with_allocations(
            &store,
            "0x1111111111111111111111111111111111111111",
            &["3"],
        );
        store
            .record_claim(crate::store::NewClaim {
                user_id,
                amount: "3000000000000000000".to_string(),
                transaction_hash: "0x01".to_string(),
            })
            .unwrap();

        assert!(aggregate_unclaimed(&store).unwrap().is_empty());
    }

    #[test]
    fn test_empty_store_is_a_valid_empty_mapping() {
        let store = MemoryStore::new();
        assert!(aggregate_unclaimed(&store).unwrap().is_empty());
    }

    #[test]
    fn test_missing_user_is_skipped_not_fatal() {
        let store = MemoryStore::new();
        let orphaned = user_with_allocations(
            &store,
            "0x1111111111111111111111111111111111111111",
            &["5"],
        );
        let kept = user_with_allocations(
            &store,
            "0x2222222222222222222222222222222222222222",
            &["7"],
        );
        store.delete_user(orphaned).unwrap();

        let entries = aggregate_unclaimed(&store).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, kept);
    }

    #[test]
    fn test_malformed_amount_raises() {
        let store = MemoryStore::new();
        user_with_allocations(
            &store,
            "0x1111111111111111111111111111111111111111",
            &["not-a-number"],
        );
        assert!(matches!(
            aggregate_unclaimed(&store),
            Err(DistributorError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_malformed_wallet_raises() {
        let store = MemoryStore::new();
        user_with_allocations(&store, "garbage-wallet", &["1"]);
        assert!(matches!(
            aggregate_unclaimed(&store),
            Err(DistributorError::InvalidAddress { .. })
        ));
    }
}
