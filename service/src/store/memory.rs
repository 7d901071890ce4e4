use std::{
    fs::File,
    io::{BufReader, Write},
    path::PathBuf,
    sync::RwLock,
};

use alloy_primitives::U256;
use amd_merkle_tree::utils::{format_token_amount, parse_token_amount};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    unix_now, Allocation, Claim, ClaimStatus, Distribution, DistributorStore, NewAllocation,
    NewClaim, NewProof, NewUser, StoreError, StoredProof, User, UserId,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreInner {
    users: Vec<User>,
    allocations: Vec<Allocation>,
    distributions: Vec<Distribution>,
    proofs: Vec<StoredProof>,
    claims: Vec<Claim>,
    next_id: u64,
}

impl StoreInner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory record store with an optional JSON snapshot on disk. Writes
/// touching multiple records happen under one lock acquisition, which is the
/// transactional scope this store offers.
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Load a snapshot from `path`, or start empty when the file does not
    /// exist yet.
    pub fn load_from_file(path: &PathBuf) -> Result<Self, StoreError> {
        if !path.exists() {
            info!("no store snapshot at {:?}, starting empty", path);
            return Ok(Self::new());
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let inner: StoreInner = serde_json::from_reader(reader)?;
        info!(
            "loaded store snapshot from {:?} ({} users, {} allocations)",
            path,
            inner.users.len(),
            inner.allocations.len()
        );
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    pub fn write_to_file(&self, path: &PathBuf) -> Result<(), StoreError> {
        let inner = self.read()?;
        let serialized = serde_json::to_string_pretty(&*inner)?;
        let mut file = File::create(path)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }

    /// Administrative cleanup. Dependent allocation rows are left in place,
    /// which is exactly the orphaned state the aggregator must tolerate.
    pub fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        if inner.users.len() == before {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreInner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreInner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

fn wallet_key(wallet: &str) -> String {
    wallet.trim().to_ascii_lowercase()
}

fn add_decimal_amounts(a: &str, b: &str) -> Result<String, StoreError> {
    let parse = |raw: &str| {
        parse_token_amount(raw)
            .map_err(|_| StoreError::Backend(format!("unparseable stored amount {raw:?}")))
    };
    let sum = parse(a)?
        .checked_add(parse(b)?)
        .ok_or_else(|| StoreError::Backend("amount overflow while merging users".to_string()))?;
    Ok(format_token_amount(sum))
}

impl DistributorStore for MemoryStore {
    fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.write()?;
        if inner
            .users
            .iter()
            .any(|u| u.wallet_address == user.wallet_address)
        {
            return Err(StoreError::Conflict(format!(
                "wallet address {} already registered",
                user.wallet_address
            )));
        }
        let record = User {
            id: inner.next_id(),
            wallet_address: user.wallet_address,
            referrer_id: user.referrer_id,
            total_spending_for_allocation: "0".to_string(),
            total_spent_money: "0".to_string(),
            is_paid_member: false,
            paid_member_tier: None,
            created_at: unix_now(),
        };
        inner.users.push(record.clone());
        Ok(record)
    }

    fn update_user_wallet(&self, id: UserId, wallet_address: String) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user.wallet_address = wallet_address;
        Ok(())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>, StoreError> {
        let key = wallet_key(wallet_address);
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| wallet_key(&u.wallet_address) == key)
            .cloned())
    }

    fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read()?.users.clone())
    }

    fn insert_allocation(&self, allocation: NewAllocation) -> Result<Allocation, StoreError> {
        let mut inner = self.write()?;
        if !inner.users.iter().any(|u| u.id == allocation.user_id) {
            return Err(StoreError::NotFound(format!("user {}", allocation.user_id)));
        }
        let record = Allocation {
            id: inner.next_id(),
            user_id: allocation.user_id,
            amount: allocation.amount,
            kind: allocation.kind,
            is_claimed: false,
            claim_id: None,
            created_at: unix_now(),
        };
        inner.allocations.push(record.clone());
        Ok(record)
    }

    fn unclaimed_allocations(&self) -> Result<Vec<Allocation>, StoreError> {
        Ok(self
            .read()?
            .allocations
            .iter()
            .filter(|a| !a.is_claimed)
            .cloned()
            .collect())
    }

    fn allocations_for_user(&self, user_id: UserId) -> Result<Vec<Allocation>, StoreError> {
        Ok(self
            .read()?
            .allocations
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    fn active_distribution(&self) -> Result<Option<Distribution>, StoreError> {
        Ok(self
            .read()?
            .distributions
            .iter()
            .find(|d| d.is_active)
            .cloned())
    }

    fn deactivate_active_distribution(&self) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        for distribution in inner.distributions.iter_mut() {
            distribution.is_active = false;
        }
        Ok(())
    }

    fn insert_distribution(
        &self,
        merkle_root: String,
        name: String,
    ) -> Result<Distribution, StoreError> {
        let mut inner = self.write()?;
        if inner.distributions.iter().any(|d| d.is_active) {
            return Err(StoreError::Conflict(
                "another distribution is still active".to_string(),
            ));
        }
        let record = Distribution {
            id: inner.next_id(),
            merkle_root,
            name,
            is_active: true,
            created_at: unix_now(),
        };
        inner.distributions.push(record.clone());
        Ok(record)
    }

    fn insert_proof(&self, proof: NewProof) -> Result<StoredProof, StoreError> {
        let mut inner = self.write()?;
        if inner
            .proofs
            .iter()
            .any(|p| p.distribution_id == proof.distribution_id && p.user_id == proof.user_id)
        {
            return Err(StoreError::Conflict(format!(
                "proof already stored for distribution {} user {}",
                proof.distribution_id, proof.user_id
            )));
        }
        let record = StoredProof {
            id: inner.next_id(),
            distribution_id: proof.distribution_id,
            user_id: proof.user_id,
            amount: proof.amount,
            proof: proof.proof,
        };
        inner.proofs.push(record.clone());
        Ok(record)
    }

    fn proof_count(&self, distribution_id: u64) -> Result<usize, StoreError> {
        Ok(self
            .read()?
            .proofs
            .iter()
            .filter(|p| p.distribution_id == distribution_id)
            .count())
    }

    fn proof_for(
        &self,
        distribution_id: u64,
        user_id: UserId,
    ) -> Result<Option<StoredProof>, StoreError> {
        Ok(self
            .read()?
            .proofs
            .iter()
            .find(|p| p.distribution_id == distribution_id && p.user_id == user_id)
            .cloned())
    }

    fn record_claim(&self, claim: NewClaim) -> Result<Option<Claim>, StoreError> {
        let mut inner = self.write()?;
        // Duplicate event delivery after a reconnect must not double-count.
        if inner
            .claims
            .iter()
            .any(|c| c.transaction_hash == claim.transaction_hash)
        {
            return Ok(None);
        }
        if !inner.users.iter().any(|u| u.id == claim.user_id) {
            return Err(StoreError::NotFound(format!("user {}", claim.user_id)));
        }

        let previously_claimed = inner
            .claims
            .iter()
            .filter(|c| c.user_id == claim.user_id && c.status == ClaimStatus::Success)
            .try_fold(U256::ZERO, |acc, c| {
                let amount = U256::from_str_radix(&c.amount, 10).map_err(|_| {
                    StoreError::Backend(format!("unparseable claim amount {:?}", c.amount))
                })?;
                acc.checked_add(amount).ok_or_else(|| {
                    StoreError::Backend("claim total overflows u256".to_string())
                })
            })?;
        let amount = U256::from_str_radix(&claim.amount, 10).map_err(|_| {
            StoreError::Backend(format!("unparseable claim amount {:?}", claim.amount))
        })?;
        let total = previously_claimed
            .checked_add(amount)
            .ok_or_else(|| StoreError::Backend("claim total overflows u256".to_string()))?;

        let record = Claim {
            id: inner.next_id(),
            user_id: claim.user_id,
            amount: claim.amount,
            total_claimed_amount: total.to_string(),
            transaction_hash: claim.transaction_hash,
            status: ClaimStatus::Success,
            claim_date: unix_now(),
        };
        let claim_id = record.id;
        let user_id = record.user_id;
        inner.claims.push(record.clone());

        for allocation in inner.allocations.iter_mut() {
            if allocation.user_id == user_id && !allocation.is_claimed {
                allocation.is_claimed = true;
                allocation.claim_id = Some(claim_id);
            }
        }

        Ok(Some(record))
    }

    fn merge_users(&self, kept: UserId, merged: UserId) -> Result<(), StoreError> {
        if kept == merged {
            return Err(StoreError::Conflict(
                "cannot merge a user into itself".to_string(),
            ));
        }
        let mut inner = self.write()?;
        let kept_idx = inner
            .users
            .iter()
            .position(|u| u.id == kept)
            .ok_or_else(|| StoreError::NotFound(format!("user {kept}")))?;
        let merged_idx = inner
            .users
            .iter()
            .position(|u| u.id == merged)
            .ok_or_else(|| StoreError::NotFound(format!("user {merged}")))?;

        let merged_user = inner.users[merged_idx].clone();
        {
            let kept_user = &mut inner.users[kept_idx];
            kept_user.total_spending_for_allocation = add_decimal_amounts(
                &kept_user.total_spending_for_allocation,
                &merged_user.total_spending_for_allocation,
            )?;
            kept_user.total_spent_money = add_decimal_amounts(
                &kept_user.total_spent_money,
                &merged_user.total_spent_money,
            )?;
            kept_user.is_paid_member |= merged_user.is_paid_member;
            if kept_user.paid_member_tier.is_none() {
                kept_user.paid_member_tier = merged_user.paid_member_tier;
            }
        }

        for allocation in inner.allocations.iter_mut() {
            if allocation.user_id == merged {
                allocation.user_id = kept;
            }
        }
        for claim in inner.claims.iter_mut() {
            if claim.user_id == merged {
                claim.user_id = kept;
            }
        }
        for proof in inner.proofs.iter_mut() {
            if proof.user_id == merged {
                proof.user_id = kept;
            }
        }
        for user in inner.users.iter_mut() {
            if user.referrer_id == Some(merged) {
                user.referrer_id = Some(kept);
            }
        }
        inner.users.retain(|u| u.id != merged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AllocationKind;

    fn new_user(store: &MemoryStore, wallet: &str) -> User {
        store
            .insert_user(NewUser {
                wallet_address: wallet.to_string(),
                referrer_id: None,
            })
            .unwrap()
    }

    #[test]
    fn test_allocation_lifecycle() {
        let store = MemoryStore::new();
        let user = new_user(&store, "0x1111111111111111111111111111111111111111");
        store
            .insert_allocation(NewAllocation {
                user_id: user.id,
                amount: "10".to_string(),
                kind: AllocationKind::Airdrop,
            })
            .unwrap();

        assert_eq!(store.unclaimed_allocations().unwrap().len(), 1);

        let claim = store
            .record_claim(NewClaim {
                user_id: user.id,
                amount: "10000000000000000000".to_string(),
                transaction_hash: "0xabc".to_string(),
            })
            .unwrap()
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Success);
        assert!(store.unclaimed_allocations().unwrap().is_empty());

        let allocation = &store.allocations_for_user(user.id).unwrap()[0];
        assert!(allocation.is_claimed);
        assert_eq!(allocation.claim_id, Some(claim.id));
    }

    #[test]
    fn test_record_claim_is_idempotent_per_tx_hash() {
        let store = MemoryStore::new();
        let user = new_user(&store, "0x1111111111111111111111111111111111111111");
        let claim = NewClaim {
            user_id: user.id,
            amount: "5".to_string(),
            transaction_hash: "0xdeadbeef".to_string(),
        };
        assert!(store.record_claim(claim.clone()).unwrap().is_some());
        assert!(store.record_claim(claim).unwrap().is_none());
    }

    #[test]
    fn test_total_claimed_amount_accumulates() {
        let store = MemoryStore::new();
        let user = new_user(&store, "0x1111111111111111111111111111111111111111");
        store
            .record_claim(NewClaim {
                user_id: user.id,
                amount: "5".to_string(),
                transaction_hash: "0x01".to_string(),
            })
            .unwrap();
        let second = store
            .record_claim(NewClaim {
                user_id: user.id,
                amount: "7".to_string(),
                transaction_hash: "0x02".to_string(),
            })
            .unwrap()
            .unwrap();
        assert_eq!(second.total_claimed_amount, "12");
    }

    #[test]
    fn test_single_active_distribution() {
        let store = MemoryStore::new();
        store
            .insert_distribution("0xroot1".to_string(), "first".to_string())
            .unwrap();
        // Activating a second distribution without deactivating the first is
        // a constraint violation.
        assert!(store
            .insert_distribution("0xroot2".to_string(), "second".to_string())
            .is_err());

        store.deactivate_active_distribution().unwrap();
        let second = store
            .insert_distribution("0xroot2".to_string(), "second".to_string())
            .unwrap();
        assert_eq!(store.active_distribution().unwrap().unwrap().id, second.id);
    }

    #[test]
    fn test_proof_uniqueness_per_distribution_and_user() {
        let store = MemoryStore::new();
        let user = new_user(&store, "0x1111111111111111111111111111111111111111");
        let distribution = store
            .insert_distribution("0xroot".to_string(), "d".to_string())
            .unwrap();
        let proof = NewProof {
            distribution_id: distribution.id,
            user_id: user.id,
            amount: "1".to_string(),
            proof: vec![],
        };
        store.insert_proof(proof.clone()).unwrap();
        assert!(store.insert_proof(proof).is_err());
        assert_eq!(store.proof_count(distribution.id).unwrap(), 1);
    }

    #[test]
    fn test_user_by_wallet_tolerates_legacy_rows() {
        let store = MemoryStore::new();
        let user = new_user(&store, " 0x41347A026E28f532Ca464bd4FfFa451bF1aA5307 ");
        let found = store
            .user_by_wallet("0x41347a026e28f532ca464bd4fffa451bf1aa5307")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn test_merge_users_repoints_dependents() {
        let store = MemoryStore::new();
        let kept = new_user(&store, "0x1111111111111111111111111111111111111111");
        let merged = new_user(&store, " 0x1111111111111111111111111111111111111111");
        let referred = store
            .insert_user(NewUser {
                wallet_address: "0x2222222222222222222222222222222222222222".to_string(),
                referrer_id: Some(merged.id),
            })
            .unwrap();
        store
            .insert_allocation(NewAllocation {
                user_id: merged.id,
                amount: "3".to_string(),
                kind: AllocationKind::ReferralReward,
            })
            .unwrap();

        store.merge_users(kept.id, merged.id).unwrap();

        assert!(store.user(merged.id).unwrap().is_none());
        assert_eq!(
            store.allocations_for_user(kept.id).unwrap().len(),
            1,
            "allocation should follow the surviving user"
        );
        assert_eq!(
            store.user(referred.id).unwrap().unwrap().referrer_id,
            Some(kept.id)
        );
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = MemoryStore::new();
        let user = new_user(&store, "0x1111111111111111111111111111111111111111");
        store
            .insert_allocation(NewAllocation {
                user_id: user.id,
                amount: "1.5".to_string(),
                kind: AllocationKind::SpendingReward,
            })
            .unwrap();

        let dir = std::env::temp_dir().join("amd_memory_store_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.json");
        store.write_to_file(&path).unwrap();

        let reloaded = MemoryStore::load_from_file(&path).unwrap();
        assert_eq!(reloaded.users().unwrap().len(), 1);
        assert_eq!(reloaded.unclaimed_allocations().unwrap().len(), 1);
    }
}
