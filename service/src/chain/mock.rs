use std::sync::Mutex;

use alloy_primitives::keccak256;
use async_trait::async_trait;

use super::{ChainError, ClaimScan, ClaimedEvent, DistributorChain, RootUpdate};

#[derive(Debug, Default)]
struct MockChainState {
    root: [u8; 32],
    block: u64,
    update_count: u64,
    fail_reads: bool,
    revert_updates: bool,
    omit_update_event: bool,
    fail_scans: bool,
    pending_events: Vec<ClaimedEvent>,
}

/// In-memory stand-in for the distributor contract, for development without
/// a BSC endpoint and for pipeline tests. Failure toggles simulate the RPC
/// and revert conditions the reconciler must handle.
#[derive(Debug, Default)]
pub struct MockChain {
    state: Mutex<MockChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: [u8; 32]) -> Self {
        let chain = Self::new();
        chain.lock().root = root;
        chain
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn set_revert_updates(&self, revert: bool) {
        self.lock().revert_updates = revert;
    }

    pub fn set_omit_update_event(&self, omit: bool) {
        self.lock().omit_update_event = omit;
    }

    pub fn set_fail_scans(&self, fail: bool) {
        self.lock().fail_scans = fail;
    }

    pub fn update_count(&self) -> u64 {
        self.lock().update_count
    }

    pub fn current_root(&self) -> [u8; 32] {
        self.lock().root
    }

    /// Queues a `Claimed` event for the next scan and advances the block.
    pub fn push_claimed_event(&self, mut event: ClaimedEvent) {
        let mut state = self.lock();
        state.block += 1;
        event.block_number = state.block;
        state.pending_events.push(event);
    }
}

#[async_trait]
impl DistributorChain for MockChain {
    fn ensure_writable(&self) -> Result<(), ChainError> {
        Ok(())
    }

    async fn merkle_root(&self) -> Result<[u8; 32], ChainError> {
        let state = self.lock();
        if state.fail_reads {
            return Err(ChainError::Network("mock read failure".to_string()));
        }
        Ok(state.root)
    }

    async fn update_merkle_root(&self, new_root: [u8; 32]) -> Result<RootUpdate, ChainError> {
        let mut state = self.lock();
        state.update_count += 1;
        if state.revert_updates {
            return Err(ChainError::RevertWithReason(
                "mock: update reverted".to_string(),
            ));
        }
        state.root = new_root;
        state.block += 1;
        let mut seed = [0u8; 40];
        seed[..32].copy_from_slice(&new_root);
        seed[32..].copy_from_slice(&state.update_count.to_be_bytes());
        Ok(RootUpdate {
            transaction_hash: keccak256(seed),
            event_seen: !state.omit_update_event,
        })
    }

    async fn claimed_events(&self, from_block: u64) -> Result<ClaimScan, ChainError> {
        let state = self.lock();
        if state.fail_scans {
            return Err(ChainError::Network("mock scan failure".to_string()));
        }
        let events = state
            .pending_events
            .iter()
            .filter(|e| e.block_number >= from_block)
            .cloned()
            .collect();
        Ok(ClaimScan {
            events,
            next_block: state.block + 1,
        })
    }
}
