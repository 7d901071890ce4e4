use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    address::checksummed,
    chain::{ClaimedEvent, DistributorChain},
    error::DistributorError,
    store::{DistributorStore, NewClaim},
};

/// Connection state of the claim listener. One owned timer drives all
/// transitions; there are no shared mutable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Connected,
    BackingOff,
}

/// Typed health snapshot, published through a watch channel so callers query
/// listener status through an owned handle instead of ambient globals.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerHealth {
    pub state: ListenerState,
    pub next_block: u64,
    pub consecutive_failures: u32,
    pub claims_recorded: u64,
}

/// Long-lived task mirroring on-chain `Claimed` events into Claim records.
///
/// Runs independently of the distribution pipeline; the only shared state is
/// the store, and claim recording is idempotent per transaction hash so
/// duplicate log delivery after a reconnect is harmless.
pub struct ClaimEventListener<S: DistributorStore> {
    store: Arc<S>,
    chain: Arc<dyn DistributorChain>,
    poll_interval: Duration,
    next_block: u64,
    consecutive_failures: u32,
    claims_recorded: u64,
    health: watch::Sender<ListenerHealth>,
}

impl<S: DistributorStore> ClaimEventListener<S> {
    pub fn new(
        store: Arc<S>,
        chain: Arc<dyn DistributorChain>,
        poll_interval: Duration,
        start_block: u64,
    ) -> (Self, watch::Receiver<ListenerHealth>) {
        let (health, health_rx) = watch::channel(ListenerHealth {
            state: ListenerState::Disconnected,
            next_block: start_block,
            consecutive_failures: 0,
            claims_recorded: 0,
        });
        (
            Self {
                store,
                chain,
                poll_interval,
                next_block: start_block,
                consecutive_failures: 0,
                claims_recorded: 0,
                health,
            },
            health_rx,
        )
    }

    /// Runs until `shutdown` flips to true.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(from_block = self.next_block, "claim listener starting");
        loop {
            self.publish(ListenerState::Connecting);
            let delay = match self.poll_once().await {
                Ok(recorded) => {
                    if recorded > 0 {
                        info!(recorded, next_block = self.next_block, "recorded claims");
                    }
                    self.consecutive_failures = 0;
                    self.publish(ListenerState::Connected);
                    self.poll_interval
                }
                Err(err) => {
                    self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                    let delay = backoff_delay(self.consecutive_failures);
                    warn!(
                        %err,
                        attempt = self.consecutive_failures,
                        retry_in_secs = delay.as_secs(),
                        "claim scan failed, backing off"
                    );
                    self.publish(ListenerState::BackingOff);
                    delay
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.publish(ListenerState::Disconnected);
        info!("claim listener stopped");
    }

    async fn poll_once(&mut self) -> Result<usize, DistributorError> {
        let scan = self.chain.claimed_events(self.next_block).await?;
        let mut recorded = 0usize;
        for event in &scan.events {
            if self.apply_event(event)? {
                recorded += 1;
            }
        }
        self.next_block = scan.next_block;
        self.claims_recorded += recorded as u64;
        Ok(recorded)
    }

    /// Returns true if the event produced a new claim record.
    fn apply_event(&self, event: &ClaimedEvent) -> Result<bool, DistributorError> {
        let wallet = checksummed(&event.wallet);
        let Some(user) = self.store.user_by_wallet(&wallet)? else {
            warn!(%wallet, tx = %format!("{:#x}", event.transaction_hash),
                "Claimed event for unknown wallet, skipping");
            return Ok(false);
        };
        let claim = self.store.record_claim(NewClaim {
            user_id: user.id,
            amount: event.amount.to_string(),
            transaction_hash: format!("{:#x}", event.transaction_hash),
        })?;
        if claim.is_none() {
            debug!(tx = %format!("{:#x}", event.transaction_hash), "claim already recorded");
        }
        Ok(claim.is_some())
    }

    fn publish(&self, state: ListenerState) {
        self.health.send_replace(ListenerHealth {
            state,
            next_block: self.next_block,
            consecutive_failures: self.consecutive_failures,
            claims_recorded: self.claims_recorded,
        });
    }
}

/// Doubles per consecutive failure, capped at 60s.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64 << attempt.min(7).saturating_sub(1);
    Duration::from_secs(secs.min(60))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, B256, U256};

    use super::*;
    use crate::{
        chain::MockChain,
        store::{AllocationKind, MemoryStore, NewAllocation, NewUser},
    };

    const WALLET: &str = "0x41347A026E28f532Ca464bd4FfFa451bF1aA5307";

    fn claimed(amount: u64, tx_byte: u8) -> ClaimedEvent {
        ClaimedEvent {
            wallet: WALLET.parse::<Address>().unwrap(),
            amount: U256::from(amount),
            transaction_hash: B256::repeat_byte(tx_byte),
            block_number: 0,
        }
    }

    fn listener_with_user(
        chain: Arc<MockChain>,
    ) -> (ClaimEventListener<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                wallet_address: WALLET.to_string(),
                referrer_id: None,
            })
            .unwrap();
        store
            .insert_allocation(NewAllocation {
                user_id: user.id,
                amount: "10".to_string(),
                kind: AllocationKind::Airdrop,
            })
            .unwrap();
        let (listener, _health) =
            ClaimEventListener::new(store.clone(), chain, Duration::from_millis(10), 0);
        (listener, store)
    }

    #[tokio::test]
    async fn test_poll_records_claims_and_marks_allocations() {
        let chain = Arc::new(MockChain::new());
        chain.push_claimed_event(claimed(100, 0x01));
        let (mut listener, store) = listener_with_user(chain);

        assert_eq!(listener.poll_once().await.unwrap(), 1);
        assert!(store.unclaimed_allocations().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_idempotent() {
        let chain = Arc::new(MockChain::new());
        chain.push_claimed_event(claimed(100, 0x01));
        let (mut listener, _store) = listener_with_user(chain);

        assert_eq!(listener.poll_once().await.unwrap(), 1);
        // Re-scan from genesis, as after a reconnect: same log, no new claim.
        listener.next_block = 0;
        assert_eq!(listener.poll_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_wallet_is_skipped() {
        let chain = Arc::new(MockChain::new());
        chain.push_claimed_event(ClaimedEvent {
            wallet: Address::repeat_byte(0x99),
            amount: U256::from(1),
            transaction_hash: B256::repeat_byte(0x02),
            block_number: 0,
        });
        let (mut listener, _store) = listener_with_user(chain);
        assert_eq!(listener.poll_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_transitions_through_backoff_and_recovery() {
        let chain = Arc::new(MockChain::new());
        chain.set_fail_scans(true);
        let (listener, _store) = listener_with_user(chain.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut health = listener.health.subscribe();

        let handle = tokio::spawn(listener.run(shutdown_rx));

        // First scan fails and the listener backs off.
        loop {
            health.changed().await.unwrap();
            let snapshot = health.borrow().clone();
            if snapshot.state == ListenerState::BackingOff {
                assert!(snapshot.consecutive_failures >= 1);
                break;
            }
        }

        // Heal the chain; the next poll connects.
        chain.set_fail_scans(false);
        loop {
            health.changed().await.unwrap();
            if health.borrow().state == ListenerState::Connected {
                break;
            }
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn test_backoff_doubles_and_caps_at_sixty_seconds() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(4), Duration::from_secs(8));
        assert_eq!(backoff_delay(6), Duration::from_secs(32));
        // The doubling saturates at the cap, never past it.
        assert_eq!(backoff_delay(7), Duration::from_secs(60));
        assert_eq!(backoff_delay(100), Duration::from_secs(60));
    }
}
