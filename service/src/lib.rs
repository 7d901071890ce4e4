//! Distribution generation and reconciliation for the AMD token.
//!
//! The pipeline turns unclaimed point allocations into a Merkle
//! distribution: aggregate per user, build the tree, reconcile the root
//! against the distributor contract on BSC, then persist the distribution
//! and one proof record per user. A separate long-lived listener mirrors
//! on-chain `Claimed` events back into the store.

pub mod address;
pub mod aggregator;
pub mod chain;
pub mod config;
pub mod error;
pub mod listener;
pub mod persister;
pub mod pipeline;
pub mod reconciler;
pub mod repair;
pub mod store;

pub use error::DistributorError;
pub use pipeline::{DistributionPipeline, RegenerateOutcome};
