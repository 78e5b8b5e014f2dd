//! Queue-driven pump.fun token launch service
//!
//! Exposes the creation queue, the launch orchestrator and its collaborator
//! seams for integration and testing.

pub mod config;
pub mod errors;
pub mod keys;
pub mod launcher;
pub mod metadata;
pub mod planner;
pub mod pump;
pub mod queue;
pub mod rpc;
pub mod submitter;

// Re-export commonly used types
pub use errors::{LaunchError, LaunchResult};
pub use launcher::{LaunchOrchestrator, LaunchOutcome, SellOutcome, SnipeSet};
pub use queue::{Job, JobHandle, JobQueue, JobState, Worker};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
