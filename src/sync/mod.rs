//! Snapshot Synchronization
//!
//! Decision and publish stages plus the engine that runs one full pass.

pub mod decision;
pub mod engine;
pub mod publisher;

pub use decision::{decide, SyncDecision};
pub use engine::{SyncEngine, SyncOptions, SyncReport, SyncSettings};
pub use publisher::{versioned_key, PublishOrder, PublishOutcome, VersionedPublisher};
