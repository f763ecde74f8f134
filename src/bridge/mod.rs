//! Bridge coordination layer.
//!
//! Ties the transport to the query and transfer operations the tool front
//! end calls.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bridge`] | Entry point for queries and transfers |
//! | [`BridgeContext`] | State shared with the dispatcher |
//! | [`RequestCorrelator`] | One pending slot per request kind |
//! | [`SnapshotCache`] | Latest pushed or pulled inventory |
//! | [`TransferOutcome`] | Classified transfer result |

// ============================================================================
// Submodules
// ============================================================================

/// Snapshot cache.
pub mod cache;

/// Request/response correlation.
pub mod correlator;

/// Bridge coordinator and shared context.
pub mod core;

/// Transfer orchestration.
pub mod transfer;

// ============================================================================
// Re-exports
// ============================================================================

pub use cache::{Freshness, SnapshotCache, SnapshotSource};
pub use core::{Bridge, BridgeContext};
pub use correlator::RequestCorrelator;
pub use transfer::TransferOutcome;
