//! Collaborator interfaces of the shardvm engine.
//!
//! This crate defines the seams between the async call orchestrator and
//! the rest of the engine:
//!
//! - [`VmHost`]: the full set of collaborators an orchestrator operation
//!   borrows while running
//! - [`RuntimeContext`], [`MeteringContext`], [`BlockchainContext`],
//!   [`OutputContext`], [`StorageContext`], [`CallDataParser`]: one trait
//!   per collaborator
//! - [`VmError`]: every error class the orchestrator raises or propagates
//! - [`GasSchedule`]: the fee parameters the orchestrator charges directly
//!
//! # Architecture
//!
//! The orchestrator never owns its host. Every operation receives the host
//! by reference, which keeps the async context itself plain data that can
//! be snapshotted, persisted and reloaded freely:
//!
//! ```text
//! Executor (owns host + context)
//!      │
//!      ├─► context.execute(&mut host) ──► host.execute_on_dest_context(..)
//!      │                                        │ (mutual recursion)
//!      │◄─── persisted blob / output transfers ◄┘
//! ```

mod error;
mod schedule;
mod traits;

pub use error::VmError;
pub use schedule::GasSchedule;
pub use traits::{
    BlockchainContext, CallDataParser, MeteringContext, OutputContext, RuntimeContext,
    StorageContext, VmHost,
};

/// Canonical callback entry point invoked on an originating contract.
pub const CALLBACK_FUNCTION_NAME: &str = "callBack";

/// Reserved group identifier used by the single-call legacy async path.
pub const LEGACY_ASYNC_GROUP_ID: &str = "legacy-async";

/// Domain prefix of the storage keys holding persisted async contexts.
pub const ASYNC_DATA_PREFIX: &[u8] = b"async-data";

/// Why the interpreter is asked to stop after the current step.
///
/// Modeled as an explicit request the interpreter loop observes as a step
/// result, not as a mutable global breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendReason {
    /// The contract registered the legacy async call; execution resumes
    /// when the cross-shard reply arrives.
    AsyncCall,
}
