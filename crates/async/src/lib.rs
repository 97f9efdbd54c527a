//! Asynchronous cross-shard call orchestration.
//!
//! When a contract invokes another contract that may live on a different
//! shard, this crate decides whether the call runs locally and
//! synchronously or leaves the shard as a message, tracks the lifecycle of
//! every pending call, routes return values into the originating
//! contract's callback, and persists enough state to survive the arbitrary
//! delay between a cross-shard call leaving and its reply arriving.
//!
//! # Architecture
//!
//! The [`AsyncContext`] is plain data: the registered call groups of the
//! current transaction plus a snapshot stack the outer executor uses to
//! checkpoint before nested calls. Every operation borrows the engine
//! collaborators through [`shardvm_core::VmHost`]; the context owns none
//! of them, so it can be cloned, persisted and reloaded freely.
//!
//! ```text
//! contract execution                 AsyncContext
//!      │ register calls ──────────────► groups
//!      │ returns                          │
//!      ▼                                  ▼
//! executor ──► context.execute(host) ─► phase 1: sync calls, recurse
//!                                       phase 2: cross-shard transfers
//!                                       persist remaining groups
//! ...arbitrary delay, reply arrives as a new transaction...
//! executor ──► context.post_process_cross_shard_callback(host)
//!                                       reload, retire call,
//!                                       reply to original caller
//! ```
//!
//! Execution is single-threaded and cooperative: the only suspension
//! points are the re-entrant calls into
//! [`shardvm_core::VmHost::execute_on_dest_context`].

mod callback;
mod context;
mod execute;
mod gas;
mod mode;
mod persist;

pub use context::AsyncContext;
pub use mode::{determine_execution_mode, ExecutionMode};
pub use persist::storage_key;
