//! Test helpers for shardvm - a full in-memory host for orchestrator tests.
//!
//! This crate provides an implementation of every collaborator interface
//! so orchestrator tests can run real scenarios without an interpreter: a
//! scripted destination executor, a recording output, an assignable shard
//! topology and a deterministic gas meter.
//!
//! # Example
//!
//! ```rust
//! use shardvm_test_helpers::{fixtures, TestHost};
//! use shardvm_types::{ShardId, VmOutput};
//!
//! let mut host = TestHost::new(fixtures::address("A"));
//! host.blockchain.assign(fixtures::address("B"), ShardId(0));
//! host.executor.script_ok(fixtures::address("B"), "inc", VmOutput::ok_with_gas(400));
//!
//! // The host is now ready to drive an AsyncContext.
//! assert_eq!(host.metering.gas_left, 1_000_000);
//! ```

pub mod fixtures;

mod host;
mod parser;

pub use host::{
    ExecutedCall, RecordingOutput, ScriptedExecutor, TestBlockchain, TestHost, TestMetering,
    TestRuntime, TransferRecord,
};
pub use parser::AtSeparatedParser;
