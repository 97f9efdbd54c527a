//! Core types for the shardvm execution engine.
//!
//! This crate provides the foundational types used by the asynchronous
//! call orchestrator and its collaborators:
//!
//! - **Primitives**: [`Hash`], [`Address`], [`ShardId`]
//! - **VM data**: [`VmInput`], [`ContractCallInput`], [`VmOutput`],
//!   [`CallType`], [`ReturnCode`]
//! - **Async calls**: [`AsyncCall`], [`AsyncCallGroup`], [`AsyncCallStatus`]
//!
//! # Design Philosophy
//!
//! This crate is self-contained and does not depend on any other workspace
//! crate, making it the foundation layer. Everything that crosses a shard
//! boundary or reaches storage derives canonical SBOR encoding, and every
//! collection that is iterated observably is an ordered sequence, so that
//! all nodes derive identical bytes from identical state.

mod async_call;
mod hash;
mod identifiers;
mod input;
mod output;

pub use async_call::{AsyncCall, AsyncCallGroup, AsyncCallStatus};
pub use hash::{Hash, HexError};
pub use identifiers::{Address, ShardId};
pub use input::{CallType, ContractCallInput, VmInput};
pub use output::{ReturnCode, VmOutput};
