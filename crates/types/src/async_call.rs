//! Async call records and call groups.
//!
//! An [`AsyncCall`] is one outbound contract call registered during
//! execution; an [`AsyncCallGroup`] is an ordered collection of calls that
//! share a user-chosen identifier and an optional terminal callback. Both
//! are persisted verbatim inside the async context blob, so they derive
//! canonical SBOR encoding and keep their calls in insertion order.

use crate::{Address, ReturnCode};
use sbor::prelude::*;

/// Lifecycle of one registered asynchronous call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub enum AsyncCallStatus {
    /// Registered; no result observed yet.
    Pending,
    /// The destination completed with the success code.
    Resolved(ReturnCode),
    /// The destination completed with a failure code.
    Rejected(ReturnCode),
}

impl AsyncCallStatus {
    /// Whether the call is still awaiting its result.
    pub fn is_pending(self) -> bool {
        matches!(self, AsyncCallStatus::Pending)
    }
}

/// One outbound call registered during contract execution.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct AsyncCall {
    /// Where the call stands in its lifecycle.
    pub status: AsyncCallStatus,
    /// Contract being called.
    pub destination: Address,
    /// Encoded call data (function name and arguments).
    pub data: Vec<u8>,
    /// Transferred value as big-endian bytes of a non-negative integer.
    pub value: Vec<u8>,
    /// Entry point invoked on the originating contract when the call succeeds.
    pub success_callback: String,
    /// Entry point invoked on the originating contract when the call fails.
    pub error_callback: String,
    /// Gas requested by the contract; `0` asks the planner for a share of
    /// the leftover budget.
    pub provided_gas: u64,
    /// Effective gas budget assigned by the planner.
    pub gas_limit: u64,
    /// Gas reserved so the callback can run when the reply arrives.
    pub gas_locked: u64,
}

impl AsyncCall {
    /// Whether the call is still awaiting its result.
    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Record the destination's return code.
    pub fn update_status(&mut self, code: ReturnCode) {
        self.status = if code.is_ok() {
            AsyncCallStatus::Resolved(code)
        } else {
            AsyncCallStatus::Rejected(code)
        };
    }

    /// Name of the callback matching the current status.
    ///
    /// A pending call answers with its success callback, so a callback
    /// input can be prepared before the status is known.
    pub fn callback_name(&self) -> &str {
        match self.status {
            AsyncCallStatus::Rejected(_) => &self.error_callback,
            _ => &self.success_callback,
        }
    }
}

/// An ordered collection of async calls sharing a group identifier.
///
/// Groups are kept as a sequence, never a keyed map: they participate in
/// cross-node consensus and must iterate identically everywhere.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct AsyncCallGroup {
    /// User-chosen identifier, unique within a context.
    pub identifier: String,
    /// Calls in registration order.
    pub calls: Vec<AsyncCall>,
    /// Optional terminal callback run when the group completes.
    ///
    /// The hook is declared but its arguments and gas budget are not
    /// defined yet.
    pub callback: Option<String>,
}

impl AsyncCallGroup {
    /// Create an empty group.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            calls: Vec::new(),
            callback: None,
        }
    }

    /// Append a call to the group.
    pub fn add_call(&mut self, call: AsyncCall) {
        self.calls.push(call);
    }

    /// Index of the first call registered for `destination`.
    pub fn find_by_destination(&self, destination: &Address) -> Option<usize> {
        self.calls
            .iter()
            .position(|call| call.destination == *destination)
    }

    /// Remove the call at `index` by swap-remove.
    ///
    /// Group ordering is not semantically required after registration, so
    /// the cheap removal is fine. Out-of-range indices are ignored.
    pub fn delete_call(&mut self, index: usize) {
        if index < self.calls.len() {
            self.calls.swap_remove(index);
        }
    }

    /// Drop every call that is no longer pending.
    pub fn delete_completed_calls(&mut self) {
        self.calls.retain(AsyncCall::is_pending);
    }

    /// Whether any call is still awaiting its result.
    pub fn has_pending_calls(&self) -> bool {
        self.calls.iter().any(AsyncCall::is_pending)
    }

    /// A group is completed once none of its calls is pending.
    pub fn is_completed(&self) -> bool {
        !self.has_pending_calls()
    }
}
