//! Error classes of the async call machinery.

use thiserror::Error;

/// Errors raised by the orchestrator or propagated from its collaborators.
///
/// All of these abort the current execution phase and bubble to the outer
/// executor, which wraps them into a VM output with a non-ok return code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// A call group with this identifier is already registered.
    #[error("async call group {0} already exists")]
    GroupExists(String),

    /// The legacy async path allows a single call per context.
    #[error("only one legacy async call allowed per context")]
    OnlyOneLegacyAllowed,

    /// A registered built-in function cannot serve as a callback.
    #[error("cannot use built-in function {0} as callback")]
    BuiltinAsCallback(String),

    /// No registered call matches the given destination.
    #[error("async call not found")]
    CallNotFound,

    /// The callback carries no interpretable arguments.
    #[error("cannot interpret callback arguments")]
    CannotInterpretCallbackArgs,

    /// A callback arrived outside of a cross-shard reply.
    #[error("callback function not expected")]
    CallbackNotExpected,

    /// No persisted async context exists for the originating transaction.
    #[error("no stored async context found")]
    NoStoredContext,

    /// The gas budget cannot cover the requested operation.
    #[error("not enough gas")]
    NotEnoughGas,

    /// Gas accounting produced an impossible value.
    #[error("gas usage error")]
    GasUsageError,

    /// Call data could not be parsed.
    #[error("cannot parse call data: {0}")]
    ParseFailure(String),

    /// The external executor failed outright.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The storage collaborator rejected an operation.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}
