//! Collaborator traits borrowed by the orchestrator.
//!
//! Each trait is the seam to one engine subsystem. The orchestrator
//! mutates metering (gas consumption) and output (outgoing transfers),
//! reads runtime and blockchain, and drives the executor recursively; it
//! owns none of them.

use crate::{GasSchedule, SuspendReason, VmError};
use shardvm_types::{Address, CallType, ContractCallInput, ShardId, VmInput, VmOutput};

/// The interpreter-facing state of the call currently being executed.
pub trait RuntimeContext {
    /// Address of the contract currently executing.
    fn sc_address(&self) -> &Address;

    /// Input of the call being executed, including the tx-hash triplet.
    fn vm_input(&self) -> &VmInput;

    /// Name of the function being executed.
    fn function(&self) -> &str;

    /// Whether the current contract exports the canonical callback entry
    /// point. Consulted by dynamic gas locking.
    fn has_callback_method(&self) -> bool;

    /// Ask the interpreter to stop after the current step.
    fn suspend(&mut self, reason: SuspendReason);

    /// Abort the current execution with an error.
    fn fail_execution(&mut self, err: &VmError);

    /// Zero the gas budget of the current call.
    ///
    /// Invoked after a failed local callback so the failure consumes the
    /// whole budget deterministically.
    fn zero_gas_provided(&mut self);
}

/// Gas accounting for the current execution.
pub trait MeteringContext {
    /// Gas still available to the current execution.
    fn gas_left(&self) -> u64;

    /// The fee parameters the orchestrator charges directly.
    fn gas_schedule(&self) -> &GasSchedule;

    /// Consume gas unconditionally; the budget saturates at zero.
    fn use_gas(&mut self, gas: u64);

    /// Consume gas, failing with `NotEnoughGas` when the budget is
    /// exceeded. Nothing is consumed on failure.
    fn use_gas_bounded(&mut self, gas: u64) -> Result<(), VmError>;

    /// Charge the fixed async-step fee.
    fn use_gas_for_async_step(&mut self) -> Result<(), VmError>;

    /// Gas to reserve for a future callback invocation.
    fn compute_gas_locked_for_async(&self) -> u64;
}

/// Chain queries answered without executing anything.
pub trait BlockchainContext {
    /// Shard that owns `address`.
    fn shard_of_address(&self, address: &Address) -> ShardId;
}

/// Accumulates the observable effects of the current transaction.
pub trait OutputContext {
    /// Record an outgoing transfer, possibly a cross-shard message.
    ///
    /// `call_type` tells the host chain how to route the transfer and how
    /// to classify the eventual reply.
    #[allow(clippy::too_many_arguments)]
    fn transfer(
        &mut self,
        destination: Address,
        sender: Address,
        gas_limit: u64,
        gas_locked: u64,
        value: &[u8],
        data: &[u8],
        call_type: CallType,
    ) -> Result<(), VmError>;

    /// Build the VM output describing a failed execution.
    fn vm_output_for_error(&self, err: &VmError) -> VmOutput;

    /// Set the transaction's return message.
    fn set_return_message(&mut self, message: &str);

    /// Append an item to the transaction's finish data.
    fn finish(&mut self, data: &[u8]);
}

/// Persistent key-value storage of the current contract.
pub trait StorageContext {
    /// Store `value` under `key`; an empty value deletes the entry.
    fn set_storage(&mut self, key: &[u8], value: &[u8]) -> Result<(), VmError>;

    /// Stored bytes under `key`; empty bytes mean absent.
    fn get_storage(&self, key: &[u8]) -> Vec<u8>;
}

/// Parser of the textual call-data encoding.
pub trait CallDataParser {
    /// Split encoded call data into a function name and raw arguments.
    fn parse_data(&self, data: &str) -> Result<(String, Vec<Vec<u8>>), VmError>;
}

/// The full set of collaborators the orchestrator borrows while running.
///
/// # Guarantees
///
/// - **Synchronous**: every method completes before returning; there are
///   no suspension points other than [`VmHost::execute_on_dest_context`]
/// - **Exclusive**: between two executor recursions the host is observed
///   only by the currently running operation
pub trait VmHost {
    /// Read access to the runtime collaborator.
    fn runtime(&self) -> &dyn RuntimeContext;

    /// Write access to the runtime collaborator.
    fn runtime_mut(&mut self) -> &mut dyn RuntimeContext;

    /// Read access to the metering collaborator.
    fn metering(&self) -> &dyn MeteringContext;

    /// Write access to the metering collaborator.
    fn metering_mut(&mut self) -> &mut dyn MeteringContext;

    /// The blockchain query collaborator.
    fn blockchain(&self) -> &dyn BlockchainContext;

    /// Read access to the output collaborator.
    fn output(&self) -> &dyn OutputContext;

    /// Write access to the output collaborator.
    fn output_mut(&mut self) -> &mut dyn OutputContext;

    /// Read access to contract storage.
    fn storage(&self) -> &dyn StorageContext;

    /// Write access to contract storage.
    fn storage_mut(&mut self) -> &mut dyn StorageContext;

    /// The call-data parser collaborator.
    fn call_args_parser(&self) -> &dyn CallDataParser;

    /// Whether `function` is a registered protocol built-in.
    fn is_builtin_function(&self, function: &str) -> bool;

    /// Dynamic gas locking: reserve callback gas only when the current
    /// contract declares a callback entry point. The static mode reserves
    /// unconditionally.
    fn dynamic_gas_locking_enabled(&self) -> bool;

    /// Execute a contract call in a fresh inner context.
    ///
    /// This is the re-entry point of the engine: the async call machinery
    /// drives it for synchronous calls and local callbacks, and the callee
    /// may itself register async calls that the inner invocation resolves
    /// before returning. On `Err` the inner execution left no side
    /// effects.
    fn execute_on_dest_context(&mut self, input: ContractCallInput) -> Result<VmOutput, VmError>;
}
