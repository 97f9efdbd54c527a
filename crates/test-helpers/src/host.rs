//! The test host and its collaborator stubs.

use crate::fixtures;
use crate::parser::AtSeparatedParser;
use shardvm_core::{
    BlockchainContext, CallDataParser, GasSchedule, MeteringContext, OutputContext,
    RuntimeContext, StorageContext, SuspendReason, VmError, VmHost,
};
use shardvm_storage_memory::MemoryStorage;
use shardvm_types::{
    Address, CallType, ContractCallInput, ReturnCode, ShardId, VmInput, VmOutput,
};
use std::collections::{BTreeMap, BTreeSet};

/// Runtime stub: the current VM input plus recorded side channels.
#[derive(Debug, Clone, Default)]
pub struct TestRuntime {
    /// Address of the contract currently "executing".
    pub sc_address: Address,
    /// Input of the current call.
    pub vm_input: VmInput,
    /// Name of the function being executed.
    pub function: String,
    /// Whether the contract declares the canonical callback entry point.
    pub has_callback: bool,
    /// Last suspend request, if any.
    pub suspended: Option<SuspendReason>,
    /// Message of the last `fail_execution`, if any.
    pub failed_with: Option<String>,
}

impl RuntimeContext for TestRuntime {
    fn sc_address(&self) -> &Address {
        &self.sc_address
    }

    fn vm_input(&self) -> &VmInput {
        &self.vm_input
    }

    fn function(&self) -> &str {
        &self.function
    }

    fn has_callback_method(&self) -> bool {
        self.has_callback
    }

    fn suspend(&mut self, reason: SuspendReason) {
        self.suspended = Some(reason);
    }

    fn fail_execution(&mut self, err: &VmError) {
        self.failed_with = Some(err.to_string());
    }

    fn zero_gas_provided(&mut self) {
        self.vm_input.gas_provided = 0;
    }
}

/// Deterministic gas meter over a plain counter.
#[derive(Debug, Clone)]
pub struct TestMetering {
    /// Remaining gas.
    pub gas_left: u64,
    /// Fee parameters.
    pub schedule: GasSchedule,
}

impl TestMetering {
    /// A meter with the given budget and the test schedule.
    pub fn with_gas(gas_left: u64) -> Self {
        Self {
            gas_left,
            schedule: fixtures::test_gas_schedule(),
        }
    }
}

impl MeteringContext for TestMetering {
    fn gas_left(&self) -> u64 {
        self.gas_left
    }

    fn gas_schedule(&self) -> &GasSchedule {
        &self.schedule
    }

    fn use_gas(&mut self, gas: u64) {
        self.gas_left = self.gas_left.saturating_sub(gas);
    }

    fn use_gas_bounded(&mut self, gas: u64) -> Result<(), VmError> {
        if gas > self.gas_left {
            return Err(VmError::NotEnoughGas);
        }
        self.gas_left -= gas;
        Ok(())
    }

    fn use_gas_for_async_step(&mut self) -> Result<(), VmError> {
        let step = self.schedule.async_call_step_cost;
        self.use_gas_bounded(step)
    }

    fn compute_gas_locked_for_async(&self) -> u64 {
        self.schedule.async_callback_gas_lock
    }
}

/// Shard topology by explicit assignment; unassigned addresses live in
/// shard 0.
#[derive(Debug, Clone, Default)]
pub struct TestBlockchain {
    shards: BTreeMap<Address, ShardId>,
}

impl TestBlockchain {
    /// Place `address` in `shard`.
    pub fn assign(&mut self, address: Address, shard: ShardId) {
        self.shards.insert(address, shard);
    }
}

impl BlockchainContext for TestBlockchain {
    fn shard_of_address(&self, address: &Address) -> ShardId {
        self.shards.get(address).copied().unwrap_or(ShardId(0))
    }
}

/// One transfer recorded by [`RecordingOutput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Receiving account.
    pub destination: Address,
    /// Sending account.
    pub sender: Address,
    /// Gas the transfer carries for the destination.
    pub gas_limit: u64,
    /// Gas locked for the eventual callback.
    pub gas_locked: u64,
    /// Transferred value bytes.
    pub value: Vec<u8>,
    /// Raw call data.
    pub data: Vec<u8>,
    /// Routing tag.
    pub call_type: CallType,
}

/// Records transfers and finish data instead of composing real output
/// accounts.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    /// Every transfer, in emission order.
    pub transfers: Vec<TransferRecord>,
    /// Every finish item, in emission order.
    pub finish_data: Vec<Vec<u8>>,
    /// Last return message set.
    pub return_message: String,
    /// When set, every transfer is rejected.
    pub fail_transfers: bool,
}

impl OutputContext for RecordingOutput {
    fn transfer(
        &mut self,
        destination: Address,
        sender: Address,
        gas_limit: u64,
        gas_locked: u64,
        value: &[u8],
        data: &[u8],
        call_type: CallType,
    ) -> Result<(), VmError> {
        if self.fail_transfers {
            return Err(VmError::ExecutionFailed("transfer rejected".to_string()));
        }
        self.transfers.push(TransferRecord {
            destination,
            sender,
            gas_limit,
            gas_locked,
            value: value.to_vec(),
            data: data.to_vec(),
            call_type,
        });
        Ok(())
    }

    fn vm_output_for_error(&self, err: &VmError) -> VmOutput {
        let return_code = match err {
            VmError::NotEnoughGas => ReturnCode::OutOfGas,
            _ => ReturnCode::ExecutionFailed,
        };
        VmOutput {
            return_code,
            return_data: Vec::new(),
            return_message: err.to_string(),
            gas_remaining: 0,
        }
    }

    fn set_return_message(&mut self, message: &str) {
        self.return_message = message.to_string();
    }

    fn finish(&mut self, data: &[u8]) {
        self.finish_data.push(data.to_vec());
    }
}

/// One call the scripted executor received.
pub type ExecutedCall = ContractCallInput;

/// Scripted destination executor.
///
/// Maps `(recipient, function)` to a canned result and records every call
/// input it receives, in order. Unscripted destinations fail with
/// `ExecutionFailed`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    results: BTreeMap<(Address, String), Result<VmOutput, VmError>>,
    /// Every received input, in call order.
    pub executed: Vec<ExecutedCall>,
}

impl ScriptedExecutor {
    /// Script the result of calling `function` on `recipient`.
    pub fn script(
        &mut self,
        recipient: Address,
        function: &str,
        result: Result<VmOutput, VmError>,
    ) {
        self.results.insert((recipient, function.to_string()), result);
    }

    /// Script a successful result.
    pub fn script_ok(&mut self, recipient: Address, function: &str, output: VmOutput) {
        self.script(recipient, function, Ok(output));
    }

    /// The inputs received for `function` on `recipient`.
    pub fn calls_to(&self, recipient: Address, function: &str) -> Vec<&ExecutedCall> {
        self.executed
            .iter()
            .filter(|input| input.recipient == recipient && input.function == function)
            .collect()
    }

    fn run(&mut self, input: ContractCallInput) -> Result<VmOutput, VmError> {
        let key = (input.recipient, input.function.clone());
        self.executed.push(input);
        match self.results.get(&key) {
            Some(result) => result.clone(),
            None => Err(VmError::ExecutionFailed(format!(
                "no scripted result for {} on {}",
                key.1, key.0
            ))),
        }
    }
}

/// A complete in-memory host for orchestrator tests.
///
/// All collaborators are public fields so tests can stage state up front
/// and inspect recordings afterwards.
#[derive(Debug, Clone)]
pub struct TestHost {
    /// Runtime stub.
    pub runtime: TestRuntime,
    /// Gas meter.
    pub metering: TestMetering,
    /// Shard topology.
    pub blockchain: TestBlockchain,
    /// Output recorder.
    pub output: RecordingOutput,
    /// Contract storage.
    pub storage: MemoryStorage,
    /// Call-data parser.
    pub parser: AtSeparatedParser,
    /// Registered built-in function names.
    pub builtins: BTreeSet<String>,
    /// Whether dynamic gas locking is enabled.
    pub dynamic_gas_locking: bool,
    /// Destination executor.
    pub executor: ScriptedExecutor,
}

impl TestHost {
    /// A host executing a contract at `sc_address` with a 1M gas budget.
    pub fn new(sc_address: Address) -> Self {
        let runtime = TestRuntime {
            sc_address,
            function: "main".to_string(),
            ..TestRuntime::default()
        };
        Self {
            runtime,
            metering: TestMetering::with_gas(1_000_000),
            blockchain: TestBlockchain::default(),
            output: RecordingOutput::default(),
            storage: MemoryStorage::new(),
            parser: AtSeparatedParser,
            builtins: BTreeSet::new(),
            dynamic_gas_locking: false,
            executor: ScriptedExecutor::default(),
        }
    }

    /// Register a protocol built-in function name.
    pub fn register_builtin(&mut self, name: &str) {
        self.builtins.insert(name.to_string());
    }
}

impl VmHost for TestHost {
    fn runtime(&self) -> &dyn RuntimeContext {
        &self.runtime
    }

    fn runtime_mut(&mut self) -> &mut dyn RuntimeContext {
        &mut self.runtime
    }

    fn metering(&self) -> &dyn MeteringContext {
        &self.metering
    }

    fn metering_mut(&mut self) -> &mut dyn MeteringContext {
        &mut self.metering
    }

    fn blockchain(&self) -> &dyn BlockchainContext {
        &self.blockchain
    }

    fn output(&self) -> &dyn OutputContext {
        &self.output
    }

    fn output_mut(&mut self) -> &mut dyn OutputContext {
        &mut self.output
    }

    fn storage(&self) -> &dyn StorageContext {
        &self.storage
    }

    fn storage_mut(&mut self) -> &mut dyn StorageContext {
        &mut self.storage
    }

    fn call_args_parser(&self) -> &dyn CallDataParser {
        &self.parser
    }

    fn is_builtin_function(&self, function: &str) -> bool {
        self.builtins.contains(function)
    }

    fn dynamic_gas_locking_enabled(&self) -> bool {
        self.dynamic_gas_locking
    }

    fn execute_on_dest_context(&mut self, input: ContractCallInput) -> Result<VmOutput, VmError> {
        self.executor.run(input)
    }
}
