//! Deterministic fixtures for orchestrator tests.

use shardvm_core::GasSchedule;
use shardvm_types::{
    Address, AsyncCall, AsyncCallStatus, CallType, ContractCallInput, Hash, VmInput,
};

/// A test address from an ASCII label, right-padded with `.` to 32 bytes.
///
/// # Panics
///
/// Panics if the label is longer than 32 bytes.
pub fn address(label: &str) -> Address {
    assert!(label.len() <= Address::BYTES, "label too long for an address");
    let mut bytes = [b'.'; 32];
    bytes[..label.len()].copy_from_slice(label.as_bytes());
    Address::new(bytes)
}

/// A deterministic transaction hash from a label.
pub fn tx_hash(label: &str) -> Hash {
    Hash::from_bytes(label.as_bytes())
}

/// The gas schedule used across orchestrator tests.
///
/// Small round numbers keep expected gas values readable; the data-copy
/// fee is zero so callback gas arithmetic stays obvious. Tests exercising
/// the per-byte fee build their own schedule.
pub fn test_gas_schedule() -> GasSchedule {
    GasSchedule {
        async_call_step_cost: 100,
        async_callback_gas_lock: 500,
        data_copy_per_byte: 0,
    }
}

/// A pending async call with the given destination, data and gas figures.
///
/// Callbacks default to `onDone`/`onFail`; value is empty.
pub fn pending_call(
    destination: Address,
    data: &[u8],
    provided_gas: u64,
    gas_locked: u64,
) -> AsyncCall {
    AsyncCall {
        status: AsyncCallStatus::Pending,
        destination,
        data: data.to_vec(),
        value: Vec::new(),
        success_callback: "onDone".to_string(),
        error_callback: "onFail".to_string(),
        provided_gas,
        gas_limit: 0,
        gas_locked,
    }
}

/// A minimal direct-call input for `function` on `recipient`.
pub fn call_input(recipient: Address, function: &str) -> ContractCallInput {
    ContractCallInputBuilder::new(recipient, function).build()
}

/// Builder for contract call inputs.
///
/// # Example
///
/// ```rust
/// use shardvm_test_helpers::fixtures::{address, tx_hash, ContractCallInputBuilder};
/// use shardvm_types::CallType;
///
/// let input = ContractCallInputBuilder::new(address("B"), "inc")
///     .with_caller(address("A"))
///     .with_call_type(CallType::AsynchronousCall)
///     .with_gas_provided(1000)
///     .with_prev_tx_hash(tx_hash("origin"))
///     .build();
/// assert_eq!(input.function, "inc");
/// ```
#[derive(Debug, Clone)]
pub struct ContractCallInputBuilder {
    input: ContractCallInput,
}

impl ContractCallInputBuilder {
    /// Start from a direct call with zero gas and no arguments.
    pub fn new(recipient: Address, function: &str) -> Self {
        Self {
            input: ContractCallInput {
                vm_input: VmInput::default(),
                recipient,
                function: function.to_string(),
            },
        }
    }

    /// Set the calling account.
    pub fn with_caller(mut self, caller: Address) -> Self {
        self.input.vm_input.caller = caller;
        self
    }

    /// Set the call type.
    pub fn with_call_type(mut self, call_type: CallType) -> Self {
        self.input.vm_input.call_type = call_type;
        self
    }

    /// Set the raw arguments.
    pub fn with_arguments(mut self, arguments: Vec<Vec<u8>>) -> Self {
        self.input.vm_input.arguments = arguments;
        self
    }

    /// Set the transferred value bytes.
    pub fn with_call_value(mut self, value: Vec<u8>) -> Self {
        self.input.vm_input.call_value = value;
        self
    }

    /// Set the gas budget.
    pub fn with_gas_provided(mut self, gas: u64) -> Self {
        self.input.vm_input.gas_provided = gas;
        self
    }

    /// Set the previous transaction hash.
    pub fn with_prev_tx_hash(mut self, hash: Hash) -> Self {
        self.input.vm_input.prev_tx_hash = hash;
        self
    }

    /// Set the current transaction hash.
    pub fn with_current_tx_hash(mut self, hash: Hash) -> Self {
        self.input.vm_input.current_tx_hash = hash;
        self
    }

    /// Finish building.
    pub fn build(self) -> ContractCallInput {
        self.input
    }
}
