//! Contract call inputs as seen by the engine.

use crate::{Address, Hash};

/// How a contract invocation was routed to the current shard.
///
/// The tag travels on every outgoing transfer and tells the host chain how
/// to route the message and how to classify the eventual reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallType {
    /// Ordinary transaction executed on the shard where it landed.
    DirectCall,
    /// Outgoing leg of a cross-shard contract call.
    AsynchronousCall,
    /// Reply leg of a cross-shard call, or a context-level callback.
    AsynchronousCallBack,
}

/// The input of the contract call currently being executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmInput {
    /// Account that initiated the call.
    pub caller: Address,
    /// Raw call arguments.
    pub arguments: Vec<Vec<u8>>,
    /// Transferred value as big-endian bytes of a non-negative integer.
    pub call_value: Vec<u8>,
    /// How this call reached the current shard.
    pub call_type: CallType,
    /// Price per unit of gas, fixed by the originating transaction.
    pub gas_price: u64,
    /// Gas budget of this call.
    pub gas_provided: u64,
    /// Hash of the transaction being executed right now.
    pub current_tx_hash: Hash,
    /// Hash of the user transaction at the root of the call chain.
    pub original_tx_hash: Hash,
    /// Hash of the transaction that produced this one.
    ///
    /// For cross-shard replies this identifies the originating transaction
    /// and therefore the persisted async context to reload.
    pub prev_tx_hash: Hash,
}

impl Default for VmInput {
    fn default() -> Self {
        Self {
            caller: Address::ZERO,
            arguments: Vec::new(),
            call_value: Vec::new(),
            call_type: CallType::DirectCall,
            gas_price: 0,
            gas_provided: 0,
            current_tx_hash: Hash::ZERO,
            original_tx_hash: Hash::ZERO,
            prev_tx_hash: Hash::ZERO,
        }
    }
}

/// A fully-addressed contract call, ready for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCallInput {
    /// Common VM input fields.
    pub vm_input: VmInput,
    /// Contract being called.
    pub recipient: Address,
    /// Entry point to invoke.
    pub function: String,
}
