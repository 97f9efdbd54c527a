//! The async context: registered call groups, snapshots, registration.

use crate::gas;
use shardvm_core::{
    SuspendReason, VmError, VmHost, CALLBACK_FUNCTION_NAME, LEGACY_ASYNC_GROUP_ID,
};
use shardvm_types::{Address, AsyncCall, AsyncCallGroup, AsyncCallStatus, CallType, ReturnCode};
use tracing::debug;

/// All async call state of the current transaction.
///
/// Holds the original caller, the return data the transaction produced,
/// the registered call groups, and a LIFO of snapshots the outer executor
/// uses to checkpoint before nested calls. Group identifiers are unique;
/// the context is complete once it holds zero groups.
#[derive(Debug, Clone, Default)]
pub struct AsyncContext {
    caller: Address,
    return_data: Vec<u8>,
    pub(crate) groups: Vec<AsyncCallGroup>,
    state_stack: Vec<AsyncContextSnapshot>,
}

/// One checkpoint of (caller, return-data, groups).
///
/// Snapshots own structural clones: mutations of the live context after a
/// push never reach the saved state.
#[derive(Debug, Clone)]
struct AsyncContextSnapshot {
    caller: Address,
    return_data: Vec<u8>,
    groups: Vec<AsyncCallGroup>,
}

impl AsyncContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset caller, return data and groups, keeping the snapshot stack.
    pub fn init_state(&mut self) {
        self.caller = Address::ZERO;
        self.return_data.clear();
        self.groups.clear();
    }

    /// The account that initiated the transaction being orchestrated.
    pub fn caller(&self) -> &Address {
        &self.caller
    }

    /// Record the original caller.
    pub fn set_caller(&mut self, caller: Address) {
        self.caller = caller;
    }

    /// Return data produced by the transaction so far.
    pub fn return_data(&self) -> &[u8] {
        &self.return_data
    }

    /// Record the transaction's return data.
    pub fn set_return_data(&mut self, return_data: Vec<u8>) {
        self.return_data = return_data;
    }

    /// The registered call groups, in registration order.
    pub fn groups(&self) -> &[AsyncCallGroup] {
        &self.groups
    }

    /// The group registered under `group_id`, if any.
    pub fn group(&self, group_id: &str) -> Option<&AsyncCallGroup> {
        self.group_position(group_id).map(|index| &self.groups[index])
    }

    /// Register a new group; identifiers must be unique within the context.
    pub fn add_group(&mut self, group: AsyncCallGroup) -> Result<(), VmError> {
        if self.group_position(&group.identifier).is_some() {
            return Err(VmError::GroupExists(group.identifier));
        }
        self.groups.push(group);
        Ok(())
    }

    /// Remove the group registered under `group_id`; missing ids are
    /// ignored.
    pub fn delete_group_by_id(&mut self, group_id: &str) {
        if let Some(index) = self.group_position(group_id) {
            self.delete_group(index);
        }
    }

    /// Remove the group at `index` by swap-remove; out-of-range indices
    /// are ignored.
    pub fn delete_group(&mut self, index: usize) {
        if index < self.groups.len() {
            self.groups.swap_remove(index);
        }
    }

    /// Register a call under `group_id`, creating the group when absent.
    ///
    /// Neither callback may name a registered built-in function: built-ins
    /// run with protocol privileges and must never be reachable through a
    /// reply.
    pub fn add_call<H: VmHost>(
        &mut self,
        host: &H,
        group_id: &str,
        call: AsyncCall,
    ) -> Result<(), VmError> {
        if host.is_builtin_function(&call.success_callback) {
            return Err(VmError::BuiltinAsCallback(call.success_callback));
        }
        if host.is_builtin_function(&call.error_callback) {
            return Err(VmError::BuiltinAsCallback(call.error_callback));
        }

        match self.group_position(group_id) {
            Some(index) => self.groups[index].add_call(call),
            None => {
                let mut group = AsyncCallGroup::new(group_id);
                group.add_call(call);
                self.groups.push(group);
            }
        }
        Ok(())
    }

    /// Build a call from its parts, reserve its gas, and register it.
    ///
    /// Charges the async-step fee and possibly a callback gas lock before
    /// the call is appended. A requested gas of `u64::MAX` is replaced by
    /// the gas remaining at this instant.
    #[allow(clippy::too_many_arguments)]
    pub fn create_and_add_call<H: VmHost>(
        &mut self,
        host: &mut H,
        group_id: &str,
        destination: Address,
        data: Vec<u8>,
        value: Vec<u8>,
        success_callback: String,
        error_callback: String,
        gas: u64,
    ) -> Result<(), VmError> {
        let gas_locked = gas::prepare_gas_for_async_call(host)?;

        let provided_gas = if gas == u64::MAX {
            host.metering().gas_left()
        } else {
            gas
        };

        self.add_call(
            host,
            group_id,
            AsyncCall {
                status: AsyncCallStatus::Pending,
                destination,
                data,
                value,
                success_callback,
                error_callback,
                provided_gas,
                gas_limit: 0,
                gas_locked,
            },
        )
    }

    /// Register the single legacy async call and suspend the contract.
    ///
    /// The legacy path uses implicit defaults: both callbacks are the
    /// canonical callback name, the requested gas is everything remaining,
    /// and the group is the reserved legacy identifier. The contract stops
    /// executing immediately afterwards.
    pub fn prepare_legacy_call<H: VmHost>(
        &mut self,
        host: &mut H,
        destination: Address,
        data: Vec<u8>,
        value: Vec<u8>,
    ) -> Result<(), VmError> {
        if self.group(LEGACY_ASYNC_GROUP_ID).is_some() {
            return Err(VmError::OnlyOneLegacyAllowed);
        }

        self.create_and_add_call(
            host,
            LEGACY_ASYNC_GROUP_ID,
            destination,
            data,
            value,
            CALLBACK_FUNCTION_NAME.to_string(),
            CALLBACK_FUNCTION_NAME.to_string(),
            u64::MAX,
        )?;

        host.runtime_mut().suspend(SuspendReason::AsyncCall);
        Ok(())
    }

    /// Locate the first call registered for `destination`.
    ///
    /// Groups are scanned in registration order and the first match wins;
    /// multiple calls to the same destination are permitted but ambiguous
    /// on reply.
    pub fn find_call(&self, destination: &Address) -> Result<(usize, usize), VmError> {
        for (group_index, group) in self.groups.iter().enumerate() {
            if let Some(call_index) = group.find_by_destination(destination) {
                return Ok((group_index, call_index));
            }
        }
        Err(VmError::CallNotFound)
    }

    /// Update the status of the call answered by the current transaction.
    ///
    /// Called at the start of a callback invocation. Returns `None`
    /// without error when the current call is not a callback. Otherwise
    /// the first incoming argument is the destination's return code as
    /// unsigned big-endian bytes, and the call is located by the reply's
    /// caller address.
    pub fn update_current_call_status<H: VmHost>(
        &mut self,
        host: &H,
    ) -> Result<Option<AsyncCall>, VmError> {
        let vm_input = host.runtime().vm_input();
        if vm_input.call_type != CallType::AsynchronousCallBack {
            return Ok(None);
        }

        let Some(first_argument) = vm_input.arguments.first() else {
            return Err(VmError::CannotInterpretCallbackArgs);
        };
        let code = ReturnCode::from_u64(u64_from_be_bytes(first_argument));
        let reply_caller = vm_input.caller;

        let (group_index, call_index) = self.find_call(&reply_caller)?;
        let call = &mut self.groups[group_index].calls[call_index];
        call.update_status(code);
        debug!(destination = %call.destination, status = ?call.status, "async call answered");

        Ok(Some(call.clone()))
    }

    /// The groups that still hold pending calls, as owned clones.
    ///
    /// Resolved and rejected calls are filtered out; the context itself is
    /// untouched.
    pub fn pending_only(&self) -> Vec<AsyncCallGroup> {
        let mut pending_groups = Vec::new();
        for group in &self.groups {
            let pending: Vec<AsyncCall> =
                group.calls.iter().filter(|call| call.is_pending()).cloned().collect();
            if pending.is_empty() {
                continue;
            }
            let mut pending_group = AsyncCallGroup::new(group.identifier.clone());
            pending_group.callback = group.callback.clone();
            pending_group.calls = pending;
            pending_groups.push(pending_group);
        }
        pending_groups
    }

    /// Whether any group is still registered.
    pub fn has_pending_groups(&self) -> bool {
        !self.groups.is_empty()
    }

    /// The context is complete once it holds zero groups.
    pub fn is_complete(&self) -> bool {
        self.groups.is_empty()
    }

    /// Checkpoint the current (caller, return-data, groups).
    pub fn push_state(&mut self) {
        self.state_stack.push(AsyncContextSnapshot {
            caller: self.caller,
            return_data: self.return_data.clone(),
            groups: self.groups.clone(),
        });
    }

    /// Drop the most recent snapshot.
    pub fn pop_discard(&mut self) {
        self.state_stack.pop();
    }

    /// Replace the live state with the most recent snapshot.
    pub fn pop_set_active(&mut self) {
        if let Some(snapshot) = self.state_stack.pop() {
            self.caller = snapshot.caller;
            self.return_data = snapshot.return_data;
            self.groups = snapshot.groups;
        }
    }

    /// Restore caller and return data from the most recent snapshot while
    /// keeping the live groups.
    ///
    /// A real merge policy for groups is not defined yet; until it is, the
    /// merge is the identity on groups.
    pub fn pop_merge_active(&mut self) {
        if let Some(snapshot) = self.state_stack.pop() {
            self.caller = snapshot.caller;
            self.return_data = snapshot.return_data;
        }
    }

    /// Drop every snapshot.
    pub fn clear_state_stack(&mut self) {
        self.state_stack.clear();
    }

    /// Number of snapshots currently held.
    pub fn state_stack_depth(&self) -> usize {
        self.state_stack.len()
    }

    pub(crate) fn group_position(&self, group_id: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.identifier == group_id)
    }
}

/// Big-endian interpretation of arbitrary-width bytes, keeping the low 64
/// bits of oversized inputs.
fn u64_from_be_bytes(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
}
