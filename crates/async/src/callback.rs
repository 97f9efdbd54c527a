//! Callback dispatch: routing results back to the originating contract.
//!
//! Covers the three return paths of an async call: the local callback
//! after a synchronous child, the context-level callback to the original
//! caller once every group has drained, and the ingestion of a cross-shard
//! reply arriving as a new transaction.

use crate::context::AsyncContext;
use shardvm_core::{VmError, VmHost, CALLBACK_FUNCTION_NAME};
use shardvm_types::{AsyncCall, CallType, ContractCallInput, VmInput, VmOutput};
use tracing::{debug, warn};

/// Run the local callback of a synchronously-executed call.
///
/// The callback input is built from the child's output and executed in a
/// fresh inner context; the effects of a successful callback are merged
/// into the enclosing output by the executor.
pub(crate) fn execute_sync_callback<H: VmHost>(
    call: &AsyncCall,
    vm_output: &VmOutput,
    destination_err: Option<&VmError>,
    host: &mut H,
) -> Result<VmOutput, VmError> {
    let input = create_sync_callback_input(call, vm_output, destination_err, host)?;
    host.execute_on_dest_context(input)
}

/// Build the callback call-input from a child's result.
///
/// The first argument is always the child's return code as minimal
/// big-endian bytes. A successful child contributes its raw return data
/// items; a failed one contributes a single item holding its return
/// message. The callback pays the async-step fee plus a per-byte copy fee
/// over the reconstructed textual length of the data.
fn create_sync_callback_input<H: VmHost>(
    call: &AsyncCall,
    vm_output: &VmOutput,
    destination_err: Option<&VmError>,
    host: &H,
) -> Result<ContractCallInput, VmError> {
    let mut arguments = vec![vm_output.return_code.to_callback_bytes()];
    if destination_err.is_none() {
        arguments.extend(vm_output.return_data.iter().cloned());
    } else {
        arguments.push(vm_output.return_message.clone().into_bytes());
    }

    let callback_function = call.callback_name();

    let schedule = host.metering().gas_schedule();
    let data_length = encoded_data_length(callback_function, &arguments) as u64;
    let gas_to_use = schedule
        .data_copy_per_byte
        .saturating_mul(data_length)
        .saturating_add(schedule.async_call_step_cost);

    let gas_limit = vm_output.gas_remaining.saturating_add(call.gas_locked);
    if gas_limit <= gas_to_use {
        return Err(VmError::NotEnoughGas);
    }
    let gas_provided = gas_limit - gas_to_use;

    let runtime = host.runtime();
    let current = runtime.vm_input();
    Ok(ContractCallInput {
        vm_input: VmInput {
            caller: call.destination,
            arguments,
            call_value: Vec::new(),
            call_type: CallType::AsynchronousCallBack,
            gas_price: current.gas_price,
            gas_provided,
            current_tx_hash: current.current_tx_hash,
            original_tx_hash: current.original_tx_hash,
            prev_tx_hash: current.prev_tx_hash,
        },
        recipient: *runtime.sc_address(),
        function: callback_function.to_string(),
    })
}

/// Record a failed synchronous execution in the transaction output.
///
/// A failed callback consumes the whole remaining budget, writes the
/// error's textual code and the current transaction hash into the finish
/// data, and sets the return message. Successful executions pass through
/// untouched; their effects were already merged by the executor.
pub(crate) fn finish_sync_execution<H: VmHost>(host: &mut H, result: Result<VmOutput, VmError>) {
    let err = match result {
        Ok(_) => return,
        Err(err) => err,
    };

    warn!(%err, "synchronous callback failed");
    host.runtime_mut().zero_gas_provided();

    let vm_output = host.output().vm_output_for_error(&err);
    host.output_mut().set_return_message(&vm_output.return_message);
    host.output_mut()
        .finish(vm_output.return_code.as_str().as_bytes());
    let current_tx_hash = host.runtime().vm_input().current_tx_hash;
    host.output_mut().finish(current_tx_hash.as_bytes());
}

/// Length the callback data would have in its textual
/// `function@arg1@arg2...` form. Empty arguments still count their
/// separator.
fn encoded_data_length(function: &str, arguments: &[Vec<u8>]) -> usize {
    let separators = arguments.len();
    function.len() + separators + arguments.iter().map(Vec::len).sum::<usize>()
}

impl AsyncContext {
    /// Ingest a cross-shard reply addressed to this shard.
    ///
    /// Called after the receiving contract ran its per-call callback for a
    /// reply transaction. Loads the persisted context of the originating
    /// transaction, retires the answered call, and once the whole context
    /// has drained, deletes the blob and notifies the original caller.
    /// Replies to the legacy callback need no bookkeeping and return
    /// immediately.
    pub fn post_process_cross_shard_callback<H: VmHost>(
        &mut self,
        host: &mut H,
    ) -> Result<(), VmError> {
        if host.runtime().function() == CALLBACK_FUNCTION_NAME {
            return Ok(());
        }
        if host.runtime().vm_input().call_type != CallType::AsynchronousCallBack {
            return Err(VmError::CallbackNotExpected);
        }

        self.load(host)?;

        let reply_caller = host.runtime().vm_input().caller;
        let (group_index, call_index) = self.find_call(&reply_caller)?;

        let group = &mut self.groups[group_index];
        group.delete_call(call_index);
        if group.has_pending_calls() {
            return Ok(());
        }
        let group_id = group.identifier.clone();
        debug!(group = %group_id, "async call group drained by cross-shard reply");
        self.delete_group_by_id(&group_id);

        if self.has_pending_groups() {
            return Ok(());
        }

        self.delete(host)?;
        self.execute_context_callback(host)
    }

    /// Deliver the context result to the original caller.
    ///
    /// An in-shard caller gets a local callback on the canonical entry
    /// point; a remote caller gets a cross-shard transfer carrying the
    /// remaining gas and the context's return data.
    pub(crate) fn execute_context_callback<H: VmHost>(
        &mut self,
        host: &mut H,
    ) -> Result<(), VmError> {
        let blockchain = host.blockchain();
        let caller_shard = blockchain.shard_of_address(self.caller());
        let own_shard = blockchain.shard_of_address(host.runtime().sc_address());
        if caller_shard != own_shard {
            return self.send_context_callback_to_original_caller(host);
        }

        let input = self.create_context_callback_input(host);
        let result = host.execute_on_dest_context(input);
        finish_sync_execution(host, result);
        Ok(())
    }

    fn send_context_callback_to_original_caller<H: VmHost>(
        &self,
        host: &mut H,
    ) -> Result<(), VmError> {
        debug!(caller = %self.caller(), "replying to original caller cross-shard");

        let sender = *host.runtime().sc_address();
        let gas_left = host.metering().gas_left();
        let call_value = host.runtime().vm_input().call_value.clone();
        let transfer = host.output_mut().transfer(
            *self.caller(),
            sender,
            gas_left,
            0,
            &call_value,
            self.return_data(),
            CallType::AsynchronousCallBack,
        );

        if let Err(err) = transfer {
            let gas_left = host.metering().gas_left();
            host.metering_mut().use_gas(gas_left);
            host.runtime_mut().fail_execution(&err);
            return Err(err);
        }

        Ok(())
    }

    /// Build the local context-callback input for an in-shard caller.
    ///
    /// The context's return data is parsed as call data for the argument
    /// list; data the parser cannot read becomes a single opaque argument
    /// instead of failing the callback.
    fn create_context_callback_input<H: VmHost>(&self, host: &H) -> ContractCallInput {
        let text = String::from_utf8_lossy(self.return_data()).into_owned();
        let arguments = match host.call_args_parser().parse_data(&text) {
            Ok((_, arguments)) => arguments,
            Err(_) => vec![self.return_data().to_vec()],
        };

        let runtime = host.runtime();
        let current = runtime.vm_input();
        ContractCallInput {
            vm_input: VmInput {
                caller: *runtime.sc_address(),
                arguments,
                call_value: current.call_value.clone(),
                call_type: CallType::AsynchronousCallBack,
                gas_price: current.gas_price,
                gas_provided: host.metering().gas_left(),
                current_tx_hash: current.current_tx_hash,
                original_tx_hash: current.original_tx_hash,
                prev_tx_hash: current.prev_tx_hash,
            },
            recipient: *self.caller(),
            function: CALLBACK_FUNCTION_NAME.to_string(),
        }
    }
}
