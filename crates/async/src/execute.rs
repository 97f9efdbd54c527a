//! Two-phase execution of registered async calls.

use crate::callback;
use crate::context::AsyncContext;
use crate::mode::{determine_execution_mode, ExecutionMode};
use shardvm_core::{VmError, VmHost, LEGACY_ASYNC_GROUP_ID};
use shardvm_types::{AsyncCall, AsyncCallGroup, CallType, ContractCallInput, VmInput, VmOutput};
use tracing::{debug, trace};

/// Which kinds of calls a pass over the groups may carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Only synchronous, in-shard execution; cross-shard calls stay
    /// pending for the second pass.
    SyncOnly,
    /// Everything: synchronous leftovers, local built-ins with cross-shard
    /// effects, and pure cross-shard dispatch.
    Mixed,
}

impl AsyncContext {
    /// Entry point of the async call machinery.
    ///
    /// Runs after the current contract returns, if any calls were
    /// registered. Phase 1 executes every call that can complete
    /// synchronously in this shard; phase 2 re-plans the gas pool and
    /// emits the cross-shard legs of whatever is left, then persists the
    /// remaining context under the originating transaction hash.
    ///
    /// Mutually recursive with
    /// [`VmHost::execute_on_dest_context`]: synchronous children may
    /// register and resolve their own async calls before returning, and
    /// their groups never touch this context.
    pub fn execute<H: VmHost>(&mut self, host: &mut H) -> Result<(), VmError> {
        if self.is_complete() {
            return Ok(());
        }

        self.plan_gas(host)?;
        self.execute_phase(host, Phase::SyncOnly)?;

        // Synchronous work may have changed the pool; size the remaining
        // calls against what is actually left.
        self.plan_gas(host)?;
        self.execute_phase(host, Phase::Mixed)?;

        // The legacy group's callback is handled by a different path.
        self.delete_group_by_id(LEGACY_ASYNC_GROUP_ID);

        self.save(host)
    }

    fn execute_phase<H: VmHost>(&mut self, host: &mut H, phase: Phase) -> Result<(), VmError> {
        let mut index = 0;
        while index < self.groups.len() {
            let group = &mut self.groups[index];
            execute_group(group, host, phase)?;

            group.delete_completed_calls();
            if group.is_completed() {
                run_group_callback(group, host);
                self.groups.swap_remove(index);
            } else {
                index += 1;
            }
        }
        Ok(())
    }
}

fn execute_group<H: VmHost>(
    group: &mut AsyncCallGroup,
    host: &mut H,
    phase: Phase,
) -> Result<(), VmError> {
    trace!(group = %group.identifier, calls = group.calls.len(), ?phase, "executing call group");
    for call in &mut group.calls {
        execute_call(call, host, phase)?;
    }
    Ok(())
}

fn execute_call<H: VmHost>(
    call: &mut AsyncCall,
    host: &mut H,
    phase: Phase,
) -> Result<(), VmError> {
    let mode = determine_execution_mode(host, &call.destination, &call.data)?;

    match mode {
        ExecutionMode::Sync => {
            let (vm_output, destination_err) = match execute_sync_call(call, host) {
                Ok(vm_output) => (vm_output, None),
                Err(err) => (host.output().vm_output_for_error(&err), Some(err)),
            };
            call.update_status(vm_output.return_code);

            let callback_result =
                callback::execute_sync_callback(call, &vm_output, destination_err.as_ref(), host);
            callback::finish_sync_execution(host, callback_result);
            Ok(())
        }
        _ if phase == Phase::SyncOnly => Ok(()),
        ExecutionMode::AsyncBuiltinLocal => {
            // The built-in runs locally and deposits the cross-shard
            // output entries itself; the call stays pending until the
            // reply leg returns. Only an immediate failure is terminal.
            let vm_output = execute_sync_call(call, host)?;
            if !vm_output.return_code.is_ok() {
                call.update_status(vm_output.return_code);
                let callback_result =
                    callback::execute_sync_callback(call, &vm_output, None, host);
                callback::finish_sync_execution(host, callback_result);
            }
            Ok(())
        }
        ExecutionMode::AsyncCrossShard => send_async_call_cross_shard(call, host),
    }
}

fn execute_sync_call<H: VmHost>(call: &AsyncCall, host: &mut H) -> Result<VmOutput, VmError> {
    let input = create_sync_call_input(call, host)?;
    host.execute_on_dest_context(input)
}

/// Build the call input of a destination contract call.
///
/// The async-step fee is paid out of the call's own gas limit before the
/// destination sees the rest.
fn create_sync_call_input<H: VmHost>(
    call: &AsyncCall,
    host: &H,
) -> Result<ContractCallInput, VmError> {
    let text = String::from_utf8_lossy(&call.data);
    let (function, arguments) = host.call_args_parser().parse_data(&text)?;

    let async_step_cost = host.metering().gas_schedule().async_call_step_cost;
    if call.gas_limit <= async_step_cost {
        return Err(VmError::NotEnoughGas);
    }
    let gas_provided = call.gas_limit - async_step_cost;

    let runtime = host.runtime();
    let current = runtime.vm_input();
    Ok(ContractCallInput {
        vm_input: VmInput {
            caller: *runtime.sc_address(),
            arguments,
            call_value: call.value.clone(),
            call_type: CallType::AsynchronousCall,
            gas_price: current.gas_price,
            gas_provided,
            current_tx_hash: current.current_tx_hash,
            original_tx_hash: current.original_tx_hash,
            prev_tx_hash: current.prev_tx_hash,
        },
        recipient: call.destination,
        function,
    })
}

/// Emit the cross-shard leg of a pending call.
///
/// The transfer carries the planned gas limit, the locked callback gas,
/// the value and the raw call data, tagged as an asynchronous call so the
/// destination shard routes the reply back here.
fn send_async_call_cross_shard<H: VmHost>(call: &AsyncCall, host: &mut H) -> Result<(), VmError> {
    debug!(
        destination = %call.destination,
        gas_limit = call.gas_limit,
        gas_locked = call.gas_locked,
        "dispatching cross-shard async call"
    );

    let sender = *host.runtime().sc_address();
    let transfer = host.output_mut().transfer(
        call.destination,
        sender,
        call.gas_limit,
        call.gas_locked,
        &call.value,
        &call.data,
        CallType::AsynchronousCall,
    );

    if let Err(err) = transfer {
        let gas_left = host.metering().gas_left();
        host.metering_mut().use_gas(gas_left);
        host.runtime_mut().fail_execution(&err);
        return Err(err);
    }

    Ok(())
}

/// Group-level terminal callback hook.
///
/// The arguments and gas budget of group callbacks are not defined yet;
/// the hook only marks the completion point.
fn run_group_callback<H: VmHost>(group: &AsyncCallGroup, _host: &mut H) {
    if group.callback.is_some() {
        trace!(group = %group.identifier, "group completed with a declared callback");
    }
}
