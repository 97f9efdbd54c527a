//! End-to-end scenarios for the two-phase executor and callback routing.
//!
//! Each test stages a host, registers calls, runs `execute()` and checks
//! the observable effects: executor recursions, output transfers, finish
//! data and the persisted blob.

use shardvm_async::{storage_key, AsyncContext};
use shardvm_core::{StorageContext, VmError};
use shardvm_test_helpers::{fixtures, TestHost};
use shardvm_types::{AsyncCallStatus, CallType, ReturnCode, ShardId, VmOutput};
use tracing_test::traced_test;

/// A host for contract `A` with a readable gas budget and an origin hash.
fn staged_host() -> TestHost {
    let mut host = TestHost::new(fixtures::address("A"));
    host.metering.gas_left = 5_000;
    host.runtime.vm_input.prev_tx_hash = fixtures::tx_hash("origin");
    host.runtime.vm_input.current_tx_hash = fixtures::tx_hash("current");
    host
}

#[test]
fn in_shard_call_resolves_synchronously_with_local_callback() {
    let a = fixtures::address("A");
    let b = fixtures::address("B");
    let mut host = staged_host();
    host.executor.script_ok(b, "inc", VmOutput::ok_with_gas(400));
    host.executor.script_ok(a, "onDone", VmOutput::ok_with_gas(0));

    let mut context = AsyncContext::new();
    context
        .add_call(&host, "transfers", fixtures::pending_call(b, b"inc", 1000, 500))
        .unwrap();

    context.execute(&mut host).unwrap();

    // The call resolved and was removed; nothing left to persist, no
    // outgoing transfer.
    assert!(context.is_complete());
    assert!(host.output.transfers.is_empty());
    assert!(host.storage.is_empty());

    let executed = &host.executor.executed;
    assert_eq!(executed.len(), 2);

    // Destination call: the async-step fee came out of the call's budget.
    assert_eq!(executed[0].recipient, b);
    assert_eq!(executed[0].function, "inc");
    assert_eq!(executed[0].vm_input.caller, a);
    assert_eq!(executed[0].vm_input.call_type, CallType::AsynchronousCall);
    assert_eq!(executed[0].vm_input.gas_provided, 1000 - 100);

    // Local callback: caller and recipient swapped, the return code as
    // the single argument, budget = remaining + locked - step fee.
    let callback = &executed[1];
    assert_eq!(callback.recipient, a);
    assert_eq!(callback.function, "onDone");
    assert_eq!(callback.vm_input.caller, b);
    assert_eq!(callback.vm_input.call_type, CallType::AsynchronousCallBack);
    assert_eq!(callback.vm_input.arguments, vec![vec![0u8]]);
    assert_eq!(callback.vm_input.gas_provided, 400 + 500 - 100);
}

#[test]
fn successful_child_return_data_reaches_the_callback() {
    let a = fixtures::address("A");
    let b = fixtures::address("B");
    let mut host = staged_host();
    host.executor.script_ok(
        b,
        "inc",
        VmOutput {
            return_data: vec![vec![0x2A], b"note".to_vec()],
            gas_remaining: 400,
            ..VmOutput::default()
        },
    );
    host.executor.script_ok(a, "onDone", VmOutput::ok_with_gas(0));

    let mut context = AsyncContext::new();
    context
        .add_call(&host, "transfers", fixtures::pending_call(b, b"inc", 1000, 500))
        .unwrap();
    context.execute(&mut host).unwrap();

    let callback = &host.executor.executed[1];
    assert_eq!(
        callback.vm_input.arguments,
        vec![vec![0u8], vec![0x2A], b"note".to_vec()]
    );
}

#[test]
fn failed_sync_call_routes_message_to_error_callback() {
    let a = fixtures::address("A");
    let b = fixtures::address("B");
    let mut host = staged_host();
    host.executor
        .script(b, "inc", Err(VmError::ExecutionFailed("boom".to_string())));
    host.executor.script_ok(a, "onFail", VmOutput::ok_with_gas(0));

    let mut context = AsyncContext::new();
    context
        .add_call(&host, "transfers", fixtures::pending_call(b, b"inc", 1000, 500))
        .unwrap();
    context.execute(&mut host).unwrap();

    assert!(context.is_complete());

    let callbacks = host.executor.calls_to(a, "onFail");
    assert_eq!(callbacks.len(), 1);
    let arguments = &callbacks[0].vm_input.arguments;
    assert_eq!(arguments.len(), 2);
    assert_eq!(arguments[0], ReturnCode::ExecutionFailed.to_callback_bytes());
    assert_eq!(arguments[1], b"execution failed: boom".to_vec());
    // The error output carries no remaining gas; only the locked gas
    // funds the callback.
    assert_eq!(callbacks[0].vm_input.gas_provided, 500 - 100);
}

#[test]
#[traced_test]
fn failed_callback_consumes_budget_and_reports_through_output() {
    let b = fixtures::address("B");
    let mut host = staged_host();
    host.runtime.vm_input.gas_provided = 777;
    host.executor.script_ok(b, "inc", VmOutput::ok_with_gas(400));
    // "onDone" is not scripted: the callback execution fails.

    let mut context = AsyncContext::new();
    context
        .add_call(&host, "transfers", fixtures::pending_call(b, b"inc", 1000, 500))
        .unwrap();
    context.execute(&mut host).unwrap();

    // A failed callback is not fatal to the transaction, but it zeroes
    // the budget and reports the textual code plus the current tx hash.
    assert!(context.is_complete());
    assert_eq!(host.runtime.vm_input.gas_provided, 0);
    assert!(!host.output.return_message.is_empty());
    assert_eq!(host.output.finish_data.len(), 2);
    assert_eq!(host.output.finish_data[0], b"execution failed".to_vec());
    assert_eq!(
        host.output.finish_data[1],
        fixtures::tx_hash("current").as_bytes().to_vec()
    );
    assert!(logs_contain("synchronous callback failed"));
}

#[test]
fn cross_shard_call_emits_transfer_and_persists_context() {
    let a = fixtures::address("A");
    let b = fixtures::address("B");
    let mut host = staged_host();
    host.blockchain.assign(b, ShardId(1));

    let mut context = AsyncContext::new();
    context.set_caller(fixtures::address("U"));
    context.set_return_data(b"done@2a".to_vec());
    context
        .add_call(&host, "transfers", fixtures::pending_call(b, b"inc", 1000, 500))
        .unwrap();

    context.execute(&mut host).unwrap();

    // One transfer tagged as an asynchronous call, with the planned gas
    // figures and the raw call data.
    assert_eq!(host.output.transfers.len(), 1);
    let transfer = &host.output.transfers[0];
    assert_eq!(transfer.destination, b);
    assert_eq!(transfer.sender, a);
    assert_eq!(transfer.gas_limit, 1000);
    assert_eq!(transfer.gas_locked, 500);
    assert_eq!(transfer.data, b"inc".to_vec());
    assert_eq!(transfer.call_type, CallType::AsynchronousCall);

    // Nothing ran locally; the call is pending and the context is
    // persisted under the origin transaction hash.
    assert!(host.executor.executed.is_empty());
    assert!(!context.is_complete());
    let blob = host
        .storage
        .get_storage(&storage_key(&fixtures::tx_hash("origin")));
    assert!(!blob.is_empty());

    // The blob decodes to exactly this single-call context.
    let mut reloaded = AsyncContext::new();
    reloaded.load(&host).unwrap();
    assert_eq!(reloaded.caller(), context.caller());
    assert_eq!(reloaded.return_data(), context.return_data());
    assert_eq!(reloaded.groups(), context.groups());
    assert_eq!(reloaded.groups()[0].calls[0].gas_limit, 1000);
    assert!(reloaded.groups()[0].calls[0].is_pending());
}

#[test]
fn mixed_group_resolves_sync_half_and_persists_pending_half() {
    let a = fixtures::address("A");
    let b = fixtures::address("B");
    let c = fixtures::address("C");
    let mut host = staged_host();
    host.blockchain.assign(c, ShardId(1));
    host.executor.script_ok(b, "inc", VmOutput::ok_with_gas(100));
    host.executor.script_ok(a, "onDone", VmOutput::ok_with_gas(0));

    let mut context = AsyncContext::new();
    context
        .add_call(&host, "work", fixtures::pending_call(b, b"inc", 1000, 500))
        .unwrap();
    context
        .add_call(&host, "work", fixtures::pending_call(c, b"dec", 800, 0))
        .unwrap();

    context.execute(&mut host).unwrap();

    // The in-shard call resolved and was dropped; the cross-shard one
    // went out and survives in the persisted group.
    assert_eq!(host.output.transfers.len(), 1);
    assert_eq!(host.output.transfers[0].destination, c);

    let mut reloaded = AsyncContext::new();
    reloaded.load(&host).unwrap();
    assert_eq!(reloaded.groups().len(), 1);
    assert_eq!(reloaded.groups()[0].calls.len(), 1);
    assert_eq!(reloaded.groups()[0].calls[0].destination, c);
}

#[test]
fn remote_builtin_runs_locally_and_stays_pending() {
    let b = fixtures::address("B");
    let mut host = staged_host();
    host.blockchain.assign(b, ShardId(1));
    host.register_builtin("mintTokens");
    host.executor
        .script_ok(b, "mintTokens", VmOutput::ok_with_gas(100));

    let mut context = AsyncContext::new();
    context
        .add_call(&host, "mint", fixtures::pending_call(b, b"mintTokens", 1000, 0))
        .unwrap();
    context.execute(&mut host).unwrap();

    // Executed locally exactly once; the built-in deposits its own
    // cross-shard entries, so the orchestrator emits no transfer. The
    // true status arrives with the reply, so the call stays pending.
    assert_eq!(host.executor.executed.len(), 1);
    assert_eq!(host.executor.executed[0].vm_input.gas_provided, 1000 - 100);
    assert!(host.output.transfers.is_empty());
    assert!(!context.is_complete());
    assert!(context.groups()[0].calls[0].is_pending());
    assert!(!host
        .storage
        .get_storage(&storage_key(&fixtures::tx_hash("origin")))
        .is_empty());
}

#[test]
fn failed_remote_builtin_is_terminal_and_runs_error_callback() {
    let a = fixtures::address("A");
    let b = fixtures::address("B");
    let mut host = staged_host();
    host.blockchain.assign(b, ShardId(1));
    host.register_builtin("mintTokens");
    host.executor.script_ok(
        b,
        "mintTokens",
        VmOutput {
            return_code: ReturnCode::UserError,
            return_message: "mint failed".to_string(),
            gas_remaining: 100,
            ..VmOutput::default()
        },
    );
    host.executor.script_ok(a, "onFail", VmOutput::ok_with_gas(0));

    let mut context = AsyncContext::new();
    context
        .add_call(&host, "mint", fixtures::pending_call(b, b"mintTokens", 1000, 500))
        .unwrap();
    context.execute(&mut host).unwrap();

    // Rejected immediately: the error callback ran and the call was
    // dropped, leaving nothing to persist.
    assert!(context.is_complete());
    assert!(host.storage.is_empty());

    let callbacks = host.executor.calls_to(a, "onFail");
    assert_eq!(callbacks.len(), 1);
    // The built-in produced a real output, so its return data (none)
    // follows the code; the message is not forwarded.
    assert_eq!(
        callbacks[0].vm_input.arguments,
        vec![ReturnCode::UserError.to_callback_bytes()]
    );
}

#[test]
fn rejected_transfer_drains_gas_and_fails_execution() {
    let b = fixtures::address("B");
    let mut host = staged_host();
    host.blockchain.assign(b, ShardId(1));
    host.output.fail_transfers = true;

    let mut context = AsyncContext::new();
    context
        .add_call(&host, "transfers", fixtures::pending_call(b, b"inc", 1000, 0))
        .unwrap();

    let err = context.execute(&mut host).unwrap_err();
    assert!(matches!(err, VmError::ExecutionFailed(_)));
    assert_eq!(host.metering.gas_left, 0);
    assert!(host.runtime.failed_with.is_some());
}

#[test]
fn unparseable_call_data_aborts_the_phase() {
    let b = fixtures::address("B");
    let mut host = staged_host();

    let mut context = AsyncContext::new();
    context
        .add_call(&host, "transfers", fixtures::pending_call(b, b"", 1000, 0))
        .unwrap();

    assert!(matches!(
        context.execute(&mut host),
        Err(VmError::ParseFailure(_))
    ));
}

#[test]
fn execute_on_complete_context_is_a_noop() {
    let mut host = staged_host();
    let mut context = AsyncContext::new();
    context.execute(&mut host).unwrap();

    assert!(host.executor.executed.is_empty());
    assert!(host.output.transfers.is_empty());
    assert!(host.storage.is_empty());
}

#[test]
fn cross_shard_reply_drains_context_and_notifies_original_caller() {
    let a = fixtures::address("A");
    let b = fixtures::address("B");
    let c = fixtures::address("C");
    let mut host = staged_host();
    host.blockchain.assign(b, ShardId(1));

    // Stage the persisted context: A called B cross-shard on behalf of
    // the in-shard original caller C.
    let mut stored = AsyncContext::new();
    stored.set_caller(c);
    stored.set_return_data(b"done@2a".to_vec());
    let mut call = fixtures::pending_call(b, b"inc", 1000, 500);
    call.success_callback = "onInc".to_string();
    call.error_callback = "onIncFail".to_string();
    call.gas_limit = 1000;
    stored.add_call(&host, "transfers", call).unwrap();
    stored.save(&mut host).unwrap();

    // The reply arrives as a new transaction from B, carrying the return
    // code and the result.
    host.runtime.function = "onInc".to_string();
    host.runtime.vm_input.caller = b;
    host.runtime.vm_input.call_type = CallType::AsynchronousCallBack;
    host.runtime.vm_input.arguments = vec![vec![0u8], b"42".to_vec()];
    host.executor.script_ok(c, "callBack", VmOutput::ok_with_gas(0));

    let mut context = AsyncContext::new();
    context.load(&host).unwrap();
    let answered = context.update_current_call_status(&host).unwrap().unwrap();
    assert_eq!(answered.status, AsyncCallStatus::Resolved(ReturnCode::Ok));
    assert_eq!(answered.callback_name(), "onInc");

    context.post_process_cross_shard_callback(&mut host).unwrap();

    // Call retired, group and context drained, blob deleted.
    assert!(context.is_complete());
    assert!(host
        .storage
        .get_storage(&storage_key(&fixtures::tx_hash("origin")))
        .is_empty());

    // The context-level callback ran locally on the original caller with
    // arguments parsed from the stored return data.
    let callbacks = host.executor.calls_to(c, "callBack");
    assert_eq!(callbacks.len(), 1);
    assert_eq!(callbacks[0].vm_input.caller, a);
    assert_eq!(callbacks[0].vm_input.arguments, vec![vec![0x2A]]);
    assert_eq!(
        callbacks[0].vm_input.call_type,
        CallType::AsynchronousCallBack
    );
}

#[test]
fn reply_for_partial_group_keeps_the_rest_persisted() {
    let b = fixtures::address("B");
    let c = fixtures::address("C");
    let mut host = staged_host();
    host.blockchain.assign(b, ShardId(1));
    host.blockchain.assign(c, ShardId(1));

    let mut stored = AsyncContext::new();
    stored.set_caller(fixtures::address("U"));
    let mut first = fixtures::pending_call(b, b"inc", 1000, 0);
    first.success_callback = "onInc".to_string();
    let mut second = fixtures::pending_call(c, b"dec", 1000, 0);
    second.success_callback = "onDec".to_string();
    stored.add_call(&host, "work", first).unwrap();
    stored.add_call(&host, "work", second).unwrap();
    stored.save(&mut host).unwrap();

    host.runtime.function = "onInc".to_string();
    host.runtime.vm_input.caller = b;
    host.runtime.vm_input.call_type = CallType::AsynchronousCallBack;
    host.runtime.vm_input.arguments = vec![vec![0u8]];

    let mut context = AsyncContext::new();
    context.post_process_cross_shard_callback(&mut host).unwrap();

    // One call retired, the other still pending; the blob survives.
    assert!(!context.is_complete());
    assert_eq!(context.groups()[0].calls.len(), 1);
    assert_eq!(context.groups()[0].calls[0].destination, c);
    assert!(!host
        .storage
        .get_storage(&storage_key(&fixtures::tx_hash("origin")))
        .is_empty());
}

#[test]
fn remote_original_caller_is_answered_cross_shard() {
    let a = fixtures::address("A");
    let b = fixtures::address("B");
    let u = fixtures::address("U");
    let mut host = staged_host();
    host.blockchain.assign(b, ShardId(1));
    host.blockchain.assign(u, ShardId(2));
    host.metering.gas_left = 4_000;
    host.runtime.vm_input.call_value = vec![9];

    let mut stored = AsyncContext::new();
    stored.set_caller(u);
    stored.set_return_data(b"done@2a".to_vec());
    let mut call = fixtures::pending_call(b, b"inc", 1000, 0);
    call.success_callback = "onInc".to_string();
    stored.add_call(&host, "transfers", call).unwrap();
    stored.save(&mut host).unwrap();

    host.runtime.function = "onInc".to_string();
    host.runtime.vm_input.caller = b;
    host.runtime.vm_input.call_type = CallType::AsynchronousCallBack;
    host.runtime.vm_input.arguments = vec![vec![0u8]];

    let mut context = AsyncContext::new();
    context.post_process_cross_shard_callback(&mut host).unwrap();

    // The original caller lives elsewhere: the context result leaves as a
    // cross-shard callback transfer carrying the remaining gas.
    assert_eq!(host.executor.executed.len(), 0);
    assert_eq!(host.output.transfers.len(), 1);
    let transfer = &host.output.transfers[0];
    assert_eq!(transfer.destination, u);
    assert_eq!(transfer.sender, a);
    assert_eq!(transfer.gas_limit, 4_000);
    assert_eq!(transfer.gas_locked, 0);
    assert_eq!(transfer.value, vec![9]);
    assert_eq!(transfer.data, b"done@2a".to_vec());
    assert_eq!(transfer.call_type, CallType::AsynchronousCallBack);
}

#[test]
fn opaque_return_data_falls_back_to_single_argument() {
    let b = fixtures::address("B");
    let c = fixtures::address("C");
    let mut host = staged_host();
    host.blockchain.assign(b, ShardId(1));

    let mut stored = AsyncContext::new();
    stored.set_caller(c);
    // Starts with '@': the parser rejects it, so the callback receives
    // the raw bytes as one argument.
    stored.set_return_data(b"@raw-bytes".to_vec());
    let mut call = fixtures::pending_call(b, b"inc", 1000, 0);
    call.success_callback = "onInc".to_string();
    stored.add_call(&host, "transfers", call).unwrap();
    stored.save(&mut host).unwrap();

    host.runtime.function = "onInc".to_string();
    host.runtime.vm_input.caller = b;
    host.runtime.vm_input.call_type = CallType::AsynchronousCallBack;
    host.runtime.vm_input.arguments = vec![vec![0u8]];
    host.executor.script_ok(c, "callBack", VmOutput::ok_with_gas(0));

    let mut context = AsyncContext::new();
    context.post_process_cross_shard_callback(&mut host).unwrap();

    let callbacks = host.executor.calls_to(c, "callBack");
    assert_eq!(callbacks.len(), 1);
    assert_eq!(
        callbacks[0].vm_input.arguments,
        vec![b"@raw-bytes".to_vec()]
    );
}
