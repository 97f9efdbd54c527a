//! Gas planning for registered async calls.
//!
//! Two jobs: reserve the fixed fees when a call is registered, and split
//! the remaining budget among the registered calls at the start of each
//! executor phase. Planning is deterministic and position-independent for
//! calls that requested a specific amount; zero-gas calls receive an
//! identical share, with the integer-division remainder forfeited.

use crate::AsyncContext;
use shardvm_core::{VmError, VmHost};

/// Reserve the per-call fees for a new async call.
///
/// Charges the async-step fee, then decides whether to lock callback gas:
/// static mode locks unconditionally, dynamic mode locks only when the
/// current contract declares a callback entry point. Returns the locked
/// amount.
pub(crate) fn prepare_gas_for_async_call<H: VmHost>(host: &mut H) -> Result<u64, VmError> {
    host.metering_mut().use_gas_for_async_step()?;

    let should_lock_gas = if !host.dynamic_gas_locking_enabled() {
        true
    } else {
        host.runtime().has_callback_method()
    };

    if !should_lock_gas {
        return Ok(0);
    }

    let gas_to_lock = host.metering().compute_gas_locked_for_async();
    host.metering_mut().use_gas_bounded(gas_to_lock)?;
    Ok(gas_to_lock)
}

impl AsyncContext {
    /// Assign an effective gas limit to every registered call.
    ///
    /// Calls with an explicit request get exactly that amount. Whatever
    /// remains of the budget is split evenly among the calls that asked
    /// for nothing; the division remainder is silently forfeited so the
    /// split does not depend on call order.
    pub(crate) fn plan_gas<H: VmHost>(&mut self, host: &H) -> Result<(), VmError> {
        let gas_left = host.metering().gas_left();
        let mut gas_needed = 0u64;
        let mut calls_with_zero_gas = 0u64;

        for group in &mut self.groups {
            for call in &mut group.calls {
                gas_needed = gas_needed
                    .checked_add(call.provided_gas)
                    .ok_or(VmError::GasUsageError)?;
                if gas_needed > gas_left {
                    return Err(VmError::NotEnoughGas);
                }

                if call.provided_gas == 0 {
                    calls_with_zero_gas += 1;
                    continue;
                }
                call.gas_limit = call.provided_gas;
            }
        }

        if calls_with_zero_gas == 0 {
            return Ok(());
        }

        if gas_left <= gas_needed {
            return Err(VmError::NotEnoughGas);
        }

        let gas_share = (gas_left - gas_needed) / calls_with_zero_gas;
        for group in &mut self.groups {
            for call in &mut group.calls {
                if call.provided_gas == 0 {
                    call.gas_limit = gas_share;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardvm_test_helpers::{fixtures, TestHost};

    fn context_with_gas_requests(host: &TestHost, requests: &[u64]) -> AsyncContext {
        let mut context = AsyncContext::new();
        for (i, &provided_gas) in requests.iter().enumerate() {
            let destination = fixtures::address(&format!("dest{i}"));
            let call = fixtures::pending_call(destination, b"fn", provided_gas, 0);
            context.add_call(host, "planned", call).unwrap();
        }
        context
    }

    fn planned_limits(context: &AsyncContext) -> Vec<u64> {
        context.groups()[0]
            .calls
            .iter()
            .map(|call| call.gas_limit)
            .collect()
    }

    #[test]
    fn test_leftover_split_evenly_among_zero_gas_calls() {
        let mut host = TestHost::new(fixtures::address("A"));
        host.metering.gas_left = 1800;

        let mut context = context_with_gas_requests(&host, &[0, 0, 300, 0]);
        context.plan_gas(&host).unwrap();

        assert_eq!(planned_limits(&context), vec![500, 500, 300, 500]);
    }

    #[test]
    fn test_assignments_never_exceed_budget() {
        let mut host = TestHost::new(fixtures::address("A"));
        host.metering.gas_left = 1000;

        let mut context = context_with_gas_requests(&host, &[0, 150, 0, 0]);
        context.plan_gas(&host).unwrap();

        // The remainder of (1000 - 150) / 3 is forfeited.
        assert_eq!(planned_limits(&context), vec![283, 150, 283, 283]);
        let total: u64 = planned_limits(&context).iter().sum();
        assert!(total <= host.metering.gas_left);
    }

    #[test]
    fn test_explicit_requests_pass_through() {
        let mut host = TestHost::new(fixtures::address("A"));
        host.metering.gas_left = 1000;

        let mut context = context_with_gas_requests(&host, &[400, 600]);
        context.plan_gas(&host).unwrap();

        assert_eq!(planned_limits(&context), vec![400, 600]);
    }

    #[test]
    fn test_requests_beyond_budget_fail() {
        let mut host = TestHost::new(fixtures::address("A"));
        host.metering.gas_left = 1800;

        let mut context = context_with_gas_requests(&host, &[2000]);
        assert_eq!(context.plan_gas(&host), Err(VmError::NotEnoughGas));
    }

    #[test]
    fn test_zero_gas_calls_need_surplus() {
        let mut host = TestHost::new(fixtures::address("A"));
        host.metering.gas_left = 300;

        // The explicit request exactly consumes the budget; nothing is
        // left for the zero-gas call.
        let mut context = context_with_gas_requests(&host, &[300, 0]);
        assert_eq!(context.plan_gas(&host), Err(VmError::NotEnoughGas));
    }

    #[test]
    fn test_request_sum_overflow_is_gas_usage_error() {
        let mut host = TestHost::new(fixtures::address("A"));
        host.metering.gas_left = u64::MAX;

        let mut context = context_with_gas_requests(&host, &[u64::MAX, 1]);
        assert_eq!(context.plan_gas(&host), Err(VmError::GasUsageError));
    }

    #[test]
    fn test_static_locking_reserves_unconditionally() {
        let mut host = TestHost::new(fixtures::address("A"));
        host.metering.gas_left = 10_000;
        host.dynamic_gas_locking = false;
        host.runtime.has_callback = false;

        let locked = prepare_gas_for_async_call(&mut host).unwrap();
        assert_eq!(locked, 500);
        assert_eq!(host.metering.gas_left, 10_000 - 100 - 500);
    }

    #[test]
    fn test_dynamic_locking_follows_callback_declaration() {
        let mut host = TestHost::new(fixtures::address("A"));
        host.metering.gas_left = 10_000;
        host.dynamic_gas_locking = true;
        host.runtime.has_callback = false;

        let locked = prepare_gas_for_async_call(&mut host).unwrap();
        assert_eq!(locked, 0);
        assert_eq!(host.metering.gas_left, 10_000 - 100);

        host.runtime.has_callback = true;
        let locked = prepare_gas_for_async_call(&mut host).unwrap();
        assert_eq!(locked, 500);
    }

    #[test]
    fn test_reservation_fails_on_exhausted_budget() {
        let mut host = TestHost::new(fixtures::address("A"));
        host.metering.gas_left = 50;

        assert_eq!(
            prepare_gas_for_async_call(&mut host),
            Err(VmError::NotEnoughGas)
        );
    }
}
