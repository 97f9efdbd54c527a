//! Gas cost parameters consulted by the orchestrator.

/// The fragment of the engine-wide gas schedule the async call machinery
/// charges directly.
///
/// The full schedule lives with the metering collaborator; these three
/// fees are the only ones the orchestrator reads by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSchedule {
    /// Fixed fee charged for every async call step: registration, dispatch
    /// of a cross-shard leg, and callback invocation.
    pub async_call_step_cost: u64,

    /// Gas reserved at registration time so the callback is guaranteed a
    /// budget when the reply arrives.
    pub async_callback_gas_lock: u64,

    /// Per-byte fee for copying call data between contracts.
    pub data_copy_per_byte: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            async_call_step_cost: 100_000,
            async_callback_gas_lock: 4_000_000,
            data_copy_per_byte: 50,
        }
    }
}
