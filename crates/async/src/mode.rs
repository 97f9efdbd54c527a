//! Execution-mode classification of registered calls.

use shardvm_core::{VmError, VmHost};
use shardvm_types::Address;

/// How a registered async call will be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// The destination lives in the current shard: execute synchronously,
    /// in place.
    Sync,
    /// The destination is remote but the entry point is a protocol
    /// built-in: execute locally, the built-in deposits the cross-shard
    /// effects itself.
    AsyncBuiltinLocal,
    /// A plain cross-shard message.
    AsyncCrossShard,
}

/// Classify a destination call. Never mutates anything.
///
/// Parsing the call data comes first: data the parser cannot read is
/// neither a contract call nor a built-in invocation, and the parser error
/// propagates to the caller.
pub fn determine_execution_mode<H: VmHost>(
    host: &H,
    destination: &Address,
    data: &[u8],
) -> Result<ExecutionMode, VmError> {
    let text = String::from_utf8_lossy(data);
    let (function, _) = host.call_args_parser().parse_data(&text)?;

    let blockchain = host.blockchain();
    let shard_of_sc = blockchain.shard_of_address(host.runtime().sc_address());
    let shard_of_destination = blockchain.shard_of_address(destination);
    if shard_of_sc == shard_of_destination {
        return Ok(ExecutionMode::Sync);
    }

    if host.is_builtin_function(&function) {
        return Ok(ExecutionMode::AsyncBuiltinLocal);
    }

    Ok(ExecutionMode::AsyncCrossShard)
}
