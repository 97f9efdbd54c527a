//! Contract execution results.

use sbor::prelude::*;
use std::fmt;

/// Outcome code of a contract execution.
///
/// The numeric values and textual forms are stable: the code travels as the
/// first argument of every callback (minimal big-endian bytes) and the text
/// is written into the transaction's finish data on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BasicSbor)]
pub enum ReturnCode {
    /// Execution completed successfully.
    Ok,
    /// The requested entry point does not exist.
    FunctionNotFound,
    /// The entry point exists but its signature cannot be invoked.
    FunctionWrongSignature,
    /// No contract is deployed at the destination.
    ContractNotFound,
    /// The contract signalled an error itself.
    UserError,
    /// The gas budget ran out mid-execution.
    OutOfGas,
    /// The execution failed for any other reason.
    ExecutionFailed,
}

impl ReturnCode {
    /// Numeric form carried on the wire.
    pub fn as_u64(self) -> u64 {
        match self {
            ReturnCode::Ok => 0,
            ReturnCode::FunctionNotFound => 1,
            ReturnCode::FunctionWrongSignature => 2,
            ReturnCode::ContractNotFound => 3,
            ReturnCode::UserError => 4,
            ReturnCode::OutOfGas => 5,
            ReturnCode::ExecutionFailed => 10,
        }
    }

    /// Decode a numeric code; unknown values collapse to `ExecutionFailed`.
    pub fn from_u64(code: u64) -> Self {
        match code {
            0 => ReturnCode::Ok,
            1 => ReturnCode::FunctionNotFound,
            2 => ReturnCode::FunctionWrongSignature,
            3 => ReturnCode::ContractNotFound,
            4 => ReturnCode::UserError,
            5 => ReturnCode::OutOfGas,
            _ => ReturnCode::ExecutionFailed,
        }
    }

    /// Stable textual form written into finish data.
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnCode::Ok => "ok",
            ReturnCode::FunctionNotFound => "function not found",
            ReturnCode::FunctionWrongSignature => "wrong signature for function",
            ReturnCode::ContractNotFound => "contract not found",
            ReturnCode::UserError => "user error",
            ReturnCode::OutOfGas => "out of gas",
            ReturnCode::ExecutionFailed => "execution failed",
        }
    }

    /// Whether this is the success code.
    pub fn is_ok(self) -> bool {
        self == ReturnCode::Ok
    }

    /// Minimal big-endian encoding used as the first callback argument.
    ///
    /// A single `0x00` byte when the code is zero, otherwise the big-endian
    /// bytes with leading zeros stripped.
    pub fn to_callback_bytes(self) -> Vec<u8> {
        let value = self.as_u64();
        if value == 0 {
            return vec![0];
        }
        let bytes = value.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(7);
        bytes[first..].to_vec()
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for ReturnCode {
    fn default() -> Self {
        ReturnCode::Ok
    }
}

/// The output of a contract execution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VmOutput {
    /// Outcome code.
    pub return_code: ReturnCode,
    /// Data items returned by the contract.
    pub return_data: Vec<Vec<u8>>,
    /// Human-readable message accompanying a failure.
    pub return_message: String,
    /// Gas left unconsumed by the execution.
    pub gas_remaining: u64,
}

impl VmOutput {
    /// A successful output with the given remaining gas and no return data.
    pub fn ok_with_gas(gas_remaining: u64) -> Self {
        Self {
            gas_remaining,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_codes_roundtrip() {
        for code in [
            ReturnCode::Ok,
            ReturnCode::FunctionNotFound,
            ReturnCode::FunctionWrongSignature,
            ReturnCode::ContractNotFound,
            ReturnCode::UserError,
            ReturnCode::OutOfGas,
            ReturnCode::ExecutionFailed,
        ] {
            assert_eq!(ReturnCode::from_u64(code.as_u64()), code);
        }
    }

    #[test]
    fn test_unknown_codes_collapse() {
        assert_eq!(ReturnCode::from_u64(6), ReturnCode::ExecutionFailed);
        assert_eq!(ReturnCode::from_u64(u64::MAX), ReturnCode::ExecutionFailed);
    }

    #[test]
    fn test_callback_bytes_are_minimal() {
        assert_eq!(ReturnCode::Ok.to_callback_bytes(), vec![0]);
        assert_eq!(ReturnCode::UserError.to_callback_bytes(), vec![4]);
        assert_eq!(ReturnCode::ExecutionFailed.to_callback_bytes(), vec![10]);
    }
}
