//! `@`-separated call-data parsing.
//!
//! The engine's production parser is a collaborator; tests use the same
//! textual convention: `function@hexarg1@hexarg2`, with a plain-text
//! function name and hex-encoded arguments.

use shardvm_core::{CallDataParser, VmError};

/// Parser of `function@arg@arg` call data with hex-encoded arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtSeparatedParser;

impl CallDataParser for AtSeparatedParser {
    fn parse_data(&self, data: &str) -> Result<(String, Vec<Vec<u8>>), VmError> {
        let mut tokens = data.split('@');
        let function = tokens.next().unwrap_or_default();
        if function.is_empty() {
            return Err(VmError::ParseFailure("empty function name".to_string()));
        }

        let mut arguments = Vec::new();
        for token in tokens {
            let bytes = hex::decode(token)
                .map_err(|_| VmError::ParseFailure(format!("invalid hex argument: {token}")))?;
            arguments.push(bytes);
        }

        Ok((function.to_string(), arguments))
    }
}
