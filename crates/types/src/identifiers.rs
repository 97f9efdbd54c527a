//! Account addresses and shard identifiers.

use sbor::prelude::*;
use std::fmt;

/// A 32-byte smart-contract account address.
///
/// Opaque to the orchestrator: shard placement and code resolution are
/// answered by the blockchain collaborator, never derived from the bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct Address([u8; 32]);

impl Address {
    /// Size of an address in bytes.
    pub const BYTES: usize = 32;

    /// Zero address (all bytes are 0x00).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an address from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create an address from a slice.
    ///
    /// # Panics
    ///
    /// Panics if the slice length is not exactly 32.
    pub fn from_slice(bytes: &[u8]) -> Self {
        assert_eq!(bytes.len(), 32, "Address must be exactly 32 bytes");
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Self(arr)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to bytes array.
    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(self.0);
        write!(f, "Address({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Index of one shard of the chain's address space.
///
/// Contracts in different shards cannot exchange effects synchronously;
/// the classifier compares shard ids to pick an execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct ShardId(pub u32);

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
