//! Persistence of partially-completed async contexts.
//!
//! A context still holding pending calls when its transaction finishes is
//! serialized under a key derived from the originating transaction hash
//! and reloaded when the reply arrives on this shard. The encoding is
//! canonical SBOR: fixed field order, fixed integer widths, no trailing
//! bytes, so every node derives identical blobs from identical state.

use crate::context::AsyncContext;
use sbor::prelude::*;
use shardvm_core::{VmError, VmHost, ASYNC_DATA_PREFIX};
use shardvm_types::{Address, AsyncCallGroup, Hash};
use tracing::debug;

/// The persisted projection of an [`AsyncContext`].
///
/// Host handles, metering state and the snapshot stack never reach
/// storage; the blob carries exactly the caller, the return data and the
/// registered groups. Decoding rejects unknown fields and trailing bytes.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
struct PersistedAsyncContext {
    caller: Address,
    return_data: Vec<u8>,
    groups: Vec<AsyncCallGroup>,
}

/// Storage key of a persisted context: the async-data domain prefix
/// followed by the hash of the transaction that originated the calls.
pub fn storage_key(prev_tx_hash: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(ASYNC_DATA_PREFIX.len() + Hash::BYTES);
    key.extend_from_slice(ASYNC_DATA_PREFIX);
    key.extend_from_slice(prev_tx_hash.as_bytes());
    key
}

impl AsyncContext {
    /// Persist the context under the originating transaction hash.
    ///
    /// Nothing is written when no groups remain: a complete context needs
    /// no reply bookkeeping.
    pub fn save<H: VmHost>(&self, host: &mut H) -> Result<(), VmError> {
        if self.groups.is_empty() {
            return Ok(());
        }

        let key = storage_key(&host.runtime().vm_input().prev_tx_hash);
        let blob = self.serialize()?;
        debug!(bytes = blob.len(), groups = self.groups.len(), "persisting async context");
        host.storage_mut().set_storage(&key, &blob)
    }

    /// Reload the context persisted for the originating transaction.
    ///
    /// The snapshot stack is left untouched; only caller, return data and
    /// groups are replaced.
    pub fn load<H: VmHost>(&mut self, host: &H) -> Result<(), VmError> {
        let key = storage_key(&host.runtime().vm_input().prev_tx_hash);
        let blob = host.storage().get_storage(&key);
        if blob.is_empty() {
            return Err(VmError::NoStoredContext);
        }

        let persisted = deserialize(&blob)?;
        self.set_caller(persisted.caller);
        self.set_return_data(persisted.return_data);
        self.groups = persisted.groups;
        Ok(())
    }

    /// Delete the persisted context by writing an empty value.
    pub fn delete<H: VmHost>(&self, host: &mut H) -> Result<(), VmError> {
        let key = storage_key(&host.runtime().vm_input().prev_tx_hash);
        host.storage_mut().set_storage(&key, &[])
    }

    fn serialize(&self) -> Result<Vec<u8>, VmError> {
        let persisted = PersistedAsyncContext {
            caller: *self.caller(),
            return_data: self.return_data().to_vec(),
            groups: self.groups.clone(),
        };
        sbor::basic_encode(&persisted)
            .map_err(|err| VmError::StorageFailure(format!("cannot encode async context: {err:?}")))
    }
}

fn deserialize(blob: &[u8]) -> Result<PersistedAsyncContext, VmError> {
    sbor::basic_decode(blob)
        .map_err(|err| VmError::StorageFailure(format!("cannot decode async context: {err:?}")))
}
