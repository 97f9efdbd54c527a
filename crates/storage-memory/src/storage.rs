//! Ordered in-memory key-value store.

use im::OrdMap;
use shardvm_core::{StorageContext, VmError};

/// In-memory contract storage.
///
/// Keys iterate in byte order and snapshots are cheap structural-sharing
/// clones. Writing an empty value removes the entry, matching the storage
/// contract where empty bytes mean absent.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: OrdMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheap structural-sharing snapshot of the current contents.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StorageContext for MemoryStorage {
    fn set_storage(&mut self, key: &[u8], value: &[u8]) -> Result<(), VmError> {
        if value.is_empty() {
            self.entries.remove(key);
        } else {
            self.entries.insert(key.to_vec(), value.to_vec());
        }
        Ok(())
    }

    fn get_storage(&self, key: &[u8]) -> Vec<u8> {
        self.entries.get(key).cloned().unwrap_or_default()
    }
}
