use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::storage::NoteCache;

/// Process-local cache. Used by tests and when no disk cache is configured.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NoteCache for MemoryCache {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put_raw(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete_raw(&self, key: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}
