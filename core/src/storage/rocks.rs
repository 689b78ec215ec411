use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

use crate::storage::NoteCache;

const CF_NOTES: &str = "notes";

/// A thread-safe wrapper around RocksDB.
#[derive(Clone)]
pub struct RocksCache {
    db: Arc<DB>,
}

impl RocksCache {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![ColumnFamilyDescriptor::new(CF_NOTES, Options::default())];

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), families)
            .with_context(|| format!("Failed to open RocksDB at {}", path.as_ref().display()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl NoteCache for RocksCache {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self
            .db
            .cf_handle(CF_NOTES)
            .context("Column family 'notes' missing")?;
        Ok(self.db.get_cf(cf, key)?)
    }

    fn put_raw(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        let cf = self
            .db
            .cf_handle(CF_NOTES)
            .context("Column family 'notes' missing")?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    fn delete_raw(&self, key: &[u8]) -> Result<()> {
        let cf = self
            .db
            .cf_handle(CF_NOTES)
            .context("Column family 'notes' missing")?;
        self.db.delete_cf(cf, key)?;
        Ok(())
    }
}
