//! Durable ledger storage using RocksDB
//!
//! Thin key-value layer underneath the ledger store. Multi-key commits go
//! through a single `WriteBatch` so a balance update and its transaction
//! row land together or not at all.

use crate::config::StorageConfig;
use crate::errors::LedgerResult;
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct LedgerStorage {
    db: Arc<DB>,
}

impl LedgerStorage {
    pub fn open(config: &StorageConfig) -> LedgerResult<Self> {
        if config.clear_on_start {
            let _ = DB::destroy(&Options::default(), &config.data_dir);
            info!(data_dir = %config.data_dir, "Cleared ledger database on start");
        }
        Self::open_path(&config.data_dir)
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(16 * 1024 * 1024);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, key: &[u8]) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> LedgerResult<()> {
        Ok(self.db.put(key, value)?)
    }

    /// Commit several writes as one indivisible unit.
    pub fn batch_write<K, V>(&self, items: &[(K, V)]) -> LedgerResult<()>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut batch = WriteBatch::default();
        for (key, value) in items {
            batch.put(key, value);
        }
        Ok(self.db.write(batch)?)
    }

    /// All key/value pairs whose key starts with `prefix`, in key order.
    pub fn scan_prefix(&self, prefix: &[u8]) -> LedgerResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries = Vec::new();
        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}
