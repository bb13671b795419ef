use crate::extract::Record;
use crate::storage::traits::{ResultStore, StorageResult};
use std::sync::{Mutex, PoisonError};

/// Process-local store, useful when results need not outlive the process
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: Mutex<Option<Vec<Record>>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultStore for MemoryResultStore {
    fn load(&self) -> StorageResult<Option<Vec<Record>>> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.clone().filter(|r| !r.is_empty()))
    }

    fn save(&self, records: &[Record]) -> StorageResult<()> {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = Some(records.to_vec());
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
