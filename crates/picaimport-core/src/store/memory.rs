// crates/picaimport-core/src/store/memory.rs - In-process record store

use std::collections::BTreeMap;

use super::{RecordStore, StoreError, StoreResult, StoredRecord};
use crate::ppn::Ppn;
use crate::record::PicaRecord;

/// Record store backed by a map, PPNs allocated from a counter
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: BTreeMap<Ppn, PicaRecord>,
    next_serial: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            next_serial: 1,
        }
    }

    /// Seed the store with records keyed by PPN
    pub fn with_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (Ppn, PicaRecord)>,
    {
        let mut store = Self::new();
        for (ppn, record) in records {
            store.insert(ppn, record);
        }
        store
    }

    /// Put a record under a fixed PPN, replacing any record already there
    pub fn insert(&mut self, ppn: Ppn, record: PicaRecord) {
        let stored = record.with_ppn(&ppn);
        self.records.insert(ppn, stored);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, ppn: &Ppn) -> bool {
        self.records.contains_key(ppn)
    }

    fn allocate(&mut self) -> StoreResult<Ppn> {
        loop {
            let candidate = Ppn::from_serial(self.next_serial)?;
            self.next_serial += 1;
            if !self.records.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn create(&mut self, record: &PicaRecord) -> StoreResult<StoredRecord> {
        if record.is_empty() {
            return Err(StoreError::EmptyRecord);
        }

        let ppn = self.allocate()?;
        let stored = record.clone().with_ppn(&ppn);
        self.records.insert(ppn.clone(), stored.clone());
        Ok(StoredRecord::new(ppn, stored))
    }

    fn update(&mut self, ppn: &Ppn, record: &PicaRecord) -> StoreResult<StoredRecord> {
        if record.is_empty() {
            return Err(StoreError::EmptyRecord);
        }

        let slot = self
            .records
            .get_mut(ppn)
            .ok_or_else(|| StoreError::NotFound(ppn.clone()))?;
        *slot = record.clone().with_ppn(ppn);
        Ok(StoredRecord::new(ppn.clone(), slot.clone()))
    }

    fn get(&mut self, ppn: &Ppn) -> StoreResult<StoredRecord> {
        self.records
            .get(ppn)
            .map(|record| StoredRecord::new(ppn.clone(), record.clone()))
            .ok_or_else(|| StoreError::NotFound(ppn.clone()))
    }

    fn delete(&mut self, ppn: &Ppn) -> StoreResult<Ppn> {
        self.records
            .remove(ppn)
            .map(|_| ppn.clone())
            .ok_or_else(|| StoreError::NotFound(ppn.clone()))
    }

    fn describe(&self) -> String {
        "memory store".to_string()
    }
}
