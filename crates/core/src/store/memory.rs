use super::RecordRepository;
use crate::config::StorageNamespace;
use crate::record::RecordMap;
use crate::{CensusError, CensusResult};
use std::sync::Mutex;

/// In-process repository.
#[derive(Debug)]
pub struct MemoryRepository {
    namespace: StorageNamespace,
    records: Mutex<RecordMap>,
}

impl MemoryRepository {
    pub fn new(namespace: StorageNamespace) -> Self {
        Self {
            namespace,
            records: Mutex::new(RecordMap::new()),
        }
    }
}

impl RecordRepository for MemoryRepository {
    fn namespace(&self) -> StorageNamespace {
        self.namespace
    }

    fn load_all(&self) -> CensusResult<RecordMap> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|e| CensusError::LockPoisoned(e.to_string()))
    }

    fn update(&self, apply: &mut dyn FnMut(&mut RecordMap)) -> CensusResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| CensusError::LockPoisoned(e.to_string()))?;
        apply(&mut records);
        Ok(())
    }
}
