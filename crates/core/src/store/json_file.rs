use super::RecordRepository;
use crate::config::{CensusConfig, StorageNamespace};
use crate::record::RecordMap;
use crate::{CensusError, CensusResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File-backed repository: the namespace's whole map in `<data_dir>/<key>.json`.
#[derive(Debug)]
pub struct JsonFileRepository {
    namespace: StorageNamespace,
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRepository {
    pub fn new(cfg: &CensusConfig, namespace: StorageNamespace) -> Self {
        let path = cfg.key_path(&cfg.records_key(namespace));
        Self {
            namespace,
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> CensusResult<RecordMap> {
        if !self.path.exists() {
            return Ok(RecordMap::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(CensusError::FileRead)?;
        if contents.trim().is_empty() {
            return Ok(RecordMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            tracing::error!("corrupt census store {}: {}", self.path.display(), e);
            CensusError::Deserialization(e)
        })
    }

    fn write(&self, records: &RecordMap) -> CensusResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(CensusError::StorageDirCreation)?;
        }
        let json = serde_json::to_string_pretty(records).map_err(CensusError::Serialization)?;
        fs::write(&self.path, json).map_err(CensusError::FileWrite)
    }
}

impl RecordRepository for JsonFileRepository {
    fn namespace(&self) -> StorageNamespace {
        self.namespace
    }

    fn load_all(&self) -> CensusResult<RecordMap> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| CensusError::LockPoisoned(e.to_string()))?;
        self.read()
    }

    fn update(&self, apply: &mut dyn FnMut(&mut RecordMap)) -> CensusResult<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| CensusError::LockPoisoned(e.to_string()))?;
        let mut records = self.read()?;
        apply(&mut records);
        self.write(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BedCatalog;
    use crate::record::DailyRecord;
    use chrono::{NaiveDate, Utc};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> CensusConfig {
        CensusConfig::new(dir.path().join("store"), "test_ward").expect("valid config")
    }

    #[test]
    fn test_missing_file_is_empty_map() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = JsonFileRepository::new(&config(&temp_dir), StorageNamespace::Production);
        assert!(repo.load_all().expect("load").is_empty());
    }

    #[test]
    fn test_save_and_get_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = JsonFileRepository::new(&config(&temp_dir), StorageNamespace::Production);
        let catalog = BedCatalog::standard();
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let mut record = DailyRecord::blank(&catalog, date, Utc::now());
        if let Some(slot) = record.beds.get_mut("R1") {
            slot.main.patient_name = "Juan".into();
        }

        repo.save(&record).expect("save");
        assert!(repo.path().ends_with("test_ward_hospital_data.json"));
        let loaded = repo.get(date).expect("get").expect("record exists");
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_demo_namespace_is_isolated() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = config(&temp_dir);
        let production = JsonFileRepository::new(&cfg, StorageNamespace::Production);
        let demo = JsonFileRepository::new(&cfg, StorageNamespace::Demo);
        let catalog = BedCatalog::standard();
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        demo.save(&DailyRecord::blank(&catalog, date, Utc::now()))
            .expect("save demo");
        assert!(production.get(date).expect("get").is_none());
        assert!(demo.get(date).expect("get").is_some());
        assert!(demo.path().ends_with("test_ward_demo_records.json"));

        demo.clear().expect("clear");
        assert!(demo.load_all().expect("load").is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = config(&temp_dir);
        let repo = JsonFileRepository::new(&cfg, StorageNamespace::Production);
        fs::create_dir_all(cfg.data_dir()).expect("mkdir");
        fs::write(repo.path(), "{not json").expect("write");

        let err = repo.load_all().expect_err("corrupt store");
        assert!(matches!(err, CensusError::Deserialization(_)));
    }
}
