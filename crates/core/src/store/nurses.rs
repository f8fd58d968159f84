use crate::config::CensusConfig;
use crate::constants::DEFAULT_NURSES;
use crate::{CensusError, CensusResult};
use std::fs;
use std::path::PathBuf;

/// Nurse roster: the names offered when filling a record's nurse slots.
#[derive(Clone, Debug)]
pub struct NurseRosterStore {
    path: PathBuf,
}

impl NurseRosterStore {
    pub fn new(cfg: &CensusConfig) -> Self {
        Self {
            path: cfg.key_path(&cfg.nurses_key()),
        }
    }

    /// Stored roster, or the default placeholder names if none was saved.
    pub fn load(&self) -> CensusResult<Vec<String>> {
        if !self.path.exists() {
            return Ok(default_roster());
        }
        let contents = fs::read_to_string(&self.path).map_err(CensusError::FileRead)?;
        serde_json::from_str(&contents).map_err(CensusError::Deserialization)
    }

    pub fn save(&self, nurses: &[String]) -> CensusResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(CensusError::StorageDirCreation)?;
        }
        let json = serde_json::to_string_pretty(nurses).map_err(CensusError::Serialization)?;
        fs::write(&self.path, json).map_err(CensusError::FileWrite)
    }

    pub fn clear(&self) -> CensusResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CensusError::FileWrite(e)),
        }
    }
}

fn default_roster() -> Vec<String> {
    DEFAULT_NURSES.iter().map(|n| n.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roster_defaults_then_persists() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = CensusConfig::new(temp_dir.path().to_path_buf(), "ward").expect("config");
        let store = NurseRosterStore::new(&cfg);

        assert_eq!(store.load().expect("load"), default_roster());

        let roster = vec!["Ana Tuki".to_string(), "Luis Pakarati".to_string()];
        store.save(&roster).expect("save");
        assert_eq!(store.load().expect("load"), roster);
        assert!(temp_dir.path().join("ward_nurses_list.json").is_file());

        store.clear().expect("clear");
        store.clear().expect("clear twice");
        assert_eq!(store.load().expect("load"), default_roster());
    }
}
