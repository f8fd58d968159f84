//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Binaries read the environment; request handling never does, which
//! keeps behaviour consistent across multi-threaded runtimes and test harnesses.

use crate::catalog::BedCatalog;
use crate::constants::{
    DEMO_RECORDS_KEY_SUFFIX, NURSES_KEY_SUFFIX, RECORDS_KEY_SUFFIX, REMOTE_NEWER_THRESHOLD,
    SYNC_DEBOUNCE,
};
use crate::{CensusError, CensusResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which isolated set of records a repository reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageNamespace {
    Production,
    Demo,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CensusConfig {
    data_dir: PathBuf,
    namespace: String,
    echo_window: Duration,
    remote_newer_threshold: Duration,
}

impl CensusConfig {
    /// Create a new `CensusConfig` with the default sync timings.
    pub fn new(data_dir: PathBuf, namespace: impl Into<String>) -> CensusResult<Self> {
        let namespace = namespace.into();
        validate_storage_namespace(&namespace)?;

        Ok(Self {
            data_dir,
            namespace,
            echo_window: SYNC_DEBOUNCE,
            remote_newer_threshold: REMOTE_NEWER_THRESHOLD,
        })
    }

    pub fn with_sync_timings(mut self, echo_window: Duration, remote_newer: Duration) -> Self {
        self.echo_window = echo_window;
        self.remote_newer_threshold = remote_newer;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn echo_window(&self) -> Duration {
        self.echo_window
    }

    pub fn remote_newer_threshold(&self) -> Duration {
        self.remote_newer_threshold
    }

    /// Storage key of the date → record map for the given namespace.
    pub fn records_key(&self, ns: StorageNamespace) -> String {
        let suffix = match ns {
            StorageNamespace::Production => RECORDS_KEY_SUFFIX,
            StorageNamespace::Demo => DEMO_RECORDS_KEY_SUFFIX,
        };
        format!("{}_{}", self.namespace, suffix)
    }

    pub fn nurses_key(&self) -> String {
        format!("{}_{}", self.namespace, NURSES_KEY_SUFFIX)
    }

    /// File holding the JSON blob for a storage key.
    pub fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

/// Validates that a namespace is safe to embed in a storage key and file name.
///
/// - Rejects empty or whitespace-only strings
/// - Bounds the length
/// - Restricts characters to ASCII alphanumerics, `-` and `_`
pub fn validate_storage_namespace(namespace: &str) -> CensusResult<()> {
    const MAX_NAMESPACE_LEN: usize = 64;

    if namespace.trim().is_empty() {
        return Err(CensusError::InvalidInput(
            "namespace cannot be empty".into(),
        ));
    }

    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(CensusError::InvalidInput(format!(
            "namespace exceeds maximum length of {} characters",
            MAX_NAMESPACE_LEN
        )));
    }

    let ok = namespace
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_'));

    if !ok {
        return Err(CensusError::InvalidInput(
            "namespace contains invalid characters (only alphanumeric, '-', '_' allowed)".into(),
        ));
    }

    Ok(())
}

/// Resolve the bed catalog without reading environment variables.
///
/// If `override_path` is provided it must point at a YAML catalog file; otherwise the standard
/// ward catalog is used.
pub fn resolve_bed_catalog(override_path: Option<PathBuf>) -> CensusResult<BedCatalog> {
    match override_path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).map_err(CensusError::FileRead)?;
            let catalog = BedCatalog::from_yaml_str(&raw)?;
            tracing::info!(
                "loaded bed catalog from {} ({} beds)",
                path.display(),
                catalog.all().len()
            );
            Ok(catalog)
        }
        None => Ok(BedCatalog::standard()),
    }
}

/// Parse a boolean flag from an optional environment value.
///
/// Accepts `1`, `true`, `yes` and `on` (case-insensitive); anything else, or no value, is false.
pub fn flag_from_env_value(value: Option<String>) -> bool {
    value
        .map(|v| v.trim().to_ascii_lowercase())
        .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_namespace() {
        let err = CensusConfig::new(PathBuf::from("/tmp"), "  ")
            .expect_err("empty namespace should be rejected");
        assert!(matches!(err, CensusError::InvalidInput(_)));
    }

    #[test]
    fn test_new_rejects_path_characters_in_namespace() {
        let err = CensusConfig::new(PathBuf::from("/tmp"), "../etc")
            .expect_err("path characters should be rejected");
        assert!(matches!(err, CensusError::InvalidInput(_)));
    }

    #[test]
    fn test_storage_keys_follow_namespace() {
        let cfg = CensusConfig::new(PathBuf::from("/data"), "hanga_roa").unwrap();
        assert_eq!(
            cfg.records_key(StorageNamespace::Production),
            "hanga_roa_hospital_data"
        );
        assert_eq!(
            cfg.records_key(StorageNamespace::Demo),
            "hanga_roa_demo_records"
        );
        assert_eq!(cfg.nurses_key(), "hanga_roa_nurses_list");
        assert_eq!(
            cfg.key_path("hanga_roa_hospital_data"),
            PathBuf::from("/data/hanga_roa_hospital_data.json")
        );
    }

    #[test]
    fn test_flag_from_env_value() {
        assert!(flag_from_env_value(Some("TRUE".into())));
        assert!(flag_from_env_value(Some(" 1 ".into())));
        assert!(!flag_from_env_value(Some("no".into())));
        assert!(!flag_from_env_value(None));
    }

    #[test]
    fn test_resolve_bed_catalog_defaults_to_standard() {
        let catalog = resolve_bed_catalog(None).expect("standard catalog");
        assert_eq!(catalog.capacity(), 18);
    }
}
