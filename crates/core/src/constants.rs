//! Constants used throughout the census core crate.
//!
//! This module contains storage keys, sync timings and domain defaults to ensure
//! consistency across the codebase and make maintenance easier.

use std::time::Duration;

/// Default storage namespace when no explicit namespace is configured.
pub const DEFAULT_NAMESPACE: &str = "hanga_roa";

/// Default directory for census data storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "census_data";

/// Suffix of the storage key holding the production date → record map.
pub const RECORDS_KEY_SUFFIX: &str = "hospital_data";

/// Suffix of the storage key holding the isolated demo date → record map.
pub const DEMO_RECORDS_KEY_SUFFIX: &str = "demo_records";

/// Suffix of the storage key holding the nurse roster.
pub const NURSES_KEY_SUFFIX: &str = "nurses_list";

/// Window after a local write during which an incoming remote copy is treated as its echo.
pub const SYNC_DEBOUNCE: Duration = Duration::from_millis(500);

/// A remote record newer than the local one by more than this always wins.
pub const REMOTE_NEWER_THRESHOLD: Duration = Duration::from_millis(1000);

/// Reason stored when a bed is blocked without an explicit reason.
pub const DEFAULT_BLOCKED_REASON: &str = "Sin especificar";

/// Number of nurse slots on a daily record.
pub const NURSE_SLOTS: usize = 2;

/// Roster returned when no nurse list has been stored yet.
pub const DEFAULT_NURSES: [&str; 2] = ["Enfermero/a 1", "Enfermero/a 2"];

/// Evacuation method for which a flight escort is recorded.
pub const COMMERCIAL_FLIGHT: &str = "Avión comercial";

/// Receiving center value that switches to the free-text "other" field.
pub const OTHER_CENTER: &str = "Otro";

/// Maximum number of validation messages reported for a rejected import.
pub const MAX_IMPORT_ERRORS: usize = 5;

/// Suffix appended to bed ids for clinical crib rows in exports.
pub const CRIB_ROW_ID_SUFFIX: &str = "-C";
