//! # Census Core
//!
//! Core business logic for the ward bed census.
//!
//! This crate contains the census data model and everything that operates on it:
//! - Bed catalog, patient slots with a nested clinical crib, CUDYR scoring
//! - Pure mutations (old record → new record) and occupancy statistics
//! - Per-day record storage with production and demo namespaces
//! - Remote mirroring with echo suppression, CSV/JSON export, JSON import, demo data
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and `cli`.

pub mod backup;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod constants;
pub mod cudyr;
pub mod demo;
pub mod error;
pub mod export;
pub mod mutations;
pub mod patient;
pub mod record;
pub mod service;
pub mod session;
pub mod statistics;
pub mod store;
pub mod sync;

pub use catalog::{BedCatalog, BedDefinition, BedType};
pub use config::{CensusConfig, StorageNamespace};
pub use error::{CensusError, CensusResult};
pub use mutations::{CensusAction, CensusEditor, Rejection};
pub use patient::{Occupant, PatientData};
pub use record::{DailyRecord, RecordMap};
pub use service::{CensusService, Commit, DemoPeriod, Notification};
pub use session::{DaySession, DayState};
pub use statistics::{compute_statistics, Statistics};
pub use store::{JsonFileRepository, MemoryRepository, NurseRosterStore, RecordRepository};
pub use sync::{InMemoryRemote, RemoteStore, SyncStatus};
