//! JSON backup import.
//!
//! A backup is the exported date → record map. Import validates in two passes:
//!
//! 1. Structure: the document must deserialise into a [`RecordMap`]; the first failure is
//!    reported with its JSON path.
//! 2. Field rules on the raw document: date formats, RUT format for RUT documents, CUDYR items
//!    in range and non-empty bed ids. Every violation is collected.
//!
//! Nothing is merged unless both passes succeed.

use crate::constants::MAX_IMPORT_ERRORS;
use crate::record::RecordMap;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

/// Highest CUDYR item value accepted from a backup.
pub const MAX_IMPORTED_CUDYR: u64 = 4;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("backup is not valid JSON: {0}")]
    Malformed(String),
    #[error("backup does not match the census format:\n{}", Shown(.errors))]
    Invalid { errors: Vec<String> },
}

impl ImportError {
    /// The messages shown to the user, capped at five.
    pub fn shown_errors(&self) -> Vec<String> {
        match self {
            ImportError::Malformed(msg) => vec![msg.clone()],
            ImportError::Invalid { errors } => {
                errors.iter().take(MAX_IMPORT_ERRORS).cloned().collect()
            }
        }
    }
}

struct Shown<'a>(&'a [String]);

impl fmt::Display for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Vec<&str> = self
            .0
            .iter()
            .take(MAX_IMPORT_ERRORS)
            .map(String::as_str)
            .collect();
        write!(f, "{}", shown.join("\n"))
    }
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"))
}

fn rut_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2}\.?\d{3}\.?\d{3}-?[\dkK])?$").expect("RUT pattern is valid")
    })
}

/// Whether `rut` is empty or a well-formed Chilean RUT.
pub fn is_valid_rut(rut: &str) -> bool {
    rut.trim().is_empty() || rut_regex().is_match(rut)
}

/// Parse and validate a backup document.
///
/// # Errors
///
/// Returns [`ImportError::Malformed`] if `raw` is not JSON and [`ImportError::Invalid`] with
/// every violation found otherwise.
pub fn parse_backup(raw: &str) -> Result<RecordMap, ImportError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|e| ImportError::Malformed(e.to_string()))?;

    let deserializer = &mut serde_json::Deserializer::from_str(raw);
    let records: RecordMap = serde_path_to_error::deserialize(deserializer).map_err(|e| {
        ImportError::Invalid {
            errors: vec![format!("{}: {}", e.path(), e.inner())],
        }
    })?;

    let errors = field_violations(&document);
    if !errors.is_empty() {
        tracing::warn!("backup rejected with {} violations", errors.len());
        return Err(ImportError::Invalid { errors });
    }
    Ok(records)
}

fn field_violations(document: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    let Some(days) = document.as_object() else {
        return vec!["(root): expected an object keyed by date".into()];
    };

    for (key, day) in days {
        if !date_regex().is_match(key) {
            errors.push(format!("{key}: invalid date key (YYYY-MM-DD)"));
        }
        if let Some(date) = day.get("date").and_then(Value::as_str) {
            if !date_regex().is_match(date) {
                errors.push(format!("{key}.date: invalid date format"));
            }
        }
        if let Some(beds) = day.get("beds").and_then(Value::as_object) {
            for (bed_key, slot) in beds {
                slot_violations(&format!("{key}.beds.{bed_key}"), slot, &mut errors);
            }
        }
        for log in ["discharges", "transfers"] {
            let Some(events) = day.get(log).and_then(Value::as_array) else {
                continue;
            };
            for (i, event) in events.iter().enumerate() {
                event_violations(&format!("{key}.{log}[{i}]"), event, &mut errors);
            }
        }
    }
    errors
}

/// Rules for a discharge or transfer event. Its snapshot is restored into a bed on undo, so it
/// follows the same rules as a live slot.
fn event_violations(path: &str, event: &Value, errors: &mut Vec<String>) {
    let id = event.get("id").and_then(Value::as_str).unwrap_or_default();
    if id.trim().is_empty() {
        errors.push(format!("{path}.id: event id is required"));
    }
    if let Some(snapshot) = event.get("originalData").filter(|d| d.is_object()) {
        slot_violations(&format!("{path}.originalData"), snapshot, errors);
    }
}

fn slot_violations(path: &str, slot: &Value, errors: &mut Vec<String>) {
    occupant_violations(path, slot, errors);
    if let Some(crib) = slot.get("clinicalCrib").filter(|c| c.is_object()) {
        occupant_violations(&format!("{path}.clinicalCrib"), crib, errors);
    }
}

fn occupant_violations(path: &str, occupant: &Value, errors: &mut Vec<String>) {
    let text = |field: &str| occupant.get(field).and_then(Value::as_str).unwrap_or_default();

    if text("bedId").trim().is_empty() {
        errors.push(format!("{path}.bedId: bed id is required"));
    }

    let is_rut_document = matches!(text("documentType"), "" | "RUT");
    if is_rut_document && !is_valid_rut(text("rut")) {
        errors.push(format!("{path}.rut: invalid RUT format"));
    }

    let admission = text("admissionDate");
    if !admission.is_empty() && !date_regex().is_match(admission) {
        errors.push(format!("{path}.admissionDate: invalid date format (YYYY-MM-DD)"));
    }

    if let Some(items) = occupant.get("cudyr").and_then(Value::as_object) {
        for (item, value) in items {
            if value.as_u64().is_some_and(|v| v > MAX_IMPORTED_CUDYR) {
                errors.push(format!(
                    "{path}.cudyr.{item}: must be at most {MAX_IMPORTED_CUDYR}"
                ));
            }
        }
    }
}
