//! Nurse slots on the daily record.

use super::{CensusEditor, Outcome, Rejection};
use crate::constants::NURSE_SLOTS;
use crate::record::DailyRecord;

impl CensusEditor {
    /// Assign `name` to nurse slot `index`. A malformed slot list is reset to empty slots first.
    pub fn update_nurse(&self, record: &DailyRecord, index: usize, name: &str) -> Outcome {
        if index >= NURSE_SLOTS {
            return Err(Rejection::NurseSlot(index));
        }
        let mut next = record.clone();
        if next.nurses.len() != NURSE_SLOTS {
            next.nurses = vec![String::new(); NURSE_SLOTS];
        }
        next.nurses[index] = name.to_string();
        Ok(self.touch(next))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_update_nurse() {
        let editor = editor();
        let record = blank(&editor);
        let next = editor.update_nurse(&record, 1, "Luis").expect("slot 1");
        assert_eq!(next.nurses, vec![String::new(), "Luis".to_string()]);
        assert_eq!(
            editor.update_nurse(&record, 2, "X"),
            Err(Rejection::NurseSlot(2))
        );
    }

    #[test]
    fn test_update_nurse_repairs_slot_list() {
        let editor = editor();
        let mut record = blank(&editor);
        record.nurses = vec!["Solo".into()];
        let next = editor.update_nurse(&record, 0, "Ana").expect("slot 0");
        assert_eq!(next.nurses, vec!["Ana".to_string(), String::new()]);
    }
}
