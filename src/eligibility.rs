//! Eligibility list extraction and membership checks.
//!
//! Coordinators upload a spreadsheet of students permitted to apply to a
//! posting. The file decode itself happens upstream; this module receives the
//! decoded 2-D grid (row-major, first row is the header), locates the
//! register-number column and produces the eligibility list.
//!
//! Register numbers are entered inconsistently across institutional
//! spreadsheets (case, stray spaces), so every comparison point must apply
//! the same normalization: trim, then lowercase. `normalize` is that single
//! rule; use it everywhere eligibility is checked.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("sheet has no rows")]
    EmptyInput,
    #[error("no header column containing 'register' was found")]
    ColumnNotFound,
    #[error("register number column contains no values")]
    NoRecordsFound,
}

impl ExtractError {
    pub fn code(&self) -> &'static str {
        match self {
            ExtractError::EmptyInput => "empty_input",
            ExtractError::ColumnNotFound => "column_not_found",
            ExtractError::NoRecordsFound => "no_records_found",
        }
    }
}

/// Canonical register-number normalization: trim then case-fold.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// An extracted eligibility list. Immutable after extraction; holds the raw
/// cell values in sheet order (duplicates permitted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityList {
    raw: Vec<String>,
}

impl EligibilityList {
    /// Wrap an already-extracted list of raw register numbers.
    pub fn from_raw(raw: Vec<String>) -> Self {
        Self { raw }
    }

    /// The ordered raw values as extracted.
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// Membership test under the normalization rule. Empty candidate or
    /// empty list reports false; never an error.
    pub fn is_eligible(&self, candidate: &str) -> bool {
        let needle = normalize(candidate);
        if needle.is_empty() {
            return false;
        }
        self.raw.iter().any(|entry| normalize(entry) == needle)
    }

    /// Number of distinct register numbers after normalization.
    pub fn unique_count(&self) -> usize {
        self.raw
            .iter()
            .map(|entry| normalize(entry))
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Extract the register-number column from a decoded sheet.
///
/// The header row is scanned for the first cell whose lower-cased text
/// contains the substring "register"; each subsequent row contributes its
/// cell at that index when present and non-blank after trimming. Values are
/// kept raw at this stage so the stored list matches the sheet.
pub fn extract_register_column(grid: &[Vec<String>]) -> Result<EligibilityList, ExtractError> {
    let Some(header) = grid.first() else {
        return Err(ExtractError::EmptyInput);
    };
    let col = header
        .iter()
        .position(|cell| cell.to_lowercase().contains("register"))
        .ok_or(ExtractError::ColumnNotFound)?;

    let mut raw: Vec<String> = Vec::new();
    for row in &grid[1..] {
        if let Some(cell) = row.get(col) {
            if !cell.trim().is_empty() {
                raw.push(cell.clone());
            }
        }
    }
    if raw.is_empty() {
        return Err(ExtractError::NoRecordsFound);
    }
    Ok(EligibilityList::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn extracts_raw_values_and_checks_membership_case_insensitively() {
        let g = grid(&[&["Name", "Register Number"], &["Alice", "CS101"], &["Bob", " cs102 "]]);
        let list = extract_register_column(&g).unwrap();
        assert_eq!(list.raw(), &["CS101".to_string(), " cs102 ".to_string()]);
        assert!(list.is_eligible("cs101"));
        assert!(list.is_eligible("CS102"));
        assert!(!list.is_eligible("CS999"));
    }

    #[test]
    fn header_match_is_substring_and_case_folded() {
        let g = grid(&[&["S.No", "REGISTER NO."], &["1", "2021cs001"]]);
        let list = extract_register_column(&g).unwrap();
        assert_eq!(list.raw(), &["2021cs001".to_string()]);
    }

    #[test]
    fn missing_register_column_is_an_error() {
        let g = grid(&[&["Name", "Roll"], &["Alice", "1"]]);
        assert_eq!(extract_register_column(&g), Err(ExtractError::ColumnNotFound));
    }

    #[test]
    fn empty_grid_and_empty_column_are_distinct_errors() {
        assert_eq!(extract_register_column(&[]), Err(ExtractError::EmptyInput));

        let header_only = grid(&[&["Register Number"]]);
        assert_eq!(extract_register_column(&header_only), Err(ExtractError::NoRecordsFound));

        // Blank and short rows contribute nothing.
        let blanks = grid(&[&["Register Number"], &["   "], &[]]);
        assert_eq!(extract_register_column(&blanks), Err(ExtractError::NoRecordsFound));
    }

    #[test]
    fn duplicates_survive_extraction_but_collapse_in_unique_count() {
        let list = EligibilityList::from_raw(vec!["A1".into(), "a1 ".into(), " A1".into()]);
        assert_eq!(list.raw().len(), 3);
        assert_eq!(list.unique_count(), 1);
    }

    #[test]
    fn empty_candidate_and_empty_list_report_false() {
        let list = EligibilityList::from_raw(vec!["A1".into()]);
        assert!(!list.is_eligible(""));
        assert!(!list.is_eligible("   "));

        let empty = EligibilityList::from_raw(Vec::new());
        assert!(!empty.is_eligible("A1"));
    }
}
