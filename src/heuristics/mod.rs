// src/heuristics/mod.rs

mod keywords;

use crate::value::FieldValue;
use indexmap::IndexMap;
use serde::Serialize;

pub use keywords::RULES;

/// A numeric field whose token could not be read as a number.
/// The field is still consumed and set to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanWarning {
    pub field: String,
    /// 1-based line number in the extracted text.
    pub line: usize,
    pub token: String,
}

/// Everything the keyword scan pulled out of the PDF text.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRecord {
    /// Every scanned field, in rule order. Unmatched fields hold their default.
    pub fields: IndexMap<String, FieldValue>,
    /// Fields no line matched.
    pub unmatched: Vec<String>,
    pub warnings: Vec<ScanWarning>,
}

impl ScanRecord {
    /// How many fields a line was found for, out of all scanned fields.
    pub fn coverage(&self) -> (usize, usize) {
        let total = self.fields.len();
        (total - self.unmatched.len(), total)
    }
}

/// Scan extracted PDF text line by line with the prioritized keyword rules.
pub fn extract_itr(text: &str) -> ScanRecord {
    keywords::scan(text)
}
