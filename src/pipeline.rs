// src/pipeline.rs

use crate::error::AppError;
use crate::excel;
use crate::heuristics;
use crate::layout::Layout;
use crate::pdf_extract::extract_text_from_pdf;
use crate::report::{Report, assemble_itr, assemble_scan};
use crate::resolver::{FieldResolver, Origin, Resolved};
use indexmap::IndexMap;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Json,
    Pdf,
}

/// Short content hash used to tag log lines for one upload.
pub fn source_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hex = format!("{:x}", hasher.finalize());
    hex[..12].to_string()
}

fn count_origin(resolved: &IndexMap<String, Resolved>, pred: impl Fn(Origin) -> bool) -> usize {
    resolved.values().filter(|r| pred(r.origin)).count()
}

/// Parse an ITR JSON document and assemble the computation report.
pub fn process_json(bytes: &[u8], layout: &Layout) -> Result<Report, AppError> {
    let doc: Value = serde_json::from_slice(bytes)?;
    let resolver = FieldResolver::new(&layout.fallbacks);

    let header = resolver.resolve_group(&doc, &layout.header);
    let filing = resolver.resolve_group(&doc, &layout.filing);
    let computation = resolver.resolve_computation(&doc, &layout.computation);

    let is_fallback = |o: Origin| matches!(o, Origin::Fallback(_));
    let is_default = |o: Origin| o == Origin::Default;
    info!(
        header_fallbacks = count_origin(&header, is_fallback),
        filing_fallbacks = count_origin(&filing, is_fallback),
        header_defaults = count_origin(&header, is_default),
        computation_mapped = computation.len(),
        computation_defaults = count_origin(&computation, is_default),
        "Resolved JSON document"
    );

    let report = assemble_itr(layout, &header, &filing, &computation);
    if !report.missing_fields.is_empty() {
        warn!(
            count = report.missing_fields.len(),
            fields = ?report.missing_fields,
            "Missing fields"
        );
    }
    Ok(report)
}

/// Extract PDF text, keyword-scan it and assemble the extracted-fields report.
pub fn process_pdf(bytes: &[u8], layout: &Layout) -> Result<Report, AppError> {
    let text = extract_text_from_pdf(bytes)?;
    let record = heuristics::extract_itr(&text);

    let (filled, total) = record.coverage();
    info!(
        filled,
        total,
        lines = text.lines().count(),
        warnings = record.warnings.len(),
        "Keyword scan result"
    );
    if !record.unmatched.is_empty() {
        warn!(fields = ?record.unmatched, "Missing fields");
    }

    Ok(assemble_scan(layout, &record))
}

/// Process one input file end to end and write its workbook.
///
/// Returns the report and the path of the saved workbook.
pub fn run(
    kind: SourceKind,
    input: &Path,
    layout: &Layout,
    out_dir: &Path,
) -> Result<(Report, PathBuf), Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let span = tracing::info_span!(
        "upload",
        file = %input.display(),
        digest = %source_digest(&bytes)
    );
    let _guard = span.enter();
    info!(bytes = bytes.len(), kind = ?kind, "Processing input");

    let (report, workbook) = match kind {
        SourceKind::Json => (process_json(&bytes, layout)?, &layout.workbook.json),
        SourceKind::Pdf => (process_pdf(&bytes, layout)?, &layout.workbook.pdf),
    };

    let path = excel::write_report(&report, workbook, out_dir)?;
    Ok((report, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_extract::tests::build_pdf;
    use crate::value::FieldValue;

    const ITR_JSON: &str = r#"{
        "ITR": {"ITR3": {
            "Form_ITR3": {"AssessmentYear": "2024"},
            "PartA_GEN1": {"PersonalInfo": {
                "PAN": "ABCDE1234F",
                "GSTIN": "29ABCDE1234F1Z5",
                "AssesseeName": {"FirstName": "Asha", "SurNameOrOrgName": "Rao"}
            }},
            "PartB-TI": {"Salaries": 1250000, "TotalIncome": "12,50,000"}
        }}
    }"#;

    fn row_value(report: &Report, label: &str) -> FieldValue {
        report
            .rows()
            .find(|r| r.label == label)
            .map(|r| r.value.clone())
            .unwrap()
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(source_digest(b"abc"), source_digest(b"abc"));
        assert_ne!(source_digest(b"abc"), source_digest(b"abd"));
        assert_eq!(source_digest(b"abc").len(), 12);
    }

    #[test]
    fn test_process_json() {
        let layout = Layout::builtin().unwrap();
        let report = process_json(ITR_JSON.as_bytes(), &layout).unwrap();

        assert_eq!(row_value(&report, "GST Number"), FieldValue::Text("29ABCDE1234F1Z5".into()));
        assert_eq!(row_value(&report, "Legal Name of Business"), FieldValue::Text("Rao".into()));
        assert_eq!(row_value(&report, "Total Income"), FieldValue::Amount(1250000.0));
        assert!(report.missing_fields.contains(&"Mobile No".to_string()));
    }

    #[test]
    fn test_unparseable_json_is_fatal() {
        let layout = Layout::builtin().unwrap();
        let err = process_json(b"{\"ITR\": ", &layout).unwrap_err();
        assert!(matches!(err, AppError::Json(_)));
    }

    #[test]
    fn test_non_itr_json_gives_defaults() {
        let layout = Layout::builtin().unwrap();
        let report = process_json(b"[1, 2, 3]", &layout).unwrap();
        assert!(report.rows().all(|r| r.value.is_falsy()));
    }

    #[test]
    fn test_process_pdf() {
        let layout = Layout::builtin().unwrap();
        let pdf = build_pdf(&[&[
            "PAN ABCDE1234F",
            "Income from Salaries 1,25,000",
            "Income from Other Sources 4,500",
        ]]);
        let report = process_pdf(&pdf, &layout).unwrap();

        assert_eq!(row_value(&report, "PAN"), FieldValue::Text("ABCDE1234F".into()));
        assert_eq!(row_value(&report, "Income from Salaries"), FieldValue::Amount(125000.0));
        assert_eq!(row_value(&report, "Income from Other Sources"), FieldValue::Amount(4500.0));
    }

    #[test]
    fn test_process_pdf_keeps_amount_warnings() {
        let layout = Layout::builtin().unwrap();
        let pdf = build_pdf(&[&["PAN ABCDE1234F", "Capital Gains NIL"]]);
        let report = process_pdf(&pdf, &layout).unwrap();

        assert_eq!(row_value(&report, "Capital Gains"), FieldValue::Amount(0.0));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].field, "Capital Gains");
        assert_eq!(report.warnings[0].token, "NIL");
    }

    #[test]
    fn test_run_writes_workbook() {
        let layout = Layout::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("itr.json");
        fs::write(&input, ITR_JSON).unwrap();

        let (report, path) = run(SourceKind::Json, &input, &layout, dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(path, dir.path().join("ITR3_Computation.xlsx"));
        assert_eq!(report.groups.len(), 3);
    }

    #[test]
    fn test_run_missing_input_is_fatal() {
        let layout = Layout::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let result = run(SourceKind::Pdf, &dir.path().join("nope.pdf"), &layout, dir.path());
        assert!(result.is_err());
        assert!(!dir.path().join("ITR_Computation_Extracted.xlsx").exists());
    }
}
