// src/excel.rs

use crate::error::ExportError;
use crate::layout::WorkbookSpec;
use crate::report::Report;
use crate::value::FieldValue;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::{Path, PathBuf};
use tracing::info;

const MIN_LABEL_WIDTH: f64 = 20.0;
const MAX_LABEL_WIDTH: f64 = 90.0;
const VALUE_WIDTH: f64 = 24.0;

/// Write `report` to `<out_dir>/<file_name>` on a single sheet. Returns the saved path.
pub fn write_report(
    report: &Report,
    spec: &WorkbookSpec,
    out_dir: &Path,
) -> Result<PathBuf, ExportError> {
    if !out_dir.is_dir() {
        return Err(ExportError::MissingDir(out_dir.display().to_string()));
    }
    let path = out_dir.join(&spec.file_name);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&spec.sheet_name)?;

    let label_width = report
        .rows()
        .map(|r| r.label.chars().count() as f64 + 2.0)
        .fold(MIN_LABEL_WIDTH, f64::max)
        .min(MAX_LABEL_WIDTH);
    worksheet.set_column_width(0, label_width)?;
    worksheet.set_column_width(1, VALUE_WIDTH)?;

    let caption_format = Format::new().set_bold();

    for group in &report.groups {
        worksheet.write_string_with_format(group.start_row, 0, &group.columns[0], &caption_format)?;
        worksheet.write_string_with_format(group.start_row, 1, &group.columns[1], &caption_format)?;

        for (i, row) in group.rows.iter().enumerate() {
            let r = group.start_row + 1 + i as u32;
            worksheet.write_string(r, 0, &row.label)?;
            write_value(worksheet, r, &row.value)?;
        }
    }

    workbook.save(&path)?;
    info!(
        path = %path.display(),
        sheet = %spec.sheet_name,
        groups = report.groups.len(),
        "Saved workbook"
    );
    Ok(path)
}

/// Text goes in as a string cell, amounts as a number cell.
fn write_value(worksheet: &mut Worksheet, row: u32, value: &FieldValue) -> Result<(), XlsxError> {
    match value {
        FieldValue::Text(s) => worksheet.write_string(row, 1, s).map(|_| ()),
        FieldValue::Amount(n) => worksheet.write_number(row, 1, *n).map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::report::assemble_itr;
    use crate::resolver::FieldResolver;
    use calamine::{Data, Reader, open_workbook_auto};
    use serde_json::json;

    #[test]
    fn test_groups_written_at_their_offsets() {
        let layout = Layout::builtin().unwrap();
        let resolver = FieldResolver::new(&layout.fallbacks);
        let doc = json!({"ITR": {"ITR3": {
            "PartA_GEN1": {"PersonalInfo": {"PAN": "ABCDE1234F"}},
            "PartB-TI": {"Salaries": 1250000}
        }}});
        let report = assemble_itr(
            &layout,
            &resolver.resolve_group(&doc, &layout.header),
            &resolver.resolve_group(&doc, &layout.filing),
            &resolver.resolve_computation(&doc, &layout.computation),
        );

        let dir = tempfile::tempdir().unwrap();
        let path = write_report(&report, &layout.workbook.json, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "ITR3_Computation.xlsx");

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range("Computation").unwrap();

        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Field".into())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("PAN".into())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("ABCDE1234F".into())));

        // Rows between groups stay blank.
        let gap_row = report.groups[0].start_row + report.groups[0].height();
        assert!(!matches!(range.get_value((gap_row, 0)), Some(Data::String(_))));

        let comp = &report.groups[2];
        assert_eq!(
            range.get_value((comp.start_row, 0)),
            Some(&Data::String("Particulars".into()))
        );
        assert_eq!(
            range.get_value((comp.start_row + 1, 0)),
            Some(&Data::String("B1 - Salaries".into()))
        );
        assert_eq!(range.get_value((comp.start_row + 1, 1)), Some(&Data::Float(0.0)));
        assert_eq!(range.get_value((comp.start_row + 2, 1)), Some(&Data::Float(1250000.0)));
    }

    #[test]
    fn test_missing_output_dir_rejected() {
        let layout = Layout::builtin().unwrap();
        let report = crate::report::assemble_scan(&layout, &crate::heuristics::extract_itr(""));
        let err = write_report(
            &report,
            &layout.workbook.pdf,
            Path::new("/definitely/not/a/real/dir"),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::MissingDir(_)));
    }
}
