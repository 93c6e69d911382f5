// src/report.rs

use crate::heuristics::{ScanRecord, ScanWarning};
use crate::layout::{GroupSpec, Layout};
use crate::resolver::Resolved;
use crate::value::{FieldKind, FieldValue};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub label: String,
    pub value: FieldValue,
}

/// A block of rows written under one column-caption row.
#[derive(Debug, Clone, Serialize)]
pub struct RowGroup {
    pub title: String,
    pub columns: [String; 2],
    /// Zero-based sheet row of the caption row.
    pub start_row: u32,
    pub rows: Vec<ReportRow>,
}

impl RowGroup {
    /// Caption row plus data rows.
    pub fn height(&self) -> u32 {
        1 + self.rows.len() as u32
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub form: String,
    pub groups: Vec<RowGroup>,
    /// Fields with a source path that resolved to an empty value.
    pub missing_fields: Vec<String>,
    /// Amounts that were set to zero because their token was not a number.
    pub warnings: Vec<ScanWarning>,
}

impl Report {
    pub fn rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.groups.iter().flat_map(|g| g.rows.iter())
    }
}

/// Stacks row groups top to bottom, `gap` blank rows apart.
pub struct ReportAssembler {
    gap: u32,
    next_row: u32,
    groups: Vec<RowGroup>,
}

impl ReportAssembler {
    pub fn new(gap: u32) -> Self {
        Self {
            gap,
            next_row: 0,
            groups: Vec::new(),
        }
    }

    pub fn push_group(&mut self, title: &str, columns: &[String; 2], rows: Vec<ReportRow>) {
        let group = RowGroup {
            title: title.to_string(),
            columns: columns.clone(),
            start_row: self.next_row,
            rows,
        };
        self.next_row += group.height() + self.gap;
        self.groups.push(group);
    }

    pub fn finish(
        self,
        form: &str,
        missing_fields: Vec<String>,
        warnings: Vec<ScanWarning>,
    ) -> Report {
        Report {
            form: form.to_string(),
            groups: self.groups,
            missing_fields,
            warnings,
        }
    }
}

fn field_rows(group: &GroupSpec, resolved: &IndexMap<String, Resolved>) -> Vec<ReportRow> {
    group
        .fields
        .iter()
        .map(|f| ReportRow {
            label: f.name.clone(),
            value: resolved
                .get(&f.name)
                .map(|r| r.value.clone())
                .unwrap_or_else(|| FieldValue::default_for(f.kind)),
        })
        .collect()
}

/// Header, filing status and computation groups for a resolved ITR document.
///
/// Rows come from the layout, never from the document: every catalogue
/// label appears once, in order, and labels without a resolved value get 0.
pub fn assemble_itr(
    layout: &Layout,
    header: &IndexMap<String, Resolved>,
    filing: &IndexMap<String, Resolved>,
    computation: &IndexMap<String, Resolved>,
) -> Report {
    let header_rows = field_rows(&layout.header, header);
    let filing_rows = field_rows(&layout.filing, filing);

    let computation_rows = layout
        .computation
        .labels
        .iter()
        .map(|label| ReportRow {
            label: label.clone(),
            value: computation
                .get(label)
                .map(|r| r.value.clone())
                .unwrap_or_else(|| FieldValue::default_for(FieldKind::Amount)),
        })
        .collect();

    let missing_fields = layout
        .header
        .fields
        .iter()
        .zip(&header_rows)
        .chain(layout.filing.fields.iter().zip(&filing_rows))
        .filter(|(f, row)| !f.path.is_empty_marker() && row.value.is_falsy())
        .map(|(f, _)| f.name.clone())
        .collect();

    let mut assembler = ReportAssembler::new(layout.group_gap);
    assembler.push_group(&layout.header.title, &layout.header.columns, header_rows);
    assembler.push_group(&layout.filing.title, &layout.filing.columns, filing_rows);
    assembler.push_group(
        &layout.computation.title,
        &layout.computation.columns,
        computation_rows,
    );
    assembler.finish(&layout.form, missing_fields, Vec::new())
}

/// Single group holding the keyword-scan fields in rule order.
pub fn assemble_scan(layout: &Layout, record: &ScanRecord) -> Report {
    let rows = record
        .fields
        .iter()
        .map(|(name, value)| ReportRow {
            label: name.clone(),
            value: value.clone(),
        })
        .collect();

    let mut assembler = ReportAssembler::new(layout.group_gap);
    assembler.push_group(
        "Extracted Fields",
        &["Field".to_string(), "Value".to_string()],
        rows,
    );
    assembler.finish(
        &layout.form,
        record.unmatched.clone(),
        record.warnings.clone(),
    )
}
