// src/layout.rs

use crate::error::{AppError, LayoutError};
use crate::value::FieldKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::{fs, path::Path};
use tracing::info;

const BUILTIN_ITR3: &str = include_str!("../layouts/itr3.toml");

/// One traversal step: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Index(usize),
    Key(String),
}

/// Ordered steps from the document root to a leaf.
///
/// An empty spec is the placeholder marker: the field has no source data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupSpec(Vec<Step>);

impl LookupSpec {
    #[cfg(test)]
    pub fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn is_empty_marker(&self) -> bool {
        self.0.is_empty()
    }

    /// Name of the last step, if it is a key. Fallback rules are keyed on this.
    pub fn terminal_key(&self) -> Option<&str> {
        match self.0.last() {
            Some(Step::Key(k)) => Some(k),
            _ => None,
        }
    }
}

impl fmt::Display for LookupSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<none>");
        }
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match step {
                Step::Key(k) => f.write_str(k)?,
                Step::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub path: LookupSpec,
}

/// A titled group of fields rendered as one block of rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub title: String,
    pub columns: [String; 2],
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    pub label: String,
    pub path: LookupSpec,
}

/// Fixed label catalogue plus the label → lookup table feeding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationSpec {
    pub title: String,
    pub columns: [String; 2],
    pub labels: Vec<String>,
    #[serde(default)]
    pub mapping: Vec<MappingEntry>,
}

impl ComputationSpec {
    /// Exact-match lookup of a catalogue label in the mapping table.
    pub fn field_for(&self, label: &str) -> Option<FieldDef> {
        self.mapping
            .iter()
            .find(|m| m.label == label)
            .map(|m| FieldDef {
                name: m.label.clone(),
                kind: FieldKind::Amount,
                path: m.path.clone(),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookSpec {
    pub file_name: String,
    pub sheet_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workbooks {
    pub json: WorkbookSpec,
    pub pdf: WorkbookSpec,
}

/// Alternate lookups keyed by the terminal step of a primary path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackTable(IndexMap<String, Vec<LookupSpec>>);

impl FallbackTable {
    /// Fallbacks registered for `spec`, in the order they should be tried.
    pub fn rules_for(&self, spec: &LookupSpec) -> &[LookupSpec] {
        spec.terminal_key()
            .and_then(|k| self.0.get(k))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Field configuration for one form version. Loaded once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub version: u32,
    pub form: String,
    #[serde(default = "default_group_gap")]
    pub group_gap: u32,
    pub workbook: Workbooks,
    pub header: GroupSpec,
    pub filing: GroupSpec,
    pub computation: ComputationSpec,
    #[serde(default)]
    pub fallbacks: FallbackTable,
}

fn default_group_gap() -> u32 {
    2
}

impl Layout {
    /// The ITR-3 layout compiled into the binary.
    pub fn builtin() -> Result<Self, LayoutError> {
        Self::from_toml_str(BUILTIN_ITR3)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let content = fs::read_to_string(&path)?;
        let layout = Self::from_toml_str(&content)?;
        info!(
            path = %path.as_ref().display(),
            form = %layout.form,
            version = layout.version,
            "Loaded custom layout"
        );
        Ok(layout)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, LayoutError> {
        let layout: Layout = toml::from_str(content)?;
        layout.validate()?;
        Ok(layout)
    }

    fn validate(&self) -> Result<(), LayoutError> {
        for group in [&self.header, &self.filing] {
            let mut seen = HashSet::new();
            for field in &group.fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(LayoutError::DuplicateField {
                        group: group.title.clone(),
                        name: field.name.clone(),
                    });
                }
            }
        }

        let mut labels = HashSet::new();
        for label in &self.computation.labels {
            if !labels.insert(label.as_str()) {
                return Err(LayoutError::DuplicateLabel(label.clone()));
            }
        }
        let mut mapped = HashSet::new();
        for m in &self.computation.mapping {
            if !labels.contains(m.label.as_str()) {
                return Err(LayoutError::UnknownLabel(m.label.clone()));
            }
            if !mapped.insert(m.label.as_str()) {
                return Err(LayoutError::DuplicateMapping(m.label.clone()));
            }
        }

        for (key, specs) in &self.fallbacks.0 {
            if specs.iter().any(LookupSpec::is_empty_marker) {
                return Err(LayoutError::EmptyFallback(key.clone()));
            }
        }
        Ok(())
    }
}
