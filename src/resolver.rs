// src/resolver.rs

use crate::layout::{ComputationSpec, FallbackTable, FieldDef, GroupSpec, LookupSpec, Step};
use crate::value::{FieldKind, FieldValue, format_number, parse_amount};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Outcome of walking one lookup spec and coercing the leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A scalar of the right kind was found.
    Found(FieldValue),
    /// A step was absent, an index out of range, or the leaf null / empty.
    Missing,
    /// The document had the wrong shape somewhere along the path, or the
    /// leaf was not a scalar the field kind accepts.
    WrongType,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Primary,
    /// Index into the fallback rules registered for the field's terminal step.
    Fallback(usize),
    Default,
    /// Field has no source path at all.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub value: FieldValue,
    pub origin: Origin,
}

impl Resolved {
    fn default_for(kind: FieldKind, origin: Origin) -> Self {
        Self {
            value: FieldValue::default_for(kind),
            origin,
        }
    }
}

/// Walk `spec` from the document root. Never panics on malformed input.
pub fn walk<'a>(doc: &'a Value, spec: &LookupSpec) -> Result<&'a Value, Resolution> {
    let mut current = doc;
    for step in spec.steps() {
        current = match (step, current) {
            (Step::Key(key), Value::Object(map)) => map.get(key).ok_or(Resolution::Missing)?,
            (Step::Index(i), Value::Array(items)) => items.get(*i).ok_or(Resolution::Missing)?,
            _ => return Err(Resolution::WrongType),
        };
    }
    Ok(current)
}

/// Coerce a leaf to `kind`. Only strings and numbers are scalars.
pub fn coerce(leaf: &Value, kind: FieldKind) -> Resolution {
    match (kind, leaf) {
        (_, Value::Null) => Resolution::Missing,
        (FieldKind::Text, Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Resolution::Missing
            } else {
                Resolution::Found(FieldValue::Text(s.to_string()))
            }
        }
        (FieldKind::Text, Value::Number(n)) => {
            let text = match n.as_i64() {
                Some(i) => i.to_string(),
                None => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
            };
            Resolution::Found(FieldValue::Text(text))
        }
        (FieldKind::Amount, Value::Number(n)) => match n.as_f64() {
            Some(f) => Resolution::Found(FieldValue::Amount(f)),
            None => Resolution::WrongType,
        },
        (FieldKind::Amount, Value::String(s)) if s.trim().is_empty() => Resolution::Missing,
        (FieldKind::Amount, Value::String(s)) => match parse_amount(s) {
            Some(f) => Resolution::Found(FieldValue::Amount(f)),
            None => Resolution::WrongType,
        },
        _ => Resolution::WrongType,
    }
}

/// Walk and coerce in one go.
pub fn lookup(doc: &Value, spec: &LookupSpec, kind: FieldKind) -> Resolution {
    match walk(doc, spec) {
        Ok(leaf) => coerce(leaf, kind),
        Err(outcome) => outcome,
    }
}

/// Resolves field definitions against a parsed document, consulting the
/// fallback table when the primary path yields nothing.
pub struct FieldResolver<'a> {
    fallbacks: &'a FallbackTable,
}

impl<'a> FieldResolver<'a> {
    pub fn new(fallbacks: &'a FallbackTable) -> Self {
        Self { fallbacks }
    }

    pub fn resolve(&self, doc: &Value, field: &FieldDef) -> Resolved {
        if field.path.is_empty_marker() {
            return Resolved::default_for(field.kind, Origin::Placeholder);
        }

        let primary = match lookup(doc, &field.path, field.kind) {
            Resolution::Found(value) => {
                return Resolved {
                    value,
                    origin: Origin::Primary,
                };
            }
            other => other,
        };

        for (idx, spec) in self.fallbacks.rules_for(&field.path).iter().enumerate() {
            if let Resolution::Found(value) = lookup(doc, spec, field.kind) {
                debug!(field = %field.name, rule = idx, path = %spec, "Resolved via fallback");
                return Resolved {
                    value,
                    origin: Origin::Fallback(idx),
                };
            }
        }

        debug!(field = %field.name, path = %field.path, outcome = ?primary, "Using default");
        Resolved::default_for(field.kind, Origin::Default)
    }

    /// Resolve every field of a group, keyed by field name in layout order.
    pub fn resolve_group(&self, doc: &Value, group: &GroupSpec) -> IndexMap<String, Resolved> {
        group
            .fields
            .iter()
            .map(|f| (f.name.clone(), self.resolve(doc, f)))
            .collect()
    }

    /// Resolve the computation catalogue labels that have a mapping entry.
    pub fn resolve_computation(
        &self,
        doc: &Value,
        computation: &ComputationSpec,
    ) -> IndexMap<String, Resolved> {
        computation
            .labels
            .iter()
            .filter_map(|label| computation.field_for(label))
            .map(|f| {
                let resolved = self.resolve(doc, &f);
                (f.name, resolved)
            })
            .collect()
    }
}
