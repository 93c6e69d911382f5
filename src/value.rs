// src/value.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Plain decimal, optionally signed. Rejects `inf`, `NaN` and exponents,
/// which `f64::from_str` would otherwise accept.
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?(\d+\.?\d*|\.\d+)$").expect("valid decimal regex"));

/// Declared kind of a field. Decides the default and how scalars coerce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Amount,
}

/// A resolved scalar. Text fields always hold `Text`, amount fields `Amount`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Amount(f64),
}

impl FieldValue {
    pub fn default_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => FieldValue::Text(String::new()),
            FieldKind::Amount => FieldValue::Amount(0.0),
        }
    }

    /// Empty string or zero.
    pub fn is_falsy(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Amount(n) => *n == 0.0,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Amount(n) => write!(f, "{}", format_number(*n)),
        }
    }
}

/// Integral values print without a fractional part (`9876543210`, not `9876543210.0`).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Strip thousands separators, rupee signs and whitespace, then parse as a decimal.
///
/// Returns `None` when what remains is not a plain decimal number.
pub fn parse_amount(token: &str) -> Option<f64> {
    let cleaned: String = token
        .chars()
        .filter(|c| *c != ',' && *c != '₹' && !c.is_whitespace())
        .collect();
    if !DECIMAL.is_match(&cleaned) {
        return None;
    }
    cleaned.parse::<f64>().ok()
}
