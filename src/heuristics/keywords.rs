use super::{ScanRecord, ScanWarning};
use crate::value::{FieldKind, FieldValue, parse_amount};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// How the value is cut out of a matching line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Last whitespace-delimited token.
    LastToken,
    /// Text after the last colon, trimmed. Whole line if there is none.
    AfterColon,
    /// Text after the colon, or everything after the first token.
    Remainder,
    /// Last token, separators and rupee sign stripped, read as a decimal.
    Amount,
}

impl Capture {
    fn kind(self) -> FieldKind {
        match self {
            Capture::Amount => FieldKind::Amount,
            _ => FieldKind::Text,
        }
    }
}

/// One keyword predicate. A line matches when it contains every keyword.
#[derive(Debug)]
pub struct Rule {
    pub field: &'static str,
    pub keywords: &'static [&'static str],
    pub capture: Capture,
}

impl Rule {
    fn matches(&self, line: &str) -> bool {
        self.keywords.iter().all(|k| line.contains(k))
    }
}

/// Evaluation order is significant: for each line the first rule that
/// matches, whose field is still unset and whose capture is non-empty takes
/// the line. A line holding both "Capital Gain" and "Other Sources"
/// therefore goes to Capital Gains.
pub const RULES: &[Rule] = &[
    Rule {
        field: "PAN",
        keywords: &["PAN"],
        capture: Capture::LastToken,
    },
    Rule {
        field: "Name",
        keywords: &["Name"],
        capture: Capture::Remainder,
    },
    Rule {
        field: "Mobile No",
        keywords: &["Mobile"],
        capture: Capture::LastToken,
    },
    Rule {
        field: "Email",
        keywords: &["Email"],
        capture: Capture::LastToken,
    },
    Rule {
        field: "GST Number",
        keywords: &["GST"],
        capture: Capture::LastToken,
    },
    Rule {
        field: "Date of Incorporation",
        keywords: &["Date of Incorporation"],
        capture: Capture::AfterColon,
    },
    Rule {
        field: "Income from Salaries",
        keywords: &["Income from Salaries"],
        capture: Capture::Amount,
    },
    Rule {
        field: "Income from House Property",
        keywords: &["House Property"],
        capture: Capture::Amount,
    },
    Rule {
        field: "Profits and gains from Business",
        keywords: &["Business", "Profits"],
        capture: Capture::Amount,
    },
    Rule {
        field: "Capital Gains",
        keywords: &["Capital Gain"],
        capture: Capture::Amount,
    },
    Rule {
        field: "Income from Other Sources",
        keywords: &["Other Sources"],
        capture: Capture::Amount,
    },
    Rule {
        field: "Total Exempt Income",
        keywords: &["Total Exempt Income"],
        capture: Capture::Amount,
    },
];

fn last_token(line: &str) -> &str {
    line.split_whitespace().next_back().unwrap_or("")
}

fn after_colon(line: &str) -> &str {
    line.rsplit(':').next().unwrap_or(line).trim()
}

fn remainder(line: &str) -> String {
    if line.contains(':') {
        return after_colon(line).to_string();
    }
    line.split_whitespace().skip(1).collect::<Vec<_>>().join(" ")
}

/// Cut the rule's value out of `line`. Empty text captures yield `None` so the
/// field stays open for a later line.
fn capture(
    rule: &Rule,
    line: &str,
    lineno: usize,
    warnings: &mut Vec<ScanWarning>,
) -> Option<FieldValue> {
    let text = match rule.capture {
        Capture::LastToken => last_token(line).to_string(),
        Capture::AfterColon => after_colon(line).to_string(),
        Capture::Remainder => remainder(line),
        Capture::Amount => {
            let token = last_token(line);
            return Some(match parse_amount(token) {
                Some(n) => FieldValue::Amount(n),
                None => {
                    warn!(
                        field = rule.field,
                        line = lineno,
                        token = %token,
                        "Non-numeric amount, using 0"
                    );
                    warnings.push(ScanWarning {
                        field: rule.field.to_string(),
                        line: lineno,
                        token: token.to_string(),
                    });
                    FieldValue::Amount(0.0)
                }
            });
        }
    };
    if text.is_empty() {
        debug!(field = rule.field, line = lineno, "Empty capture, field left open");
        return None;
    }
    Some(FieldValue::Text(text))
}

pub fn scan(text: &str) -> ScanRecord {
    let mut found: IndexMap<&'static str, FieldValue> = IndexMap::new();
    let mut warnings = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let lineno = idx + 1;
        let Some((field, value)) = RULES
            .iter()
            .filter(|r| !found.contains_key(r.field) && r.matches(line))
            .find_map(|r| capture(r, line, lineno, &mut warnings).map(|v| (r.field, v)))
        else {
            continue;
        };
        debug!(field, line = lineno, value = %value, "Matched");
        found.insert(field, value);
    }

    let mut fields = IndexMap::new();
    let mut unmatched = Vec::new();
    for rule in RULES {
        let value = match found.swap_remove(rule.field) {
            Some(v) => v,
            None => {
                unmatched.push(rule.field.to_string());
                FieldValue::default_for(rule.capture.kind())
            }
        };
        fields.insert(rule.field.to_string(), value);
    }

    ScanRecord {
        fields,
        unmatched,
        warnings,
    }
}
