//! Row de-identification
//!
//! Applied by the caller to result rows when a decision carries
//! `de_identify = true`. The transform is row-local and idempotent.

use crate::config::DeIdentificationLevel;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Marker written in place of a direct identifier
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Direct identifiers replaced with [`REDACTION_MARKER`] at safe-harbor
pub const DIRECT_IDENTIFIERS: &[&str] = &["name", "address", "phone", "email", "ssn", "mrn"];

const BIRTH_DATE: &str = "birth_date";
const BIRTH_YEAR: &str = "birth_year";
const ZIP_CODE: &str = "zip_code";

/// A result row
pub type Row = Map<String, Value>;

/// De-identification transform for one level
#[derive(Debug, Clone)]
pub struct DeIdentifier {
    level: DeIdentificationLevel,
    additional_identifiers: Vec<String>,
}

impl DeIdentifier {
    /// Create a transform for `level`
    pub fn new(level: DeIdentificationLevel) -> Self {
        Self {
            level,
            additional_identifiers: Vec::new(),
        }
    }

    /// Extra identifiers redacted at expert-determination level
    pub fn with_additional_identifiers(mut self, identifiers: Vec<String>) -> Self {
        self.additional_identifiers = identifiers;
        self
    }

    pub fn level(&self) -> DeIdentificationLevel {
        self.level
    }

    /// De-identify every row
    pub fn de_identify(&self, rows: Vec<Row>) -> Vec<Row> {
        if self.level == DeIdentificationLevel::None {
            return rows;
        }
        rows.into_iter().map(|row| self.de_identify_row(row)).collect()
    }

    /// De-identify a single row
    pub fn de_identify_row(&self, mut row: Row) -> Row {
        if self.level == DeIdentificationLevel::None {
            return row;
        }

        if let Some(birth_date) = row.remove(BIRTH_DATE) {
            let year = birth_year(&birth_date).map_or(Value::Null, Value::from);
            row.insert(BIRTH_YEAR.to_string(), year);
        }

        if let Some(zip) = row.get_mut(ZIP_CODE) {
            if let Some(truncated) = truncate_zip(zip) {
                *zip = Value::String(truncated);
            }
        }

        for field in DIRECT_IDENTIFIERS {
            redact(&mut row, field);
        }

        if self.level == DeIdentificationLevel::ExpertDetermination {
            for field in &self.additional_identifiers {
                redact(&mut row, field);
            }
        }

        row
    }
}

fn redact(row: &mut Row, field: &str) {
    if let Some(value) = row.get_mut(field) {
        *value = Value::String(REDACTION_MARKER.to_string());
    }
}

/// Calendar year of a stored birth date
///
/// Accepts ISO dates, RFC 3339 timestamps and naive timestamps, falling back
/// to a leading four-digit year.
fn birth_year(value: &Value) -> Option<i32> {
    let text = value.as_str()?.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.year());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.year());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(ts.year());
    }

    let prefix = text.get(..4)?;
    if prefix.chars().all(|c| c.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}

/// Three-digit ZIP prefix padded with "00"
///
/// Numeric ZIPs have lost their leading zeros, so they are left-padded to
/// five digits first.
fn truncate_zip(value: &Value) -> Option<String> {
    let digits: String = match value {
        Value::String(s) => s.chars().filter(char::is_ascii_digit).collect(),
        Value::Number(n) => match n.as_u64() {
            Some(n) => format!("{n:05}"),
            None => n.to_string().chars().filter(char::is_ascii_digit).collect(),
        },
        _ => return None,
    };

    if digits.len() < 3 {
        Some("00000".to_string())
    } else {
        Some(format!("{}00", &digits[..3]))
    }
}
