//! Card field heuristics for OCR output.
//!
//! Pulls a candidate Aadhaar number and holder name out of raw recognized
//! text. Pure pattern matching: no I/O, same input always gives the same
//! output. Best-effort by nature; another all-caps line of the right shape
//! can be picked up as the name.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Three groups of four digits (single optional whitespace between groups)
/// or a bare run of twelve digits.
///
/// Word boundaries are ASCII-only: Devanagari or accented letters glued to
/// the number by OCR do not hide it.
static PRIMARY_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?-u:\b)[0-9]{4}\s?[0-9]{4}\s?[0-9]{4}(?-u:\b)|(?-u:\b)[0-9]{12}(?-u:\b)",
    )
    .expect("primary id pattern compiles")
});

/// Header and label text printed on every card.
static BOILERPLATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)GOVERNMENT OF INDIA|AADHAAR|ENROLLMENT|UIDAI|DOB|YOB|MALE|FEMALE|ADDRESS")
        .expect("boilerplate pattern compiles")
});

static NAME_LINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z\s]{2,30}$").expect("name pattern compiles"));

static NUMERIC_LINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("numeric pattern compiles"));

/// Candidate field values found in OCR text. Empty string means no match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub primary_id: String,
    pub name: String,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.primary_id.is_empty() && self.name.is_empty()
    }
}

/// Extract both fields from raw OCR text.
pub fn extract(text: &str) -> ExtractedFields {
    ExtractedFields {
        primary_id: extract_primary_id(text),
        name: extract_name(text),
    }
}

/// First 12-digit identifier in the text, internal whitespace removed.
///
/// Tries the grouped `4 4 4` layout printed on cards and a bare run of
/// twelve digits. Returns an empty string when neither occurs.
pub fn extract_primary_id(text: &str) -> String {
    PRIMARY_ID_PATTERN
        .find(text)
        .map(|m| m.as_str().chars().filter(|c| !c.is_whitespace()).collect())
        .unwrap_or_default()
}

/// First all-caps line that is not card boilerplate.
pub fn extract_name(text: &str) -> String {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !BOILERPLATE_PATTERN.is_match(line))
        .find(|line| NAME_LINE_PATTERN.is_match(line) && !NUMERIC_LINE_PATTERN.is_match(line))
        .map(str::to_string)
        .unwrap_or_default()
}
