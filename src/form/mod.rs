//! Form domain: the three-field card record and its input masking.
//!
//! Every keystroke and every OCR result goes through [`FieldValidator`].
//! Digit fields are normalized silently: non-digits are dropped and
//! over-long input is cut. Length is only enforced as a hard precondition
//! at save time.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Digits in a complete primary identifier (Aadhaar number).
pub const PRIMARY_ID_LEN: usize = 12;

/// Digits in a complete secondary identifier (USC number), strict variant.
pub const SECONDARY_ID_LEN: usize = 13;

/// One input on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    PrimaryId,
    Name,
    SecondaryId,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::PrimaryId, Field::Name, Field::SecondaryId];

    /// Label printed next to the field on the card form.
    pub fn label(self) -> &'static str {
        match self {
            Field::PrimaryId => "ADHAR NUMBER",
            Field::Name => "NAME",
            Field::SecondaryId => "USC NO:",
        }
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aadhaar" | "aadhaar-number" | "primary" | "primary-id" => Ok(Field::PrimaryId),
            "name" => Ok(Field::Name),
            "usc" | "usc-no" | "secondary" | "secondary-id" => Ok(Field::SecondaryId),
            other => Err(format!(
                "Unknown field '{}'. Use 'aadhaar', 'name' or 'usc'.",
                other
            )),
        }
    }
}

/// The identity-card fields being entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub primary_id: String,
    pub name: String,
    pub secondary_id: String,
}

impl FormRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::PrimaryId => &self.primary_id,
            Field::Name => &self.name,
            Field::SecondaryId => &self.secondary_id,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::PrimaryId => &mut self.primary_id,
            Field::Name => &mut self.name,
            Field::SecondaryId => &mut self.secondary_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary_id.is_empty() && self.name.is_empty() && self.secondary_id.is_empty()
    }
}

/// Save attempted with an incomplete required field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a valid 12-digit Aadhaar number before saving.")]
    PrimaryIdIncomplete { len: usize },
    #[error("Please enter a valid 13-digit USC NO before saving.")]
    SecondaryIdIncomplete { len: usize },
}

/// Per-field masking rules.
///
/// The strict variant caps the secondary id at 13 digits and requires all
/// 13 before saving; the relaxed variant accepts any number of digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldValidator {
    strict_secondary_id: bool,
}

impl Default for FieldValidator {
    fn default() -> Self {
        Self::strict()
    }
}

impl FieldValidator {
    pub fn new(strict_secondary_id: bool) -> Self {
        Self { strict_secondary_id }
    }

    pub fn strict() -> Self {
        Self::new(true)
    }

    pub fn relaxed() -> Self {
        Self::new(false)
    }

    pub fn is_strict(&self) -> bool {
        self.strict_secondary_id
    }

    /// Normalize raw input for one field. Never fails.
    pub fn normalize(&self, field: Field, raw: &str) -> String {
        match field {
            Field::PrimaryId => digits_only(raw, Some(PRIMARY_ID_LEN)),
            Field::SecondaryId => {
                let limit = self.strict_secondary_id.then_some(SECONDARY_ID_LEN);
                digits_only(raw, limit)
            }
            Field::Name => raw.to_string(),
        }
    }

    /// Return a copy of `current` with `field` replaced by the normalized input.
    pub fn apply(&self, field: Field, raw: &str, current: &FormRecord) -> FormRecord {
        let mut next = current.clone();
        *next.slot_mut(field) = self.normalize(field, raw);
        next
    }

    /// Check the hard length constraints that gate saving.
    ///
    /// The primary id is checked first, so the error names the first
    /// unmet constraint in form order.
    pub fn validate_for_save(&self, record: &FormRecord) -> Result<(), ValidationError> {
        if record.primary_id.len() != PRIMARY_ID_LEN {
            return Err(ValidationError::PrimaryIdIncomplete {
                len: record.primary_id.len(),
            });
        }
        if self.strict_secondary_id && record.secondary_id.len() != SECONDARY_ID_LEN {
            return Err(ValidationError::SecondaryIdIncomplete {
                len: record.secondary_id.len(),
            });
        }
        Ok(())
    }

    pub fn can_save(&self, record: &FormRecord) -> bool {
        self.validate_for_save(record).is_ok()
    }
}

fn digits_only(raw: &str, limit: Option<usize>) -> String {
    let digits = raw.chars().filter(|c| c.is_ascii_digit());
    match limit {
        Some(n) => digits.take(n).collect(),
        None => digits.collect(),
    }
}
