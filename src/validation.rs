//! Field-level input checks shared by the entity payloads.
//!
//! Inputs arrive as loosely typed drafts (every field optional) and are
//! turned into concrete payloads only when every check passes, so a single
//! request reports all of its field problems at once.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Column widths from the migrations
pub const CODE_LEN: usize = 64;
pub const NAME_LEN: usize = 255;
pub const SHORT_LEN: usize = 32;
pub const JENJANG_LEN: usize = 16;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem; the first message for a field wins
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Required, non-blank text. Returned trimmed.
    pub fn required_text(&mut self, field: &str, label: &str, value: Option<String>) -> Option<String> {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.add(field, format!("{} is required", label));
                None
            }
        }
    }

    /// `required_text` plus the column's VARCHAR limit, counted in characters
    pub fn bounded_text(&mut self, field: &str, label: &str, value: Option<String>, max: usize) -> Option<String> {
        let value = self.required_text(field, label, value)?;
        if self.max_len(field, label, &value, max) {
            Some(value)
        } else {
            None
        }
    }

    /// False (and an error recorded) when `value` is longer than `max`
    pub fn max_len(&mut self, field: &str, label: &str, value: &str, max: usize) -> bool {
        if value.chars().count() > max {
            self.add(field, format!("{} must be at most {} characters", label, max));
            return false;
        }
        true
    }

    pub fn required<T>(&mut self, field: &str, label: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.add(field, format!("{} is required", label));
        }
        value
    }

    pub fn int_range(&mut self, field: &str, label: &str, value: i32, min: i32, max: Option<i32>) {
        if value < min {
            self.add(field, format!("{} must be at least {}", label, min));
        } else if let Some(max) = max {
            if value > max {
                self.add(field, format!("{} must be at most {}", label, max));
            }
        }
    }

    pub fn decimal_range(&mut self, field: &str, label: &str, value: Decimal, min: Decimal, max: Decimal) {
        if value < min || value > max {
            self.add(field, format!("{} must be between {} and {}", label, min, max));
        }
    }

    pub fn one_of(&mut self, field: &str, label: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.add(field, format!("{} must be one of: {}", label, allowed.join(", ")));
        }
    }
}

/// Blank optional text collapses to None
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
