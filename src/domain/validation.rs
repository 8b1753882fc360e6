use std::collections::HashMap;

/// Field-level validation messages keyed by field path (e.g. `exercises[1].default_sets`).
///
/// The first message recorded for a field wins so that the most basic problem
/// (missing value) is not overwritten by a derived one (too long).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.0
    }

    /// Finish a validation pass: `Ok` when nothing was recorded.
    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

/// Input payloads are checked at the HTTP boundary before any domain logic runs.
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

pub(crate) fn check_name(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "This field is required");
    } else if trimmed.chars().count() > max_len {
        errors.add(field, format!("Must be at most {} characters", max_len));
    }
}

pub(crate) fn check_optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: usize,
) {
    if let Some(text) = value {
        if text.chars().count() > max_len {
            errors.add(field, format!("Must be at most {} characters", max_len));
        }
    }
}

pub(crate) fn check_range_i32(errors: &mut FieldErrors, field: &str, value: i32, min: i32, max: i32) {
    if value < min || value > max {
        errors.add(field, format!("Must be between {} and {}", min, max));
    }
}

pub(crate) fn check_weight(errors: &mut FieldErrors, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.add(field, "Must be a non-negative number");
    } else if value > MAX_WEIGHT {
        errors.add(field, format!("Must be at most {}", MAX_WEIGHT));
    }
}

/// Trim and drop empty optional text.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_NOTES_LEN: usize = 1000;
pub const MAX_WEIGHT: f64 = 2000.0;
