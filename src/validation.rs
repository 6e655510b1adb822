//! Form field validation shared by every entity kind

use crate::error::{Error, Result};

pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 100;
pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// Rule for one text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Column name, also used in error messages
    pub field: &'static str,
    pub required: bool,
    /// Maximum length in characters
    pub max_len: usize,
}

impl FieldRule {
    pub const fn required(field: &'static str, max_len: usize) -> Self {
        Self {
            field,
            required: true,
            max_len,
        }
    }

    pub const fn optional(field: &'static str, max_len: usize) -> Self {
        Self {
            field,
            required: false,
            max_len,
        }
    }

    /// Validate a value against this rule.
    ///
    /// Returns the value to store: `None` for an absent or blank optional
    /// field, otherwise the value as given.
    pub fn check(&self, value: Option<&str>) -> Result<Option<String>> {
        let blank = value.map_or(true, |v| v.trim().is_empty());
        if blank {
            if self.required {
                return Err(Error::validation(
                    self.field,
                    format!("{} is required", label(self.field)),
                ));
            }
            return Ok(None);
        }

        let value = value.unwrap_or_default();
        if value.chars().count() > self.max_len {
            return Err(Error::validation(
                self.field,
                format!(
                    "{} must be at most {} characters",
                    label(self.field),
                    self.max_len
                ),
            ));
        }
        Ok(Some(value.to_string()))
    }
}

/// Validate a required field and return its value
pub fn validate_required(rule: FieldRule, value: &str) -> Result<String> {
    rule.check(Some(value))?.ok_or_else(|| {
        Error::validation(rule.field, format!("{} is required", label(rule.field)))
    })
}

/// Validate an optional field; blank values become `None`
pub fn validate_optional(rule: FieldRule, value: Option<&str>) -> Result<Option<String>> {
    rule.check(value)
}

fn label(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE: FieldRule = FieldRule::required("title", TITLE_MAX_LEN);
    const DESCRIPTION: FieldRule = FieldRule::optional("description", DESCRIPTION_MAX_LEN);

    #[test]
    fn required_rejects_blank() {
        for value in ["", "   ", "\t\n"] {
            match validate_required(TITLE, value) {
                Err(Error::Validation { field, message }) => {
                    assert_eq!(field, "title");
                    assert_eq!(message, "Title is required");
                }
                other => panic!("Expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn required_keeps_value_untrimmed() {
        assert_eq!(validate_required(TITLE, " Q1 ").unwrap(), " Q1 ");
    }

    #[test]
    fn max_length_counts_chars() {
        let ok = "é".repeat(TITLE_MAX_LEN);
        assert!(validate_required(TITLE, &ok).is_ok());
        let too_long = "a".repeat(TITLE_MAX_LEN + 1);
        assert!(matches!(
            validate_required(TITLE, &too_long),
            Err(Error::Validation { field: "title", .. })
        ));
    }

    #[test]
    fn optional_blank_becomes_none() {
        assert_eq!(validate_optional(DESCRIPTION, None).unwrap(), None);
        assert_eq!(validate_optional(DESCRIPTION, Some("  ")).unwrap(), None);
        assert_eq!(
            validate_optional(DESCRIPTION, Some("notes")).unwrap().as_deref(),
            Some("notes")
        );
        assert!(validate_optional(DESCRIPTION, Some(&"x".repeat(501))).is_err());
    }
}
