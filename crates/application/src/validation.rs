//! Structured validation results.

use serde::{Deserialize, Serialize};

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

/// Every rule a command broke. Validation collects them all rather than
/// stopping at the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationFailure>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationFailure {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Records a failure when `condition` does not hold.
    pub fn require(&mut self, condition: bool, field: impl Into<String>, message: impl Into<String>) {
        if !condition {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.0
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|f| f.field == field)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<String> = self
            .0
            .iter()
            .map(|failure| format!("{}: {}", failure.field, failure.message))
            .collect();
        write!(f, "{}", joined.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_collects_all_failures() {
        let mut errors = ValidationErrors::new();
        errors.require(false, "a", "first");
        errors.require(true, "b", "skipped");
        errors.require(false, "c", "second");

        let errors = errors.into_result().unwrap_err();
        assert_eq!(errors.failures().len(), 2);
        assert!(errors.has_field("a"));
        assert!(!errors.has_field("b"));
        assert_eq!(errors.to_string(), "a: first; c: second");
    }
}
