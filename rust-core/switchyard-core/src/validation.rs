//! # Validation
//!
//! Structured validation errors and the validator chain run before an action
//! target is invoked.
//!
//! Rule evaluation is left to [`Validator`] implementations; the chain only
//! consumes their pass/fail outcome and error lists.

use crate::params::BoundParams;
use crate::response::Response;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Error code for categorizing validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Required field is missing
    Required,
    /// Value is invalid type
    InvalidType,
    /// Value is too short
    TooShort,
    /// Value is too long
    TooLong,
    /// Value is below minimum
    TooSmall,
    /// Value is above maximum
    TooLarge,
    /// Value doesn't match pattern
    InvalidFormat,
    /// Value is not unique
    NotUnique,
    /// Value is not in allowed set
    InvalidChoice,
    /// Custom validation failed
    Custom,
}

/// A single validation error for a specific field
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Field name (e.g., "email", "user.address.city")
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl FieldError {
    /// Create a new field error
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }

    /// Create a "required field" error
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("{field} is required");
        Self::new(field, message, ValidationCode::Required)
    }

    /// Create an "invalid type" error
    pub fn invalid_type(field: impl Into<String>, expected: &str) -> Self {
        let field = field.into();
        let message = format!("{field} must be {expected}");
        Self::new(field, message, ValidationCode::InvalidType)
    }

    /// Create a "too short" error
    pub fn too_short(field: impl Into<String>, min: usize) -> Self {
        let field = field.into();
        let message = format!("{field} must be at least {min} characters");
        Self::new(field, message, ValidationCode::TooShort)
    }

    /// Create a "too long" error
    pub fn too_long(field: impl Into<String>, max: usize) -> Self {
        let field = field.into();
        let message = format!("{field} must be at most {max} characters");
        Self::new(field, message, ValidationCode::TooLong)
    }
}

/// Collection of validation errors
///
/// Allows aggregating multiple field errors for a single request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    /// List of field-level errors
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field error
    pub fn add(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Add a required field error
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.add(FieldError::required(field));
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Convert to JSON response body
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"errors":[]}"#.to_string())
    }

    /// Append all errors of another collection
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Messages grouped by field
    #[must_use]
    pub fn messages(&self) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for error in &self.errors {
            map.entry(error.field.clone())
                .or_default()
                .push(error.message.clone());
        }
        map
    }

    /// Group errors by field
    #[must_use]
    pub fn by_field(&self) -> HashMap<String, Vec<&FieldError>> {
        let mut map: HashMap<String, Vec<&FieldError>> = HashMap::new();
        for error in &self.errors {
            map.entry(error.field.clone()).or_default().push(error);
        }
        map
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = std::result::Result<T, ValidationErrors>;

/// Validates inbound parameters before an action runs
pub trait Validator: Send + Sync {
    /// Check the bound parameters
    ///
    /// # Errors
    ///
    /// Returns the collected field errors when the data is rejected
    fn validate(&self, data: &BoundParams) -> ValidationResult<()>;

    /// Response sent when this validator rejects a request
    fn response(&self, errors: &ValidationErrors) -> Response {
        Response::json(errors.to_json()).with_status(422)
    }

    /// Validator name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

impl<F> Validator for F
where
    F: Fn(&BoundParams) -> ValidationResult<()> + Send + Sync,
{
    fn validate(&self, data: &BoundParams) -> ValidationResult<()> {
        self(data)
    }
}

/// Outcome of a rejected validation
#[derive(Debug, Clone)]
pub struct ValidationFailed {
    /// Errors of every failing validator, in chain order
    pub errors: ValidationErrors,
    /// Response of the first failing validator
    pub response: Response,
}

/// Ordered validators attached to an action
#[derive(Default, Clone)]
pub struct ValidatorChain {
    validators: Vec<Arc<dyn Validator>>,
}

impl fmt::Debug for ValidatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.validators.iter().map(|v| v.name()))
            .finish()
    }
}

impl ValidatorChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator
    pub fn add<V: Validator + 'static>(&mut self, validator: V) {
        self.validators.push(Arc::new(validator));
    }

    /// Append a shared validator
    pub fn add_shared(&mut self, validator: Arc<dyn Validator>) {
        self.validators.push(validator);
    }

    /// Number of validators
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check if the chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run every validator against `data`
    ///
    /// Passes only if all validators pass. All validators run even after a
    /// failure so the error report is complete.
    ///
    /// # Errors
    ///
    /// Returns the merged errors and the first failing validator's response
    pub fn validate(&self, data: &BoundParams) -> std::result::Result<(), ValidationFailed> {
        let mut errors = ValidationErrors::new();
        let mut first_failed: Option<&Arc<dyn Validator>> = None;

        for validator in &self.validators {
            if let Err(rejected) = validator.validate(data) {
                debug!(validator = validator.name(), errors = rejected.len(), "Validator rejected");
                errors.extend(rejected);
                first_failed.get_or_insert(validator);
            }
        }

        match first_failed {
            None => Ok(()),
            Some(validator) => Err(ValidationFailed {
                response: validator.response(&errors),
                errors,
            }),
        }
    }
}
