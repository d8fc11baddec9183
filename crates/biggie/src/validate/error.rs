use std::fmt;

/// Why a property failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `EREQUIRED`: a required property is missing.
    Required,

    /// `ETYPE`: the value could not be cast to the property type.
    Type,

    /// `EVALID`: a validator rejected the value.
    Valid,

    /// `EUNIQUE`: another record already holds the value.
    Unique,
}

/// A validation failure recorded on a model, keyed by property name.
///
/// These never surface as [`crate::Error`]; a rejected save reports them
/// through the model instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: ErrorCode,

    pub property: String,

    /// The type name for `Type`, the validator name for `Valid`.
    pub detail: Option<String>,
}

impl ValidationError {
    pub(crate) fn required(property: &str) -> ValidationError {
        ValidationError {
            code: ErrorCode::Required,
            property: property.to_string(),
            detail: None,
        }
    }

    pub(crate) fn ty(property: &str, ty: &str) -> ValidationError {
        ValidationError {
            code: ErrorCode::Type,
            property: property.to_string(),
            detail: Some(ty.to_string()),
        }
    }

    pub(crate) fn valid(property: &str, validator: &str) -> ValidationError {
        ValidationError {
            code: ErrorCode::Valid,
            property: property.to_string(),
            detail: Some(validator.to_string()),
        }
    }

    pub(crate) fn unique(property: &str) -> ValidationError {
        ValidationError {
            code: ErrorCode::Unique,
            property: property.to_string(),
            detail: None,
        }
    }

    /// The human readable message.
    pub fn message(&self) -> String {
        let detail = self.detail.as_deref().unwrap_or(&self.property);
        match self.code {
            ErrorCode::Required => format!("A {} is required.", self.property),
            ErrorCode::Type => format!("Not a valid {detail}."),
            ErrorCode::Valid => format!("Please specify a valid {detail}."),
            ErrorCode::Unique => format!("This {} has already been taken", self.property),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ValidationError {}
