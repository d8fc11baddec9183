use super::Error;

/// Error when a finder query cannot be planned.
///
/// Raised before any command is sent: unknown properties, range bounds on
/// non-numeric properties, and values that fail to cast to the property
/// type.
#[derive(Debug)]
pub(super) struct InvalidQueryError {
    message: Box<str>,
}

impl std::error::Error for InvalidQueryError {}

impl core::fmt::Display for InvalidQueryError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid query: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidQuery(InvalidQueryError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid query error.
    pub fn is_invalid_query(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::InvalidQuery(_))
    }
}
