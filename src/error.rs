//! Error surface of the translator.

use thiserror::Error;

/// Result type for translation operations.
pub type TranslateResult<T> = Result<T, TranslateError>;

/// Errors a translation can produce.
///
/// The renderer never fails on structurally valid queries; everything here
/// comes from lifting a source string into the IR, except `NotSupported`,
/// which a renderer also raises for target dialects it does not emit yet.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TranslateError {
    /// The source could not be parsed, a required sub-element is absent, or
    /// a coercion inside lowering failed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The source construct has no OQL mapping.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Blank input.
    #[error("empty query")]
    EmptyQuery,
}

impl TranslateError {
    /// Prefix a clause name onto the message, preserving the kind.
    ///
    /// Reverse translators use this to identify which clause of a statement
    /// failed to lift.
    pub fn in_clause(self, clause: &str) -> TranslateError {
        match self {
            TranslateError::ParseError(msg) => {
                TranslateError::ParseError(format!("{}: {}", clause, msg))
            }
            TranslateError::NotSupported(msg) => {
                TranslateError::NotSupported(format!("{}: {}", clause, msg))
            }
            TranslateError::EmptyQuery => TranslateError::EmptyQuery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = TranslateError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "parse error: unexpected token");
        assert_eq!(TranslateError::EmptyQuery.to_string(), "empty query");
    }

    #[test]
    fn test_clause_prefix() {
        let err = TranslateError::NotSupported("weird shape".into()).in_clause("WHERE");
        assert_eq!(err.to_string(), "not supported: WHERE: weird shape");
    }

    #[test]
    fn test_clause_prefix_keeps_empty_query() {
        assert_eq!(
            TranslateError::EmptyQuery.in_clause("WHERE"),
            TranslateError::EmptyQuery
        );
    }
}
