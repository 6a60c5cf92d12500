use thiserror::Error;

/// A document did not match the shape its entity requires.
///
/// `field` is a dotted path from the document root, e.g.
/// `comments[1].votes.u42.value`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed document: missing required field `{field}`")]
    Missing { field: String },

    #[error("Malformed document: field `{field}` is not {expected}")]
    WrongType { field: String, expected: &'static str },

    #[error("Malformed document: field `{field}` is invalid: {reason}")]
    Invalid { field: String, reason: String },
}

impl DecodeError {
    /// Path of the offending field.
    pub fn field(&self) -> &str {
        match self {
            DecodeError::Missing { field }
            | DecodeError::WrongType { field, .. }
            | DecodeError::Invalid { field, .. } => field,
        }
    }

    /// Re-root the error under a parent field, so nested decode failures
    /// report their full path.
    pub fn nested(self, parent: &str) -> Self {
        let join = |field: String| {
            if field.starts_with('[') {
                format!("{parent}{field}")
            } else {
                format!("{parent}.{field}")
            }
        };
        match self {
            DecodeError::Missing { field } => DecodeError::Missing { field: join(field) },
            DecodeError::WrongType { field, expected } => DecodeError::WrongType {
                field: join(field),
                expected,
            },
            DecodeError::Invalid { field, reason } => DecodeError::Invalid {
                field: join(field),
                reason,
            },
        }
    }
}

/// Errors raised by the comment tree algorithms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Cannot reply at comment level {level}: replies nest at most two levels deep")]
    TooDeep { level: u8 },

    #[error("No node with UUID {uuid} exists in this thread")]
    TargetNotFound { uuid: String },

    #[error("Comment level mismatch: expected {expected}, found {found}")]
    LevelMismatch { expected: u8, found: u8 },

    #[error("Text must be between 1 and {max} characters (got {len})")]
    TextLength { len: usize, max: usize },

    #[error("A vote must be -1, 0 or 1 (got {value})")]
    VoteValue { value: i8 },
}
