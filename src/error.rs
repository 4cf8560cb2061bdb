//! Error types for pwsxml
//!
//! This module defines the closed validation error taxonomy reported to
//! importers, and the crate-level error type used by the document driver.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias using pwsxml Error
pub type Result<T> = std::result::Result<T, Error>;

/// Result of a single validator event
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Main error type for pwsxml operations
#[derive(Error, Debug)]
pub enum Error {
    /// The element stream does not conform to the schema
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Value error (bad option or argument)
    #[error("value error: {0}")]
    Value(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML well-formedness error reported by the streaming reader
    #[error("XML error: {0}")]
    Xml(String),
}

impl Error {
    /// The validation error carried by this error, if any
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Closed taxonomy of validation failures.
///
/// Every failure is terminal for the document being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// An element appeared more often than its maxOccurs allows
    ExceededMaxOccurs,
    /// An element appeared in a place the grammar does not allow
    UnexpectedElement,
    /// A record closed without one of its mandatory fields
    MissingMandatoryField,
    /// A compound element closed without one of its required members
    MissingElement,
    /// Element content does not match its declared datatype
    InvalidData,
    /// The element name is not part of the schema
    UnknownField,
}

impl ErrorCode {
    /// Stable numeric code, as reported to callers that only keep integers
    pub fn code(&self) -> u32 {
        match self {
            ErrorCode::ExceededMaxOccurs => 1,
            ErrorCode::UnexpectedElement => 2,
            ErrorCode::MissingMandatoryField => 3,
            ErrorCode::MissingElement => 4,
            ErrorCode::InvalidData => 5,
            ErrorCode::UnknownField => 6,
        }
    }

    /// Get the code name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ExceededMaxOccurs => "ExceededMaxOccurs",
            ErrorCode::UnexpectedElement => "UnexpectedElement",
            ErrorCode::MissingMandatoryField => "MissingMandatoryField",
            ErrorCode::MissingElement => "MissingElement",
            ErrorCode::InvalidData => "InvalidData",
            ErrorCode::UnknownField => "UnknownField",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failure with its code and the message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Error code from the closed taxonomy
    pub code: ErrorCode,
    /// Error message
    pub message: String,
    /// Path of open elements when the error was raised
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Byte offset in the source document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            position: None,
        }
    }

    /// `Unexpected element: <name>`
    pub fn unexpected_element(name: &str) -> Self {
        Self::new(
            ErrorCode::UnexpectedElement,
            format!("Unexpected element: {}", name),
        )
    }

    /// `Unknown element: <name>`
    pub fn unknown_element(name: &str) -> Self {
        Self::new(ErrorCode::UnknownField, format!("Unknown element: {}", name))
    }

    /// `Unknown field: <name>`
    pub fn unknown_field(name: &str) -> Self {
        Self::new(ErrorCode::UnknownField, format!("Unknown field: {}", name))
    }

    /// `Exceeded MaxOccurs: <n>`
    pub fn exceeded_max_occurs(max: u32) -> Self {
        Self::new(
            ErrorCode::ExceededMaxOccurs,
            format!("Exceeded MaxOccurs: {}", max),
        )
    }

    /// `Invalid data in element: <name>`
    pub fn invalid_data(name: &str) -> Self {
        Self::new(
            ErrorCode::InvalidData,
            format!("Invalid data in element: {}", name),
        )
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the byte offset where validation failed
    pub fn with_position(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        if let Some(position) = self.position {
            write!(f, "\n\nPosition: {}", position)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}
