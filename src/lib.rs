//! # pwsxml
//!
//! Streaming validation of Password Safe XML imports.
//!
//! Two import formats are supported: entry/database files (root
//! `passwordsafe`) and saved-filter files (root `filters`). Each is described
//! by an immutable table of element descriptors; a [`StreamValidator`] walks
//! the element events of one document against that table and stops at the
//! first error.
//!
//! ## Features
//!
//! - Event-level validator usable with any SAX-style parser
//! - Occurrence, parent, ordering and mandatory-member checks
//! - Datatype checks for integers, dates, times, UUIDs, base64 and enumerations
//! - Document driver on top of `quick-xml` with resource limits
//! - Command line front end (feature `cli`)
//!
//! ## Example
//!
//! ```rust
//! use pwsxml::validators::{DatatypeKind, EntryValidator};
//!
//! let mut validator = EntryValidator::new();
//! validator.on_start_element("passwordsafe")?;
//! validator.on_start_element("entry")?;
//! validator.on_start_element("title")?;
//! validator.on_end_element("title", "Mail", DatatypeKind::Text)?;
//! validator.on_start_element("password")?;
//! validator.on_end_element("password", "secret", DatatypeKind::Text)?;
//! validator.on_end_element("entry", "", DatatypeKind::NoContent)?;
//! validator.on_end_element("passwordsafe", "", DatatypeKind::NoContent)?;
//! assert!(validator.is_complete());
//! # Ok::<(), pwsxml::error::ValidationError>(())
//! ```
//!
//! Whole documents go through the driver:
//!
//! ```rust
//! use pwsxml::documents::{validate_document, SchemaKind};
//! use pwsxml::limits::Limits;
//!
//! let xml = r#"<filters><filter filtername="Expired"/></filters>"#;
//! let kind = validate_document(xml, None, &Limits::default())?;
//! assert_eq!(kind, SchemaKind::Filters);
//! # Ok::<(), pwsxml::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;

pub mod validators;

pub mod documents;

// Re-exports for convenience
pub use documents::{validate_document, validate_file, validate_stream, SchemaKind, ValidationReport};
pub use error::{Error, ErrorCode, Result, ValidationError};
pub use validators::{EntryValidator, FilterValidator, StreamValidator};

/// Version of the pwsxml library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
