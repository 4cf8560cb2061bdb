//! Import validators
//!
//! A [`StreamValidator`] checks the element stream of one import document
//! against a table-driven [`Schema`]. Two schemas are provided: the
//! entry/database schema ([`EntrySchema`]) and the saved-filter schema
//! ([`FilterSchema`]).

pub mod context;
pub mod datatypes;
pub mod engine;
pub mod entries;
pub mod filters;
pub mod particles;
pub mod schema;

pub use context::ValidationContext;
pub use datatypes::DatatypeKind;
pub use engine::StreamValidator;
pub use entries::{EntryElement, EntrySchema, EntryValidator};
pub use filters::{FilterElement, FilterSchema, FilterValidator, MatchRule, RuleFamily};
pub use particles::{Occurs, OccursCounter};
pub use schema::{ElementCode, ElementDescriptor, Region, Schema, SchemaTable};
