//! Import document driver
//!
//! This module feeds a whole XML document through a streaming `quick-xml`
//! reader into a [`StreamValidator`]. It knows nothing about the grammar
//! beyond the attribute checks of [`DocumentSchema`]; element order,
//! occurrence and content are judged by the validator.

use crate::error::{Error, ErrorCode, Result, ValidationError, ValidationResult};
use crate::limits::Limits;
use crate::validators::datatypes::DatatypeKind;
use crate::validators::entries::{EntryElement, EntrySchema};
use crate::validators::filters::{FilterElement, FilterSchema, ACTIVE_VALUES};
use crate::validators::{Schema, StreamValidator};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Field type codes an unknown header or record field may carry
const FIELD_TYPE: DatatypeKind = DatatypeKind::BoundedInteger {
    min: 18,
    max: Some(255),
};

/// Attribute name and unescaped value, in document order
pub type Attributes = Vec<(String, String)>;

/// The import schemas a document can be validated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// Entry/database import, root `passwordsafe`
    Entries,
    /// Saved-filter import, root `filters`
    Filters,
}

impl SchemaKind {
    /// Schema whose root element has the given name
    pub fn from_root(name: &str) -> Option<SchemaKind> {
        if name == EntrySchema::table().root_name() {
            Some(SchemaKind::Entries)
        } else if name == FilterSchema::table().root_name() {
            Some(SchemaKind::Filters)
        } else {
            None
        }
    }

    /// Name used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Entries => "entries",
            SchemaKind::Filters => "filters",
        }
    }

    /// Name of the root element
    pub fn root_name(&self) -> &'static str {
        match self {
            SchemaKind::Entries => EntrySchema::table().root_name(),
            SchemaKind::Filters => FilterSchema::table().root_name(),
        }
    }
}

impl FromStr for SchemaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "entries" | "entry" | "database" => Ok(SchemaKind::Entries),
            "filters" | "filter" => Ok(SchemaKind::Filters),
            _ => Err(Error::Value(format!(
                "Unknown schema: '{}'. Must be 'entries' or 'filters'",
                s
            ))),
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A schema that can be driven from a complete document.
///
/// Adds the checks on attributes, which the element stream of the validator
/// does not carry.
pub trait DocumentSchema: Schema {
    /// Which import this schema describes
    const KIND: SchemaKind;

    /// Check the attributes of an element that has just been accepted
    fn check_attributes(_code: Self::Code, _attributes: &[(String, String)]) -> ValidationResult<()> {
        Ok(())
    }
}

impl DocumentSchema for EntrySchema {
    const KIND: SchemaKind = SchemaKind::Entries;

    fn check_attributes(code: EntryElement, attributes: &[(String, String)]) -> ValidationResult<()> {
        match code {
            EntryElement::Passwordsafe => {
                require_attribute(attributes, "delimiter", DatatypeKind::Character)
            }
            EntryElement::HeaderField | EntryElement::RecordField => {
                require_attribute(attributes, "ftype", FIELD_TYPE)
            }
            _ => Ok(()),
        }
    }
}

impl DocumentSchema for FilterSchema {
    const KIND: SchemaKind = SchemaKind::Filters;

    fn check_attributes(code: FilterElement, attributes: &[(String, String)]) -> ValidationResult<()> {
        match code {
            FilterElement::Filter => require_attribute(attributes, "filtername", DatatypeKind::Text),
            FilterElement::FilterEntry => match attribute(attributes, "active") {
                Some(value) => check_attribute("active", value, DatatypeKind::Enumeration(ACTIVE_VALUES)),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

/// Find an attribute value by name
pub fn attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn require_attribute(
    attributes: &[(String, String)],
    name: &str,
    kind: DatatypeKind,
) -> ValidationResult<()> {
    match attribute(attributes, name) {
        Some(value) => check_attribute(name, value, kind),
        None => Err(ValidationError::new(
            ErrorCode::MissingElement,
            format!("Mandatory {} attribute missing.", name),
        )),
    }
}

fn check_attribute(name: &str, value: &str, kind: DatatypeKind) -> ValidationResult<()> {
    if kind.is_valid(value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            ErrorCode::InvalidData,
            format!("Invalid data in attribute: {}", name),
        ))
    }
}

/// Outcome of validating one document, suitable for JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Whether the document conforms
    pub valid: bool,
    /// Schema the document was checked against, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaKind>,
    /// Error code of a validation failure
    pub code: Option<ErrorCode>,
    /// Message of the failure
    pub message: Option<String>,
    /// Open elements at the point of failure
    pub path: Option<String>,
}

impl ValidationReport {
    /// Build a report from the result of a validation run
    pub fn from_result(schema: Option<SchemaKind>, result: &Result<SchemaKind>) -> Self {
        match result {
            Ok(kind) => Self {
                valid: true,
                schema: Some(*kind),
                code: None,
                message: None,
                path: None,
            },
            Err(Error::Validation(err)) => Self {
                valid: false,
                schema,
                code: Some(err.code),
                message: Some(err.message.clone()),
                path: err.path.clone(),
            },
            Err(err) => Self {
                valid: false,
                schema,
                code: None,
                message: Some(err.to_string()),
                path: None,
            },
        }
    }
}

/// Name of the first element of a document
pub fn root_element(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => return element_name(&e),
            Ok(Event::Eof) => return Err(Error::Xml("Document has no root element".to_string())),
            Err(e) => {
                return Err(Error::Xml(format!(
                    "Error parsing XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }
}

/// Detect the schema of a document from its root element
pub fn detect_schema(xml: &str) -> Result<SchemaKind> {
    let root = root_element(xml)?;
    SchemaKind::from_root(&root)
        .ok_or_else(|| Error::Value(format!("Unrecognised root element: {}", root)))
}

/// Validate a document held in memory against schema `S`
pub fn validate_str<S: DocumentSchema>(xml: &str, limits: &Limits) -> Result<()> {
    limits.check_document_size(xml.len())?;
    validate_reader::<S, _>(xml.as_bytes(), limits)
}

/// Validate a document read from `input` against schema `S`
pub fn validate_reader<S: DocumentSchema, R: BufRead>(input: R, limits: &Limits) -> Result<()> {
    pump::<S, R>(xml_reader(input), limits, None)
}

/// Validate a document read from `input`, detecting the schema from its root
/// element unless one is given
pub fn validate_stream<R: BufRead>(
    input: R,
    schema: Option<SchemaKind>,
    limits: &Limits,
) -> Result<SchemaKind> {
    let mut reader = xml_reader(input);
    let (kind, root) = match schema {
        Some(kind) => (kind, None),
        None => {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let event = next_event(&mut reader, &mut buf)?;
                let position = reader.buffer_position();
                limits.check_document_size(position)?;
                let name = match &event {
                    Event::Start(e) | Event::Empty(e) => Some(element_name(e)?),
                    Event::Eof => return Err(Error::Xml("Document has no root element".to_string())),
                    _ => None,
                };
                if let Some(name) = name {
                    let kind = SchemaKind::from_root(&name)
                        .ok_or_else(|| Error::Value(format!("Unrecognised root element: {}", name)))?;
                    break (kind, Some((event.into_owned(), position)));
                }
            }
        }
    };

    match kind {
        SchemaKind::Entries => pump::<EntrySchema, R>(reader, limits, root)?,
        SchemaKind::Filters => pump::<FilterSchema, R>(reader, limits, root)?,
    }
    Ok(kind)
}

/// Validate a document held in memory, detecting the schema unless one is given
pub fn validate_document(xml: &str, schema: Option<SchemaKind>, limits: &Limits) -> Result<SchemaKind> {
    limits.check_document_size(xml.len())?;
    validate_stream(xml.as_bytes(), schema, limits)
}

/// Validate a document file, detecting the schema unless one is given
pub fn validate_file(
    path: impl AsRef<Path>,
    schema: Option<SchemaKind>,
    limits: &Limits,
) -> Result<SchemaKind> {
    let path = path.as_ref();
    let size = std::fs::metadata(path)?.len();
    limits.check_document_size(usize::try_from(size).unwrap_or(usize::MAX))?;
    validate_stream(BufReader::new(File::open(path)?), schema, limits)
}

fn xml_reader<R: BufRead>(input: R) -> Reader<R> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(false);
    reader
}

fn next_event<'b, R: BufRead>(reader: &mut Reader<R>, buf: &'b mut Vec<u8>) -> Result<Event<'b>> {
    reader.read_event_into(buf).map_err(|e| {
        Error::Xml(format!(
            "Error parsing XML at position {}: {}",
            reader.buffer_position(),
            e
        ))
    })
}

/// Drive the rest of a document through a validator for `S`, starting with
/// an already read root event when schema detection consumed it
fn pump<S: DocumentSchema, R: BufRead>(
    mut reader: Reader<R>,
    limits: &Limits,
    root: Option<(Event<'static>, usize)>,
) -> Result<()> {
    let mut driver = Driver::<S>::new(limits);
    if let Some((event, position)) = root {
        driver.feed(event, position)?;
    }

    let mut buf = Vec::new();
    loop {
        let event = next_event(&mut reader, &mut buf)?;
        let position = reader.buffer_position();
        limits.check_document_size(position)?;
        if matches!(event, Event::Eof) {
            break;
        }
        driver.feed(event, position)?;
        buf.clear();
    }

    let elements = driver.elements;
    driver.finish()?;
    debug!(schema = %S::KIND, elements, "document accepted");
    Ok(())
}

fn element_name(start: &BytesStart) -> Result<String> {
    let name = start.name();
    std::str::from_utf8(name.as_ref())
        .map(str::to_string)
        .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))
}

fn element_attributes(start: &BytesStart) -> Result<Attributes> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(format!("Invalid attribute: {}", e)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
            .to_string();
        attributes.push((key, value));
    }
    Ok(attributes)
}

/// Per-document driver state
struct Driver<'l, S: DocumentSchema> {
    validator: StreamValidator<S>,
    limits: &'l Limits,
    elements: usize,
}

impl<'l, S: DocumentSchema> Driver<'l, S> {
    fn new(limits: &'l Limits) -> Self {
        Self {
            validator: StreamValidator::new(),
            limits,
            elements: 0,
        }
    }

    fn feed(&mut self, event: Event<'_>, position: usize) -> Result<()> {
        match event {
            Event::Start(e) => {
                let name = element_name(&e)?;
                let attributes = element_attributes(&e)?;
                self.start(&name, &attributes, position)
            }
            Event::Empty(e) => {
                let name = element_name(&e)?;
                let attributes = element_attributes(&e)?;
                self.start(&name, &attributes, position)?;
                self.end(&name, position)
            }
            Event::End(e) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
                    .to_string();
                self.end(&name, position)
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                self.text(&text)
            }
            Event::CData(e) => {
                let raw = e.into_inner();
                let text = std::str::from_utf8(&raw)
                    .map_err(|e| Error::Xml(format!("Invalid CDATA section: {}", e)))?;
                self.text(text)
            }
            _ => Ok(()), // Declarations, comments, processing instructions
        }
    }

    fn start(&mut self, name: &str, attributes: &[(String, String)], position: usize) -> Result<()> {
        self.validator
            .on_start_element(name)
            .map_err(|err| self.locate(err, Some(name), position))?;

        if let Some(code) = self.validator.context().current() {
            S::check_attributes(code, attributes).map_err(|err| self.locate(err, None, position))?;
        }

        self.elements += 1;
        self.limits.check_elements(self.elements)?;
        self.limits.check_depth(self.validator.depth())
    }

    fn text(&mut self, chunk: &str) -> Result<()> {
        // grouping elements hold only whitespace between their children
        if self.validator.depth() == 0
            || self.validator.declared_datatype() == Some(DatatypeKind::NoContent)
        {
            return Ok(());
        }
        let length = self.validator.context().text().len() + chunk.len();
        self.limits.check_text_length(length)?;
        self.validator.on_character_data(chunk);
        Ok(())
    }

    fn end(&mut self, name: &str, position: usize) -> Result<()> {
        self.validator
            .finish_element(name)
            .map_err(|err| self.locate(err, None, position))
    }

    fn finish(self) -> Result<()> {
        if self.validator.is_complete() {
            Ok(())
        } else if self.validator.depth() == 0 {
            Err(Error::Xml("Document has no root element".to_string()))
        } else {
            Err(Error::Xml(format!(
                "Unexpected end of document inside {}",
                self.validator.path()
            )))
        }
    }

    /// Attach the element path and byte offset to a validation error
    fn locate(&self, err: ValidationError, name: Option<&str>, position: usize) -> Error {
        let mut path = self.validator.path();
        if let Some(name) = name {
            if !path.ends_with('/') {
                path.push('/');
            }
            path.push_str(name);
        }
        Error::Validation(err.with_path(path).with_position(position as u64))
    }
}
