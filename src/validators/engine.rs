//! Streaming validator driven by element events
//!
//! [`StreamValidator`] consumes the start, character data and end events of a
//! non-validating XML parser, in document order, and enforces the grammar of
//! one [`Schema`]. The first failure is terminal: it is recorded and returned
//! again for every later event, and no further state is mutated.

use super::context::ValidationContext;
use super::datatypes::{trim, DatatypeKind};
use super::schema::{ElementDescriptor, Region, Schema};
use crate::error::{ErrorCode, ValidationError, ValidationResult};
use std::fmt;
use tracing::{debug, trace};

/// Validator for one document of schema `S`
pub struct StreamValidator<S: Schema> {
    ctx: ValidationContext<S>,
    failure: Option<ValidationError>,
}

impl<S: Schema> StreamValidator<S> {
    /// Create a validator for a fresh document
    pub fn new() -> Self {
        Self {
            ctx: ValidationContext::new(),
            failure: None,
        }
    }

    /// Handle the opening of an element
    pub fn on_start_element(&mut self, name: &str) -> ValidationResult<()> {
        if let Some(ref failure) = self.failure {
            return Err(failure.clone());
        }

        match self.start(name) {
            Ok(()) => {
                trace!(element = name, depth = self.ctx.depth(), "start accepted");
                Ok(())
            }
            Err(err) => self.fail(name, err),
        }
    }

    /// Accumulate character data of the open element.
    ///
    /// Chunks are concatenated in the order received; trimming happens only
    /// when the element closes. Grouping elements keep no text.
    pub fn on_character_data(&mut self, chunk: &str) {
        if self.failure.is_none() && self.declared_datatype() != Some(DatatypeKind::NoContent) {
            self.ctx.append_text(chunk);
        }
    }

    /// Handle the closing of an element with its accumulated text and the
    /// datatype the caller resolved for it
    pub fn on_end_element(
        &mut self,
        name: &str,
        text: &str,
        datatype: DatatypeKind,
    ) -> ValidationResult<()> {
        if let Some(ref failure) = self.failure {
            return Err(failure.clone());
        }

        match self.end(name, text, datatype) {
            Ok(()) => {
                trace!(element = name, depth = self.ctx.depth(), "end accepted");
                Ok(())
            }
            Err(err) => self.fail(name, err),
        }
    }

    /// Close the open element using the text accumulated through
    /// [`on_character_data`](Self::on_character_data) and its declared datatype
    pub fn finish_element(&mut self, name: &str) -> ValidationResult<()> {
        let text = self.ctx.text().to_string();
        let datatype = self.declared_datatype().unwrap_or(DatatypeKind::NoContent);
        self.on_end_element(name, &text, datatype)
    }

    /// Declared content kind of the open element
    pub fn declared_datatype(&self) -> Option<DatatypeKind> {
        self.current_descriptor().map(|d| d.content)
    }

    /// Descriptor of the open element
    pub fn current_descriptor(&self) -> Option<&'static ElementDescriptor<S::Code>> {
        self.ctx.current().and_then(|code| S::table().descriptor(code))
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.ctx.depth()
    }

    /// Occurrences of an element within its current reset scope
    pub fn occurs(&self, code: S::Code) -> u32 {
        self.ctx.occurs(code)
    }

    /// Check if the root element was opened and closed without error
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.ctx.root_closed()
    }

    /// The error that stopped validation, if any
    pub fn failure(&self) -> Option<&ValidationError> {
        self.failure.as_ref()
    }

    /// Read access to the per-document state
    pub fn context(&self) -> &ValidationContext<S> {
        &self.ctx
    }

    /// Slash separated names of the open elements
    pub fn path(&self) -> String {
        let table = S::table();
        let mut path = String::new();
        for code in self.ctx.stack() {
            path.push('/');
            path.push_str(table.descriptor(*code).map_or("?", |d| d.name));
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    /// Forget the current document, including any recorded failure
    pub fn reset(&mut self) {
        self.ctx.clear();
        self.failure = None;
    }

    fn fail(&mut self, name: &str, err: ValidationError) -> ValidationResult<()> {
        debug!(
            element = name,
            code = %err.code,
            path = %self.path(),
            "{}",
            err.message
        );
        self.failure = Some(err.clone());
        Err(err)
    }

    fn start(&mut self, name: &str) -> ValidationResult<()> {
        let table = S::table();
        let root = table.root();

        if name == table.root_name() {
            if !self.ctx.is_empty() || self.ctx.occurs(root) > 0 {
                return Err(ValidationError::unexpected_element(name));
            }
            let resets = table.descriptor(root).map_or(&[][..], |d| d.resets);
            self.ctx.push(root, resets);
            self.ctx.set_region(Region::Document);
            return Ok(());
        }

        let parent = self
            .ctx
            .current()
            .ok_or_else(|| ValidationError::unexpected_element(name))?;

        let descriptor = S::resolve(name, &self.ctx).ok_or_else(|| S::unknown(name))?;

        if descriptor.occurs.is_over(self.ctx.occurs(descriptor.code)) {
            let max = descriptor.occurs.max.unwrap_or(u32::MAX);
            return Err(ValidationError::exceeded_max_occurs(max));
        }

        if !descriptor.allows_parent(parent)
            || !self.ctx.none_occurred(descriptor.followers)
            || !self.ctx.each_once(descriptor.prerequisites)
        {
            return Err(ValidationError::unexpected_element(name));
        }

        S::check_start(descriptor, &self.ctx)?;

        self.ctx.push(descriptor.code, descriptor.resets);
        if let Some(region) = descriptor.enters {
            self.ctx.set_region(region);
        }
        S::enter(descriptor, &mut self.ctx);
        Ok(())
    }

    fn end(&mut self, name: &str, text: &str, datatype: DatatypeKind) -> ValidationResult<()> {
        let table = S::table();
        let code = self
            .ctx
            .current()
            .filter(|code| table.candidates(name).contains(code))
            .ok_or_else(|| ValidationError::unexpected_element(name))?;
        let descriptor = table
            .descriptor(code)
            .ok_or_else(|| ValidationError::unexpected_element(name))?;

        if !self.ctx.each_once(descriptor.mandatory) {
            return Err(ValidationError::new(
                ErrorCode::MissingMandatoryField,
                descriptor.missing_message,
            ));
        }

        if !datatype.is_valid(text) {
            return Err(ValidationError::invalid_data(name));
        }

        if !self.ctx.each_once(descriptor.members) {
            return Err(ValidationError::new(
                ErrorCode::MissingElement,
                descriptor.missing_message,
            ));
        }

        S::check_end(descriptor, trim(text), &self.ctx)?;

        self.ctx.pop();
        if descriptor.enters.is_some() {
            self.ctx.set_region(Region::Document);
        }
        S::leave(descriptor, &mut self.ctx);
        Ok(())
    }
}

impl<S: Schema> Default for StreamValidator<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> fmt::Debug for StreamValidator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamValidator")
            .field("context", &self.ctx)
            .field("failure", &self.failure)
            .finish()
    }
}
