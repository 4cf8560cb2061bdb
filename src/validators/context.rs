//! Per-document validation state

use super::particles::OccursCounter;
use super::schema::{Region, Schema};
use std::fmt;

/// Mutable state for exactly one document.
///
/// Owned by a single validator and mutated only by its start and end
/// handlers; never shared between documents.
pub struct ValidationContext<S: Schema> {
    stack: Vec<S::Code>,
    text: Vec<String>,
    occurs: OccursCounter<S::Code>,
    previous: Option<S::Code>,
    region: Region,
    root_closed: bool,
    state: S::State,
}

impl<S: Schema> ValidationContext<S> {
    /// Create an empty context
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            text: Vec::new(),
            occurs: OccursCounter::new(),
            previous: None,
            region: Region::Document,
            root_closed: false,
            state: S::State::default(),
        }
    }

    /// Currently open element
    pub fn current(&self) -> Option<S::Code> {
        self.stack.last().copied()
    }

    /// Element that was on top of the stack when the last element was opened
    pub fn previous(&self) -> Option<S::Code> {
        self.previous
    }

    /// Open elements, root first
    pub fn stack(&self) -> &[S::Code] {
        &self.stack
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Check if no element is open
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Occurrences of a code within its current reset scope
    pub fn occurs(&self, code: S::Code) -> u32 {
        self.occurs.get(code)
    }

    /// Check that none of the codes has occurred in the current scope
    pub fn none_occurred(&self, codes: &[S::Code]) -> bool {
        self.occurs.all_zero(codes)
    }

    /// Check that every code has occurred exactly once in the current scope
    pub fn each_once(&self, codes: &[S::Code]) -> bool {
        codes.iter().all(|code| self.occurs.get(*code) == 1)
    }

    /// Section of the document being read
    pub fn region(&self) -> Region {
        self.region
    }

    /// Switch to another region
    pub fn set_region(&mut self, region: Region) {
        self.region = region;
    }

    /// Check if the root element has been opened and closed
    pub fn root_closed(&self) -> bool {
        self.root_closed
    }

    /// Schema-specific state
    pub fn state(&self) -> &S::State {
        &self.state
    }

    /// Schema-specific state, mutably
    pub fn state_mut(&mut self) -> &mut S::State {
        &mut self.state
    }

    /// Character data accumulated for the open element
    pub fn text(&self) -> &str {
        self.text.last().map_or("", |t| t.as_str())
    }

    /// Append character data to the open element
    pub fn append_text(&mut self, chunk: &str) {
        if let Some(text) = self.text.last_mut() {
            text.push_str(chunk);
        }
    }

    /// Record a committed start event: zero the scope of `resets`, count the
    /// element and push it
    pub(crate) fn push(&mut self, code: S::Code, resets: &[S::Code]) {
        self.previous = self.current();
        self.occurs.reset_group(resets);
        self.occurs.increment(code);
        self.stack.push(code);
        self.text.push(String::new());
    }

    /// Pop the open element, returning its code and accumulated text
    pub(crate) fn pop(&mut self) -> Option<(S::Code, String)> {
        let code = self.stack.pop()?;
        let text = self.text.pop().unwrap_or_default();
        if self.stack.is_empty() {
            self.root_closed = true;
        }
        Some((code, text))
    }

    /// Discard all state, ready for a fresh document
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl<S: Schema> Default for ValidationContext<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> fmt::Debug for ValidationContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("stack", &self.stack)
            .field("occurs", &self.occurs)
            .field("previous", &self.previous)
            .field("region", &self.region)
            .field("state", &self.state)
            .finish()
    }
}
