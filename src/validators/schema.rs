//! Schema tables and element descriptors
//!
//! A schema is an immutable table of [`ElementDescriptor`]s indexed by a dense
//! element code, plus a name index for O(1) lookup. Both import schemas are
//! described this way and share one validation engine; schema specific rules
//! that do not fit the table are expressed through the hooks of [`Schema`].

use super::context::ValidationContext;
use super::datatypes::DatatypeKind;
use super::particles::Occurs;
use crate::error::{Error, Result, ValidationError, ValidationResult};
use indexmap::IndexMap;
use std::fmt;

/// Dense identifier of an element within one schema
pub trait ElementCode: Copy + Eq + fmt::Debug + 'static {
    /// Number of codes in the schema
    const COUNT: usize;

    /// Position of the code in `0..COUNT`
    fn index(self) -> usize;
}

/// Document region used to disambiguate elements sharing a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    /// Outside any header or record section
    #[default]
    Document,
    /// Inside the unknown header fields section
    Header,
    /// Inside a record
    Entry,
}

/// Static description of one legal element
#[derive(Debug, Clone)]
pub struct ElementDescriptor<C: 'static> {
    /// Element name as it appears in the document
    pub name: &'static str,
    /// Code of the element
    pub code: C,
    /// maxOccurs within the current reset scope
    pub occurs: Occurs,
    /// Declared content kind
    pub content: DatatypeKind,
    /// Legal parents; empty only for the root
    pub parents: &'static [C],
    /// Siblings that must not have occurred yet when this element opens
    pub followers: &'static [C],
    /// Siblings that must have occurred exactly once before this element opens
    pub prerequisites: &'static [C],
    /// Counters zeroed when this element opens
    pub resets: &'static [C],
    /// Region this element is resolved in; None matches any region
    pub region: Option<Region>,
    /// Region entered while this element is open
    pub enters: Option<Region>,
    /// Children that must have occurred when the element closes, checked
    /// before its content
    pub mandatory: &'static [C],
    /// Children that must have occurred exactly once when the element closes
    pub members: &'static [C],
    /// Message reported when `mandatory` or `members` is not satisfied
    pub missing_message: &'static str,
}

impl<C: ElementCode> ElementDescriptor<C> {
    /// Create a descriptor with maxOccurs 1 and no structural constraints
    pub fn new(name: &'static str, code: C, content: DatatypeKind) -> Self {
        Self {
            name,
            code,
            occurs: Occurs::optional(),
            content,
            parents: &[],
            followers: &[],
            prerequisites: &[],
            resets: &[],
            region: None,
            enters: None,
            mandatory: &[],
            members: &[],
            missing_message: "",
        }
    }

    /// Set the maximum occurrence within a reset scope
    pub fn occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Allow any number of occurrences
    pub fn unbounded(self) -> Self {
        self.occurs(Occurs::zero_or_more())
    }

    /// Restrict the elements this one may be opened under
    pub fn parents(mut self, parents: &'static [C]) -> Self {
        self.parents = parents;
        self
    }

    /// Later siblings that must not have been opened yet
    pub fn followers(mut self, followers: &'static [C]) -> Self {
        self.followers = followers;
        self
    }

    /// Earlier siblings that must already have been opened
    pub fn prerequisites(mut self, prerequisites: &'static [C]) -> Self {
        self.prerequisites = prerequisites;
        self
    }

    /// Counters zeroed each time this element opens
    pub fn resets(mut self, resets: &'static [C]) -> Self {
        self.resets = resets;
        self
    }

    /// Region this element belongs to
    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Region entered while this element is open
    pub fn enters(mut self, region: Region) -> Self {
        self.enters = Some(region);
        self
    }

    /// Children that must all be present when this element closes
    pub fn mandatory(mut self, mandatory: &'static [C], message: &'static str) -> Self {
        self.mandatory = mandatory;
        self.missing_message = message;
        self
    }

    /// Children that must each occur exactly once when this element closes
    pub fn members(mut self, members: &'static [C], message: &'static str) -> Self {
        self.members = members;
        self.missing_message = message;
        self
    }

    /// Check if this element may be opened directly under `parent`
    pub fn allows_parent(&self, parent: C) -> bool {
        self.parents.contains(&parent)
    }

    /// Check if this element is resolved in the given region
    pub fn matches_region(&self, region: Region) -> bool {
        self.region.map_or(true, |r| r == region)
    }
}

/// Immutable lookup table for one schema
#[derive(Debug)]
pub struct SchemaTable<C: ElementCode> {
    root: C,
    descriptors: Vec<ElementDescriptor<C>>,
    by_name: IndexMap<&'static str, Vec<C>>,
}

impl<C: ElementCode> SchemaTable<C> {
    /// Build a table; `descriptors` must be ordered by code.
    ///
    /// `aliases` maps alternative names onto an existing code.
    pub fn build(
        root: C,
        descriptors: Vec<ElementDescriptor<C>>,
        aliases: &[(&'static str, C)],
    ) -> Self {
        let mut by_name: IndexMap<&'static str, Vec<C>> = IndexMap::new();
        for descriptor in &descriptors {
            by_name.entry(descriptor.name).or_default().push(descriptor.code);
        }
        for (alias, code) in aliases {
            by_name.entry(*alias).or_default().push(*code);
        }

        Self {
            root,
            descriptors,
            by_name,
        }
    }

    /// Code of the document root
    pub fn root(&self) -> C {
        self.root
    }

    /// Name of the document root
    pub fn root_name(&self) -> &'static str {
        self.descriptor(self.root).map_or("", |d| d.name)
    }

    /// Descriptor for a code
    pub fn descriptor(&self, code: C) -> Option<&ElementDescriptor<C>> {
        self.descriptors.get(code.index())
    }

    /// All codes an element name may resolve to, in declaration order
    pub fn candidates(&self, name: &str) -> &[C] {
        self.by_name.get(name).map_or(&[], |codes| codes.as_slice())
    }

    /// First descriptor with the given name
    pub fn lookup(&self, name: &str) -> Option<&ElementDescriptor<C>> {
        self.candidates(name)
            .first()
            .and_then(|code| self.descriptor(*code))
    }

    /// Check if the name belongs to the schema
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterate over all descriptors in code order
    pub fn iter(&self) -> impl Iterator<Item = &ElementDescriptor<C>> {
        self.descriptors.iter()
    }

    /// Number of declared elements
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if no element is declared
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Verify the structural soundness of the table
    pub fn check_invariants(&self) -> Result<()> {
        if self.descriptors.len() != C::COUNT {
            return Err(Error::Value(format!(
                "schema table has {} descriptors for {} codes",
                self.descriptors.len(),
                C::COUNT
            )));
        }

        for (index, descriptor) in self.descriptors.iter().enumerate() {
            if descriptor.code.index() != index {
                return Err(Error::Value(format!(
                    "descriptor '{}' is out of code order",
                    descriptor.name
                )));
            }
            if descriptor.parents.is_empty() && descriptor.code != self.root {
                return Err(Error::Value(format!(
                    "descriptor '{}' has no parent",
                    descriptor.name
                )));
            }
            if descriptor.occurs.max == Some(0) {
                return Err(Error::Value(format!(
                    "descriptor '{}' can never occur",
                    descriptor.name
                )));
            }
        }

        // A shared name must be told apart by region or by parent
        for (name, codes) in &self.by_name {
            for (i, a) in codes.iter().enumerate() {
                for b in &codes[i + 1..] {
                    if a == b {
                        continue;
                    }
                    let (Some(da), Some(db)) = (self.descriptor(*a), self.descriptor(*b)) else {
                        continue;
                    };
                    let same_region = da.region.is_none() || db.region.is_none() || da.region == db.region;
                    let shared_parent = da.parents.iter().any(|p| db.parents.contains(p));
                    if same_region && shared_parent {
                        return Err(Error::Value(format!(
                            "element name '{}' is ambiguous",
                            name
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// One import schema driven by the shared engine.
///
/// Implementors are unit types; all state lives in the
/// [`ValidationContext`].
pub trait Schema: fmt::Debug + Sized + 'static {
    /// Element codes of the schema
    type Code: ElementCode;

    /// Schema specific per-document state
    type State: Default + fmt::Debug;

    /// The immutable table of the schema
    fn table() -> &'static SchemaTable<Self::Code>;

    /// Error for a name absent from the schema
    fn unknown(name: &str) -> ValidationError;

    /// Resolve a name to the descriptor that applies at the current point of
    /// the document.
    ///
    /// Prefers the candidate declared for the current region, then the one
    /// whose parent is open, and otherwise the first declared.
    fn resolve(
        name: &str,
        ctx: &ValidationContext<Self>,
    ) -> Option<&'static ElementDescriptor<Self::Code>> {
        let table = Self::table();
        let candidates: Vec<&'static ElementDescriptor<Self::Code>> = table
            .candidates(name)
            .iter()
            .filter_map(|code| table.descriptor(*code))
            .collect();

        candidates
            .iter()
            .find(|d| d.region.is_some() && d.matches_region(ctx.region()))
            .or_else(|| {
                candidates
                    .iter()
                    .find(|d| ctx.current().map_or(false, |parent| d.allows_parent(parent)))
            })
            .or_else(|| candidates.first())
            .copied()
    }

    /// Extra checks before an element is committed
    fn check_start(
        _descriptor: &ElementDescriptor<Self::Code>,
        _ctx: &ValidationContext<Self>,
    ) -> ValidationResult<()> {
        Ok(())
    }

    /// Update schema state after an element is committed
    fn enter(_descriptor: &ElementDescriptor<Self::Code>, _ctx: &mut ValidationContext<Self>) {}

    /// Extra checks when an element closes, after its content has been checked
    fn check_end(
        _descriptor: &ElementDescriptor<Self::Code>,
        _text: &str,
        _ctx: &ValidationContext<Self>,
    ) -> ValidationResult<()> {
        Ok(())
    }

    /// Update schema state after an element is popped
    fn leave(_descriptor: &ElementDescriptor<Self::Code>, _ctx: &mut ValidationContext<Self>) {}
}
