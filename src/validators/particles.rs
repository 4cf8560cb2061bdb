//! Occurrence bounds and counters
//!
//! maxOccurs limits of import elements are scoped to the nearest reset
//! boundary, so the counter is reset piecewise by the group-defining elements
//! rather than once per document.

use super::schema::ElementCode;
use std::fmt;
use std::marker::PhantomData;

/// Occurrence bounds for an element (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Optional occurrence (0, 1)
    pub const fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Up to `max` occurrences (0, max)
    pub const fn at_most(max: u32) -> Self {
        Self { min: 0, max: Some(max) }
    }

    /// Zero or more (0, unbounded)
    pub const fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// Check if the element may repeat without limit
    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// Check if occurrence count is at or over the maximum, i.e. one more
    /// occurrence would exceed it
    pub fn is_over(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count >= max,
            None => false,
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::optional()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..unbounded", self.min),
        }
    }
}

/// Occurrence counter indexed by dense element code
#[derive(Clone)]
pub struct OccursCounter<K: ElementCode> {
    counts: Vec<u32>,
    _codes: PhantomData<K>,
}

impl<K: ElementCode> OccursCounter<K> {
    /// Create a counter with every code at zero
    pub fn new() -> Self {
        Self {
            counts: vec![0; K::COUNT],
            _codes: PhantomData,
        }
    }

    /// Get the count for a code
    pub fn get(&self, key: K) -> u32 {
        self.counts.get(key.index()).copied().unwrap_or(0)
    }

    /// Increment the count for a code
    pub fn increment(&mut self, key: K) -> u32 {
        match self.counts.get_mut(key.index()) {
            Some(count) => {
                *count = count.saturating_add(1);
                *count
            }
            None => 0,
        }
    }

    /// Zero the counts of a reset scope
    pub fn reset_group(&mut self, keys: &[K]) {
        for key in keys {
            if let Some(count) = self.counts.get_mut(key.index()) {
                *count = 0;
            }
        }
    }

    /// Reset the counter
    pub fn reset(&mut self) {
        self.counts.iter_mut().for_each(|count| *count = 0);
    }

    /// Check that every code has occurred zero times
    pub fn all_zero(&self, keys: &[K]) -> bool {
        keys.iter().all(|key| self.get(*key) == 0)
    }
}

impl<K: ElementCode> Default for OccursCounter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ElementCode> fmt::Debug for OccursCounter<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nonzero: Vec<(usize, u32)> = self
            .counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(index, count)| (index, *count))
            .collect();
        f.debug_struct("OccursCounter").field("counts", &nonzero).finish()
    }
}
