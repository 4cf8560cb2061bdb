//! Limits and constraints for import processing
//!
//! This module defines the limits the document driver enforces before handing
//! events to the validator, so an oversized or maliciously nested import file
//! cannot exhaust memory.

use crate::error::{Error, Result};

/// Limits configuration for the document driver
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum element nesting depth
    pub max_depth: usize,

    /// Maximum document size in bytes
    pub max_document_size: usize,

    /// Maximum accumulated character data of a single element, in bytes
    pub max_text_length: usize,

    /// Maximum number of elements in one document
    pub max_elements: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_document_size: 100 * 1024 * 1024, // 100 MB
            max_text_length: 1024 * 1024,         // 1 MB
            max_elements: 10_000_000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_depth: 16,
            max_document_size: 10 * 1024 * 1024, // 10 MB
            max_text_length: 64 * 1024,          // 64 KB
            max_elements: 1_000_000,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_depth: 1024,
            max_document_size: 1024 * 1024 * 1024, // 1 GB
            max_text_length: 64 * 1024 * 1024,     // 64 MB
            max_elements: usize::MAX,
        }
    }

    /// Look up a preset by name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "default" => Ok(Self::default()),
            "strict" => Ok(Self::strict()),
            "permissive" => Ok(Self::permissive()),
            _ => Err(Error::Value(format!(
                "Invalid limits preset: '{}'. Must be 'default', 'strict', or 'permissive'",
                name
            ))),
        }
    }

    /// Check if the nesting depth is within limits
    pub fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            Err(Error::LimitExceeded(format!(
                "element depth {} exceeds maximum {}",
                depth, self.max_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the document size is within limits
    pub fn check_document_size(&self, size: usize) -> Result<()> {
        if size > self.max_document_size {
            Err(Error::LimitExceeded(format!(
                "document size {} bytes exceeds maximum {} bytes",
                size, self.max_document_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if an element's text length is within limits
    pub fn check_text_length(&self, length: usize) -> Result<()> {
        if length > self.max_text_length {
            Err(Error::LimitExceeded(format!(
                "element text of {} bytes exceeds maximum {} bytes",
                length, self.max_text_length
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the element count is within limits
    pub fn check_elements(&self, count: usize) -> Result<()> {
        if count > self.max_elements {
            Err(Error::LimitExceeded(format!(
                "element count {} exceeds maximum {}",
                count, self.max_elements
            )))
        } else {
            Ok(())
        }
    }
}
