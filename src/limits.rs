//! Limits and constraints for schema processing
//!
//! This module defines limits that keep pathological inputs (deeply nested
//! documents, runaway derivation chains, huge schema graphs) from exhausting
//! the stack or memory.

use crate::error::{Error, Result};
use serde::Deserialize;

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Limits {
    /// Maximum element nesting depth decoded or encoded by the codec
    pub max_xml_depth: usize,

    /// Maximum XML text size in bytes accepted by the codec
    pub max_xml_size: usize,

    /// Maximum length of a base-type derivation chain
    pub max_derivation_depth: usize,

    /// Maximum number of distinct schemas reachable through imports/includes
    pub max_schemas: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_derivation_depth: 100,
            max_schemas: 10_000,
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
            max_xml_depth: 100,
            max_xml_size: 10 * 1024 * 1024, // 10 MB
            max_derivation_depth: 20,
            max_schemas: 500,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10_000,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_derivation_depth: 1000,
            max_schemas: 1_000_000,
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if a derivation chain is within limits
    pub fn check_derivation_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_derivation_depth {
            Err(Error::LimitExceeded(format!(
                "Derivation depth {} exceeds maximum {}",
                depth, self.max_derivation_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of reachable schemas is within limits
    pub fn check_schemas(&self, count: usize) -> Result<()> {
        if count > self.max_schemas {
            Err(Error::LimitExceeded(format!(
                "Schema count {} exceeds maximum {}",
                count, self.max_schemas
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_xml_depth, 1000);
        assert!(limits.check_xml_depth(500).is_ok());
        assert!(limits.check_xml_depth(1500).is_err());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_xml_depth < Limits::default().max_xml_depth);
        assert!(limits.check_derivation_depth(21).is_err());
    }

    #[test]
    fn test_permissive_limits() {
        let limits = Limits::permissive();
        assert!(limits.max_xml_depth > Limits::default().max_xml_depth);
        assert!(limits.check_xml_depth(5000).is_ok());
    }

    #[test]
    fn test_check_xml_size() {
        let limits = Limits::default();
        assert!(limits.check_xml_size(1024).is_ok());
        assert!(limits.check_xml_size(200 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let limits: Limits = serde_json::from_str(r#"{"maxXmlDepth": 8}"#).unwrap();
        assert_eq!(limits.max_xml_depth, 8);
        assert_eq!(limits.max_schemas, Limits::default().max_schemas);
    }
}
