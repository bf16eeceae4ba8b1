//! Error types for xmlschema-bind
//!
//! Every failure surfaces as one [`Error`] value whose display text starts
//! with a stable prefix identifying the kind of failure:
//!
//! - `schema defect:` a referenced component is missing or derivation is circular
//! - `malformed document:` the instance document cannot be matched to the schema
//! - `XML error:` the XML text itself is not well-formed
//! - `parse error:` XSD source text is not a schema document

use std::fmt;
use thiserror::Error;

/// Result type alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of schema component named by a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Named type, complex or simple
    Type,
    /// Top-level element
    Element,
    /// Global attribute
    Attribute,
    /// Named model group
    Group,
    /// Named attribute group
    AttributeGroup,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Type => "type",
            Self::Element => "element",
            Self::Attribute => "attribute",
            Self::Group => "group",
            Self::AttributeGroup => "attribute group",
        };
        f.write_str(label)
    }
}

/// Main error type for xmlschema-bind operations
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced component is absent from the schema-plus-imports search space
    #[error("schema defect: {kind} '{name}' not found")]
    MissingReference {
        /// What kind of component was referenced
        kind: ComponentKind,
        /// The identifier as written at the reference point
        name: String,
    },

    /// Any other structural defect in the schema (e.g. circular derivation)
    #[error("schema defect: {0}")]
    Schema(String),

    /// The instance document cannot be decoded against the schema
    #[error("malformed document: {0}")]
    Document(String),

    /// XSD source parsing error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Encoding error (value to XML conversion)
    #[error("encoding error: {0}")]
    Encode(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// XML parsing or writing error
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON (de)serialization error for the schema model
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a missing-reference schema defect
    pub fn missing(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self::MissingReference {
            kind,
            name: name.into(),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

/// XSD source parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location in the schema source
    pub location: Option<String>,
    /// Schema source fragment that caused the error
    pub source: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, "\n\nSource:\n{}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}
