//! XSD built-in types
//!
//! Built-in type names grouped into the scalar kinds that the codec converts
//! and the generator maps onto TypeScript primitives.

use std::fmt;

/// Scalar category of a built-in or derived simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Any textual type (string, token, anyURI, QName, binary, ...)
    String,
    /// xs:boolean
    Boolean,
    /// Integer types (integer, int, long, unsignedShort, ...)
    Integer,
    /// xs:decimal
    Decimal,
    /// xs:float and xs:double
    Float,
    /// xs:date
    Date,
    /// xs:dateTime
    DateTime,
    /// xs:time
    Time,
    /// anyType / anySimpleType
    Any,
}

impl ScalarKind {
    /// Check if values of this kind decode to JSON numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal | Self::Float)
    }

    /// TypeScript primitive for this kind
    pub fn ts_type(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer | Self::Decimal | Self::Float => "number",
            Self::Any => "unknown",
            _ => "string",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Time => "time",
            Self::Any => "any",
        };
        f.write_str(label)
    }
}

/// Integer built-ins
const INTEGER_TYPES: &[&str] = &[
    "integer",
    "long",
    "int",
    "short",
    "byte",
    "nonNegativeInteger",
    "positiveInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
    "nonPositiveInteger",
    "negativeInteger",
];

/// Textual built-ins
const STRING_TYPES: &[&str] = &[
    "string",
    "normalizedString",
    "token",
    "language",
    "Name",
    "NCName",
    "ID",
    "IDREF",
    "IDREFS",
    "ENTITY",
    "ENTITIES",
    "NMTOKEN",
    "NMTOKENS",
    "duration",
    "gYearMonth",
    "gYear",
    "gMonthDay",
    "gDay",
    "gMonth",
    "hexBinary",
    "base64Binary",
    "anyURI",
    "QName",
    "NOTATION",
];

/// Map a built-in type local name to its scalar kind
pub fn builtin_kind(local_name: &str) -> Option<ScalarKind> {
    match local_name {
        "boolean" => Some(ScalarKind::Boolean),
        "decimal" => Some(ScalarKind::Decimal),
        "float" | "double" => Some(ScalarKind::Float),
        "date" => Some(ScalarKind::Date),
        "dateTime" | "dateTimeStamp" => Some(ScalarKind::DateTime),
        "time" => Some(ScalarKind::Time),
        "anyType" | "anySimpleType" | "anyAtomicType" => Some(ScalarKind::Any),
        name if INTEGER_TYPES.contains(&name) => Some(ScalarKind::Integer),
        name if STRING_TYPES.contains(&name) => Some(ScalarKind::String),
        _ => None,
    }
}
