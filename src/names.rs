//! XML and TypeScript name utilities
//!
//! This module splits qualified XML names and turns schema component names
//! into identifiers and property keys that are legal in generated TypeScript.

use crate::error::{ParseError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}][A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\-\.0-9]*$")
        .unwrap()
});

static TS_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

static TS_INVALID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_$]").unwrap());

/// TypeScript reserved words that cannot name a type
const TS_RESERVED: &[&str] = &[
    "any", "boolean", "break", "case", "catch", "class", "const", "continue", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
    "function", "if", "import", "in", "instanceof", "never", "new", "null", "number",
    "object", "return", "string", "super", "switch", "this", "throw", "true", "try",
    "typeof", "undefined", "unknown", "var", "void", "while", "with",
];

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Validate an NCName and return an error if invalid
pub fn validate_ncname(name: &str) -> Result<()> {
    if is_valid_ncname(name) {
        Ok(())
    } else {
        Err(ParseError::new(format!("Invalid NCName: '{}'", name)).into())
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}

/// Strip any namespace prefix from a QName
pub fn local_name(qname: &str) -> &str {
    split_qname(qname).1
}

/// Check if a name can be used verbatim as a TypeScript identifier
pub fn is_identifier(name: &str) -> bool {
    TS_IDENTIFIER.is_match(name)
}

/// Turn a schema component name into a TypeScript type identifier
pub fn type_identifier(name: &str) -> String {
    let local = local_name(name);
    let mut ident = TS_INVALID_CHARS.replace_all(local, "_").into_owned();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if TS_RESERVED.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Render a member name as a TypeScript property key, quoting when needed
pub fn property_key(name: &str) -> Cow<'_, str> {
    if is_identifier(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(string_literal(name))
    }
}

/// Render a value as a single-quoted TypeScript string literal
pub fn string_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}
