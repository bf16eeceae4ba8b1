//! XML namespace handling
//!
//! This module provides the prefix→URI tables carried by every schema and the
//! lookups the walker, generator and codec perform against them.

use crate::names::split_qname;
use indexmap::IndexMap;
use url::Url;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix (empty string for the default namespace)
pub type Prefix = String;

/// Ordered mapping from prefix to namespace URI
pub type NamespaceMap = IndexMap<Prefix, NamespaceUri>;

/// XSD 1.0 namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XSD 1.1 namespace
pub const XSD_1_1_NAMESPACE: &str = "http://www.w3.org/2009/XMLSchema";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Conventional prefixes for the XSD namespace when no declaration is present
const CONVENTIONAL_XSD_PREFIXES: &[&str] = &["xs", "xsd"];

/// Check if a URI is one of the XML Schema namespaces
pub fn is_xsd_namespace(uri: &str) -> bool {
    uri == XSD_NAMESPACE || uri == XSD_1_1_NAMESPACE
}

/// Check if a QName as written in a schema points into the XSD namespace
///
/// Unprefixed names only count when the schema's default namespace is XSD.
pub fn refers_to_xsd(namespaces: &NamespaceMap, qname: &str) -> bool {
    match split_qname(qname) {
        (Some(prefix), _) => match namespaces.get(prefix) {
            Some(uri) => is_xsd_namespace(uri),
            None => CONVENTIONAL_XSD_PREFIXES.contains(&prefix),
        },
        (None, _) => namespaces
            .get("")
            .map(|uri| is_xsd_namespace(uri))
            .unwrap_or(false),
    }
}

/// Find the first non-default prefix bound to a namespace URI
pub fn prefix_for<'a>(namespaces: &'a NamespaceMap, uri: &str) -> Option<&'a str> {
    namespaces
        .iter()
        .find(|(prefix, ns)| !prefix.is_empty() && ns.as_str() == uri)
        .map(|(prefix, _)| prefix.as_str())
}

/// Merge `other` into `target`; existing prefixes keep their binding
pub fn union_into(target: &mut NamespaceMap, other: &NamespaceMap) {
    for (prefix, uri) in other {
        target.entry(prefix.clone()).or_insert_with(|| uri.clone());
    }
}

/// Derive a module file stem from a namespace URI
///
/// `http://example.com/schemas/common` becomes `common`, `urn:acme:orders`
/// becomes `orders`. A trailing `.xsd` extension is dropped.
pub fn module_name(namespace: &str) -> String {
    let segment = match Url::parse(namespace) {
        Ok(url) if url.cannot_be_a_base() => url
            .path()
            .rsplit(':')
            .find(|s| !s.is_empty())
            .map(str::to_string),
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string)
            .or_else(|| url.host_str().map(str::to_string)),
        Err(_) => namespace
            .rsplit(['/', ':'])
            .find(|s| !s.is_empty())
            .map(str::to_string),
    };

    let segment = segment.unwrap_or_else(|| "types".to_string());
    let stem = segment.strip_suffix(".xsd").unwrap_or(&segment);
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        "types".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> NamespaceMap {
        entries
            .iter()
            .map(|(p, u)| (p.to_string(), u.to_string()))
            .collect()
    }

    #[test]
    fn test_refers_to_xsd() {
        let ns = map(&[("xs", XSD_NAMESPACE), ("tns", "http://example.com")]);
        assert!(refers_to_xsd(&ns, "xs:string"));
        assert!(!refers_to_xsd(&ns, "tns:string"));
        assert!(!refers_to_xsd(&ns, "string"));

        // Undeclared conventional prefix
        assert!(refers_to_xsd(&NamespaceMap::new(), "xsd:int"));

        let default_xsd = map(&[("", XSD_NAMESPACE)]);
        assert!(refers_to_xsd(&default_xsd, "string"));
    }

    #[test]
    fn test_prefix_for() {
        let ns = map(&[("", "http://a"), ("a", "http://a"), ("b", "http://b")]);
        assert_eq!(prefix_for(&ns, "http://a"), Some("a"));
        assert_eq!(prefix_for(&ns, "http://c"), None);
    }

    #[test]
    fn test_union_keeps_first_binding() {
        let mut target = map(&[("a", "http://first")]);
        union_into(&mut target, &map(&[("a", "http://second"), ("b", "http://b")]));
        assert_eq!(target.get("a").map(String::as_str), Some("http://first"));
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn test_module_name() {
        assert_eq!(module_name("http://example.com/schemas/common"), "common");
        assert_eq!(module_name("http://example.com/types.xsd"), "types");
        assert_eq!(module_name("urn:acme:orders"), "orders");
        assert_eq!(module_name("http://example.com/"), "example_com");
        assert_eq!(module_name("local"), "local");
    }
}
