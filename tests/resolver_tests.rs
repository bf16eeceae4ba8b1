//! Integration tests for schema resolution

mod fixtures;

use pretty_assertions::assert_eq;
use serde_json::json;
use xmlschema_bind::codec::{build, parse, BuildOptions};
use xmlschema_bind::generator::{generate, GeneratorOptions};
use xmlschema_bind::model::{ComplexType, Element, ModelGroup, Particle, Schema};
use xmlschema_bind::{merge_all, merge_includes, resolve, ResolveOptions, Walker};

use fixtures::*;

fn element_names(model: &ModelGroup) -> Vec<String> {
    model
        .particles
        .iter()
        .flat_map(|particle| match particle {
            Particle::Element(element) => vec![element.effective_name().to_string()],
            Particle::Model(nested) => element_names(nested),
            _ => Vec::new(),
        })
        .collect()
}

const PACKAGE_XML: &str = r#"<abapGit version="v1.0.0">
  <root>
    <objects>
      <DEVC><CTEXT><language>E</language><text>Demo</text></CTEXT></DEVC>
    </objects>
  </root>
</abapGit>"#;

#[test]
fn test_merge_all_is_self_contained() {
    let merged = merge_all(&abapgit_schema()).unwrap();

    assert!(merged.imports.is_empty());
    assert!(merged.includes.is_empty());
    assert!(merged.complex_types.contains_key("TextType"));
    assert_eq!(merged.target_namespace.as_deref(), Some(ABAPGIT_NAMESPACE));

    let walker = Walker::new(&merged);
    let text_type = walker.find_complex_type("c:TextType", &merged).unwrap();
    assert!(!text_type.external);
}

#[test]
fn test_merge_all_expands_substitutions() {
    let merged = merge_all(&abapgit_schema()).unwrap();

    let objects = merged.complex_types["ObjectsType"].content.as_ref().unwrap();
    assert_eq!(element_names(objects), vec!["DEVC", "CLAS"]);
    assert!(merged.elements.contains_key("abapGit"));
    assert!(!merged.elements.contains_key("Schema"));
}

#[test]
fn test_merge_all_decodes_like_the_original() {
    let schema = abapgit_schema();
    let merged = merge_all(&schema).unwrap();
    assert_eq!(parse(&merged, PACKAGE_XML).unwrap(), parse(&schema, PACKAGE_XML).unwrap());
}

#[test]
fn test_parsed_schema_flattens() {
    let schema = tickets_schema();
    let merged = merge_all(&schema).unwrap();

    let ticket = &merged.complex_types["Ticket"];
    assert!(ticket.derivation.is_none());
    assert_eq!(
        element_names(ticket.content.as_ref().unwrap()),
        vec!["audit", "summary", "status"]
    );
    let group_refs: Vec<_> = ticket
        .content
        .iter()
        .flat_map(|model| &model.particles)
        .filter_map(|particle| match particle {
            Particle::Group(group) => Some(group.reference.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(group_refs, vec!["t:Labels"]);
    let attributes: Vec<_> = ticket.attributes.iter().filter_map(|a| a.name.as_deref()).collect();
    assert_eq!(attributes, vec!["id", "urgent"]);
    assert!(merged.complex_types.contains_key("Audit"));
    assert!(merged.simple_types.contains_key("Status"));

    let xml = r#"<tickets><ticket id="1"><audit><createdBy>a</createdBy><createdOn>2024-01-01</createdOn></audit><summary>s</summary><status>closed</status></ticket></tickets>"#;
    assert_eq!(parse(&merged, xml).unwrap(), parse(&schema, xml).unwrap());
}

#[test]
fn test_flattened_schema_generates_without_extends() {
    let merged = merge_all(&tickets_schema()).unwrap();
    let module = generate(&merged, &GeneratorOptions::default()).unwrap();
    assert!(module.source.contains(
        "export interface Ticket {\n  id: number;\n  urgent?: boolean;\n  audit: Audit;\n  summary: string;\n  status: Status;\n  label?: string[];\n}"
    ));
}

#[test]
fn test_merge_includes_leaves_imports_linked() {
    let merged = merge_includes(&abapgit_schema()).unwrap();

    assert_eq!(merged.imports.len(), 1);
    assert!(!merged.complex_types.contains_key("TextType"));
    assert!(merged.elements.contains_key("Schema"));
    assert_eq!(
        merged.complex_types["ObjectsType"].content.as_ref().map(element_names),
        Some(vec!["Schema".to_string()])
    );
    assert_eq!(parse(&merged, PACKAGE_XML).unwrap(), parse(&abapgit_schema(), PACKAGE_XML).unwrap());
}

#[test]
fn test_selective_options() {
    let options = ResolveOptions::default()
        .with_merge_imports(false)
        .with_retain_links(true)
        .with_expand_substitutions(false);
    let resolved = resolve(&extension_schema(), &options).unwrap();

    let product = &resolved.complex_types["Product"];
    assert!(product.derivation.is_none());
    assert_eq!(
        element_names(product.content.as_ref().unwrap()),
        vec!["created", "title", "weight", "tag"]
    );
}

#[test]
fn test_merged_references_stay_usable() {
    let schema = Schema::new()
        .with_element(Element::new("name").with_type("xs:string"))
        .with_element(Element::new("doc").with_complex_type(
            ComplexType::anonymous().with_sequence(vec![Particle::element(Element::reference("name"))]),
        ));
    let merged = merge_all(&schema).unwrap();
    assert_eq!(merged.elements.keys().map(String::as_str).collect::<Vec<_>>(), vec!["doc"]);

    let xml = "<doc><name>x</name></doc>";
    assert_eq!(parse(&merged, xml).unwrap(), json!({"name": "x"}));
    assert_eq!(parse(&merged, xml).unwrap(), parse(&schema, xml).unwrap());
    assert_eq!(
        build(&merged, &json!({"name": "x"}), &BuildOptions::compact()).unwrap(),
        xml
    );

    let again = merge_all(&merged).unwrap();
    assert_eq!(parse(&again, xml).unwrap(), json!({"name": "x"}));
}

#[test]
fn test_merge_all_twice_on_substitution_groups() {
    let once = merge_all(&abapgit_schema()).unwrap();
    let twice = merge_all(&once).unwrap();
    assert_eq!(parse(&twice, PACKAGE_XML).unwrap(), parse(&abapgit_schema(), PACKAGE_XML).unwrap());
}
