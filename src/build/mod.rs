//! DATS entity builders.
//!
//! Every builder takes the session's config and identity cache. Shared
//! entities (repositories, variable identifiers, subjects, the human taxon,
//! role terms) go through the cache so they are embedded once and referenced
//! afterwards.

pub mod dataset;
pub mod sample;
pub mod subject;

pub use dataset::{study_dataset, variable_dimension, variable_identifier};
pub use sample::sample_material;
pub use subject::subject_material;

use crate::cache::{cache_key, IdentityCache};
use crate::config::ConvertConfig;
use crate::model::{Node, NodeKind, PropertyMap, Value};
use crate::resolve::VariableResolver;
use crate::table::AttributeRow;
use crate::Result;

/// OBI role terms: value → IRI.
const ROLE_TERMS: [(&str, &str); 3] = [
    ("patient", "http://purl.obolibrary.org/obo/OBI_0000093"),
    ("donor", "http://purl.obolibrary.org/obo/OBI_1110087"),
    ("specimen", "http://purl.obolibrary.org/obo/OBI_0100051"),
];

pub(crate) const DONOR_ROLES: [&str; 2] = ["patient", "donor"];
pub(crate) const SPECIMEN_ROLES: [&str; 1] = ["specimen"];

const HUMAN_TAXON_ID: &str = "ncbitax:9606";

/// A fresh node with the configured context prefix.
pub(crate) fn node(config: &ConvertConfig, kind: NodeKind, properties: PropertyMap) -> Node {
    Node::create_in(&config.context_uri_prefix, kind, properties, None)
}

pub(crate) fn annotation(config: &ConvertConfig, value: &str) -> Node {
    node(config, NodeKind::Annotation, PropertyMap::from(vec![("value", value)]))
}

pub(crate) fn identifier(config: &ConvertConfig, id: &str) -> Node {
    node(
        config,
        NodeKind::Identifier,
        PropertyMap::from(vec![("identifier", id), ("identifierSource", config.identifier_source.as_str())]),
    )
}

pub(crate) fn alternate_identifier(config: &ConvertConfig, id: &str) -> Node {
    node(
        config,
        NodeKind::AlternateIdentifier,
        PropertyMap::from(vec![("identifier", id), ("identifierSource", config.identifier_source.as_str())]),
    )
}

/// The `Homo sapiens` TaxonomicInformation, cached under
/// `TaxonomicInformation:ncbitax:9606`.
pub(crate) fn human_taxon(config: &ConvertConfig, cache: &mut IdentityCache) -> Result<Value> {
    cache.get_or_create(&cache_key(NodeKind::TaxonomicInformation, [HUMAN_TAXON_ID]), || {
        let mut props = PropertyMap::new();
        props.insert("name", "Homo sapiens");
        props.insert(
            "identifier",
            PropertyMap::from(vec![("identifier", HUMAN_TAXON_ID), ("identifierSource", "ncbitax")]),
        );
        Ok(node(config, NodeKind::TaxonomicInformation, props))
    })
}

/// Role annotations, one cache entry (`Annotation:<term>`) per term.
pub(crate) fn roles(config: &ConvertConfig, cache: &mut IdentityCache, terms: &[&str]) -> Result<Vec<Value>> {
    terms
        .iter()
        .map(|&term| {
            let iri = ROLE_TERMS.iter().find(|(value, _)| *value == term).map(|(_, iri)| *iri);
            cache.get_or_create(&cache_key(NodeKind::Annotation, [term]), || {
                let mut props = PropertyMap::new();
                props.insert("value", term);
                if let Some(iri) = iri {
                    props.insert("valueIRI", iri);
                }
                Ok(node(config, NodeKind::Annotation, props))
            })
        })
        .collect()
}

/// First of `columns` with a value, else `fallback`.
pub(crate) fn first_value<'r>(row: &'r AttributeRow, columns: &[&str], fallback: &'r str) -> &'r str {
    columns.iter().find_map(|c| row.value(c)).unwrap_or(fallback)
}

/// One `Dimension` per column with a value, in column order.
///
/// A column that resolves to a catalog variable links to that variable's
/// identifier.
pub(crate) fn characteristics(
    config: &ConvertConfig,
    cache: &mut IdentityCache,
    resolver: &VariableResolver<'_>,
    row: &AttributeRow,
    consent: Option<&str>,
) -> Result<Vec<Value>> {
    let resolved = resolver.resolve_row(row, consent);
    let mut dims = Vec::new();
    for (column, cell) in &row.cells {
        let Some(value) = cell.mapped.as_deref() else { continue };
        let mut props = PropertyMap::new();
        props.insert("name", annotation(config, column));
        props.insert("values", vec![value]);
        if let Some(def) = resolved.get(column) {
            props.insert("identifier", variable_identifier(config, cache, def)?);
            if let Some(label) = def.label_for(value) {
                props.insert("description", label);
            }
        }
        dims.push(Value::from(node(config, NodeKind::Dimension, props)));
    }
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{VariableCatalog, VariableDefinition};
    use crate::study::RecordType;

    #[test]
    fn test_characteristics_sorted_and_linked() {
        let config = ConvertConfig::default();
        let mut cache = IdentityCache::new();
        let catalog = VariableCatalog::from_definitions(
            "phs000001.v1",
            [VariableDefinition::new("phv10.v1", "SEX", RecordType::Subject)],
        )
        .unwrap();
        let resolver = VariableResolver::new(&catalog);
        let row = AttributeRow::new("1")
            .with_cell("SEX", "2", RecordType::Subject)
            .with_cell("AGE", "60-69", RecordType::Subject)
            .with_cell("EMPTY", "", RecordType::Subject);

        let dims = characteristics(&config, &mut cache, &resolver, &row, None).unwrap();
        assert_eq!(dims.len(), 2);
        let names: Vec<_> = dims
            .iter()
            .map(|d| d.as_node().unwrap().get("name").unwrap().field("value").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(names, ["AGE", "SEX"]);
        assert!(dims[0].as_node().unwrap().get("identifier").is_none());
        assert!(dims[1].as_node().unwrap().get("identifier").is_some());
        assert!(cache.contains("Identifier:phv10.v1"));
    }

    #[test]
    fn test_taxon_and_roles_are_shared() {
        let config = ConvertConfig::default();
        let mut cache = IdentityCache::new();

        let taxon = human_taxon(&config, &mut cache).unwrap();
        let body = taxon.as_node().unwrap();
        assert_eq!(body.kind(), NodeKind::TaxonomicInformation);
        assert_eq!(body.get("identifier").and_then(|i| i.field("identifier")).and_then(Value::as_str), Some("ncbitax:9606"));
        let again = human_taxon(&config, &mut cache).unwrap();
        assert!(again.is_ref());
        assert_eq!(again.node_id(), taxon.node_id());

        let donor = roles(&config, &mut cache, &DONOR_ROLES).unwrap();
        assert_eq!(donor.len(), 2);
        assert_eq!(
            donor[1].field("valueIRI").and_then(Value::as_str),
            Some("http://purl.obolibrary.org/obo/OBI_1110087")
        );
        let repeated = roles(&config, &mut cache, &DONOR_ROLES).unwrap();
        assert!(repeated.iter().all(Value::is_ref));
        assert!(!cache.contains("Annotation:specimen"));
        roles(&config, &mut cache, &SPECIMEN_ROLES).unwrap();
        assert!(cache.contains("Annotation:specimen"));
    }
}
