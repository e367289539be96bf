//! Sample `Material`s and their link to the subject they came from.

use super::subject::{subject_key, subject_material};
use super::{alternate_identifier, characteristics, first_value, human_taxon, node, roles, SPECIMEN_ROLES};
use crate::cache::{cache_key, IdentityCache};
use crate::config::ConvertConfig;
use crate::model::{NodeKind, PropertyMap, Value};
use crate::resolve::VariableResolver;
use crate::table::{AttributeRow, AttributeTable};
use crate::{Error, Result};

const SAMPLE_NAME_COLUMNS: [&str; 2] = ["SAMPLE_ID", "SAMPID"];

/// A sample `Material` whose `derivesFrom` points at its subject.
///
/// The subject is taken from the cache when already emitted, else built from
/// `subjects`. A sample whose subject is in neither is an error.
pub fn sample_material(
    config: &ConvertConfig,
    cache: &mut IdentityCache,
    resolver: &VariableResolver<'_>,
    study_title: &str,
    row: &AttributeRow,
    subjects: &AttributeTable,
    consent: Option<&str>,
) -> Result<Value> {
    let key = cache_key(NodeKind::Material, ["sample", row.id.as_str()]);
    if let Some(hit) = cache.lookup(&key) {
        return Ok(hit);
    }

    let subject_id = row.value(&config.subject_id_column).ok_or_else(|| Error::UnresolvedReference {
        kind: config.subject_id_column.clone(),
        key: row.id.clone(),
    })?;
    let subject = match cache.lookup(&subject_key(subject_id)) {
        Some(hit) => hit,
        None => {
            let subject_row = subjects.get(subject_id).ok_or_else(|| Error::UnresolvedReference {
                kind: "subject".into(),
                key: subject_id.to_string(),
            })?;
            subject_material(config, cache, resolver, study_title, subject_row, consent)?
        }
    };

    let dims = characteristics(config, cache, resolver, row, consent)?;
    let taxonomy = human_taxon(config, cache)?;
    let specimen_roles = roles(config, cache, &SPECIMEN_ROLES)?;
    let name = first_value(row, &SAMPLE_NAME_COLUMNS, &row.id);
    let subject_name = subject
        .field("name")
        .and_then(Value::as_str)
        .or_else(|| cache.get(&subject_key(subject_id))?.get("name")?.as_str())
        .unwrap_or(subject_id)
        .to_string();

    cache.get_or_create(&key, || {
        let mut props = PropertyMap::new();
        props.insert("name", name);
        props.insert("identifier", PropertyMap::from(vec![("identifier", name)]));
        props.insert("alternateIdentifiers", vec![alternate_identifier(config, &row.id)]);
        props.insert("description", format!("specimen collected from subject {subject_name}"));
        props.insert("characteristics", dims);
        props.insert("taxonomy", vec![taxonomy]);
        props.insert("roles", specimen_roles);
        props.insert("derivesFrom", vec![subject]);
        Ok(node(config, NodeKind::Material, props))
    })
}
