//! Subject `Material`s.

use super::{alternate_identifier, characteristics, first_value, human_taxon, node, roles, DONOR_ROLES};
use crate::cache::{cache_key, IdentityCache};
use crate::config::ConvertConfig;
use crate::model::{NodeKind, PropertyMap, Value};
use crate::resolve::VariableResolver;
use crate::table::AttributeRow;
use crate::Result;

/// Columns holding the study's own subject id, in preference order.
const SUBJECT_NAME_COLUMNS: [&str; 2] = ["SUBJECT_ID", "SUBJID"];

/// Cache key of the subject with this dbGaP id.
pub fn subject_key(dbgap_id: &str) -> String {
    cache_key(NodeKind::Material, [dbgap_id])
}

/// A subject `Material` for one merged subject row, cached under
/// `Material:<dbGaP subject id>`. `study_title` goes into the description.
pub fn subject_material(
    config: &ConvertConfig,
    cache: &mut IdentityCache,
    resolver: &VariableResolver<'_>,
    study_title: &str,
    row: &AttributeRow,
    consent: Option<&str>,
) -> Result<Value> {
    let key = subject_key(&row.id);
    if let Some(hit) = cache.lookup(&key) {
        return Ok(hit);
    }

    let dims = characteristics(config, cache, resolver, row, consent)?;
    let taxonomy = human_taxon(config, cache)?;
    let donor_roles = roles(config, cache, &DONOR_ROLES)?;
    let name = first_value(row, &SUBJECT_NAME_COLUMNS, &row.id);

    cache.get_or_create(&key, || {
        let mut props = PropertyMap::new();
        props.insert("name", name);
        props.insert("identifier", PropertyMap::from(vec![("identifier", name)]));
        props.insert("alternateIdentifiers", vec![alternate_identifier(config, &row.id)]);
        props.insert("description", format!("{study_title} subject {name}"));
        props.insert("characteristics", dims);
        props.insert("taxonomy", vec![taxonomy]);
        props.insert("roles", donor_roles);
        Ok(node(config, NodeKind::Material, props))
    })
}
