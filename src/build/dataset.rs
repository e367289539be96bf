//! Study `Dataset` and its variable `Dimension`s.

use super::{annotation, identifier, node};
use crate::cache::{cache_key, IdentityCache};
use crate::catalog::{SummaryStats, VariableCatalog, VariableDefinition, VariableType};
use crate::config::ConvertConfig;
use crate::model::{Node, NodeKind, PropertyMap, Value};
use crate::study::StudyLayout;
use crate::Result;

/// The `Identifier` of one catalog variable, shared by the dataset's
/// dimension and every subject/sample characteristic that uses it.
pub fn variable_identifier(config: &ConvertConfig, cache: &mut IdentityCache, def: &VariableDefinition) -> Result<Value> {
    let key = cache_key(NodeKind::Identifier, [&def.id]);
    cache.get_or_create(&key, || Ok(identifier(config, &def.id)))
}

fn category_values(config: &ConvertConfig, category: &str, values: Vec<Value>) -> Value {
    let mut props = PropertyMap::new();
    props.insert("category", category);
    props.insert("values", values);
    Value::from(node(config, NodeKind::CategoryValuesPair, props))
}

fn stats_properties(config: &ConvertConfig, stats: &SummaryStats) -> Vec<Value> {
    let counts = [("n", stats.n), ("nulls", stats.nulls)];
    let measures = [
        ("mean", &stats.mean),
        ("median", &stats.median),
        ("min", &stats.min),
        ("max", &stats.max),
        ("sd", &stats.sd),
    ];

    let mut pairs: Vec<Value> = counts
        .into_iter()
        .filter_map(|(name, n)| Some(category_values(config, name, vec![Value::from(n?)])))
        .collect();
    pairs.extend(
        measures
            .into_iter()
            .filter_map(|(name, m)| Some(category_values(config, name, vec![Value::from(m.as_deref()?)]))),
    );
    if !stats.values.is_empty() {
        let counted = stats
            .values
            .iter()
            .map(|cv| {
                let mut m = PropertyMap::new();
                m.insert("value", cv.code.as_deref().unwrap_or(&cv.label));
                m.insert("label", cv.label.as_str());
                m.insert("count", cv.count);
                Value::from(m)
            })
            .collect();
        pairs.push(category_values(config, "value_counts", counted));
    }
    pairs
}

/// A `Dimension` describing one catalog variable, cached under
/// `Dimension:<schema id>`.
pub fn variable_dimension(config: &ConvertConfig, cache: &mut IdentityCache, def: &VariableDefinition) -> Result<Value> {
    let key = cache_key(NodeKind::Dimension, [&def.id]);
    if let Some(hit) = cache.lookup(&key) {
        return Ok(hit);
    }
    let id_value = variable_identifier(config, cache, def)?;

    cache.get_or_create(&key, move || {
        let mut props = PropertyMap::new();
        props.insert("identifier", id_value);
        props.insert("name", annotation(config, &def.name));
        if let Some(description) = &def.description {
            props.insert("description", description);
        }
        if def.var_type != VariableType::Unknown {
            let mut info = PropertyMap::new();
            info.insert("information", annotation(config, def.var_type.as_str()));
            props.insert("types", vec![node(config, NodeKind::DataType, info)]);
        }
        if !def.coded_values.is_empty() {
            let values: Vec<Value> = def
                .coded_values
                .iter()
                .map(|cv| {
                    let mut m = PropertyMap::new();
                    m.insert("value", cv.code.as_deref().unwrap_or(&cv.label));
                    m.insert("label", cv.label.as_str());
                    Value::from(m)
                })
                .collect();
            props.insert("values", values);
        }
        let mut extra = Vec::new();
        if !def.is_pooled() {
            extra.push(category_values(config, "consent_group", vec![Value::from(def.consent_suffix.trim_start_matches('.'))]));
        }
        if let Some(stats) = &def.stats {
            extra.extend(stats_properties(config, stats));
        }
        if !extra.is_empty() {
            props.insert("extraProperties", extra);
        }
        Ok(node(config, NodeKind::Dimension, props))
    })
}

/// `v7` in `phs000424.v7`.
fn study_version(study_id: &str) -> Option<&str> {
    study_id.split('.').nth(1)?.strip_prefix('v')
}

/// The `Dataset` for one study: identifier, variable dimensions, the dbGaP
/// repository it is stored in, and the sub-studies folded into it.
pub fn study_dataset(
    config: &ConvertConfig,
    cache: &mut IdentityCache,
    layout: &StudyLayout,
    catalog: &VariableCatalog,
    title: Option<&str>,
) -> Result<Node> {
    let dimensions = catalog
        .iter()
        .map(|def| variable_dimension(config, cache, def))
        .collect::<Result<Vec<_>>>()?;

    let repository_key = cache_key(NodeKind::DataRepository, [&config.identifier_source]);
    let stored_in = cache.get_or_create(&repository_key, || {
        Ok(node(
            config,
            NodeKind::DataRepository,
            PropertyMap::from(vec![("name", config.identifier_source.as_str())]),
        ))
    })?;

    let mut props = PropertyMap::new();
    props.insert("identifier", identifier(config, &layout.study_id));
    if let Some(version) = study_version(&layout.study_id) {
        props.insert("version", version);
    }
    props.insert("title", title.unwrap_or(&layout.study_id));
    if let Some(description) = catalog.tables().iter().find_map(|t| t.description.as_deref()) {
        props.insert("description", description);
    }
    props.insert("storedIn", stored_in);
    props.insert("dimensions", dimensions);

    let mut extra = vec![category_values(config, "main_study", vec![Value::from(layout.main.as_str())])];
    if !layout.sub_studies.is_empty() {
        let subs = layout.sub_studies.iter().map(Value::from).collect();
        extra.push(category_values(config, "sub_studies", subs));
    }
    props.insert("extraProperties", extra);

    tracing::debug!(study_id = %layout.study_id, dimensions = catalog.len(), "built study dataset");
    Ok(node(config, NodeKind::Dataset, props))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::RecordType;

    fn catalog() -> VariableCatalog {
        let mut sex = VariableDefinition::new("phv10.v1", "SEX", RecordType::Subject).with_type(VariableType::Categorical);
        sex.description = Some("Sex of subject".into());
        sex.stats = Some(SummaryStats { n: Some(80), ..SummaryStats::default() });
        VariableCatalog::from_definitions(
            "phs000001.v1",
            [sex, VariableDefinition::new("phv11.v1", "AGE", RecordType::Subject)],
        )
        .unwrap()
    }

    fn layout() -> StudyLayout {
        StudyLayout { study_id: "phs000001.v1".into(), main: "Main".into(), sub_studies: vec!["SubA".into()] }
    }

    #[test]
    fn test_dimension_cached_once() {
        let config = ConvertConfig::default();
        let mut cache = IdentityCache::new();
        let cat = catalog();
        let def = cat.get("phv10.v1").unwrap();
        let first = variable_dimension(&config, &mut cache, def).unwrap();
        let second = variable_dimension(&config, &mut cache, def).unwrap();
        assert!(first.as_node().is_some());
        assert!(second.is_ref());
        assert_eq!(first.node_id(), second.node_id());
        let ident = first.field("identifier").unwrap().as_node().unwrap();
        assert_eq!(ident.get("identifier").and_then(Value::as_str), Some("phv10.v1"));
        assert_eq!(ident.get("identifierSource").and_then(Value::as_str), Some("dbGaP"));
    }

    #[test]
    fn test_study_dataset_shape() {
        let config = ConvertConfig::default();
        let mut cache = IdentityCache::new();
        let ds = study_dataset(&config, &mut cache, &layout(), &catalog(), Some("Test study")).unwrap();
        assert_eq!(ds.kind(), NodeKind::Dataset);
        assert_eq!(ds.get("version").and_then(Value::as_str), Some("1"));
        assert_eq!(ds.get("title").and_then(Value::as_str), Some("Test study"));
        assert_eq!(ds.get("dimensions").and_then(Value::as_list).map(<[Value]>::len), Some(2));
        assert_eq!(ds.get("extraProperties").and_then(Value::as_list).map(<[Value]>::len), Some(2));

        // the repository is shared across studies
        let again = study_dataset(&config, &mut cache, &layout(), &catalog(), None).unwrap();
        assert!(again.get("storedIn").unwrap().is_ref());
    }

    #[test]
    fn test_study_version() {
        assert_eq!(study_version("phs000424.v7"), Some("7"));
        assert_eq!(study_version("phs000424"), None);
    }
}
