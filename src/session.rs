//! One conversion run.
//!
//! A `Session` owns the identity cache for everything it emits, so an entity
//! shared between studies or between subjects and samples is embedded once
//! per session. Sessions are independent; several can coexist.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;

use crate::build::{self, sample_material, study_dataset, subject_material};
use crate::cache::{CacheStats, IdentityCache};
use crate::catalog::VariableCatalog;
use crate::config::ConvertConfig;
use crate::model::{Node, NodeKind, PropertyMap, Value};
use crate::resolve::VariableResolver;
use crate::study::{classify, discover_metadata_files, FileGroups, FileType, RecordType, StudyLayout};
use crate::table::{merge_tables, read_attribute_table, AttributeTable};
use crate::{Error, Result};

/// Restricted tables of one study: consent suffix → record type → table.
type ConsentTables = BTreeMap<String, BTreeMap<RecordType, AttributeTable>>;

pub struct Session {
    config: ConvertConfig,
    cache: IdentityCache,
}

impl Session {
    pub fn new(config: ConvertConfig) -> Self {
        let cache = IdentityCache::with_mode(config.cache.mode);
        Self { config, cache }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Convert every study found in `public_dir` into one top-level
    /// `Dataset` whose `hasPart` holds a `Dataset` per study.
    ///
    /// With `restricted_dir`, subject and sample tables for those studies are
    /// turned into `Material`s under each study's `isAbout`.
    pub fn convert_study(&mut self, public_dir: &Path, restricted_dir: Option<&Path>) -> Result<Node> {
        let groups = discover_metadata_files(public_dir)?;
        if groups.is_empty() {
            return Err(Error::StudyStructure {
                study_id: public_dir.display().to_string(),
                message: "no dbGaP metadata files".into(),
            });
        }
        let layouts = classify(&groups)?;
        let restricted = restricted_dir.map(discover_metadata_files).transpose()?;

        let mut parts = Vec::with_capacity(layouts.len());
        for layout in &layouts {
            tracing::info!(
                study_id = %layout.study_id,
                main = %layout.main,
                sub_studies = layout.sub_studies.len(),
                "converting study"
            );
            let catalog = VariableCatalog::build(&groups, layout)?;
            let mut dataset = study_dataset(&self.config, &mut self.cache, layout, &catalog, None)?;

            if let Some(restricted) = &restricted {
                let title = dataset.get("title").and_then(Value::as_str).unwrap_or(&layout.study_id).to_string();
                let materials = self.restricted_materials(restricted, layout, &catalog, &title)?;
                if !materials.is_empty() {
                    tracing::info!(study_id = %layout.study_id, materials = materials.len(), "attached restricted materials");
                    dataset.set("isAbout", materials);
                }
            }
            parts.push(Value::from(dataset));
        }

        let study_ids: Vec<&str> = layouts.iter().map(|l| l.study_id.as_str()).collect();
        let mut props = PropertyMap::new();
        props.insert("title", format!("dbGaP studies {}", study_ids.join(", ")));
        props.insert("hasPart", parts);
        Ok(build::node(&self.config, NodeKind::Dataset, props))
    }

    fn read_tables(&self, groups: &FileGroups, study_id: &str) -> Result<ConsentTables> {
        let mut by_consent = ConsentTables::new();
        let Some(study) = groups.study(study_id) else { return Ok(by_consent) };

        for files in study.values() {
            for (&rt, by_type) in files {
                let Some(tables) = by_type.get(&FileType::Table) else { continue };
                if rt == RecordType::Pedigree {
                    tracing::debug!(study_id, "pedigree tables are not converted");
                    continue;
                }
                let id_column = if rt.is_subject_level() {
                    &self.config.subject_id_column
                } else {
                    &self.config.sample_id_column
                };
                for file in tables {
                    let table = read_attribute_table(&file.path, rt, id_column)?;
                    let consent = file.consent_suffix().unwrap_or_default().to_string();
                    match by_consent.entry(consent).or_default().entry(rt) {
                        Entry::Vacant(slot) => {
                            slot.insert(table);
                        }
                        Entry::Occupied(mut slot) => {
                            merge_tables(slot.get_mut(), &table)?;
                        }
                    }
                }
            }
        }
        Ok(by_consent)
    }

    /// Subject materials first, then samples, so every sample's subject is
    /// already embedded and is referenced.
    fn restricted_materials(
        &mut self,
        groups: &FileGroups,
        layout: &StudyLayout,
        catalog: &VariableCatalog,
        study_title: &str,
    ) -> Result<Vec<Value>> {
        let resolver = VariableResolver::new(catalog);
        let mut subjects_out = Vec::new();
        let mut samples_out = Vec::new();

        for (consent, mut tables) in self.read_tables(groups, &layout.study_id)? {
            let consent = (!consent.is_empty()).then_some(consent.as_str());
            let subjects = combine(&mut tables, RecordType::Subject, RecordType::SubjectPhenotypes)?
                .unwrap_or_else(|| AttributeTable::new(RecordType::Subject, &self.config.subject_id_column));
            let samples = combine(&mut tables, RecordType::Sample, RecordType::SampleAttributes)?;

            for row in subjects.rows.values() {
                subjects_out.push(subject_material(&self.config, &mut self.cache, &resolver, study_title, row, consent)?);
            }
            for row in samples.iter().flat_map(|t| t.rows.values()) {
                samples_out.push(sample_material(
                    &self.config,
                    &mut self.cache,
                    &resolver,
                    study_title,
                    row,
                    &subjects,
                    consent,
                )?);
            }
        }

        subjects_out.extend(samples_out);
        Ok(subjects_out)
    }

    /// End the session and report what the cache did.
    pub fn finish(self) -> CacheStats {
        let stats = self.cache.stats();
        tracing::info!(
            entities = self.cache.len(),
            created = stats.created,
            referenced = stats.referenced,
            "conversion session finished"
        );
        stats
    }
}

/// `primary` with `secondary` merged into it, or whichever exists.
fn combine(
    tables: &mut BTreeMap<RecordType, AttributeTable>,
    primary: RecordType,
    secondary: RecordType,
) -> Result<Option<AttributeTable>> {
    let second = tables.remove(&secondary);
    match (tables.remove(&primary), second) {
        (Some(mut first), Some(second)) => {
            merge_tables(&mut first, &second)?;
            Ok(Some(first))
        }
        (first, second) => Ok(first.or(second)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::AttributeRow;

    fn table(rt: RecordType, rows: &[(&str, &str, &str)]) -> AttributeTable {
        let mut t = AttributeTable::new(rt, "id");
        for (id, col, val) in rows {
            t.rows.insert(id.to_string(), AttributeRow::new(*id).with_cell(*col, *val, rt));
        }
        t
    }

    #[test]
    fn test_combine_merges_secondary() {
        let mut tables = BTreeMap::new();
        tables.insert(RecordType::Subject, table(RecordType::Subject, &[("1", "SEX", "2")]));
        tables.insert(
            RecordType::SubjectPhenotypes,
            table(RecordType::SubjectPhenotypes, &[("1", "AGE", "60-69")]),
        );
        let merged = combine(&mut tables, RecordType::Subject, RecordType::SubjectPhenotypes)
            .unwrap()
            .unwrap();
        assert_eq!(merged.get("1").unwrap().value("AGE"), Some("60-69"));
        assert!(tables.is_empty());
    }

    #[test]
    fn test_combine_falls_back_to_secondary() {
        let mut tables = BTreeMap::new();
        tables.insert(RecordType::SampleAttributes, table(RecordType::SampleAttributes, &[("S", "X", "1")]));
        let only = combine(&mut tables, RecordType::Sample, RecordType::SampleAttributes).unwrap();
        assert_eq!(only.unwrap().record_type, RecordType::SampleAttributes);
    }

    #[test]
    fn test_empty_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(ConvertConfig::default());
        assert!(matches!(
            session.convert_study(dir.path(), None),
            Err(Error::StudyStructure { .. })
        ));
    }
}
