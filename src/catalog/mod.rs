//! Per-study variable catalog.
//!
//! Every variable declared by the study's data dictionaries (and the
//! per-consent-group variables of its variable reports) is registered under
//! two indexes at once:
//!
//! - exact: schema id → definition
//! - ambiguity: (record type, display name, consent suffix) → schema ids
//!
//! The catalog is filled once and then only read.

pub mod variable;
pub mod xml;

use chrono::NaiveDateTime;
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

pub use variable::{
    base_variable_id, normalize_consent, split_consent_suffix, CodedValue, SummaryStats,
    VariableDefinition, VariableType,
};
pub use xml::{parse_data_table_str, read_data_table, DataTable, RawVariable};

use crate::study::{FileGroups, FileType, RecordType, StudyLayout};
use crate::{Error, Result};

/// Key of the ambiguity index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameKey {
    pub record_type: RecordType,
    pub name: String,
    /// `""` or `.c<N>`
    pub consent_suffix: String,
}

impl NameKey {
    pub fn new(record_type: RecordType, name: &str, consent_suffix: &str) -> Self {
        Self { record_type, name: name.to_string(), consent_suffix: consent_suffix.to_string() }
    }
}

/// One XML document that contributed to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    pub table_id: Option<String>,
    pub record_type: RecordType,
    pub file_type: FileType,
    pub description: Option<String>,
    pub date_created: Option<String>,
    pub created: Option<NaiveDateTime>,
    pub variables: usize,
}

/// Variable definitions of one study.
#[derive(Debug, Clone, Default)]
pub struct VariableCatalog {
    study_id: String,
    by_id: HashMap<String, VariableDefinition>,
    by_name: HashMap<NameKey, SmallVec<[String; 2]>>,
    /// Schema ids already seen in a variable report.
    reported: HashSet<String>,
    tables: Vec<TableInfo>,
}

impl VariableCatalog {
    pub fn new(study_id: impl Into<String>) -> Self {
        Self { study_id: study_id.into(), ..Self::default() }
    }

    /// Build from ready-made definitions.
    pub fn from_definitions(
        study_id: impl Into<String>,
        defs: impl IntoIterator<Item = VariableDefinition>,
    ) -> Result<Self> {
        let mut catalog = Self::new(study_id);
        for def in defs {
            catalog.register(def)?;
        }
        Ok(catalog)
    }

    /// Read the main group's dictionaries and reports for one study.
    pub fn build(groups: &FileGroups, layout: &StudyLayout) -> Result<Self> {
        let mut catalog = Self::new(&layout.study_id);

        for rt in RecordType::ALL {
            for ft in [FileType::DataDict, FileType::VarReport] {
                if let Some(file) = groups.xml_file(&layout.study_id, &layout.main, rt, ft) {
                    let table = read_data_table(&file.path)?;
                    catalog.add_data_table(&table, rt, ft)?;
                }
            }
        }

        for sub in &layout.sub_studies {
            let Some(files) = groups.group(&layout.study_id, sub) else { continue };
            for file in files.values().flat_map(|by_type| by_type.values()).flatten() {
                tracing::debug!(file = %file.name, sub_study = %sub, "skipping sub-study file");
            }
        }

        tracing::info!(
            study_id = %layout.study_id,
            variables = catalog.len(),
            tables = catalog.tables.len(),
            "built variable catalog"
        );
        Ok(catalog)
    }

    /// Add one definition to both indexes.
    pub fn register(&mut self, def: VariableDefinition) -> Result<()> {
        if self.by_id.contains_key(&def.id) {
            return Err(Error::DuplicateKey { kind: "variable".into(), key: def.id });
        }
        for name in std::iter::once(&def.name).chain(&def.aliases) {
            self.index_name(def.record_type, name, &def.consent_suffix, &def.id);
        }
        self.by_id.insert(def.id.clone(), def);
        Ok(())
    }

    fn index_name(&mut self, rt: RecordType, name: &str, suffix: &str, id: &str) {
        let ids = self.by_name.entry(NameKey::new(rt, name, suffix)).or_default();
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }

    /// Register the variables of a parsed dictionary or variable report.
    pub fn add_data_table(&mut self, table: &DataTable, rt: RecordType, ft: FileType) -> Result<()> {
        if base_variable_id(&table.study_id) != base_variable_id(&self.study_id) {
            return Err(Error::StudyStructure {
                study_id: self.study_id.clone(),
                message: format!("document belongs to study {}", table.study_id),
            });
        }

        for raw in &table.variables {
            match ft {
                FileType::VarReport => self.add_reported(raw, rt)?,
                _ => self.register(definition_from_raw(raw, rt))?,
            }
        }

        self.tables.push(TableInfo {
            table_id: table.table_id.clone(),
            record_type: rt,
            file_type: ft,
            description: table.description.clone(),
            date_created: table.date_created.clone(),
            created: table.created,
            variables: table.variables.len(),
        });
        Ok(())
    }

    /// A report entry either adds statistics to a dictionary variable or,
    /// for a consent-group entry, becomes a definition of its own.
    fn add_reported(&mut self, raw: &RawVariable, rt: RecordType) -> Result<()> {
        if !self.reported.insert(raw.id.clone()) {
            return Err(Error::DuplicateKey { kind: "variable".into(), key: raw.id.clone() });
        }
        let (_, id_suffix) = split_consent_suffix(&raw.id);
        let target = if self.by_id.contains_key(&raw.id) {
            Some(raw.id.clone())
        } else if id_suffix.is_empty() {
            let base = base_variable_id(&raw.id);
            self.by_id.contains_key(base).then(|| base.to_string())
        } else {
            None
        };

        if let Some(id) = target {
            return self.enrich(&id, raw);
        }

        let mut def = definition_from_raw(raw, rt);
        if let Some(base) = self.by_id.get(base_variable_id(&raw.id)) {
            def.description = def.description.or_else(|| base.description.clone());
            if def.var_type == VariableType::Unknown {
                def.var_type = base.var_type;
            }
            if def.coded_values.is_empty() {
                def.coded_values = base.coded_values.clone();
            }
            def.unit = def.unit.or_else(|| base.unit.clone());
        }
        self.register(def)
    }

    fn enrich(&mut self, id: &str, raw: &RawVariable) -> Result<()> {
        let Some(def) = self.by_id.get_mut(id) else {
            return Err(Error::UnresolvedReference { kind: "variable".into(), key: id.to_string() });
        };
        if raw.stats.is_some() {
            def.stats = raw.stats.clone();
        }
        if def.description.is_none() {
            def.description = raw.description.clone();
        }
        if def.var_type == VariableType::Unknown {
            def.var_type = declared_type(raw);
        }

        let alias = raw
            .display_name()
            .map(|n| split_consent_suffix(n).0)
            .filter(|n| *n != def.name && !def.aliases.iter().any(|a| a == n))
            .map(str::to_string);
        if let Some(alias) = alias {
            def.aliases.push(alias.clone());
            let (rt, suffix) = (def.record_type, def.consent_suffix.clone());
            self.index_name(rt, &alias, &suffix, id);
        }
        Ok(())
    }

    pub fn study_id(&self) -> &str {
        &self.study_id
    }

    pub fn get(&self, id: &str) -> Option<&VariableDefinition> {
        self.by_id.get(id)
    }

    /// Schema ids registered under one ambiguity key, in registration order.
    pub fn candidate_ids(&self, rt: RecordType, name: &str, consent_suffix: &str) -> &[String] {
        self.by_name
            .get(&NameKey::new(rt, name, consent_suffix))
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn candidates(
        &self,
        rt: RecordType,
        name: &str,
        consent_suffix: &str,
    ) -> impl Iterator<Item = &VariableDefinition> {
        self.candidate_ids(rt, name, consent_suffix).iter().filter_map(|id| self.by_id.get(id))
    }

    /// All definitions in schema-id order.
    pub fn iter(&self) -> impl Iterator<Item = &VariableDefinition> {
        let mut defs: Vec<_> = self.by_id.values().collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs.into_iter()
    }

    pub fn by_record_type(&self, rt: RecordType) -> impl Iterator<Item = &VariableDefinition> {
        self.iter().filter(move |d| d.record_type == rt)
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn declared_type(raw: &RawVariable) -> VariableType {
    VariableType::first_known([
        raw.declared_type.as_deref(),
        raw.reported_type.as_deref(),
        raw.calculated_type.as_deref(),
    ])
}

/// Consent suffix from the schema id, else from the display name.
fn definition_from_raw(raw: &RawVariable, rt: RecordType) -> VariableDefinition {
    let display = raw.display_name().unwrap_or(&raw.id);
    let (_, id_suffix) = split_consent_suffix(&raw.id);
    let (name, name_suffix) = split_consent_suffix(display);
    let suffix = if id_suffix.is_empty() { name_suffix } else { id_suffix };

    let mut def = VariableDefinition::new(&raw.id, name, rt).with_type(declared_type(raw));
    def.consent_suffix = suffix.to_string();
    def.description = raw.description.clone();
    def.unit = raw.unit.clone();
    def.comment = raw.comment.clone();
    def.coded_values = raw.values.clone();
    def.stats = raw.stats.clone();
    def
}
