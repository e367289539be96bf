//! Raw column name → variable definition.
//!
//! Lookup order for one column:
//!
//! 1. (record type, column, `.c<N>`): only when a consent group is known
//! 2. (record type, column, `""`): the pooled declaration
//!
//! A miss is not an error; the caller keeps the raw value unmapped.

use std::collections::BTreeMap;

use crate::catalog::{normalize_consent, VariableCatalog, VariableDefinition};
use crate::study::RecordType;
use crate::table::AttributeRow;

/// Read-only view over one study's catalog.
#[derive(Debug, Clone, Copy)]
pub struct VariableResolver<'a> {
    catalog: &'a VariableCatalog,
}

impl<'a> VariableResolver<'a> {
    pub fn new(catalog: &'a VariableCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a VariableCatalog {
        self.catalog
    }

    /// Resolve one column. `record_type = None` searches every record type
    /// in [`RecordType::ALL`] order. `consent` may be `c1` or `.c1`.
    pub fn resolve(
        &self,
        record_type: Option<RecordType>,
        column: &str,
        consent: Option<&str>,
    ) -> Option<&'a VariableDefinition> {
        let suffix = consent.map(normalize_consent).filter(|s| !s.is_empty());
        let found = suffix
            .and_then(|suffix| self.pick(record_type, column, &suffix))
            .or_else(|| self.pick(record_type, column, ""));
        if found.is_none() {
            tracing::trace!(column, ?record_type, ?consent, "column does not resolve to a variable");
        }
        found
    }

    fn pick(&self, record_type: Option<RecordType>, column: &str, suffix: &str) -> Option<&'a VariableDefinition> {
        let types = match record_type {
            Some(rt) => vec![rt],
            None => RecordType::ALL.to_vec(),
        };
        let mut candidates: Vec<&'a VariableDefinition> = types
            .into_iter()
            .flat_map(|rt| self.catalog.candidates(rt, column, suffix))
            .collect();

        if candidates.len() > 1 {
            // smallest display name, then smallest schema id
            candidates.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            tracing::debug!(
                column,
                suffix,
                chosen = %candidates[0].id,
                candidates = ?candidates.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
                "ambiguous column; applied tie-break"
            );
        }
        candidates.first().copied()
    }

    /// Resolve every column of a row, each against the record type that
    /// contributed it.
    pub fn resolve_row(&self, row: &AttributeRow, consent: Option<&str>) -> BTreeMap<String, &'a VariableDefinition> {
        row.cells
            .keys()
            .filter_map(|column| {
                let def = self.resolve(row.sources.get(column).copied(), column, consent)?;
                Some((column.clone(), def))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str, name: &str, suffix: &str, rt: RecordType) -> VariableDefinition {
        let mut d = VariableDefinition::new(id, name, rt);
        d.consent_suffix = suffix.into();
        d
    }

    fn sex_catalog() -> VariableCatalog {
        VariableCatalog::from_definitions(
            "phs000001.v1",
            [
                def("phv10", "SEX", "", RecordType::Subject),
                def("phv11", "SEX", ".c1", RecordType::Subject),
                def("phv12", "SEX", ".c2", RecordType::Subject),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pooled_wins_without_consent() {
        let cat = sex_catalog();
        let r = VariableResolver::new(&cat);
        assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", None).unwrap().id, "phv10");
    }

    #[test]
    fn test_consent_variant_wins_over_pooled() {
        let cat = sex_catalog();
        let r = VariableResolver::new(&cat);
        assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", Some("c1")).unwrap().id, "phv11");
        assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", Some(".c2")).unwrap().id, "phv12");
    }

    #[test]
    fn test_pooled_fallback_for_unknown_consent() {
        let cat = sex_catalog();
        let r = VariableResolver::new(&cat);
        assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", Some("c3")).unwrap().id, "phv10");
        assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", Some("")).unwrap().id, "phv10");
    }

    #[test]
    fn test_consent_fallback_when_no_pooled() {
        let cat = VariableCatalog::from_definitions(
            "phs000001.v1",
            [
                def("phv11", "SEX", ".c1", RecordType::Subject),
                def("phv12", "SEX", ".c2", RecordType::Subject),
            ],
        )
        .unwrap();
        let r = VariableResolver::new(&cat);
        assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", Some("c1")).unwrap().id, "phv11");
        assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", Some(".c2")).unwrap().id, "phv12");
        assert!(r.resolve(Some(RecordType::Subject), "SEX", None).is_none());
        assert!(r.resolve(Some(RecordType::Subject), "SEX", Some("c3")).is_none());
    }

    #[test]
    fn test_record_type_scoping() {
        let cat = sex_catalog();
        let r = VariableResolver::new(&cat);
        assert!(r.resolve(Some(RecordType::Sample), "SEX", None).is_none());
        assert_eq!(r.resolve(None, "SEX", None).unwrap().id, "phv10");
    }

    #[test]
    fn test_tie_break_across_record_types() {
        let cat = VariableCatalog::from_definitions(
            "phs000001.v1",
            [
                def("phv20", "AGE", "", RecordType::SubjectPhenotypes),
                def("phv07", "AGE", "", RecordType::Sample),
            ],
        )
        .unwrap();
        let r = VariableResolver::new(&cat);
        assert_eq!(r.resolve(None, "AGE", None).unwrap().id, "phv07");
    }
}
