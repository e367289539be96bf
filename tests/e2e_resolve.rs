//! End-to-end tests for the variable catalog and column resolution.
//!
//! Catalogs are built from data-dictionary / variable-report XML, the same
//! way a session builds them, then queried through `VariableResolver`.

use std::path::Path;

use dats_graph::catalog::{parse_data_table_str, VariableType};
use dats_graph::study::FileType;
use dats_graph::{AttributeRow, RecordType, VariableCatalog, VariableDefinition, VariableResolver};

const STUDY: &str = "phs000001.v1";

fn catalog(docs: &[(RecordType, FileType, &str)]) -> VariableCatalog {
    let mut cat = VariableCatalog::new(STUDY);
    for (rt, ft, xml) in docs {
        let table = parse_data_table_str(xml, Path::new("inline.xml")).unwrap();
        cat.add_data_table(&table, *rt, *ft).unwrap();
    }
    cat
}

// ============================================================================
// 1. Pooled vs consent-group variables
// ============================================================================

const SEX_DICT: &str = r#"<data_table id="pht1.v1" study_id="phs000001.v1">
  <variable id="phv10"><name>SEX</name><type>encoded value</type>
    <value code="1">Male</value><value code="2">Female</value>
  </variable>
  <variable id="phv11"><name>SEX.c1</name></variable>
  <variable id="phv12"><name>SEX.c2</name></variable>
</data_table>"#;

#[test]
fn test_sex_pooled_and_consent_variants() {
    let cat = catalog(&[(RecordType::Subject, FileType::DataDict, SEX_DICT)]);
    let r = VariableResolver::new(&cat);

    assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", None).unwrap().id, "phv10");
    assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", Some("c1")).unwrap().id, "phv11");
    assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", Some(".c2")).unwrap().id, "phv12");
    // no consent-specific declaration for c3
    assert_eq!(r.resolve(Some(RecordType::Subject), "SEX", Some("c3")).unwrap().id, "phv10");

    let c1 = cat.get("phv11").unwrap();
    assert_eq!((c1.name.as_str(), c1.consent_suffix.as_str()), ("SEX", ".c1"));
    assert_eq!(cat.candidate_ids(RecordType::Subject, "SEX", ".c2"), ["phv12".to_string()]);
    assert_eq!(cat.get("phv10").unwrap().var_type, VariableType::Categorical);
}

#[test]
fn test_consent_variant_from_variable_report() {
    let dict = r#"<data_table study_id="phs000001.v1">
      <variable id="phv00169063.v1"><name>AGE</name><type>string</type></variable>
    </data_table>"#;
    let report = r#"<data_table study_id="phs000001.v1.p1">
      <variable id="phv00169063.v1.p1.c1" var_name="AGE"><description>Age bracket</description></variable>
    </data_table>"#;
    let cat = catalog(&[
        (RecordType::Subject, FileType::DataDict, dict),
        (RecordType::Subject, FileType::VarReport, report),
    ]);

    let per_consent = cat.get("phv00169063.v1.p1.c1").unwrap();
    assert_eq!(per_consent.consent_suffix, ".c1");
    assert_eq!(per_consent.var_type, VariableType::String);

    let only_consent = VariableCatalog::from_definitions(STUDY, [per_consent.clone()]).unwrap();
    let r = VariableResolver::new(&only_consent);
    assert_eq!(r.resolve(Some(RecordType::Subject), "AGE", Some(".c1")).unwrap().id, per_consent.id);
    assert!(r.resolve(Some(RecordType::Subject), "AGE", None).is_none());
}

// ============================================================================
// 2. Ambiguity tie-break
// ============================================================================

#[test]
fn test_subjid_tie_break_is_deterministic() {
    let cat = VariableCatalog::from_definitions(
        STUDY,
        [
            VariableDefinition::new("phv1", "SUBJID_ALT", RecordType::Subject).with_alias("SUBJID"),
            VariableDefinition::new("phv2", "SUBJID", RecordType::Subject),
        ],
    )
    .unwrap();
    let r = VariableResolver::new(&cat);
    for _ in 0..3 {
        let def = r.resolve(Some(RecordType::Subject), "SUBJID", None).unwrap();
        assert_eq!(def.id, "phv2");
        assert_eq!(def.name, "SUBJID");
    }
}

#[test]
fn test_same_name_in_two_phenotype_tables() {
    let a = r#"<data_table study_id="phs000001.v1"><variable id="phv30"><name>BMI</name></variable></data_table>"#;
    let b = r#"<data_table study_id="phs000001.v1"><variable id="phv29"><name>BMI</name></variable></data_table>"#;
    let cat = catalog(&[
        (RecordType::SubjectPhenotypes, FileType::DataDict, a),
        (RecordType::SubjectPhenotypes, FileType::DataDict, b),
    ]);
    let r = VariableResolver::new(&cat);
    assert_eq!(r.resolve(None, "BMI", None).unwrap().id, "phv29");
}

// ============================================================================
// 3. Whole rows
// ============================================================================

#[test]
fn test_resolve_row_uses_contributing_record_type() {
    let cat = catalog(&[(RecordType::Subject, FileType::DataDict, SEX_DICT)]);
    let r = VariableResolver::new(&cat);
    let row = AttributeRow::new("1")
        .with_cell("SEX", "2", RecordType::Subject)
        .with_cell("UNKNOWN_COL", "x", RecordType::Subject)
        .with_cell("SEX_SAMPLE", "1", RecordType::Sample);

    let resolved = r.resolve_row(&row, None);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved["SEX"].id, "phv10");
    assert_eq!(resolved["SEX"].label_for("2"), Some("Female"));

    let per_consent = r.resolve_row(&row, Some("c1"));
    assert_eq!(per_consent.len(), 1);
    assert_eq!(per_consent["SEX"].id, "phv11");
}
