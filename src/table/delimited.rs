//! Reader for dbGaP restricted tab-delimited tables.
//!
//! ```text
//! # Study accession: phs000424.v7.p2
//! # Table accession: pht002742.v7.p2.c1
//! # Consent group: General Research Use
//!
//! dbGaP_Subject_ID	SUBJID	SEX	AGE
//! 1	GTEX-1117F	2	60-69
//! ```

use std::path::Path;

use super::{AttributeRow, AttributeTable, Cell};
use crate::study::RecordType;
use crate::{Error, Result};

const STUDY_ACCESSION: &str = "Study accession:";
const TABLE_ACCESSION: &str = "Table accession:";

fn structural(path: &Path, message: impl Into<String>) -> Error {
    Error::StructuralParse { path: path.to_path_buf(), message: message.into() }
}

/// Read a restricted table, keying rows by `id_column`.
pub fn read_attribute_table(path: &Path, record_type: RecordType, id_column: &str) -> Result<AttributeTable> {
    tracing::info!(path = %path.display(), %record_type, "reading");
    let content = std::fs::read_to_string(path)?;
    parse_attribute_table_str(&content, path, record_type, id_column)
}

/// Parse table text. `path` is used for error messages only.
pub fn parse_attribute_table_str(
    content: &str,
    path: &Path,
    record_type: RecordType,
    id_column: &str,
) -> Result<AttributeTable> {
    let mut table = AttributeTable::new(record_type, id_column);
    let mut id_index = None;

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim();
            if let Some(acc) = comment.strip_prefix(STUDY_ACCESSION) {
                table.study_accession = Some(acc.trim().to_string());
            } else if let Some(acc) = comment.strip_prefix(TABLE_ACCESSION) {
                table.table_accession = Some(acc.trim().to_string());
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let Some(idx) = id_index else {
            table.headers = fields.iter().map(|f| f.trim().to_string()).collect();
            let idx = table
                .headers
                .iter()
                .position(|h| h == id_column)
                .ok_or_else(|| structural(path, format!("primary key column '{id_column}' not in header")))?;
            id_index = Some(idx);
            continue;
        };

        if fields.len() != table.headers.len() {
            return Err(structural(
                path,
                format!(
                    "line {}: expected {} fields, found {}",
                    lineno + 1,
                    table.headers.len(),
                    fields.len()
                ),
            ));
        }
        let id = fields[idx].trim();
        if id.is_empty() {
            return Err(structural(path, format!("line {}: empty {id_column}", lineno + 1)));
        }
        if table.rows.contains_key(id) {
            return Err(Error::DuplicateKey { kind: id_column.to_string(), key: id.to_string() });
        }

        let mut row = AttributeRow::new(id);
        for (header, value) in table.headers.iter().zip(&fields) {
            row.cells.insert(header.clone(), Cell::new(value.trim()));
            row.sources.insert(header.clone(), record_type);
        }
        table.rows.insert(id.to_string(), row);
    }

    if id_index.is_none() {
        return Err(structural(path, "no header line"));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBJECTS: &str = "# Study accession: phs000424.v7.p2\n\
        # Table accession: pht002742.v7.p2.c1\n\
        # Consent group: General Research Use\n\
        \n\
        dbGaP_Subject_ID\tSUBJID\tSEX\tAGE\n\
        1\tGTEX-1117F\t2\t60-69\n\
        2\tGTEX-111CU\t1\t\n";

    fn parse(content: &str) -> Result<AttributeTable> {
        parse_attribute_table_str(content, Path::new("t.txt"), RecordType::Subject, "dbGaP_Subject_ID")
    }

    #[test]
    fn test_reads_accessions_and_rows() {
        let t = parse(SUBJECTS).unwrap();
        assert_eq!(t.study_accession.as_deref(), Some("phs000424.v7.p2"));
        assert_eq!(t.table_accession.as_deref(), Some("pht002742.v7.p2.c1"));
        assert_eq!(t.headers, ["dbGaP_Subject_ID", "SUBJID", "SEX", "AGE"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get("1").unwrap().value("SUBJID"), Some("GTEX-1117F"));
        assert_eq!(t.get("2").unwrap().value("AGE"), None);
    }

    #[test]
    fn test_field_count_mismatch() {
        let err = parse("dbGaP_Subject_ID\tSEX\n1\t2\t3\n").unwrap_err();
        assert!(matches!(err, Error::StructuralParse { .. }));
    }

    #[test]
    fn test_missing_id_column() {
        assert!(parse("SUBJID\tSEX\nA\t1\n").is_err());
    }

    #[test]
    fn test_duplicate_id() {
        let err = parse("dbGaP_Subject_ID\tSEX\n1\t2\n1\t1\n").unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }
}
