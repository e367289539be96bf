//! Attribute tables: restricted subject/sample rows keyed by primary id.

pub mod delimited;
pub mod merge;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use delimited::{parse_attribute_table_str, read_attribute_table};
pub use merge::{merge, merge_tables, MergeReport};

use crate::study::RecordType;

/// One cell: the raw text and, when present, the value carried forward.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub raw: String,
    pub mapped: Option<String>,
}

impl Cell {
    /// Empty text maps to nothing.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mapped = (!raw.is_empty()).then(|| raw.clone());
        Self { raw, mapped }
    }
}

/// One entity's attributes, possibly gathered from several files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRow {
    pub id: String,
    pub cells: BTreeMap<String, Cell>,
    /// Record type of the file each column came from.
    pub sources: BTreeMap<String, RecordType>,
}

impl AttributeRow {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    pub fn with_cell(mut self, column: impl Into<String>, raw: impl Into<String>, source: RecordType) -> Self {
        let column = column.into();
        self.sources.insert(column.clone(), source);
        self.cells.insert(column, Cell::new(raw));
        self
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    /// Mapped value of a column.
    pub fn value(&self, column: &str) -> Option<&str> {
        self.cells.get(column)?.mapped.as_deref()
    }
}

/// Rows of one restricted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTable {
    pub record_type: RecordType,
    /// From the `# Study accession:` comment line.
    pub study_accession: Option<String>,
    /// From the `# Table accession:` comment line.
    pub table_accession: Option<String>,
    pub id_column: String,
    pub headers: Vec<String>,
    pub rows: BTreeMap<String, AttributeRow>,
}

impl AttributeTable {
    pub fn new(record_type: RecordType, id_column: impl Into<String>) -> Self {
        Self {
            record_type,
            study_accession: None,
            table_accession: None,
            id_column: id_column.into(),
            headers: Vec::new(),
            rows: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&AttributeRow> {
        self.rows.get(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_has_no_mapped_value() {
        assert_eq!(Cell::new("").mapped, None);
        assert_eq!(Cell::new("1").mapped.as_deref(), Some("1"));
    }

    #[test]
    fn test_row_builder_records_source() {
        let row = AttributeRow::new("S1").with_cell("SEX", "1", RecordType::SubjectPhenotypes);
        assert_eq!(row.value("SEX"), Some("1"));
        assert_eq!(row.sources["SEX"], RecordType::SubjectPhenotypes);
    }
}
