//! Conflict-detecting merge of attribute rows.
//!
//! `merge(target, source)` adds every column of `source` that `target`
//! lacks. A column present in both must hold an identical cell. The check
//! runs over all columns before anything is inserted, so a failed merge
//! leaves `target` as it was.

use super::{AttributeRow, AttributeTable};
use crate::{Error, Result};

/// Merge one row into another.
pub fn merge(target: &mut AttributeRow, source: &AttributeRow) -> Result<()> {
    for (column, incoming) in &source.cells {
        if let Some(existing) = target.cells.get(column) {
            if existing != incoming {
                return Err(Error::PropertyConflict {
                    row_id: target.id.clone(),
                    column: column.clone(),
                    existing: existing.raw.clone(),
                    incoming: incoming.raw.clone(),
                });
            }
        }
    }

    for (column, cell) in &source.cells {
        if target.cells.contains_key(column) {
            continue;
        }
        target.cells.insert(column.clone(), cell.clone());
        if let Some(rt) = source.sources.get(column) {
            target.sources.insert(column.clone(), *rt);
        }
    }
    Ok(())
}

/// Outcome of [`merge_tables`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub merged: usize,
    pub unmatched: usize,
}

/// Merge `source` rows into the `target` rows with the same primary id.
///
/// The target defines the entity set: unmatched source rows are counted and
/// dropped.
pub fn merge_tables(target: &mut AttributeTable, source: &AttributeTable) -> Result<MergeReport> {
    let mut report = MergeReport::default();
    for (id, row) in &source.rows {
        match target.rows.get_mut(id) {
            Some(existing) => {
                merge(existing, row)?;
                report.merged += 1;
            }
            None => {
                tracing::debug!(id = %id, record_type = %source.record_type, "row has no counterpart in target table");
                report.unmatched += 1;
            }
        }
    }

    for header in &source.headers {
        if !target.headers.contains(header) {
            target.headers.push(header.clone());
        }
    }
    tracing::debug!(
        target = %target.record_type,
        source = %source.record_type,
        merged = report.merged,
        unmatched = report.unmatched,
        "merged attribute tables"
    );
    Ok(report)
}
