//! # Output shaper (C7)
//!
//! Projects the requested columns out of an executed row set and
//! decides which rows survive, per spec §4.6. Column order is fixed:
//! key, then attributes, then filters, then `failed_filters`, then
//! `is_selected`.

use crate::exec::{ExecError, RowSet};
use crate::plan::Plan;
use crate::selection::{OutputSettings, Selection};
use crate::universe::Universe;
use crate::value::Value;

/// A shaped output table: a column header row plus one row of string
/// cells per surviving record, ready to hand to the CSV writer.
pub struct ShapedOutput {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

pub fn shape(
    universe: &Universe,
    selection: &Selection,
    plan: &Plan,
    rows: &RowSet,
) -> Result<ShapedOutput, ExecError> {
    let settings: OutputSettings = selection.output_settings();
    let key_column = universe.key_column();

    let mut header = vec![key_column.to_string()];

    if settings.add_attributes {
        let mask_names: std::collections::HashSet<&str> = plan
            .filter_columns
            .iter()
            .chain(plan.level_mask_columns.iter())
            .map(String::as_str)
            .chain([plan.is_selected_column.as_str(), plan.failed_filters_column.as_str()])
            .collect();
        for name in rows.column_names() {
            if name == key_column || mask_names.contains(name.as_str()) {
                continue;
            }
            header.push(name.clone());
        }
    }

    if settings.add_filters {
        header.extend(plan.filter_columns.iter().cloned());
        if settings.add_failed_filters {
            header.push(plan.failed_filters_column.clone());
        }
    }

    if settings.show_all {
        header.push(plan.is_selected_column.clone());
    }

    let is_selected = rows.column(&plan.is_selected_column)?;
    let mut out_rows = Vec::new();
    for row in 0..rows.row_count() {
        if !settings.show_all && !is_selected[row].truthy() {
            continue;
        }
        let mut cells = Vec::with_capacity(header.len());
        for col in &header {
            cells.push(rows.column(col)?[row].clone());
        }
        out_rows.push(cells);
    }

    Ok(ShapedOutput { header, rows: out_rows })
}
