//! # Execution engine (C6)
//!
//! A column-oriented row set plus the four materialization operations
//! (spec §4.5). Single-threaded within one selection; selections run in
//! parallel across workers (§5), each against its own `RowSet` built from
//! the shared, read-only input table.

use std::cmp::Ordering;
use std::collections::HashMap;

use thiserror::Error;

use crate::expr::{eval, Ast};
use crate::universe::{AggregateFunc, Direction};
use crate::value::{PartitionKey, Value};

pub mod limits;
pub use limits::{QueryTimeout, ResourceError, ResourceLimits, TimeoutError};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("column '{0}' already exists with a different definition")]
    ColumnConflict(String),
    #[error("column '{0}' is not materialized")]
    MissingColumn(String),
}

/// An ordered table of records keyed by stable row index (spec §3 "Row
/// set"). Columns are appended one at a time by the plan compiler's
/// materialization steps; nothing is ever mutated in place once written.
#[derive(Debug, Default)]
pub struct RowSet {
    row_count: usize,
    columns: HashMap<String, Vec<Value>>,
    column_order: Vec<String>,
}

impl RowSet {
    pub fn new(row_count: usize) -> Self {
        RowSet {
            row_count,
            columns: HashMap::new(),
            column_order: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&[Value], ExecError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ExecError::MissingColumn(name.to_string()))
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    /// Appends a fully materialized column. Idempotent per spec §4.5: a
    /// second append of an identical definition for the same name is a
    /// no-op; a conflicting one is a [`ExecError::ColumnConflict`].
    pub fn append_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), ExecError> {
        debug_assert_eq!(values.len(), self.row_count);
        if let Some(existing) = self.columns.get(name) {
            return if existing == &values {
                Ok(())
            } else {
                Err(ExecError::ColumnConflict(name.to_string()))
            };
        }
        self.columns.insert(name.to_string(), values);
        self.column_order.push(name.to_string());
        Ok(())
    }

    /// `append_expression(col_name, ast)`: evaluates `ast` per row over
    /// currently materialized columns. No gating is applied — expressions
    /// are pure functions of their referents (spec §4.4 step 3).
    pub fn append_expression(&mut self, name: &str, ast: &Ast) -> Result<(), ExecError> {
        let values: Vec<Value> = (0..self.row_count)
            .map(|row| {
                let resolve = |code: &str| self.row_value(code, row);
                eval(ast, &resolve)
            })
            .collect();
        self.append_column(name, values)
    }

    /// `append_mask(col_name, ast)`: equivalent to `append_expression`
    /// collapsed to a strict boolean (null ⇒ false), used for filter and
    /// level-mask columns.
    pub fn append_mask(&mut self, name: &str, ast: &Ast) -> Result<(), ExecError> {
        let values: Vec<Value> = (0..self.row_count)
            .map(|row| {
                let resolve = |code: &str| self.row_value(code, row);
                Value::Bool(eval(ast, &resolve).truthy())
            })
            .collect();
        self.append_column(name, values)
    }

    /// Conjunction of `columns` (already-materialized boolean columns),
    /// used for filter-level-mask (`filters_level_L`) and the final
    /// `is_selected` step (spec §4.4 steps 5 & "after the last level").
    pub fn append_conjunction(&mut self, name: &str, columns: &[String]) -> Result<(), ExecError> {
        let mut values = Vec::with_capacity(self.row_count);
        for row in 0..self.row_count {
            let mut all_true = true;
            for col in columns {
                if !self.column(col)?[row].truthy() {
                    all_true = false;
                    break;
                }
            }
            values.push(Value::Bool(all_true));
        }
        self.append_column(name, values)
    }

    /// `failed_filters`: semicolon-joined list of filter column names
    /// whose value is false for that row (spec §4.4, Open Question:
    /// delimiter fixed to `;`).
    pub fn append_failed_filters(&mut self, name: &str, filter_columns: &[String]) -> Result<(), ExecError> {
        let mut values = Vec::with_capacity(self.row_count);
        for row in 0..self.row_count {
            let mut failed = Vec::new();
            for col in filter_columns {
                if !self.column(col)?[row].truthy() {
                    failed.push(col.clone());
                }
            }
            values.push(Value::string(failed.join(";")));
        }
        self.append_column(name, values)
    }

    /// `append_rank(col_name, ordering, partition_by)`: assigns a 1-based
    /// rank per partition, ordered by `ordering` (gating keys first, then
    /// declared rank keys — spec §4.4's "Ordering of multiple rank keys").
    /// Ties break by original row order (stable sort); nulls sort last
    /// regardless of direction.
    pub fn append_rank(
        &mut self,
        name: &str,
        ordering: &[(String, Direction)],
        partition_by: Option<&str>,
    ) -> Result<(), ExecError> {
        let key_columns: Vec<(&[Value], Direction)> = ordering
            .iter()
            .map(|(col, dir)| Ok((self.column(col)?, *dir)))
            .collect::<Result<_, ExecError>>()?;

        let partitions = self.partition_indices(partition_by)?;
        let mut ranks = vec![Value::Null; self.row_count];

        for mut indices in partitions.into_values() {
            indices.sort_by(|&a, &b| compare_ranked(&key_columns, a, b));
            for (pos, idx) in indices.into_iter().enumerate() {
                ranks[idx] = Value::Int((pos + 1) as i64);
            }
        }

        self.append_column(name, ranks)
    }

    /// `append_aggregate`: windowed reduction of `source` over the
    /// partition, optionally a running (ordered) aggregate when
    /// `direction` is set (spec §4.4 step 3, "Aggregate step").
    /// `gating_columns` are the `preceding_masks` in effect for this
    /// level; a row whose gating doesn't hold contributes `func`'s
    /// identity element instead of its own source value.
    #[allow(clippy::too_many_arguments)]
    pub fn append_aggregate(
        &mut self,
        name: &str,
        source: &str,
        func: AggregateFunc,
        direction: Option<Direction>,
        partition_by: Option<&str>,
        gating_columns: &[String],
    ) -> Result<(), ExecError> {
        let source_values = self.column(source)?.to_vec();
        let gate_columns: Vec<&[Value]> = gating_columns
            .iter()
            .map(|c| self.column(c))
            .collect::<Result<_, ExecError>>()?;

        let gated = |row: usize| gate_columns.iter().all(|g| g[row].truthy());

        let partitions = self.partition_indices(partition_by)?;
        let mut out = vec![Value::Null; self.row_count];

        for indices in partitions.into_values() {
            match direction {
                None => {
                    let value = reduce(func, indices.iter().copied(), &source_values, &gated);
                    for &idx in &indices {
                        out[idx] = value.clone();
                    }
                }
                Some(dir) => {
                    self.running_aggregate(
                        func,
                        dir,
                        &indices,
                        &source_values,
                        &gated,
                        &mut out,
                    );
                }
            }
        }

        self.append_column(name, out)
    }

    #[allow(clippy::too_many_arguments)]
    fn running_aggregate(
        &self,
        func: AggregateFunc,
        dir: Direction,
        indices: &[usize],
        source_values: &[Value],
        gated: &dyn Fn(usize) -> bool,
        out: &mut [Value],
    ) {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_by(|&a, &b| {
            compare_ranked(&[(source_values, dir)], a, b)
        });

        let mut sum = 0.0_f64;
        let mut count: i64 = 0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut avg_sum = 0.0_f64;
        let mut avg_count: i64 = 0;

        let mut i = 0;
        while i < sorted.len() {
            let mut j = i;
            let key = &source_values[sorted[i]];
            while j < sorted.len() && same_order_key(key, &source_values[sorted[j]]) {
                j += 1;
            }
            // Accumulate contributions from the whole tie-group before
            // writing results, since "precedes or equals" includes ties.
            for &idx in &sorted[i..j] {
                if gated(idx) {
                    count += 1;
                    let v = &source_values[idx];
                    if let Some(f) = v.as_f64() {
                        sum += f;
                        min = min.min(f);
                        max = max.max(f);
                        avg_sum += f;
                        avg_count += 1;
                    }
                }
            }
            let value = match func {
                AggregateFunc::Sum => Value::Float(sum),
                AggregateFunc::Count => Value::Int(count),
                AggregateFunc::Min => {
                    if avg_count == 0 {
                        Value::Null
                    } else {
                        Value::Float(min)
                    }
                }
                AggregateFunc::Max => {
                    if avg_count == 0 {
                        Value::Null
                    } else {
                        Value::Float(max)
                    }
                }
                AggregateFunc::Avg => {
                    if avg_count == 0 {
                        Value::Null
                    } else {
                        Value::Float(avg_sum / avg_count as f64)
                    }
                }
            };
            for &idx in &sorted[i..j] {
                out[idx] = value.clone();
            }
            i = j;
        }
    }

    fn partition_indices(&self, partition_by: Option<&str>) -> Result<HashMap<PartitionKey, Vec<usize>>, ExecError> {
        let mut partitions: HashMap<PartitionKey, Vec<usize>> = HashMap::new();
        match partition_by {
            None => {
                partitions.insert(PartitionKey::Null, (0..self.row_count).collect());
            }
            Some(col) => {
                let values = self.column(col)?;
                for (row, v) in values.iter().enumerate() {
                    partitions.entry(PartitionKey::from(v)).or_default().push(row);
                }
            }
        }
        Ok(partitions)
    }

    fn row_value(&self, code: &str, row: usize) -> Value {
        self.columns
            .get(code)
            .map(|col| col[row].clone())
            .unwrap_or(Value::Null)
    }
}

fn same_order_key(a: &Value, b: &Value) -> bool {
    match (a.is_null(), b.is_null()) {
        (true, true) => true,
        (true, false) | (false, true) => false,
        (false, false) => a == b,
    }
}

fn reduce(
    func: AggregateFunc,
    rows: impl Iterator<Item = usize>,
    source_values: &[Value],
    gated: &dyn Fn(usize) -> bool,
) -> Value {
    let mut sum = 0.0_f64;
    let mut count: i64 = 0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut avg_sum = 0.0_f64;
    let mut avg_count: i64 = 0;

    for row in rows {
        if !gated(row) {
            continue;
        }
        count += 1;
        if let Some(f) = source_values[row].as_f64() {
            sum += f;
            min = min.min(f);
            max = max.max(f);
            avg_sum += f;
            avg_count += 1;
        }
    }

    match func {
        AggregateFunc::Sum => Value::Float(sum),
        AggregateFunc::Count => Value::Int(count),
        AggregateFunc::Min => {
            if avg_count == 0 {
                Value::Null
            } else {
                Value::Float(min)
            }
        }
        AggregateFunc::Max => {
            if avg_count == 0 {
                Value::Null
            } else {
                Value::Float(max)
            }
        }
        AggregateFunc::Avg => {
            if avg_count == 0 {
                Value::Null
            } else {
                Value::Float(avg_sum / avg_count as f64)
            }
        }
    }
}

/// Lexicographic comparator over an ordered key list; nulls always sort
/// last regardless of each key's direction (spec §4.4 "Nulls").
fn compare_ranked(keys: &[(&[Value], Direction)], a: usize, b: usize) -> Ordering {
    for (col, dir) in keys {
        let va = &col[a];
        let vb = &col[b];
        let ord = match (va.is_null(), vb.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let c = va.partial_cmp(vb).unwrap_or(Ordering::Equal);
                if *dir == Direction::Desc {
                    c.reverse()
                } else {
                    c
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
