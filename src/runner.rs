//! Orchestration: load the universe, selections, and input table once,
//! then run each selection independently (spec §5's embarrassingly
//! parallel model). A failure in one selection is reported and that
//! selection's output file is omitted; it does not abort the run (spec
//! §4.7).

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, info_span, warn};

use crate::config::Config;
use crate::exec::{ResourceLimits, RowSet};
use crate::io::{csv_io, selection_json, universe_json, IoError};
use crate::plan;
use crate::selection::Selection;
use crate::universe::Universe;
use crate::{output, value::Value};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("loading universe: {0}")]
    Universe(#[source] IoError),
    #[error("loading selections: {0}")]
    Selections(#[source] IoError),
    #[error("loading input data: {0}")]
    InputData(#[source] IoError),
}

/// Outcome of one selection's run, reported back to the caller so a
/// partial run can still exit with the right status and a useful
/// message (spec §4.7, §6 "partial outputs on per-selection failures").
pub struct SelectionOutcome {
    pub selection_id: i64,
    pub result: Result<PathBuf, String>,
}

/// Runs every selection in `selections` against `universe`/`input` and
/// writes `output_{selection_id}.csv` into `output_dir` for each one that
/// succeeds.
pub fn run_all(
    universe: &Universe,
    input: &RowSet,
    selections: &[Selection],
    output_dir: &Path,
    jobs: usize,
    limits: &ResourceLimits,
) -> Vec<SelectionOutcome> {
    let run_one = |selection: &Selection| -> SelectionOutcome {
        let span = info_span!("selection", id = selection.selection_id);
        let _enter = span.enter();
        let result = run_selection(universe, input, selection, output_dir, limits);
        match &result {
            Ok(path) => info!(path = %path.display(), "selection completed"),
            Err(err) => warn!(error = %err, "selection failed"),
        }
        SelectionOutcome {
            selection_id: selection.selection_id,
            result,
        }
    };

    if jobs == 1 {
        selections.iter().map(run_one).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build();
        match pool {
            Ok(pool) => pool.install(|| selections.par_iter().map(run_one).collect()),
            Err(_) => selections.par_iter().map(run_one).collect(),
        }
    }
}

fn run_selection(
    universe: &Universe,
    input: &RowSet,
    selection: &Selection,
    output_dir: &Path,
    limits: &ResourceLimits,
) -> Result<PathBuf, String> {
    limits.check_rows(input.row_count()).map_err(|e| e.to_string())?;

    let timeout = limits.timeout_controller();
    let plan = plan::compile(universe, selection).map_err(|e| e.to_string())?;
    // Every step appends exactly one column, so this is the exact final
    // column count without having to run the plan first.
    limits
        .check_columns(input.column_names().len() + plan.steps.len())
        .map_err(|e| e.to_string())?;

    let mut rows = clone_row_set(input);
    plan::run(&plan, &mut rows).map_err(|e| e.to_string())?;

    let shaped = output::shape(universe, selection, &plan, &rows).map_err(|e| e.to_string())?;
    timeout.check().map_err(|e| e.to_string())?;

    let out_path = output_dir.join(format!("output_{}.csv", selection.selection_id));
    csv_io::write_output(&out_path, &shaped).map_err(|e| e.to_string())?;
    Ok(out_path)
}

/// Each selection mutates its own copy of the input row set by appending
/// derived columns (spec §5: "each worker materializes derived columns
/// into its own side table"). The input table itself is small enough
/// (one run's worth of CSV) that a full clone per selection is simpler
/// than a copy-on-write overlay, and keeps workers from touching shared
/// state at all.
fn clone_row_set(input: &RowSet) -> RowSet {
    let mut clone = RowSet::new(input.row_count());
    for name in input.column_names() {
        let values: Vec<Value> = input.column(name).expect("column_names lists materialized columns").to_vec();
        clone
            .append_column(name, values)
            .expect("cloning into an empty RowSet never conflicts");
    }
    clone
}

pub struct LoadedRun {
    pub universe: Universe,
    pub selections: Vec<Selection>,
    pub input: RowSet,
}

/// Loads the universe, selections, and input CSV from `input_dir`,
/// per the well-known file names in `config` (spec §6's process surface).
pub fn load(input_dir: &Path, config: &Config) -> Result<LoadedRun, RunnerError> {
    let universe_path = input_dir.join(&config.io.universe_json);
    let universe = universe_json::load(&universe_path).map_err(RunnerError::Universe)?;

    let selection_path = input_dir.join(&config.io.selection_json);
    let selections = selection_json::load(&selection_path).map_err(RunnerError::Selections)?;

    let input_csv_path = input_dir.join(&config.io.input_csv);
    let input = csv_io::load_input(&input_csv_path, &universe).map_err(RunnerError::InputData)?;

    Ok(LoadedRun {
        universe,
        selections,
        input,
    })
}
