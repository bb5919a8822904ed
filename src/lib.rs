//! # rowselect
//!
//! Evaluates layered Boolean **selections** over a tabular dataset. A
//! selection is authored against a **universe** of named attributes —
//! raw input columns plus derived ranks, windowed aggregates, and
//! arithmetic/logical expressions, each of which may depend transitively
//! on others. Filters are grouped into **application levels** that apply
//! sequentially: derived attributes at level *k* are recomputed using
//! only the records that survived every preceding level.
//!
//! ## Pipeline
//!
//! ```text
//! universe.json  ──► universe::Universe (dependency closures cached at load)
//! selection.json ──► selection::Selection (filters grouped by level)
//! input_data.csv ──► exec::RowSet
//!
//! (Universe, Selection) ──[plan::compile]──► plan::Plan
//! (Plan, RowSet)         ──[plan::run]─────► RowSet (derived columns appended)
//! (Universe, Selection, Plan, RowSet) ──[output::shape]──► output_{id}.csv
//! ```
//!
//! Selections are independent of one another once the universe and input
//! table are loaded, so [`runner::run_all`] evaluates them in parallel
//! (one worker per selection, no shared mutable state).

pub mod config;
pub mod exec;
pub mod expr;
pub mod io;
pub mod output;
pub mod plan;
pub mod runner;
pub mod selection;
pub mod universe;
pub mod value;
