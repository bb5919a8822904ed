//! # Plan compiler (C5)
//!
//! Compiles one [`Selection`] against a [`Universe`] into an ordered list
//! of materialization steps (spec §4.4). The plan is data — a separate
//! [`run`] walks it against a [`RowSet`], keeping "what to compute" and
//! "how to compute it" (C6) apart, the way a query planner and its
//! executor are kept apart upstream.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::exec::{ExecError, RowSet};
use crate::expr::{identifiers, Ast};
use crate::selection::Selection;
use crate::universe::{AggregateFunc, Attribute, Direction, Universe, UniverseError};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Universe(#[from] UniverseError),
}

#[derive(Debug, Clone)]
pub enum Step {
    Rank {
        name: String,
        ordering: Vec<(String, Direction)>,
        partition_by: Option<String>,
    },
    Aggregate {
        name: String,
        source: String,
        func: AggregateFunc,
        direction: Option<Direction>,
        partition_by: Option<String>,
        gating: Vec<String>,
    },
    Expression {
        name: String,
        ast: Ast,
    },
    Filter {
        name: String,
        ast: Ast,
    },
    /// Boolean conjunction of `inputs`, used for both `filters_level_L`
    /// and the final `is_selected` step.
    Conjunction {
        name: String,
        inputs: Vec<String>,
    },
    FailedFilters {
        name: String,
        inputs: Vec<String>,
    },
}

/// The compiled plan for one selection: an ordered list of steps plus the
/// bookkeeping the output shaper (C7) needs to find the right columns.
#[derive(Debug, Clone)]
pub struct Plan {
    pub steps: Vec<Step>,
    pub filter_columns: Vec<String>,
    pub level_mask_columns: Vec<String>,
    pub is_selected_column: String,
    pub failed_filters_column: String,
}

/// Compiles `selection` against `universe`, per spec §4.4 steps 1–6 plus
/// the final `is_selected`/`failed_filters` emission.
pub fn compile(universe: &Universe, selection: &Selection) -> Result<Plan, PlanError> {
    let mut materialized: HashSet<String> = universe.inputs().into_iter().map(String::from).collect();
    let mut preceding_masks: Vec<String> = Vec::new();
    let mut level_masks: Vec<String> = Vec::new();
    let mut filter_columns: Vec<String> = Vec::new();
    let mut steps: Vec<Step> = Vec::new();

    for level in selection.levels() {
        // Step 1: needed_L
        let mut needed: HashSet<String> = HashSet::new();
        for filter in selection.filters(level) {
            needed.extend(identifiers(&filter.expression));
        }
        needed.extend(selection.output_attrs(level).iter().cloned());

        // Step 2/3: expand to closure_L minus inputs/already-materialized,
        // topologically ordered. Sort the needed codes first so the
        // resulting step order is deterministic regardless of HashSet
        // iteration order — correctness only depends on each code's own
        // topological closure, which `universe.dependencies` guarantees.
        let mut needed_sorted: Vec<String> = needed.into_iter().collect();
        needed_sorted.sort();

        let mut closure_order: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for code in &needed_sorted {
            for dep in universe.dependencies(code)? {
                if materialized.contains(dep) || seen.contains(dep) {
                    continue;
                }
                seen.insert(dep.clone());
                closure_order.push(dep.clone());
            }
        }

        for code in &closure_order {
            match universe.get(code)? {
                Attribute::Input { .. } => {
                    // already in `materialized`; never appears in a closure
                    // minus inputs, but matched for exhaustiveness.
                }
                Attribute::Expression { expr, .. } => steps.push(Step::Expression {
                    name: code.clone(),
                    ast: expr.clone(),
                }),
                Attribute::Rank {
                    rank_keys,
                    partition_by,
                    ..
                } => {
                    let mut ordering: Vec<(String, Direction)> = preceding_masks
                        .iter()
                        .map(|m| (m.clone(), Direction::Desc))
                        .collect();
                    let mut keys = rank_keys.clone();
                    keys.sort_by_key(|k| k.order);
                    ordering.extend(keys.into_iter().map(|k| (k.attr_code, k.direction)));
                    steps.push(Step::Rank {
                        name: code.clone(),
                        ordering,
                        partition_by: partition_by.clone(),
                    });
                }
                Attribute::Aggregate {
                    source_code,
                    func,
                    direction,
                    partition_by,
                    ..
                } => steps.push(Step::Aggregate {
                    name: code.clone(),
                    source: source_code.clone(),
                    func: *func,
                    direction: *direction,
                    partition_by: partition_by.clone(),
                    gating: preceding_masks.clone(),
                }),
            }
            materialized.insert(code.clone());
        }

        // Step 4: filter steps
        let mut this_level_filters = Vec::new();
        for filter in selection.filters(level) {
            let col = selection.filter_column(filter.filter_id);
            steps.push(Step::Filter {
                name: col.clone(),
                ast: filter.expression.clone(),
            });
            this_level_filters.push(col.clone());
            filter_columns.push(col);
        }

        // Step 5/6: level mask, appended to preceding_masks
        let level_mask_name = Selection::level_column(level);
        let filter_count = this_level_filters.len();
        steps.push(Step::Conjunction {
            name: level_mask_name.clone(),
            inputs: this_level_filters,
        });
        debug!(
            level,
            materialized_steps = closure_order.len(),
            filters = filter_count,
            "compiled level"
        );
        level_masks.push(level_mask_name.clone());
        preceding_masks.push(level_mask_name);
    }

    let is_selected_column = "is_selected".to_string();
    steps.push(Step::Conjunction {
        name: is_selected_column.clone(),
        inputs: level_masks.clone(),
    });

    let failed_filters_column = "failed_filters".to_string();
    steps.push(Step::FailedFilters {
        name: failed_filters_column.clone(),
        inputs: filter_columns.clone(),
    });

    Ok(Plan {
        steps,
        filter_columns,
        level_mask_columns: level_masks,
        is_selected_column,
        failed_filters_column,
    })
}

/// Walks `plan`'s steps against `rows`, appending one column per step.
pub fn run(plan: &Plan, rows: &mut RowSet) -> Result<(), ExecError> {
    for step in &plan.steps {
        match step {
            Step::Rank {
                name,
                ordering,
                partition_by,
            } => rows.append_rank(name, ordering, partition_by.as_deref())?,
            Step::Aggregate {
                name,
                source,
                func,
                direction,
                partition_by,
                gating,
            } => rows.append_aggregate(name, source, *func, *direction, partition_by.as_deref(), gating)?,
            Step::Expression { name, ast } => rows.append_expression(name, ast)?,
            Step::Filter { name, ast } => rows.append_mask(name, ast)?,
            Step::Conjunction { name, inputs } => {
                rows.append_conjunction(name, inputs)?;
                if plan.level_mask_columns.iter().any(|m| m == name) {
                    let survivors = rows.column(name)?.iter().filter(|v| v.truthy()).count();
                    debug!(level_mask = %name, survivors, "level gate applied");
                }
            }
            Step::FailedFilters { name, inputs } => rows.append_failed_filters(name, inputs)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;
    use crate::selection::{Filter, OutputAttr, OutputSettings};
    use crate::value::{DataType, Value};

    fn universe_with_rank() -> Universe {
        let rank = Attribute::Rank {
            code: "R".to_string(),
            data_type: DataType::Int,
            rank_keys: vec![crate::universe::RankKey {
                attr_code: "A".to_string(),
                direction: Direction::Desc,
                order: 0,
            }],
            partition_by: None,
        };
        Universe::new(
            "A".to_string(),
            vec![
                Attribute::Input {
                    code: "A".to_string(),
                    data_type: DataType::Int,
                },
                Attribute::Input {
                    code: "B".to_string(),
                    data_type: DataType::String,
                },
                rank,
            ],
        )
        .unwrap()
    }

    #[test]
    fn scenario_two_level_zero_filter() {
        // scenario 2: filter R <= 2 at level 0, rows A=[10,20,20]
        let universe = universe_with_rank();
        let selection = Selection::new(
            1,
            vec![Filter {
                filter_id: 1,
                expression: parse("R <= 2").unwrap(),
                application_level: 0,
            }],
            vec![OutputAttr {
                attr_code: "R".to_string(),
                application_level: 0,
            }],
            OutputSettings {
                show_all: false,
                add_attributes: true,
                add_filters: false,
                add_failed_filters: false,
            },
        )
        .unwrap();

        let plan = compile(&universe, &selection).unwrap();
        let mut rows = RowSet::new(3);
        rows.append_column("A", vec![Value::Int(10), Value::Int(20), Value::Int(20)])
            .unwrap();
        rows.append_column(
            "B",
            vec![Value::string("x"), Value::string("y"), Value::string("z")],
        )
        .unwrap();

        run(&plan, &mut rows).unwrap();

        let selected: Vec<bool> = rows
            .column("is_selected")
            .unwrap()
            .iter()
            .map(|v| v.truthy())
            .collect();
        assert_eq!(selected, vec![false, true, true]);
    }

    #[test]
    fn no_levels_means_everything_is_selected() {
        let universe = universe_with_rank();
        let selection = Selection::new(1, vec![], vec![], OutputSettings::default()).unwrap();
        let plan = compile(&universe, &selection).unwrap();
        let mut rows = RowSet::new(2);
        rows.append_column("A", vec![Value::Int(1), Value::Int(2)]).unwrap();
        rows.append_column("B", vec![Value::string("x"), Value::string("y")])
            .unwrap();
        run(&plan, &mut rows).unwrap();
        let selected: Vec<bool> = rows.column("is_selected").unwrap().iter().map(|v| v.truthy()).collect();
        assert_eq!(selected, vec![true, true]);
    }
}
