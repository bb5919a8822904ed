//! Literal scenarios from the selection-engine design (ranking, level
//! gating, partitioned/masked aggregation, expression evaluation).

use rowselect::expr::{eval, identifiers, parse};
use rowselect::selection::{Filter, OutputAttr, OutputSettings, Selection};
use rowselect::universe::{AggregateFunc, Attribute, Direction, RankKey, Universe};
use rowselect::value::{DataType, Value};
use rowselect::{exec::RowSet, output, plan};

fn input(code: &str, data_type: DataType) -> Attribute {
    Attribute::Input {
        code: code.to_string(),
        data_type,
    }
}

#[test]
fn scenario_1_rank_breaks_ties_by_row_order() {
    let universe = Universe::new(
        "A".to_string(),
        vec![
            input("A", DataType::Int),
            input("B", DataType::String),
            Attribute::Rank {
                code: "R".to_string(),
                data_type: DataType::Int,
                rank_keys: vec![RankKey {
                    attr_code: "A".to_string(),
                    direction: Direction::Desc,
                    order: 0,
                }],
                partition_by: None,
            },
        ],
    )
    .unwrap();

    let selection = Selection::new(
        1,
        vec![],
        vec![OutputAttr {
            attr_code: "R".to_string(),
            application_level: 0,
        }],
        OutputSettings {
            show_all: true,
            add_attributes: true,
            add_filters: false,
            add_failed_filters: false,
        },
    )
    .unwrap();

    let plan = plan::compile(&universe, &selection).unwrap();
    let mut rows = RowSet::new(3);
    rows.append_column("A", vec![Value::Int(10), Value::Int(20), Value::Int(20)])
        .unwrap();
    rows.append_column(
        "B",
        vec![Value::string("x"), Value::string("y"), Value::string("z")],
    )
    .unwrap();
    plan::run(&plan, &mut rows).unwrap();

    let r: Vec<i64> = rows
        .column("R")
        .unwrap()
        .iter()
        .map(|v| if let Value::Int(i) = v { *i } else { panic!() })
        .collect();
    assert_eq!(r, vec![3, 1, 2]);
}

#[test]
fn scenario_2_filter_on_rank_keeps_only_top_two() {
    let universe = Universe::new(
        "A".to_string(),
        vec![
            input("A", DataType::Int),
            input("B", DataType::String),
            Attribute::Rank {
                code: "R".to_string(),
                data_type: DataType::Int,
                rank_keys: vec![RankKey {
                    attr_code: "A".to_string(),
                    direction: Direction::Desc,
                    order: 0,
                }],
                partition_by: None,
            },
        ],
    )
    .unwrap();

    let selection = Selection::new(
        1,
        vec![Filter {
            filter_id: 1,
            expression: parse("R <= 2").unwrap(),
            application_level: 0,
        }],
        vec![],
        OutputSettings {
            show_all: false,
            add_attributes: true,
            add_filters: false,
            add_failed_filters: false,
        },
    )
    .unwrap();

    let plan = plan::compile(&universe, &selection).unwrap();
    let mut rows = RowSet::new(3);
    rows.append_column("A", vec![Value::Int(10), Value::Int(20), Value::Int(20)])
        .unwrap();
    rows.append_column(
        "B",
        vec![Value::string("x"), Value::string("y"), Value::string("z")],
    )
    .unwrap();
    plan::run(&plan, &mut rows).unwrap();

    let shaped = output::shape(&universe, &selection, &plan, &rows).unwrap();
    assert_eq!(shaped.rows.len(), 2);
    let bs: Vec<String> = shaped
        .rows
        .iter()
        .map(|r| r[shaped.header.iter().position(|h| h == "B").unwrap()].to_string())
        .collect();
    assert_eq!(bs, vec!["y", "z"]);
}

#[test]
fn scenario_3_two_level_gated_rank() {
    let universe = Universe::new(
        "A".to_string(),
        vec![
            input("A", DataType::Int),
            input("B", DataType::Int),
            Attribute::Rank {
                code: "R2".to_string(),
                data_type: DataType::Int,
                rank_keys: vec![RankKey {
                    attr_code: "B".to_string(),
                    direction: Direction::Asc,
                    order: 0,
                }],
                partition_by: None,
            },
        ],
    )
    .unwrap();

    let selection = Selection::new(
        1,
        vec![
            Filter {
                filter_id: 1,
                expression: parse("A >= 15").unwrap(),
                application_level: 0,
            },
            Filter {
                filter_id: 2,
                expression: parse("R2 = 1").unwrap(),
                application_level: 1,
            },
        ],
        vec![],
        OutputSettings {
            show_all: false,
            add_attributes: true,
            add_filters: false,
            add_failed_filters: false,
        },
    )
    .unwrap();

    let plan = plan::compile(&universe, &selection).unwrap();
    let mut rows = RowSet::new(3);
    rows.append_column("A", vec![Value::Int(10), Value::Int(20), Value::Int(20)])
        .unwrap();
    rows.append_column("B", vec![Value::Int(9), Value::Int(7), Value::Int(8)])
        .unwrap();
    plan::run(&plan, &mut rows).unwrap();

    let shaped = output::shape(&universe, &selection, &plan, &rows).unwrap();
    assert_eq!(shaped.rows.len(), 1);
    let a_idx = shaped.header.iter().position(|h| h == "A").unwrap();
    let b_idx = shaped.header.iter().position(|h| h == "B").unwrap();
    assert_eq!(shaped.rows[0][a_idx], Value::Int(20));
    assert_eq!(shaped.rows[0][b_idx], Value::Int(7));
}

#[test]
fn level_mask_columns_are_excluded_from_attribute_output() {
    let universe = Universe::new(
        "A".to_string(),
        vec![input("A", DataType::Int), input("B", DataType::Int)],
    )
    .unwrap();

    let selection = Selection::new(
        1,
        vec![
            Filter {
                filter_id: 1,
                expression: parse("A >= 0").unwrap(),
                application_level: 0,
            },
            Filter {
                filter_id: 2,
                expression: parse("B >= 0").unwrap(),
                application_level: 1,
            },
        ],
        vec![],
        OutputSettings {
            show_all: true,
            add_attributes: true,
            add_filters: false,
            add_failed_filters: false,
        },
    )
    .unwrap();

    let plan = plan::compile(&universe, &selection).unwrap();
    let mut rows = RowSet::new(1);
    rows.append_column("A", vec![Value::Int(1)]).unwrap();
    rows.append_column("B", vec![Value::Int(1)]).unwrap();
    plan::run(&plan, &mut rows).unwrap();

    let shaped = output::shape(&universe, &selection, &plan, &rows).unwrap();
    assert!(!shaped.header.iter().any(|h| h.starts_with("filters_level_")));
    assert_eq!(shaped.header, vec!["A", "B", "is_selected"]);
}

#[test]
fn scenario_4_sum_aggregate_per_partition() {
    let mut rows = RowSet::new(3);
    rows.append_column(
        "K",
        vec![Value::string("a"), Value::string("a"), Value::string("b")],
    )
    .unwrap();
    rows.append_column("V", vec![Value::Int(1), Value::Int(2), Value::Int(10)])
        .unwrap();
    rows.append_aggregate("S", "V", AggregateFunc::Sum, None, Some("K"), &[]).unwrap();
    let sums: Vec<f64> = rows.column("S").unwrap().iter().map(|v| v.as_f64().unwrap()).collect();
    assert_eq!(sums, vec![3.0, 3.0, 10.0]);
}

#[test]
fn scenario_5_gating_mask_replaces_source_with_identity() {
    let universe = Universe::new(
        "K".to_string(),
        vec![
            input("K", DataType::String),
            input("V", DataType::Int),
            Attribute::Aggregate {
                code: "S".to_string(),
                data_type: DataType::Float,
                source_code: "V".to_string(),
                func: AggregateFunc::Sum,
                direction: None,
                partition_by: Some("K".to_string()),
            },
        ],
    )
    .unwrap();

    let selection = Selection::new(
        1,
        vec![Filter {
            filter_id: 1,
            expression: parse("V >= 2").unwrap(),
            application_level: 0,
        }],
        vec![OutputAttr {
            attr_code: "S".to_string(),
            application_level: 1,
        }],
        OutputSettings {
            show_all: true,
            add_attributes: true,
            add_filters: false,
            add_failed_filters: false,
        },
    )
    .unwrap();

    let plan = plan::compile(&universe, &selection).unwrap();
    let mut rows = RowSet::new(3);
    rows.append_column(
        "K",
        vec![Value::string("a"), Value::string("a"), Value::string("b")],
    )
    .unwrap();
    rows.append_column("V", vec![Value::Int(1), Value::Int(2), Value::Int(10)])
        .unwrap();
    plan::run(&plan, &mut rows).unwrap();

    let sums: Vec<f64> = rows.column("S").unwrap().iter().map(|v| v.as_f64().unwrap()).collect();
    assert_eq!(sums, vec![2.0, 2.0, 10.0]);
}

#[test]
fn scenario_6_expression_identifiers_and_evaluation() {
    let ast = parse("X IN (1,2,3) AND NOT Y LIKE 'foo%'").unwrap();
    let ids = identifiers(&ast);
    assert_eq!(ids, ["X", "Y"].into_iter().map(str::to_string).collect());

    let row = |x: Value, y: Value| {
        move |code: &str| match code {
            "X" => x.clone(),
            "Y" => y.clone(),
            _ => Value::Null,
        }
    };

    assert!(eval(&ast, &row(Value::Int(2), Value::string("bar"))).truthy());
    assert!(!eval(&ast, &row(Value::Int(4), Value::string("bar"))).truthy());
    assert!(!eval(&ast, &row(Value::Int(2), Value::string("foobar"))).truthy());
}
