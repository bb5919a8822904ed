//! Plan compilation and execution benchmarks: rank, aggregate, and
//! two-level gated selections at increasing row counts.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rowselect::exec::RowSet;
use rowselect::selection::{Filter, OutputAttr, OutputSettings, Selection};
use rowselect::universe::{AggregateFunc, Attribute, Direction, RankKey, Universe};
use rowselect::value::{DataType, Value};
use rowselect::{expr::parse, output, plan};

fn input(code: &str, data_type: DataType) -> Attribute {
    Attribute::Input {
        code: code.to_string(),
        data_type,
    }
}

fn rank_universe() -> Universe {
    Universe::new(
        "ID".to_string(),
        vec![
            input("ID", DataType::Int),
            input("K", DataType::String),
            input("V", DataType::Int),
            Attribute::Rank {
                code: "R".to_string(),
                data_type: DataType::Int,
                rank_keys: vec![RankKey {
                    attr_code: "V".to_string(),
                    direction: Direction::Desc,
                    order: 0,
                }],
                partition_by: Some("K".to_string()),
            },
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
    .unwrap()
}

fn rank_selection() -> Selection {
    Selection::new(
        1,
        vec![Filter {
            filter_id: 1,
            expression: parse("R <= 3").unwrap(),
            application_level: 0,
        }],
        vec![OutputAttr {
            attr_code: "S".to_string(),
            application_level: 0,
        }],
        OutputSettings {
            show_all: false,
            add_attributes: true,
            add_filters: false,
            add_failed_filters: false,
        },
    )
    .unwrap()
}

fn rows_of(size: u32) -> RowSet {
    let mut rows = RowSet::new(size as usize);
    rows.append_column(
        "ID",
        (0..size).map(|i| Value::Int(i64::from(i))).collect(),
    )
    .unwrap();
    rows.append_column(
        "K",
        (0..size).map(|i| Value::string(format!("g{}", i % 20))).collect(),
    )
    .unwrap();
    rows.append_column(
        "V",
        (0..size).map(|i| Value::Int(i64::from((i * 7) % 101))).collect(),
    )
    .unwrap();
    rows
}

fn bench_compile(c: &mut Criterion) {
    let universe = rank_universe();
    let selection = rank_selection();
    c.bench_function("plan_compile", |b| {
        b.iter(|| plan::compile(&universe, &selection).unwrap());
    });
}

fn bench_run(c: &mut Criterion) {
    let universe = rank_universe();
    let selection = rank_selection();
    let compiled = plan::compile(&universe, &selection).unwrap();

    let mut group = c.benchmark_group("plan_run");
    for size in [100u32, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut rows = rows_of(size);
                plan::run(&compiled, &mut rows).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_shape(c: &mut Criterion) {
    let universe = rank_universe();
    let selection = rank_selection();
    let compiled = plan::compile(&universe, &selection).unwrap();

    let mut group = c.benchmark_group("output_shape");
    for size in [100u32, 1_000, 10_000] {
        let mut rows = rows_of(size);
        plan::run(&compiled, &mut rows).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| output::shape(&universe, &selection, &compiled, &rows).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_run, bench_shape);
criterion_main!(benches);
