//! Deserializes `universe.json` (spec §6) into a [`Universe`].

use std::path::Path;

use serde::Deserialize;

use super::IoError;
use crate::expr::parse as parse_expr;
use crate::universe::{AggregateFunc, Attribute, Direction, RankKey, Universe};
use crate::value::DataType;

#[derive(Debug, Deserialize)]
struct RawUniverse {
    key: String,
    attributes: Vec<RawAttribute>,
}

#[derive(Debug, Deserialize)]
struct RawRankAttr {
    attr_code: String,
    direction: String,
    order: i64,
}

#[derive(Debug, Deserialize)]
struct RawAttribute {
    attr_code: String,
    attr_type: String,
    attr_data_type: String,
    #[serde(default)]
    rank_attrs: Vec<RawRankAttr>,
    #[serde(default)]
    aggregate_attr_code: Option<String>,
    #[serde(default)]
    aggregate_function: Option<String>,
    #[serde(default)]
    aggregate_direction: Option<String>,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    partition_by: Option<String>,
}

pub fn load(path: &Path) -> Result<Universe, IoError> {
    let text = std::fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let raw: RawUniverse = serde_json::from_str(&text).map_err(|source| IoError::Json {
        path: path.display().to_string(),
        source,
    })?;

    let attrs = raw
        .attributes
        .into_iter()
        .map(to_attribute)
        .collect::<Result<Vec<_>, IoError>>()?;

    Ok(Universe::new(raw.key, attrs)?)
}

fn to_attribute(raw: RawAttribute) -> Result<Attribute, IoError> {
    let code = raw.attr_code;
    let data_type = DataType::parse(&raw.attr_data_type);
    let malformed = |msg: &str| {
        IoError::Universe(crate::universe::UniverseError::MalformedAttribute(
            code.clone(),
            msg.to_string(),
        ))
    };

    match raw.attr_type.to_ascii_uppercase().as_str() {
        "INPUT" => Ok(Attribute::Input { code, data_type }),
        "EXPRESSION" => {
            let expr_src = raw.expression.ok_or_else(|| malformed("EXPRESSION attribute missing 'expression'"))?;
            let ast = parse_expr(&expr_src)?;
            Ok(Attribute::Expression { code, data_type, expr: ast })
        }
        "RANK" => {
            if raw.rank_attrs.is_empty() {
                return Err(malformed("RANK attribute requires at least one rank_attrs entry"));
            }
            let rank_keys = raw
                .rank_attrs
                .into_iter()
                .map(|r| {
                    Ok(RankKey {
                        attr_code: r.attr_code,
                        direction: Direction::parse(&r.direction)?,
                        order: r.order,
                    })
                })
                .collect::<Result<Vec<_>, crate::universe::UniverseError>>()?;
            Ok(Attribute::Rank {
                code,
                data_type,
                rank_keys,
                partition_by: raw.partition_by,
            })
        }
        "AGGREGATE" => {
            let source_code = raw
                .aggregate_attr_code
                .ok_or_else(|| malformed("AGGREGATE attribute missing 'aggregate_attr_code'"))?;
            let func_raw = raw
                .aggregate_function
                .ok_or_else(|| malformed("AGGREGATE attribute missing 'aggregate_function'"))?;
            let func = AggregateFunc::parse(&func_raw)?;
            let direction = raw
                .aggregate_direction
                .map(|d| Direction::parse(&d))
                .transpose()?;
            Ok(Attribute::Aggregate {
                code,
                data_type,
                source_code,
                func,
                direction,
                partition_by: raw.partition_by,
            })
        }
        other => Err(malformed(&format!("unknown attr_type '{other}'"))),
    }
}
