//! # Universe model (C2) and dependency resolver (C3)
//!
//! The universe is the set of all attributes known to a run: raw input
//! columns plus three kinds of derived attribute. It is loaded once,
//! never mutated, and every attribute's transitive dependency closure is
//! computed and cached at load time (design note §9) rather than
//! recomputed on every lookup.

pub mod dependency;

use std::collections::HashMap;

use thiserror::Error;

/// Sort direction used by rank keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(raw: &str) -> Result<Self, UniverseError> {
        match raw.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            other => Err(UniverseError::InvalidDirection(other.to_string())),
        }
    }
}

/// One of the fixed windowed-aggregate functions (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Sum,
    Min,
    Max,
    Avg,
    Count,
}

impl AggregateFunc {
    pub fn parse(raw: &str) -> Result<Self, UniverseError> {
        match raw.to_ascii_uppercase().as_str() {
            "SUM" => Ok(AggregateFunc::Sum),
            "MIN" => Ok(AggregateFunc::Min),
            "MAX" => Ok(AggregateFunc::Max),
            "AVG" => Ok(AggregateFunc::Avg),
            "COUNT" => Ok(AggregateFunc::Count),
            other => Err(UniverseError::InvalidAggregateFunc(other.to_string())),
        }
    }
}

/// A single rank key: `(attr_code, direction, order)`. `order` is the
/// author-declared ordinal used to sort keys before they're applied —
/// kept on the key itself so the universe loader doesn't need a second
/// pass to sort `rank_attrs`.
#[derive(Debug, Clone)]
pub struct RankKey {
    pub attr_code: String,
    pub direction: Direction,
    pub order: i64,
}

/// Tagged attribute variant (design note §9: "reimplement as a tagged
/// variant dispatched by a single function", not a class hierarchy).
#[derive(Debug, Clone)]
pub enum Attribute {
    Input {
        code: String,
        data_type: crate::value::DataType,
    },
    Expression {
        code: String,
        data_type: crate::value::DataType,
        expr: crate::expr::Ast,
    },
    Rank {
        code: String,
        data_type: crate::value::DataType,
        rank_keys: Vec<RankKey>,
        partition_by: Option<String>,
    },
    Aggregate {
        code: String,
        data_type: crate::value::DataType,
        source_code: String,
        func: AggregateFunc,
        direction: Option<Direction>,
        partition_by: Option<String>,
    },
}

impl Attribute {
    pub fn code(&self) -> &str {
        match self {
            Attribute::Input { code, .. }
            | Attribute::Expression { code, .. }
            | Attribute::Rank { code, .. }
            | Attribute::Aggregate { code, .. } => code,
        }
    }

    pub fn data_type(&self) -> &crate::value::DataType {
        match self {
            Attribute::Input { data_type, .. }
            | Attribute::Expression { data_type, .. }
            | Attribute::Rank { data_type, .. }
            | Attribute::Aggregate { data_type, .. } => data_type,
        }
    }

    /// Direct (non-transitive) dependencies, per spec §3's per-variant
    /// rule. Grounded on `original_source/attribute.py`'s
    /// `get_attribute_dependencies_*` functions.
    pub fn direct_dependencies(&self) -> Vec<String> {
        match self {
            Attribute::Input { .. } => Vec::new(),
            Attribute::Expression { expr, .. } => crate::expr::identifiers(expr).into_iter().collect(),
            Attribute::Rank {
                rank_keys,
                partition_by,
                ..
            } => {
                let mut deps: Vec<String> = rank_keys.iter().map(|k| k.attr_code.clone()).collect();
                if let Some(p) = partition_by {
                    deps.push(p.clone());
                }
                deps
            }
            Attribute::Aggregate {
                source_code,
                partition_by,
                ..
            } => {
                let mut deps = vec![source_code.clone()];
                if let Some(p) = partition_by {
                    deps.push(p.clone());
                }
                deps
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("attribute code '{0}' is declared more than once")]
    DuplicateAttribute(String),
    #[error("cyclic dependency: {}", .0.join(" -> "))]
    CyclicUniverse(Vec<String>),
    #[error("invalid direction: {0}")]
    InvalidDirection(String),
    #[error("invalid aggregate function: {0}")]
    InvalidAggregateFunc(String),
    #[error("attribute '{0}': {1}")]
    MalformedAttribute(String, String),
    #[error(transparent)]
    Parse(#[from] crate::expr::ParseError),
}

/// The universe: all attributes known to a run, resolvable by code, with
/// a cached topologically-ordered dependency closure per attribute.
#[derive(Debug)]
pub struct Universe {
    key_column: String,
    attributes: HashMap<String, Attribute>,
    order: Vec<String>,
    /// code -> transitive closure (including `code` itself at the end),
    /// topologically ordered (dependencies first). Computed once at load.
    closures: HashMap<String, Vec<String>>,
}

impl Universe {
    /// Build a universe from its attributes, computing and caching
    /// dependency closures. Fails on an unresolved `ref_code` or a cycle
    /// (spec §3 invariants, §4.3/§4.7).
    pub fn new(key_column: String, attrs: Vec<Attribute>) -> Result<Self, UniverseError> {
        let mut attributes = HashMap::with_capacity(attrs.len());
        let mut order = Vec::with_capacity(attrs.len());
        for attr in attrs {
            let code = attr.code().to_string();
            if attributes.insert(code.clone(), attr).is_some() {
                return Err(UniverseError::DuplicateAttribute(code));
            }
            order.push(code);
        }

        if !attributes.contains_key(&key_column) {
            return Err(UniverseError::UnknownAttribute(key_column));
        }

        let mut universe = Universe {
            key_column,
            attributes,
            order,
            closures: HashMap::new(),
        };

        // Validate every ref_code resolves, then compute & cache closures
        // for every attribute up front.
        let codes: Vec<String> = universe.order.clone();
        for code in &codes {
            let closure = dependency::closure(&universe, code)?;
            universe.closures.insert(code.clone(), closure);
        }

        Ok(universe)
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn get(&self, code: &str) -> Result<&Attribute, UniverseError> {
        self.attributes
            .get(code)
            .ok_or_else(|| UniverseError::UnknownAttribute(code.to_string()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.attributes.contains_key(code)
    }

    /// Internal accessor used by the dependency resolver during `Universe`
    /// construction, before `closures` is populated.
    pub(crate) fn attributes_raw(&self) -> &HashMap<String, Attribute> {
        &self.attributes
    }

    /// All input attribute codes.
    pub fn inputs(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|c| matches!(self.attributes[*c], Attribute::Input { .. }))
            .map(String::as_str)
            .collect()
    }

    /// All attributes, in declaration order.
    pub fn all(&self) -> impl Iterator<Item = &Attribute> {
        self.order.iter().map(move |c| &self.attributes[c])
    }

    /// The cached, topologically-ordered transitive closure of `code`'s
    /// dependencies, **including `code` itself as the last element**
    /// (convenient for callers that want "everything needed to
    /// materialize `code`, in emission order").
    pub fn dependencies(&self, code: &str) -> Result<&[String], UniverseError> {
        self.closures
            .get(code)
            .map(Vec::as_slice)
            .ok_or_else(|| UniverseError::UnknownAttribute(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DataType;

    fn input(code: &str) -> Attribute {
        Attribute::Input {
            code: code.to_string(),
            data_type: DataType::Int,
        }
    }

    #[test]
    fn rejects_unknown_key_column() {
        let err = Universe::new("missing".to_string(), vec![input("a")]).unwrap_err();
        assert!(matches!(err, UniverseError::UnknownAttribute(_)));
    }

    #[test]
    fn rejects_duplicate_codes() {
        let err = Universe::new("a".to_string(), vec![input("a"), input("a")]).unwrap_err();
        assert!(matches!(err, UniverseError::DuplicateAttribute(_)));
    }

    #[test]
    fn rank_dependencies_include_partition_and_keys() {
        let rank = Attribute::Rank {
            code: "r".to_string(),
            data_type: DataType::Int,
            rank_keys: vec![RankKey {
                attr_code: "a".to_string(),
                direction: Direction::Desc,
                order: 0,
            }],
            partition_by: Some("p".to_string()),
        };
        let universe = Universe::new(
            "a".to_string(),
            vec![input("a"), input("p"), rank],
        )
        .unwrap();
        let deps = universe.dependencies("r").unwrap();
        assert_eq!(deps, &["a".to_string(), "p".to_string(), "r".to_string()]);
    }
}
