//! # Selection model (C4)
//!
//! A typed view over a parsed selection: its filters grouped by
//! application level, requested output attributes per level, and output
//! settings (spec §4.2).

use std::collections::BTreeMap;

use thiserror::Error;

use crate::expr::Ast;

#[derive(Debug, Clone)]
pub struct Filter {
    pub filter_id: i64,
    pub expression: Ast,
    pub application_level: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputSettings {
    pub show_all: bool,
    pub add_attributes: bool,
    pub add_filters: bool,
    pub add_failed_filters: bool,
}

#[derive(Debug, Clone)]
pub struct OutputAttr {
    pub attr_code: String,
    pub application_level: i64,
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("selection {selection_id}: duplicate filter_id {filter_id}")]
    DuplicateFilterId { selection_id: i64, filter_id: i64 },
}

/// Typed view over one selection's filters, levels, and output
/// preferences (spec §4.2).
#[derive(Debug, Clone)]
pub struct Selection {
    pub selection_id: i64,
    filters_by_level: BTreeMap<i64, Vec<Filter>>,
    output_attrs_by_level: BTreeMap<i64, Vec<String>>,
    output_settings: OutputSettings,
}

impl Selection {
    pub fn new(
        selection_id: i64,
        filters: Vec<Filter>,
        output_attrs: Vec<OutputAttr>,
        output_settings: OutputSettings,
    ) -> Result<Self, SelectionError> {
        let mut seen_ids = std::collections::HashSet::new();
        let mut filters_by_level: BTreeMap<i64, Vec<Filter>> = BTreeMap::new();
        for filter in filters {
            if !seen_ids.insert(filter.filter_id) {
                return Err(SelectionError::DuplicateFilterId {
                    selection_id,
                    filter_id: filter.filter_id,
                });
            }
            filters_by_level.entry(filter.application_level).or_default().push(filter);
        }

        let mut output_attrs_by_level: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for oa in output_attrs {
            output_attrs_by_level
                .entry(oa.application_level)
                .or_default()
                .push(oa.attr_code);
        }

        Ok(Selection {
            selection_id,
            filters_by_level,
            output_attrs_by_level,
            output_settings,
        })
    }

    /// Ascending set of distinct application levels across filters and
    /// requested output attributes (spec §4.2's `levels()`).
    pub fn levels(&self) -> Vec<i64> {
        let mut levels: Vec<i64> = self
            .filters_by_level
            .keys()
            .chain(self.output_attrs_by_level.keys())
            .copied()
            .collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }

    pub fn filters(&self, level: i64) -> &[Filter] {
        self.filters_by_level.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn output_attrs(&self, level: i64) -> &[String] {
        self.output_attrs_by_level.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn output_settings(&self) -> OutputSettings {
        self.output_settings
    }

    /// The filter-mask column name emitted for a given filter, per spec
    /// §4.4 step 4: `filter_{selection_id}_{filter_id}`.
    pub fn filter_column(&self, filter_id: i64) -> String {
        format!("filter_{}_{}", self.selection_id, filter_id)
    }

    /// The level-mask column name emitted for a given level, per spec
    /// §4.4 step 5.
    pub fn level_column(level: i64) -> String {
        format!("filters_level_{level}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;

    fn filter(id: i64, level: i64) -> Filter {
        Filter {
            filter_id: id,
            expression: parse("1 = 1").unwrap(),
            application_level: level,
        }
    }

    #[test]
    fn levels_are_sorted_and_deduped() {
        let sel = Selection::new(
            1,
            vec![filter(1, 1), filter(2, 0), filter(3, 1)],
            vec![],
            OutputSettings::default(),
        )
        .unwrap();
        assert_eq!(sel.levels(), vec![0, 1]);
        assert_eq!(sel.filters(1).len(), 2);
    }

    #[test]
    fn rejects_duplicate_filter_ids() {
        let err = Selection::new(1, vec![filter(1, 0), filter(1, 0)], vec![], OutputSettings::default())
            .unwrap_err();
        assert!(matches!(err, SelectionError::DuplicateFilterId { .. }));
    }
}
