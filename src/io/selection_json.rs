//! Deserializes `selection.json` (spec §6) into a list of [`Selection`]s.

use std::path::Path;

use serde::Deserialize;

use super::IoError;
use crate::expr::parse as parse_expr;
use crate::selection::{Filter, OutputAttr, OutputSettings, Selection};

#[derive(Debug, Deserialize)]
struct RawRoot {
    selections: Vec<RawSelection>,
}

#[derive(Debug, Deserialize)]
struct RawSelection {
    selection_id: i64,
    #[serde(default)]
    filters: Vec<RawFilter>,
    #[serde(default)]
    output_attrs: Vec<RawOutputAttr>,
    #[serde(default)]
    output_settings: RawOutputSettings,
}

#[derive(Debug, Deserialize)]
struct RawFilter {
    filter_id: i64,
    expression: String,
    application_level: i64,
}

#[derive(Debug, Deserialize)]
struct RawOutputAttr {
    attr_code: String,
    application_level: i64,
}

#[derive(Debug, Deserialize, Default)]
struct RawOutputSettings {
    #[serde(default)]
    show_all: bool,
    #[serde(default)]
    add_attributes: bool,
    #[serde(default)]
    add_filters: bool,
    #[serde(default)]
    add_failed_filters: bool,
}

pub fn load(path: &Path) -> Result<Vec<Selection>, IoError> {
    let text = std::fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let raw: RawRoot = serde_json::from_str(&text).map_err(|source| IoError::Json {
        path: path.display().to_string(),
        source,
    })?;

    raw.selections.into_iter().map(to_selection).collect()
}

fn to_selection(raw: RawSelection) -> Result<Selection, IoError> {
    let filters = raw
        .filters
        .into_iter()
        .map(|f| {
            Ok(Filter {
                filter_id: f.filter_id,
                expression: parse_expr(&f.expression)?,
                application_level: f.application_level,
            })
        })
        .collect::<Result<Vec<_>, crate::expr::ParseError>>()?;

    let output_attrs = raw
        .output_attrs
        .into_iter()
        .map(|o| OutputAttr {
            attr_code: o.attr_code,
            application_level: o.application_level,
        })
        .collect();

    let settings = OutputSettings {
        show_all: raw.output_settings.show_all,
        add_attributes: raw.output_settings.add_attributes,
        add_filters: raw.output_settings.add_filters,
        add_failed_filters: raw.output_settings.add_failed_filters,
    };

    Ok(Selection::new(raw.selection_id, filters, output_attrs, settings)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_selection_with_defaults() {
        let json = r#"{ "selections": [
            { "selection_id": 1, "filters": [], "output_attrs": [] }
        ] }"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let selections = load(file.path()).unwrap();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].selection_id, 1);
    }
}
