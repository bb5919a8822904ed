//! CSV boundary: loads `input_data.csv` into a [`RowSet`] and writes a
//! shaped output table to `output_{selection_id}.csv` (spec §6). Uses the
//! `csv` crate rather than a hand-rolled line reader so quoting and
//! embedded delimiters are handled correctly.

use std::path::Path;

use super::IoError;
use crate::exec::RowSet;
use crate::output::ShapedOutput;
use crate::universe::Universe;
use crate::value::{DataType, Value};

/// Loads `input_data.csv`, matching header columns to the universe's
/// input attributes case-insensitively (spec §6).
pub fn load_input(path: &Path, universe: &Universe) -> Result<RowSet, IoError> {
    let path_str = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|source| IoError::Csv {
            path: path_str.clone(),
            source,
        })?;

    let header: Vec<String> = reader
        .headers()
        .map_err(|source| IoError::Csv {
            path: path_str.clone(),
            source,
        })?
        .iter()
        .map(|h| h.trim().to_ascii_uppercase())
        .collect();

    let inputs = universe.inputs();
    let mut column_index = Vec::with_capacity(inputs.len());
    for code in &inputs {
        let idx = header.iter().position(|h| h == code).ok_or_else(|| IoError::MissingInputColumn {
            path: path_str.clone(),
            column: (*code).to_string(),
        })?;
        column_index.push((*code, idx));
    }

    let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); inputs.len()];
    let mut row_count = 0;
    for record in reader.records() {
        let record = record.map_err(|source| IoError::Csv {
            path: path_str.clone(),
            source,
        })?;
        for (slot, (_, idx)) in column_index.iter().enumerate() {
            raw_columns[slot].push(record.get(*idx).unwrap_or("").to_string());
        }
        row_count += 1;
    }

    let mut rows = RowSet::new(row_count);
    for (slot, (code, _)) in column_index.iter().enumerate() {
        let attr = universe.get(code)?;
        let values: Vec<Value> = raw_columns[slot]
            .iter()
            .map(|cell| parse_cell(cell, attr.data_type()))
            .collect();
        rows.append_column(code, values).expect("input columns are appended exactly once");
    }

    Ok(rows)
}

fn parse_cell(cell: &str, data_type: &DataType) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    match data_type {
        DataType::Int => cell.parse::<i64>().map(Value::Int).unwrap_or(Value::Null),
        DataType::Float => cell.parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        DataType::Bool => match cell.to_ascii_uppercase().as_str() {
            "TRUE" | "1" => Value::Bool(true),
            "FALSE" | "0" => Value::Bool(false),
            _ => Value::Null,
        },
        DataType::String | DataType::Unknown(_) => Value::string(cell),
    }
}

/// Writes a shaped output table as `output_{selection_id}.csv`.
pub fn write_output(path: &Path, shaped: &ShapedOutput) -> Result<(), IoError> {
    let path_str = path.display().to_string();
    let mut writer = csv::WriterBuilder::new().from_path(path).map_err(|source| IoError::Csv {
        path: path_str.clone(),
        source,
    })?;

    writer.write_record(&shaped.header).map_err(|source| IoError::Csv {
        path: path_str.clone(),
        source,
    })?;

    for row in &shaped.rows {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        writer.write_record(&cells).map_err(|source| IoError::Csv {
            path: path_str.clone(),
            source,
        })?;
    }

    writer.flush().map_err(|source| IoError::Write {
        path: path_str,
        source,
    })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::Attribute;
    use std::io::Write;

    fn universe() -> Universe {
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
            ],
        )
        .unwrap()
    }

    #[test]
    fn loads_input_case_insensitively() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,hello").unwrap();
        writeln!(file, ",world").unwrap();
        let rows = load_input(file.path(), &universe()).unwrap();
        assert_eq!(rows.row_count(), 2);
        assert_eq!(rows.column("A").unwrap()[1], Value::Null);
    }

    #[test]
    fn missing_input_column_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a").unwrap();
        writeln!(file, "1").unwrap();
        assert!(load_input(file.path(), &universe()).is_err());
    }
}
