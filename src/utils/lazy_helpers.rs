//! Table materialization and typed column extraction
//!
//! Tables are read once (parquet through a LazyFrame scan, CSV through the
//! eager reader) and then turned column by column into `Option` vectors so
//! that null cells stay distinguishable from zero or empty values.

use crate::error::DataError;
use crate::model::OrganismSet;
use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

/// Read a parquet or CSV table into memory
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("parquet") => LazyFrame::scan_parquet(path, Default::default())
            .and_then(|lazy| lazy.collect())
            .map_err(|source| DataError::Read { path: path.to_path_buf(), source })
            .with_context(|| format!("Failed to load parquet: {}", path.display())),
        Some("csv") => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.into()))
            .and_then(|reader| reader.finish())
            .map_err(|source| DataError::Read { path: path.to_path_buf(), source })
            .with_context(|| format!("Failed to load CSV: {}", path.display())),
        _ => Err(DataError::UnsupportedFormat { path: path.to_path_buf() }.into()),
    }
}

/// First candidate column name present in the frame
pub fn first_present<'a>(df: &DataFrame, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|name| df.column(name).is_ok())
}

/// Fail unless the column exists
pub fn require_column(df: &DataFrame, column: &str, table: &str) -> Result<()> {
    if df.column(column).is_err() {
        return Err(DataError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Numeric column as `Option<f64>` per row; non-finite values become `None`
///
/// Returns `Ok(None)` when none of the candidate columns exists.
pub fn f64_values(df: &DataFrame, candidates: &[&str]) -> Result<Option<Vec<Option<f64>>>> {
    let Some(name) = first_present(df, candidates) else {
        return Ok(None);
    };

    let column = df
        .column(name)?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?;

    let values = column
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect();

    Ok(Some(values))
}

/// String column as `Option<String>` per row; blank strings become `None`
pub fn str_values(df: &DataFrame, candidates: &[&str]) -> Result<Option<Vec<Option<String>>>> {
    let Some(name) = first_present(df, candidates) else {
        return Ok(None);
    };

    let column = df
        .column(name)?
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' cannot be read as text", name))?;

    let values = column
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();

    Ok(Some(values))
}

/// Boolean flag column; accepts bool, integer (0/1) or text ("true"/"false")
pub fn bool_values(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<bool>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };

    if let Ok(text) = column.str() {
        let values = text
            .into_iter()
            .map(|value| {
                value.and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" | "yes" => Some(true),
                    "false" | "f" | "0" | "no" => Some(false),
                    _ => None,
                })
            })
            .collect();
        return Ok(Some(values));
    }

    let flags = column
        .cast(&DataType::Boolean)
        .with_context(|| format!("Column '{}' is not a boolean flag", name))?;
    let values = flags.bool()?.into_iter().collect();
    Ok(Some(values))
}

/// Set-valued organism column
///
/// Parquet sources store `list<str>`; CSV sources store pipe-separated
/// strings. A null cell yields `None` (unknown), an empty list or empty
/// string yields `Some(empty)`.
pub fn organism_sets(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<OrganismSet>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };

    let height = df.height();
    let mut values = Vec::with_capacity(height);

    if let Ok(list_col) = column.list() {
        for idx in 0..height {
            let set = match list_col.get_as_series(idx) {
                Some(series) => {
                    let names = series
                        .cast(&DataType::String)
                        .with_context(|| format!("Column '{}' holds non-text items", name))?;
                    Some(names.str()?.into_iter().flatten().collect::<OrganismSet>())
                }
                None => None,
            };
            values.push(set);
        }
    } else if let Ok(text_col) = column.str() {
        for value in text_col.into_iter() {
            values.push(value.map(OrganismSet::from_pipe_separated));
        }
    } else if column.null_count() == height {
        // Column inferred as all-null (e.g. empty CSV column)
        values.resize(height, None);
    } else {
        tracing::warn!(column = name, dtype = ?column.dtype(), "unreadable organism column");
        values.resize(height, None);
    }

    Ok(Some(values))
}
