use crate::error::{Result, SweeperError};
use polars::prelude::*;
use std::collections::HashSet;

/// Default selection: every column, in table order.
pub fn all_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Keeps exactly `columns`, in the order given.
///
/// An empty selection is allowed and yields a table with no columns.
///
/// # Errors
///
/// [`SweeperError::UnknownColumn`] for a name the table does not have and
/// [`SweeperError::DuplicateColumn`] for a name listed twice.
pub fn project(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let mut seen = HashSet::with_capacity(columns.len());
    for name in columns {
        if df.column(name).is_err() {
            return Err(SweeperError::UnknownColumn(name.clone()));
        }
        if !seen.insert(name.as_str()) {
            return Err(SweeperError::DuplicateColumn(name.clone()));
        }
    }

    let projected = df.select(columns.iter().map(String::as_str))?;
    tracing::debug!(columns = projected.width(), "Projected table");
    Ok(projected)
}
