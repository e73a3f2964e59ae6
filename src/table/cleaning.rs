use super::types::{DedupReport, FillReport, FilledColumn};
use crate::error::{Result, ResultExt as _};
use polars::prelude::*;

/// Drops repeated rows, keeping the first occurrence of each in original order.
///
/// Rows compare equal when every cell matches; two missing cells match.
///
/// # Errors
///
/// Returns [`crate::error::SweeperError::DataProcessing`] if the engine fails.
pub fn remove_duplicates(df: &DataFrame) -> Result<(DataFrame, DedupReport)> {
    let rows_before = df.height();
    if df.width() == 0 {
        return Ok((
            df.clone(),
            DedupReport {
                rows_before,
                rows_after: rows_before,
            },
        ));
    }

    let deduped = df
        .clone()
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()
        .context("Failed to remove duplicate rows")?;

    let report = DedupReport {
        rows_before,
        rows_after: deduped.height(),
    };
    tracing::info!(removed = report.removed(), "Removed duplicate rows");
    Ok((deduped, report))
}

/// Replaces missing cells in numeric columns with that column's mean.
///
/// Missing means null, or NaN in a float column. Only columns that actually
/// contain missing values are touched, and those become `Float64`. A numeric
/// column with no values at all has no mean: it is left as is and reported in
/// [`FillReport::skipped`].
///
/// # Errors
///
/// Returns [`crate::error::SweeperError::DataProcessing`] if the engine fails.
pub fn fill_missing_numeric(df: &DataFrame) -> Result<(DataFrame, FillReport)> {
    let mut report = FillReport::default();
    let mut expressions = Vec::new();

    for column in df.get_columns() {
        if !column.dtype().is_numeric() {
            continue;
        }
        let values = present_values(column.as_materialized_series())?;
        let missing = values.null_count();
        if missing == 0 {
            continue;
        }

        let name = column.name().as_str();
        let Some(mean) = values.mean() else {
            tracing::warn!(
                column = name,
                "Column has no values to average; leaving missing cells in place"
            );
            report.skipped.push(name.to_owned());
            continue;
        };

        expressions.push(
            col(name)
                .cast(DataType::Float64)
                .fill_nan(lit(mean))
                .fill_null(lit(mean))
                .alias(name),
        );
        report.filled.push(FilledColumn {
            name: name.to_owned(),
            mean,
            cells_filled: missing,
        });
    }

    if expressions.is_empty() {
        return Ok((df.clone(), report));
    }

    let filled = df
        .clone()
        .lazy()
        .with_columns(expressions)
        .collect()
        .context("Failed to fill missing values")?;

    tracing::info!(
        columns = report.filled.len(),
        cells = report.cells_filled(),
        "Filled missing numeric values with column means"
    );
    Ok((filled, report))
}

/// The column with NaN turned into nulls, so only real numbers count.
fn present_values(series: &Series) -> Result<Series> {
    if !series.dtype().is_float() {
        return Ok(series.clone());
    }
    let values: Float64Chunked = series
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.filter(|f| !f.is_nan()))
        .collect();
    Ok(values.into_series())
}
