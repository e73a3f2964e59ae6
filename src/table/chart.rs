use crate::error::Result;
use polars::prelude::*;
use serde::Serialize;
use std::fmt::Write as _;

/// At most this many numeric columns are charted.
pub const CHART_SERIES_LIMIT: usize = 2;

/// First numeric columns of the table, capped at [`CHART_SERIES_LIMIT`], all rows.
///
/// # Errors
///
/// Only fails if the engine cannot build the selection.
pub fn chart_slice(df: &DataFrame) -> Result<DataFrame> {
    let numeric: Vec<&str> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_numeric())
        .take(CHART_SERIES_LIMIT)
        .map(|c| c.name().as_str())
        .collect();
    Ok(df.select(numeric)?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Plain numbers behind a bar chart; the row position is the x axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    /// Derives chart data from a table, keeping only what [`chart_slice`] keeps.
    ///
    /// # Errors
    ///
    /// Fails if a numeric column cannot be read as `f64`.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let slice = chart_slice(df)?;
        let mut series = Vec::with_capacity(slice.width());
        for column in slice.get_columns() {
            let values = column
                .as_materialized_series()
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .collect();
            series.push(ChartSeries {
                name: column.name().to_string(),
                values,
            });
        }
        Ok(Self { series })
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.series.iter().map(|s| s.values.len()).max().unwrap_or(0)
    }

    fn max_magnitude(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten())
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

/// Text bar chart: one line per row and series, bars scaled to `width` characters.
pub fn render_bar_chart(chart: &ChartData, width: usize) -> String {
    let mut out = String::new();
    if chart.is_empty() {
        out.push_str("(no numeric columns to chart)\n");
        return out;
    }

    let label_width = chart
        .series
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0);
    let max = chart.max_magnitude();

    for row in 0..chart.row_count() {
        for series in &chart.series {
            let value = series.values.get(row).copied().flatten();
            let bar = match value {
                Some(v) if max > 0.0 => {
                    let len = ((v.abs() / max) * width as f64).round() as usize;
                    let glyph = if v < 0.0 { '-' } else { '#' };
                    std::iter::repeat_n(glyph, len).collect::<String>()
                }
                _ => String::new(),
            };
            let shown = value.map_or_else(|| "null".to_owned(), |v| v.to_string());
            let _ = writeln!(
                out,
                "{row:>4} {:<label_width$} |{bar} {shown}",
                series.name
            );
        }
    }
    out
}
