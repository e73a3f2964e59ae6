use super::types::{FileInfo, UploadedFile};
use polars::prelude::*;

/// Size in KiB, truncated.
pub fn size_kib(bytes: u64) -> u64 {
    bytes / 1024
}

impl FileInfo {
    pub fn describe(upload: &UploadedFile, df: &DataFrame) -> Self {
        Self::for_table(&upload.name, upload.size(), df)
    }

    /// Metadata for `df`, decoded from a file of `size` bytes called `name`.
    pub fn for_table(name: &str, size: u64, df: &DataFrame) -> Self {
        Self {
            name: name.to_owned(),
            size_kib: size_kib(size),
            row_count: df.height(),
            column_count: df.width(),
        }
    }
}

/// Lazily yields the first `limit` rows of a table.
///
/// Cloning the iterator restarts it from wherever the clone was taken, so a
/// fresh `row_preview` call (or a clone taken up front) can be walked any
/// number of times.
#[derive(Clone)]
pub struct RowPreview<'a> {
    df: &'a DataFrame,
    next: usize,
    end: usize,
}

impl<'a> Iterator for RowPreview<'a> {
    type Item = Vec<AnyValue<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let row = self.df.get(self.next);
        self.next += 1;
        row
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RowPreview<'_> {}

pub fn row_preview(df: &DataFrame, limit: usize) -> RowPreview<'_> {
    RowPreview {
        df,
        next: 0,
        end: limit.min(df.height()),
    }
}

/// First `limit` rows as a frame, for tabular display.
pub fn preview_frame(df: &DataFrame, limit: usize) -> DataFrame {
    df.head(Some(limit))
}
