use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    Json,
    Tsv,
}

impl TableFormat {
    pub fn from_accept(accept: Option<&str>) -> Self {
        match accept {
            Some(value) if value.starts_with("text/tab-separated-values") => TableFormat::Tsv,
            _ => TableFormat::Json,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TableFormat::Json => "application/json",
            TableFormat::Tsv => "text/tab-separated-values",
        }
    }
}

/// `All` selects the full row range without materializing an index list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSelection {
    All,
    Rows(Vec<usize>),
}

impl RowSelection {
    pub fn count(&self, total_rows: usize) -> usize {
        match self {
            RowSelection::All => total_rows,
            RowSelection::Rows(rows) => rows.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentRange {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl ContentRange {
    pub fn window(skip: usize, limit: usize, total: usize) -> Self {
        Self {
            start: skip,
            end: skip.saturating_add(limit).min(total),
            total,
        }
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}/{}", self.start, self.end, self.total)
    }
}
