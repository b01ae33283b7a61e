use crate::dataset::Dataset;
use crate::domain::RowSelection;
use crate::error::SliceError;

/// `values[i][j]` is the expression of `genes[i]` in `accessions[j]`.
#[derive(Debug, PartialEq)]
pub struct ExpressionSlice {
    pub genes: Vec<String>,
    pub accessions: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

pub struct SliceEngine<'a> {
    dataset: &'a Dataset,
}

impl<'a> SliceEngine<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    pub fn slice(&self, rows: &RowSelection, cols: &[usize]) -> Result<ExpressionSlice, SliceError> {
        let values = self.dataset.store().submatrix(rows, cols)?;
        Ok(ExpressionSlice {
            genes: self.row_labels(rows),
            accessions: self.column_labels(cols),
            values,
        })
    }

    /// Every sample is a separate store fetch, so the streamed transpose
    /// never holds more than one sample's values in memory.
    pub fn transpose_rows(
        &self,
        rows: &'a RowSelection,
        cols: &'a [usize],
    ) -> impl Iterator<Item = Result<(&'a str, Vec<f64>), SliceError>> {
        let catalog = self.dataset.catalog();
        let store = self.dataset.store();
        cols.iter().map(move |&col| {
            let values = store.column(col, rows)?;
            Ok((catalog.accessions()[col].as_str(), values))
        })
    }

    pub fn row_labels(&self, rows: &RowSelection) -> Vec<String> {
        let genes = self.dataset.catalog().genes();
        match rows {
            RowSelection::All => genes.to_vec(),
            RowSelection::Rows(indices) => indices.iter().map(|&row| genes[row].clone()).collect(),
        }
    }

    fn column_labels(&self, cols: &[usize]) -> Vec<String> {
        let accessions = self.dataset.catalog().accessions();
        cols.iter().map(|&col| accessions[col].clone()).collect()
    }
}
