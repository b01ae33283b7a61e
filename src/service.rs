use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use crate::dataset::Dataset;
use crate::domain::TableFormat;
use crate::emit::{self, TableOutput};
use crate::error::SliceError;
use crate::resolver::{ListingDomain, ListingWindow, QueryResolver};
use crate::slice::SliceEngine;

/// The five query operations over the shared immutable dataset. Transports
/// are expected to run the blocking slice and stream calls on worker threads.
#[derive(Clone)]
pub struct SliceService {
    dataset: Arc<Dataset>,
}

impl SliceService {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    pub fn expression(
        &self,
        gene_filter: Option<&[String]>,
        accession_filter: &[String],
        format: TableFormat,
    ) -> Result<TableOutput, SliceError> {
        let resolved = QueryResolver::new(self.dataset.catalog())
            .resolve_expression_filter(gene_filter, accession_filter)?;
        debug!(
            rows = resolved.rows.count(self.dataset.store().rows()),
            samples = resolved.cols.len(),
            "expression slice resolved"
        );
        let slice = SliceEngine::new(&self.dataset).slice(&resolved.rows, &resolved.cols)?;
        Ok(emit::emit_table(&slice, format))
    }

    /// Once the header is written, a failure can only terminate the stream,
    /// not become an error response.
    pub fn expression_transpose<W: Write>(
        &self,
        gene_filter: Option<&[String]>,
        accession_filter: &[String],
        sink: W,
    ) -> Result<(), SliceError> {
        let resolved = QueryResolver::new(self.dataset.catalog())
            .resolve_expression_filter(gene_filter, accession_filter)?;
        debug!(samples = resolved.cols.len(), "streaming transposed slice");
        let engine = SliceEngine::new(&self.dataset);
        let genes = engine.row_labels(&resolved.rows);
        emit::stream_transpose(
            sink,
            &genes,
            engine.transpose_rows(&resolved.rows, &resolved.cols),
        )
    }

    pub fn list_genes(
        &self,
        substring: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<ListingWindow, SliceError> {
        QueryResolver::new(self.dataset.catalog()).resolve_listing_filter(
            ListingDomain::Genes,
            substring,
            skip,
            limit,
        )
    }

    pub fn list_accessions(
        &self,
        series_id: Option<&str>,
        substring: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<ListingWindow, SliceError> {
        QueryResolver::new(self.dataset.catalog()).resolve_listing_filter(
            ListingDomain::Accessions { series_id },
            substring,
            skip,
            limit,
        )
    }

    pub fn list_series(
        &self,
        substring: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<ListingWindow, SliceError> {
        QueryResolver::new(self.dataset.catalog()).resolve_listing_filter(
            ListingDomain::Series,
            substring,
            skip,
            limit,
        )
    }
}
