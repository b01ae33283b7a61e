use std::fmt;
use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::catalog::CatalogIndex;
use crate::error::SliceError;
use crate::matrix::{MatrixStore, MmapMatrixStore};

/// Loader-boundary inputs: byte-encoded metadata arrays plus a matrix handle.
pub struct RawDataset {
    pub gene_symbols: Vec<Vec<u8>>,
    pub accessions: Vec<Vec<u8>>,
    pub series_tags: Vec<Vec<u8>>,
    pub matrix: Arc<dyn MatrixStore>,
}

impl fmt::Debug for RawDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDataset")
            .field("gene_symbols", &self.gene_symbols.len())
            .field("accessions", &self.accessions.len())
            .field("series_tags", &self.series_tags.len())
            .field("matrix_rows", &self.matrix.rows())
            .field("matrix_cols", &self.matrix.cols())
            .finish()
    }
}

/// Built once at startup, then shared read-only across requests.
pub struct Dataset {
    catalog: CatalogIndex,
    store: Arc<dyn MatrixStore>,
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("genes", &self.catalog.genes().len())
            .field("samples", &self.catalog.accessions().len())
            .field("series", &self.catalog.series_ids().len())
            .finish()
    }
}

impl Dataset {
    pub fn build(raw: RawDataset) -> Result<Self, SliceError> {
        if raw.gene_symbols.len() != raw.matrix.rows() {
            return Err(SliceError::ShapeMismatch(format!(
                "{} gene symbols for a matrix with {} rows",
                raw.gene_symbols.len(),
                raw.matrix.rows()
            )));
        }
        if raw.accessions.len() != raw.matrix.cols() {
            return Err(SliceError::ShapeMismatch(format!(
                "{} accessions for a matrix with {} columns",
                raw.accessions.len(),
                raw.matrix.cols()
            )));
        }

        let catalog = CatalogIndex::build(&raw.gene_symbols, &raw.accessions, &raw.series_tags)?;
        info!(
            genes = catalog.genes().len(),
            samples = catalog.accessions().len(),
            series = catalog.series_ids().len(),
            "expression catalog ready"
        );

        Ok(Self {
            catalog,
            store: raw.matrix,
        })
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn store(&self) -> &dyn MatrixStore {
        self.store.as_ref()
    }
}

pub trait DatasetSource {
    fn load(&self) -> Result<RawDataset, SliceError>;
}

/// Directory-backed loader: `genes.txt` (one symbol per line), `samples.tsv`
/// (accession before the first tab, raw series-tag string after it) and
/// `matrix.bin` (mmap container).
pub struct FileDatasetSource {
    root: Utf8PathBuf,
}

impl FileDatasetSource {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn genes_path(&self) -> Utf8PathBuf {
        self.root.join("genes.txt")
    }

    pub fn samples_path(&self) -> Utf8PathBuf {
        self.root.join("samples.tsv")
    }

    pub fn matrix_path(&self) -> Utf8PathBuf {
        self.root.join("matrix.bin")
    }
}

impl DatasetSource for FileDatasetSource {
    fn load(&self) -> Result<RawDataset, SliceError> {
        info!(root = %self.root, "loading expression dataset");
        let gene_symbols = read_lines(&self.genes_path())?;

        let mut accessions = Vec::new();
        let mut series_tags = Vec::new();
        for line in read_lines(&self.samples_path())? {
            // The raw series-tag string may itself contain tab separators,
            // so only the first tab delimits the accession.
            match line.iter().position(|&b| b == b'\t') {
                Some(split) => {
                    accessions.push(line[..split].to_vec());
                    series_tags.push(line[split + 1..].to_vec());
                }
                None => {
                    accessions.push(line);
                    series_tags.push(Vec::new());
                }
            }
        }

        let matrix = MmapMatrixStore::open(&self.matrix_path())?;
        Ok(RawDataset {
            gene_symbols,
            accessions,
            series_tags,
            matrix: Arc::new(matrix),
        })
    }
}

fn read_lines(path: &Utf8Path) -> Result<Vec<Vec<u8>>, SliceError> {
    let bytes = fs::read(path.as_std_path())
        .map_err(|err| SliceError::DatasetLoad(format!("{path}: {err}")))?;
    let mut lines: Vec<Vec<u8>> = bytes.split(|&b| b == b'\n').map(<[u8]>::to_vec).collect();
    if lines.last().is_some_and(Vec::is_empty) {
        lines.pop();
    }
    Ok(lines)
}
