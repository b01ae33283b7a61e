use std::fs::File;
use std::io::Write;

use camino::Utf8Path;
use memmap2::Mmap;

use crate::domain::RowSelection;
use crate::error::SliceError;

pub trait MatrixStore: Send + Sync {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;

    fn submatrix(&self, rows: &RowSelection, cols: &[usize]) -> Result<Vec<Vec<f64>>, SliceError>;

    fn column(&self, col: usize, rows: &RowSelection) -> Result<Vec<f64>, SliceError>;
}

fn check_bounds(store: &dyn MatrixStore, rows: &RowSelection, cols: &[usize]) -> Result<(), SliceError> {
    if let RowSelection::Rows(indices) = rows {
        if let Some(&bad) = indices.iter().find(|&&r| r >= store.rows()) {
            return Err(SliceError::StoreRead(format!(
                "row index {bad} out of range (matrix has {} rows)",
                store.rows()
            )));
        }
    }
    if let Some(&bad) = cols.iter().find(|&&c| c >= store.cols()) {
        return Err(SliceError::StoreRead(format!(
            "column index {bad} out of range (matrix has {} columns)",
            store.cols()
        )));
    }
    Ok(())
}

/// Whole matrix resident in memory, row-major.
#[derive(Debug)]
pub struct DenseMatrixStore {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl DenseMatrixStore {
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, SliceError> {
        if values.len() != rows * cols {
            return Err(SliceError::ShapeMismatch(format!(
                "expected {} values for a {rows}x{cols} matrix, got {}",
                rows * cols,
                values.len()
            )));
        }
        Ok(Self { rows, cols, values })
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }
}

impl MatrixStore for DenseMatrixStore {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn submatrix(&self, rows: &RowSelection, cols: &[usize]) -> Result<Vec<Vec<f64>>, SliceError> {
        check_bounds(self, rows, cols)?;
        let extract = |row: usize| cols.iter().map(|&col| self.value(row, col)).collect();
        Ok(match rows {
            RowSelection::All => (0..self.rows).map(extract).collect(),
            RowSelection::Rows(indices) => indices.iter().map(|&row| extract(row)).collect(),
        })
    }

    fn column(&self, col: usize, rows: &RowSelection) -> Result<Vec<f64>, SliceError> {
        check_bounds(self, rows, &[col])?;
        Ok(match rows {
            RowSelection::All => (0..self.rows).map(|row| self.value(row, col)).collect(),
            RowSelection::Rows(indices) => {
                indices.iter().map(|&row| self.value(row, col)).collect()
            }
        })
    }
}

const MATRIX_MAGIC: &[u8; 8] = b"EXPRMTX1";
const MATRIX_HEADER_LEN: usize = 24;

/// Read-only mapping of an `EXPRMTX1` container: 8-byte magic, u64-LE row
/// and column counts, then row-major f64-LE values.
#[derive(Debug)]
pub struct MmapMatrixStore {
    mmap: Mmap,
    rows: usize,
    cols: usize,
}

impl MmapMatrixStore {
    pub fn open(path: &Utf8Path) -> Result<Self, SliceError> {
        let file = File::open(path.as_std_path())
            .map_err(|err| SliceError::MatrixOpen(format!("{path}: {err}")))?;
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|err| SliceError::MatrixOpen(format!("{path}: {err}")))?;

        if mmap.len() < MATRIX_HEADER_LEN || &mmap[..8] != MATRIX_MAGIC {
            return Err(SliceError::MatrixOpen(format!(
                "{path}: not an expression matrix container"
            )));
        }
        let rows = read_u64(&mmap[8..16]) as usize;
        let cols = read_u64(&mmap[16..24]) as usize;
        let expected = MATRIX_HEADER_LEN + rows.saturating_mul(cols).saturating_mul(8);
        if mmap.len() != expected {
            return Err(SliceError::MatrixOpen(format!(
                "{path}: truncated matrix, expected {expected} bytes for {rows}x{cols}, got {}",
                mmap.len()
            )));
        }

        Ok(Self { mmap, rows, cols })
    }

    fn value(&self, row: usize, col: usize) -> Result<f64, SliceError> {
        let offset = MATRIX_HEADER_LEN + (row * self.cols + col) * 8;
        let bytes = self
            .mmap
            .get(offset..offset + 8)
            .ok_or_else(|| SliceError::StoreRead(format!("short read at ({row}, {col})")))?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(buf))
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

impl MatrixStore for MmapMatrixStore {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn submatrix(&self, rows: &RowSelection, cols: &[usize]) -> Result<Vec<Vec<f64>>, SliceError> {
        check_bounds(self, rows, cols)?;
        let extract = |row: usize| {
            cols.iter()
                .map(|&col| self.value(row, col))
                .collect::<Result<Vec<_>, _>>()
        };
        match rows {
            RowSelection::All => (0..self.rows).map(extract).collect(),
            RowSelection::Rows(indices) => indices.iter().map(|&row| extract(row)).collect(),
        }
    }

    fn column(&self, col: usize, rows: &RowSelection) -> Result<Vec<f64>, SliceError> {
        check_bounds(self, rows, &[col])?;
        match rows {
            RowSelection::All => (0..self.rows).map(|row| self.value(row, col)).collect(),
            RowSelection::Rows(indices) => {
                indices.iter().map(|&row| self.value(row, col)).collect()
            }
        }
    }
}

/// Write a matrix container in the `MmapMatrixStore` layout.
pub fn write_matrix(
    path: &Utf8Path,
    rows: usize,
    cols: usize,
    values: &[f64],
) -> Result<(), SliceError> {
    if values.len() != rows * cols {
        return Err(SliceError::ShapeMismatch(format!(
            "expected {} values for a {rows}x{cols} matrix, got {}",
            rows * cols,
            values.len()
        )));
    }
    let mut file = File::create(path.as_std_path())
        .map_err(|err| SliceError::MatrixOpen(format!("{path}: {err}")))?;
    file.write_all(MATRIX_MAGIC)
        .and_then(|_| file.write_all(&(rows as u64).to_le_bytes()))
        .and_then(|_| file.write_all(&(cols as u64).to_le_bytes()))
        .map_err(|err| SliceError::MatrixOpen(format!("{path}: {err}")))?;
    for value in values {
        file.write_all(&value.to_le_bytes())
            .map_err(|err| SliceError::MatrixOpen(format!("{path}: {err}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_fixture() -> DenseMatrixStore {
        // 3 genes x 4 samples
        DenseMatrixStore::new(
            3,
            4,
            vec![
                1.0, 2.0, 3.0, 4.0, //
                5.0, 6.0, 7.0, 8.0, //
                9.0, 10.0, 11.0, 12.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn dense_rejects_wrong_value_count() {
        let err = DenseMatrixStore::new(2, 2, vec![1.0]).unwrap_err();
        assert!(matches!(err, SliceError::ShapeMismatch(_)));
    }

    #[test]
    fn submatrix_preserves_supplied_column_order() {
        let store = dense_fixture();
        let slice = store
            .submatrix(&RowSelection::Rows(vec![0, 2]), &[3, 1])
            .unwrap();
        assert_eq!(slice, vec![vec![4.0, 2.0], vec![12.0, 10.0]]);
    }

    #[test]
    fn submatrix_all_rows() {
        let store = dense_fixture();
        let slice = store.submatrix(&RowSelection::All, &[0]).unwrap();
        assert_eq!(slice, vec![vec![1.0], vec![5.0], vec![9.0]]);
    }

    #[test]
    fn column_respects_row_selection() {
        let store = dense_fixture();
        let col = store.column(2, &RowSelection::Rows(vec![1])).unwrap();
        assert_eq!(col, vec![7.0]);
        let col = store.column(2, &RowSelection::All).unwrap();
        assert_eq!(col, vec![3.0, 7.0, 11.0]);
    }

    #[test]
    fn out_of_range_column_is_a_store_error() {
        let store = dense_fixture();
        let err = store.submatrix(&RowSelection::All, &[4]).unwrap_err();
        assert!(matches!(err, SliceError::StoreRead(_)));
    }
}
