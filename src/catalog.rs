use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::SliceError;

#[derive(Debug)]
pub struct CatalogIndex {
    genes: Vec<String>,
    gene_rows: HashMap<String, Vec<usize>>,
    accessions: Vec<String>,
    accession_cols: HashMap<String, usize>,
    series_ids: Vec<String>,
    series_members: HashMap<String, Vec<String>>,
}

impl CatalogIndex {
    /// A raw series tag may hold several tab-separated series ids. Series
    /// keep first-seen order, membership lists keep encounter order.
    pub fn build(
        gene_symbols: &[Vec<u8>],
        accessions: &[Vec<u8>],
        series_tags: &[Vec<u8>],
    ) -> Result<Self, SliceError> {
        if accessions.len() != series_tags.len() {
            return Err(SliceError::ShapeMismatch(format!(
                "{} accessions but {} series tags",
                accessions.len(),
                series_tags.len()
            )));
        }

        let genes = decode_all(gene_symbols, "gene_symbol")?;
        let accessions = decode_all(accessions, "geo_accession")?;
        let series_tags = decode_all(series_tags, "series_id")?;

        let mut gene_rows: HashMap<String, Vec<usize>> = HashMap::with_capacity(genes.len());
        for (row, symbol) in genes.iter().enumerate() {
            gene_rows.entry(symbol.clone()).or_default().push(row);
        }

        let mut accession_cols = HashMap::with_capacity(accessions.len());
        for (col, accession) in accessions.iter().enumerate() {
            accession_cols.entry(accession.clone()).or_insert(col);
        }

        let mut series_ids = Vec::new();
        let mut series_members: HashMap<String, Vec<String>> = HashMap::new();
        for (tag, accession) in series_tags.iter().zip(&accessions) {
            for series in tag.split('\t') {
                if series.is_empty() {
                    continue;
                }
                let members = match series_members.entry(series.to_string()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        series_ids.push(series.to_string());
                        entry.insert(Vec::new())
                    }
                };
                members.push(accession.clone());
            }
        }

        Ok(Self {
            genes,
            gene_rows,
            accessions,
            accession_cols,
            series_ids,
            series_members,
        })
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn accessions(&self) -> &[String] {
        &self.accessions
    }

    pub fn series_ids(&self) -> &[String] {
        &self.series_ids
    }

    /// All rows carrying this symbol, ascending; duplicate symbols do occur.
    pub fn gene_rows(&self, symbol: &str) -> Option<&[usize]> {
        self.gene_rows.get(symbol).map(Vec::as_slice)
    }

    pub fn accession_col(&self, accession: &str) -> Option<usize> {
        self.accession_cols.get(accession).copied()
    }

    pub fn series_members(&self, series_id: &str) -> Option<&[String]> {
        self.series_members.get(series_id).map(Vec::as_slice)
    }
}

fn decode_all(raw: &[Vec<u8>], field: &'static str) -> Result<Vec<String>, SliceError> {
    raw.iter()
        .enumerate()
        .map(|(index, bytes)| {
            String::from_utf8(bytes.clone())
                .map_err(|_| SliceError::MetadataDecode { field, index })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn raw(values: &[&str]) -> Vec<Vec<u8>> {
        values.iter().map(|v| v.as_bytes().to_vec()).collect()
    }

    fn fixture() -> CatalogIndex {
        CatalogIndex::build(
            &raw(&["TP53", "EGFR", "TP53"]),
            &raw(&["GSM1", "GSM2", "GSM3", "GSM4"]),
            &raw(&["GSE1", "GSE1\tGSE2", "GSE2", ""]),
        )
        .unwrap()
    }

    #[test]
    fn gene_rows_collect_duplicates_ascending() {
        let catalog = fixture();
        assert_eq!(catalog.gene_rows("TP53"), Some(&[0, 2][..]));
        assert_eq!(catalog.gene_rows("EGFR"), Some(&[1][..]));
        assert_eq!(catalog.gene_rows("BRCA1"), None);
    }

    #[test]
    fn accession_lookup_matches_column_order() {
        let catalog = fixture();
        assert_eq!(catalog.accession_col("GSM1"), Some(0));
        assert_eq!(catalog.accession_col("GSM4"), Some(3));
        assert_eq!(catalog.accession_col("GSM999"), None);
    }

    #[test]
    fn series_split_on_tab_and_grouped() {
        let catalog = fixture();
        assert_eq!(catalog.series_ids(), &["GSE1", "GSE2"]);
        assert_eq!(catalog.series_members("GSE1"), Some(&["GSM1".to_string(), "GSM2".to_string()][..]));
        assert_eq!(catalog.series_members("GSE2"), Some(&["GSM2".to_string(), "GSM3".to_string()][..]));
        assert_eq!(catalog.series_members("GSE3"), None);
    }

    #[test]
    fn empty_series_tag_joins_no_series() {
        let catalog = fixture();
        for members in catalog.series_ids().iter().map(|s| catalog.series_members(s).unwrap()) {
            assert!(!members.contains(&"GSM4".to_string()));
        }
    }

    #[test]
    fn mismatched_sample_arrays_fail() {
        let err = CatalogIndex::build(&raw(&["TP53"]), &raw(&["GSM1", "GSM2"]), &raw(&["GSE1"]))
            .unwrap_err();
        assert_matches!(err, SliceError::ShapeMismatch(_));
    }

    #[test]
    fn invalid_utf8_fails_with_field_context() {
        let err = CatalogIndex::build(
            &[vec![0xff, 0xfe]],
            &raw(&["GSM1"]),
            &raw(&["GSE1"]),
        )
        .unwrap_err();
        assert_matches!(
            err,
            SliceError::MetadataDecode {
                field: "gene_symbol",
                index: 0
            }
        );
    }
}
