use std::collections::{BTreeSet, HashSet};

use crate::catalog::CatalogIndex;
use crate::domain::{ContentRange, RowSelection};
use crate::error::SliceError;

/// Hard cap on distinct accessions in a single expression query.
pub const MAX_SAMPLES_PER_QUERY: usize = 100;

#[derive(Debug, PartialEq, Eq)]
pub struct ResolvedSlice {
    pub rows: RowSelection,
    pub cols: Vec<usize>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ListingWindow {
    pub items: Vec<String>,
    pub range: ContentRange,
}

#[derive(Debug, Clone, Copy)]
pub enum ListingDomain<'a> {
    Genes,
    Accessions { series_id: Option<&'a str> },
    Series,
}

/// Validation and not-found detection happen here, before any matrix access.
pub struct QueryResolver<'a> {
    catalog: &'a CatalogIndex,
}

impl<'a> QueryResolver<'a> {
    pub fn new(catalog: &'a CatalogIndex) -> Self {
        Self { catalog }
    }

    /// Unknown filter entries are dropped silently; only a fully unmatched
    /// filter is an error, genes checked before samples.
    pub fn resolve_expression_filter(
        &self,
        gene_filter: Option<&[String]>,
        accession_filter: &[String],
    ) -> Result<ResolvedSlice, SliceError> {
        let mut seen = HashSet::new();
        let distinct: Vec<&String> = accession_filter
            .iter()
            .filter(|accession| seen.insert(accession.as_str()))
            .collect();
        if distinct.len() > MAX_SAMPLES_PER_QUERY {
            return Err(SliceError::TooManySamples {
                got: distinct.len(),
                max: MAX_SAMPLES_PER_QUERY,
            });
        }

        let rows = match gene_filter {
            None => RowSelection::All,
            Some(symbols) => {
                let matched: BTreeSet<usize> = symbols
                    .iter()
                    .filter_map(|symbol| self.catalog.gene_rows(symbol))
                    .flatten()
                    .copied()
                    .collect();
                if matched.is_empty() {
                    return Err(SliceError::NoGenesMatched);
                }
                RowSelection::Rows(matched.into_iter().collect())
            }
        };

        let cols: Vec<usize> = distinct
            .iter()
            .filter_map(|accession| self.catalog.accession_col(accession.as_str()))
            .collect();
        if cols.is_empty() {
            return Err(SliceError::NoSamplesMatched);
        }

        Ok(ResolvedSlice { rows, cols })
    }

    pub fn resolve_listing_filter(
        &self,
        domain: ListingDomain<'_>,
        substring: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<ListingWindow, SliceError> {
        let base: &[String] = match domain {
            ListingDomain::Genes => self.catalog.genes(),
            ListingDomain::Accessions { series_id: None } => self.catalog.accessions(),
            ListingDomain::Accessions {
                series_id: Some(series_id),
            } => self
                .catalog
                .series_members(series_id)
                .ok_or_else(|| SliceError::SeriesNotFound(series_id.to_string()))?,
            ListingDomain::Series => self.catalog.series_ids(),
        };

        let filtered: Vec<&String> = match substring {
            Some(needle) => base.iter().filter(|entry| entry.contains(needle)).collect(),
            None => base.iter().collect(),
        };

        let range = ContentRange::window(skip, limit, filtered.len());
        if range.start >= range.end {
            return Err(SliceError::EmptyWindow);
        }

        Ok(ListingWindow {
            items: filtered[range.start..range.end]
                .iter()
                .map(|entry| (*entry).clone())
                .collect(),
            range,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn raw(values: &[&str]) -> Vec<Vec<u8>> {
        values.iter().map(|v| v.as_bytes().to_vec()).collect()
    }

    fn catalog() -> CatalogIndex {
        CatalogIndex::build(
            &raw(&["TP53", "EGFR", "BRCA1", "TP53"]),
            &raw(&["GSM1", "GSM2", "GSM3", "GSM4"]),
            &raw(&["GSE1", "GSE1", "GSE2", ""]),
        )
        .unwrap()
    }

    #[test]
    fn unfiltered_genes_use_the_sentinel() {
        let catalog = catalog();
        let resolved = QueryResolver::new(&catalog)
            .resolve_expression_filter(None, &["GSM2".to_string()])
            .unwrap();
        assert_eq!(resolved.rows, RowSelection::All);
        assert_eq!(resolved.cols, vec![1]);
    }

    #[test]
    fn gene_rows_ascending_with_duplicates() {
        let catalog = catalog();
        let resolved = QueryResolver::new(&catalog)
            .resolve_expression_filter(
                Some(&["TP53".to_string(), "EGFR".to_string()]),
                &["GSM1".to_string()],
            )
            .unwrap();
        assert_eq!(resolved.rows, RowSelection::Rows(vec![0, 1, 3]));
    }

    #[test]
    fn columns_preserve_caller_order_and_drop_unknowns() {
        let catalog = catalog();
        let resolved = QueryResolver::new(&catalog)
            .resolve_expression_filter(
                None,
                &[
                    "GSM3".to_string(),
                    "GSM999".to_string(),
                    "GSM1".to_string(),
                    "GSM3".to_string(),
                ],
            )
            .unwrap();
        assert_eq!(resolved.cols, vec![2, 0]);
    }

    #[test]
    fn sample_cap_boundary() {
        let catalog = catalog();
        let resolver = QueryResolver::new(&catalog);

        let mut exactly_cap: Vec<String> = (0..99).map(|i| format!("GSM{}", 100 + i)).collect();
        exactly_cap.push("GSM1".to_string());
        assert_eq!(exactly_cap.len(), 100);
        let resolved = resolver
            .resolve_expression_filter(None, &exactly_cap)
            .unwrap();
        assert_eq!(resolved.cols, vec![0]);

        exactly_cap.push("GSM2".to_string());
        let err = resolver
            .resolve_expression_filter(None, &exactly_cap)
            .unwrap_err();
        assert_matches!(err, SliceError::TooManySamples { got: 101, max: 100 });
    }

    #[test]
    fn repeated_accessions_count_once_toward_the_cap() {
        let catalog = catalog();
        let repeated: Vec<String> = std::iter::repeat_n("GSM1".to_string(), 150).collect();
        let resolved = QueryResolver::new(&catalog)
            .resolve_expression_filter(None, &repeated)
            .unwrap();
        assert_eq!(resolved.cols, vec![0]);
    }

    #[test]
    fn no_genes_matched_takes_precedence_over_no_samples() {
        let catalog = catalog();
        let err = QueryResolver::new(&catalog)
            .resolve_expression_filter(Some(&["NOPE".to_string()]), &["GSM999".to_string()])
            .unwrap_err();
        assert_matches!(err, SliceError::NoGenesMatched);
    }

    #[test]
    fn no_samples_matched() {
        let catalog = catalog();
        let err = QueryResolver::new(&catalog)
            .resolve_expression_filter(Some(&["TP53".to_string()]), &["GSM999".to_string()])
            .unwrap_err();
        assert_matches!(err, SliceError::NoSamplesMatched);
    }

    #[test]
    fn listing_window_and_range() {
        let catalog = catalog();
        let window = QueryResolver::new(&catalog)
            .resolve_listing_filter(ListingDomain::Genes, None, 1, 2)
            .unwrap();
        assert_eq!(window.items, vec!["EGFR", "BRCA1"]);
        assert_eq!(window.range.to_string(), "1-3/4");
    }

    #[test]
    fn listing_substring_filter_is_case_sensitive() {
        let catalog = catalog();
        let resolver = QueryResolver::new(&catalog);
        let window = resolver
            .resolve_listing_filter(ListingDomain::Genes, Some("TP"), 0, 10)
            .unwrap();
        assert_eq!(window.items, vec!["TP53", "TP53"]);
        assert_eq!(window.range.total, 2);

        let err = resolver
            .resolve_listing_filter(ListingDomain::Genes, Some("tp"), 0, 10)
            .unwrap_err();
        assert_matches!(err, SliceError::EmptyWindow);
    }

    #[test]
    fn listing_restricted_to_series() {
        let catalog = catalog();
        let window = QueryResolver::new(&catalog)
            .resolve_listing_filter(
                ListingDomain::Accessions {
                    series_id: Some("GSE1"),
                },
                None,
                0,
                10,
            )
            .unwrap();
        assert_eq!(window.items, vec!["GSM1", "GSM2"]);
        assert_eq!(window.range.total, 2);
    }

    #[test]
    fn unknown_series_is_not_found() {
        let catalog = catalog();
        let err = QueryResolver::new(&catalog)
            .resolve_listing_filter(
                ListingDomain::Accessions {
                    series_id: Some("GSE404"),
                },
                None,
                0,
                10,
            )
            .unwrap_err();
        assert_matches!(err, SliceError::SeriesNotFound(_));
    }

    #[test]
    fn skip_beyond_total_is_empty_window() {
        let catalog = catalog();
        let err = QueryResolver::new(&catalog)
            .resolve_listing_filter(ListingDomain::Series, None, 5, 10)
            .unwrap_err();
        assert_matches!(err, SliceError::EmptyWindow);
    }
}
