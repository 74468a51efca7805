use std::collections::BTreeSet;

use itertools::Itertools;
use thiserror::Error;

use crate::guide::PageKey;

#[derive(Debug, Error, PartialEq)]
pub enum PageRangeError {
    #[error("no pages given")]
    Empty,
    #[error("{0:?} is not a page number or range")]
    Invalid(String),
    #[error("pages are numbered from 1")]
    ZeroPage,
    #[error("range {0}-{1} runs backwards")]
    Reversed(usize, usize),
}

/// Parses page numbers like `1,3,4-8,10` (1-based, inclusive spans) into
/// sorted, unique 0-based page indices.
pub fn parse_page_ranges(input: &str) -> Result<Vec<PageKey>, PageRangeError> {
    if input.trim().is_empty() {
        return Err(PageRangeError::Empty);
    }

    let mut pages = BTreeSet::new();
    for part in input.split(',').map(str::trim) {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_page(part, start)?, parse_page(part, end)?),
            None => {
                let page = parse_page(part, part)?;
                (page, page)
            }
        };

        if start > end {
            return Err(PageRangeError::Reversed(start, end));
        }
        pages.extend((start..=end).map(|page| page - 1));
    }

    Ok(pages.into_iter().collect())
}

fn parse_page(part: &str, number: &str) -> Result<usize, PageRangeError> {
    let page: usize = number
        .trim()
        .parse()
        .map_err(|_| PageRangeError::Invalid(part.to_string()))?;
    if page == 0 {
        return Err(PageRangeError::ZeroPage);
    }
    Ok(page)
}

/// Outcome of running one page operation over many pages.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    pub updated: Vec<PageKey>,
    /// Pages the operation had nothing to do on.
    pub skipped: Vec<PageKey>,
    pub failed: Vec<(PageKey, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// 1-based page list of the failures, for messages.
    pub fn failed_pages(&self) -> String {
        self.failed.iter().map(|(page, _)| page + 1).join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_spans() {
        assert_eq!(
            parse_page_ranges("1,3,4-8,10,11-12,15"),
            Ok(vec![0, 2, 3, 4, 5, 6, 7, 9, 10, 11, 14])
        );
    }

    #[test]
    fn overlapping_parts_are_merged() {
        assert_eq!(parse_page_ranges(" 5-7, 6 ,2 "), Ok(vec![1, 4, 5, 6]));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_page_ranges(""), Err(PageRangeError::Empty));
        assert_eq!(parse_page_ranges("0-3"), Err(PageRangeError::ZeroPage));
        assert_eq!(parse_page_ranges("8-4"), Err(PageRangeError::Reversed(8, 4)));
        assert_eq!(
            parse_page_ranges("1,two"),
            Err(PageRangeError::Invalid("two".to_string()))
        );
        assert_eq!(
            parse_page_ranges("1,,2"),
            Err(PageRangeError::Invalid("".to_string()))
        );
        assert_eq!(
            parse_page_ranges("1-2-3"),
            Err(PageRangeError::Invalid("1-2-3".to_string()))
        );
    }

    #[test]
    fn failed_pages_are_one_based() {
        let report = BatchReport {
            updated: vec![0],
            skipped: vec![2],
            failed: vec![(1, "corrupt".to_string()), (4, "corrupt".to_string())],
        };

        assert!(!report.is_success());
        assert_eq!(report.failed_pages(), "2, 5");
    }
}
