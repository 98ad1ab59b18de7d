/// Nobel Prize API Client
///
/// Retrieves laureate records from the public laureates endpoint one page at
/// a time. Paging follows the `limit`/`offset` contract: the offset advances
/// by the page size until a page comes back with an empty `laureates` array.
///
/// API Documentation: https://www.nobelprize.org/about/developer-zone-2/
/// Laureates endpoint: https://api.nobelprize.org/2.1/laureates

use std::time::Duration;

use tracing::debug;

use crate::logging::Stage;
use crate::model::{FetchError, LaureatesPage, PipelineError, RawLaureate};

pub const NOBEL_API_URL: &str = "https://api.nobelprize.org/2.1/laureates";

// ============================================================================
// Page sources
// ============================================================================

/// Anything that can hand back one page of laureates for an offset.
pub trait PageSource {
    fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<RawLaureate>, FetchError>;
}

/// Blocking HTTP source backed by the public API.
pub struct NobelApiClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl NobelApiClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PipelineError::HttpClient)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Builds the request URL for one page.
pub fn build_page_url(endpoint: &str, offset: usize, limit: usize) -> String {
    format!("{}?limit={}&offset={}", endpoint, limit, offset)
}

impl PageSource for NobelApiClient {
    fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<RawLaureate>, FetchError> {
        let url = build_page_url(&self.endpoint, offset, limit);
        debug!(stage = %Stage::Fetch, %url, "requesting page");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()?;

        let status = response.status().as_u16();
        if status >= 300 {
            return Err(FetchError::HttpStatus { status, offset });
        }

        let text = response.text()?;
        parse_page(&text)
    }
}

/// Parses one response body into its laureate records.
pub fn parse_page(body: &str) -> Result<Vec<RawLaureate>, FetchError> {
    let page: LaureatesPage =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(page.laureates)
}

// ============================================================================
// Lazy paging
// ============================================================================

/// Lazy, finite sequence of pages.
///
/// Yields `Ok(batch)` for every non-empty page. The first empty page ends the
/// sequence; the first failure is yielded once as `Err` and also ends it.
/// Once finished it stays finished.
pub struct Pages<'a, S: PageSource> {
    source: &'a S,
    page_size: usize,
    offset: usize,
    finished: bool,
}

impl<'a, S: PageSource> Pages<'a, S> {
    pub fn new(source: &'a S, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            offset: 0,
            finished: false,
        }
    }

    /// Offset the next request would use.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<S: PageSource> Iterator for Pages<'_, S> {
    type Item = Result<Vec<RawLaureate>, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.source.fetch_page(self.offset, self.page_size) {
            Ok(batch) if batch.is_empty() => {
                self.finished = true;
                None
            }
            Ok(batch) => {
                self.offset += self.page_size;
                Some(Ok(batch))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<S: PageSource> std::iter::FusedIterator for Pages<'_, S> {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Serves a fixed number of laureates, optionally failing at one offset.
    struct FakeSource {
        total: usize,
        fail_at: Option<usize>,
        requested: RefCell<Vec<(usize, usize)>>,
    }

    impl FakeSource {
        fn new(total: usize, fail_at: Option<usize>) -> Self {
            Self {
                total,
                fail_at,
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl PageSource for FakeSource {
        fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<RawLaureate>, FetchError> {
            self.requested.borrow_mut().push((offset, limit));
            if self.fail_at == Some(offset) {
                return Err(FetchError::HttpStatus { status: 503, offset });
            }
            let end = self.total.min(offset + limit);
            Ok((offset..end)
                .map(|i| RawLaureate::Unrecognized(serde_json::json!({ "id": i.to_string() })))
                .collect())
        }
    }

    #[test]
    fn test_build_page_url_includes_limit_and_offset() {
        assert_eq!(
            build_page_url(NOBEL_API_URL, 200, 100),
            "https://api.nobelprize.org/2.1/laureates?limit=100&offset=200"
        );
    }

    /// Batch sizes in arrival order, plus the failure that ended paging.
    fn drain(pages: Pages<'_, FakeSource>) -> (Vec<usize>, Option<FetchError>) {
        let mut sizes = Vec::new();
        let mut failure = None;
        for page in pages {
            match page {
                Ok(batch) => sizes.push(batch.len()),
                Err(e) => failure = Some(e),
            }
        }
        (sizes, failure)
    }

    #[test]
    fn test_pages_advance_until_empty_page() {
        let source = FakeSource::new(250, None);
        let (sizes, failure) = drain(Pages::new(&source, 100));

        assert_eq!(sizes, vec![100, 100, 50]);
        assert!(failure.is_none());
        assert_eq!(
            *source.requested.borrow(),
            vec![(0, 100), (100, 100), (200, 100), (300, 100)]
        );
    }

    #[test]
    fn test_failed_page_ends_sequence_after_earlier_pages() {
        let source = FakeSource::new(500, Some(200));
        let mut pages = Pages::new(&source, 100);

        assert_eq!(pages.next().unwrap().unwrap().len(), 100);
        assert_eq!(pages.next().unwrap().unwrap().len(), 100);
        match pages.next() {
            Some(Err(FetchError::HttpStatus { status, offset })) => {
                assert_eq!(status, 503);
                assert_eq!(offset, 200);
            }
            other => panic!("expected HTTP failure, got {:?}", other),
        }
        // the failed offset is not skipped past
        assert_eq!(pages.offset(), 200);
        assert!(pages.next().is_none());
    }

    #[test]
    fn test_pages_do_not_restart_after_failure() {
        let source = FakeSource::new(500, Some(0));
        let mut pages = Pages::new(&source, 100);

        assert!(matches!(pages.next(), Some(Err(_))));
        assert!(pages.next().is_none());
        assert!(pages.next().is_none());
        assert_eq!(source.requested.borrow().len(), 1);
    }

    #[test]
    fn test_empty_source_yields_no_pages() {
        let source = FakeSource::new(0, None);
        let mut pages = Pages::new(&source, 100);
        assert!(pages.next().is_none());
        assert_eq!(pages.offset(), 0);
    }

    #[test]
    fn test_parse_page_reads_laureates_array() {
        let body = r#"{"laureates": [{"id": "1", "fullName": {"en": "Wilhelm Conrad Röntgen"}}], "meta": {}}"#;
        let records = parse_page(body).unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], RawLaureate::Individual(_)));
    }

    #[test]
    fn test_parse_page_rejects_non_json() {
        let err = parse_page("<html>gateway timeout</html>").unwrap_err();
        assert!(err.to_string().starts_with("Parse error"));
    }
}
