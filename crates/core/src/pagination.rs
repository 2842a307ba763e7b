//! Marker-based pagination
//!
//! A sweep asks a [`PageSource`] for pages of at most `limit` items, resuming
//! after the key of the last item it saw. An empty page ends the sweep. The
//! returned stream is lazy: a page is only fetched when the consumer asks for
//! an item past the current page, so stopping early costs nothing.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt as _};

use crate::error::{Error, Result};

/// One page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Key of the last item of the previous page (`None` on the first page)
    pub marker: Option<String>,
    /// Maximum number of items
    pub limit: usize,
}

/// Listing endpoint driven by a sweep
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    type Item: Send + 'static;

    /// Fetch one page
    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<Self::Item>>;

    /// Resumption key of an item
    fn marker_of(item: &Self::Item) -> String;
}

struct Sweep<S: PageSource> {
    source: S,
    limit: usize,
    marker: Option<String>,
    visited: HashSet<String>,
    buffer: VecDeque<S::Item>,
}

/// Start a fresh sweep over `source`
pub fn paginate<S: PageSource>(source: S, limit: usize) -> BoxStream<'static, Result<S::Item>> {
    let sweep = Sweep {
        source,
        limit,
        marker: None,
        visited: HashSet::new(),
        buffer: VecDeque::new(),
    };

    stream::try_unfold(sweep, |mut sweep| async move {
        if sweep.buffer.is_empty() {
            let page = sweep
                .source
                .fetch_page(PageRequest {
                    marker: sweep.marker.clone(),
                    limit: sweep.limit,
                })
                .await?;
            tracing::debug!(marker = ?sweep.marker, items = page.len(), "fetched page");
            sweep.buffer.extend(page);
        }

        // An empty page ends the sweep.
        let Some(item) = sweep.buffer.pop_front() else {
            return Ok(None);
        };

        let key = S::marker_of(&item);
        if !sweep.visited.insert(key.clone()) {
            tracing::warn!(marker = %key, "listing returned a key twice");
            return Err(Error::ProtocolViolation(format!(
                "key {key} has already been visited in this listing"
            )));
        }
        sweep.marker = Some(key);

        Ok(Some((item, sweep)))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt as _;
    use std::sync::{Arc, Mutex};

    /// Serves canned pages and records the requests it received
    struct CannedPages {
        pages: Mutex<VecDeque<Result<Vec<String>>>>,
        seen: Arc<Mutex<Vec<PageRequest>>>,
    }

    impl CannedPages {
        fn new(pages: Vec<Vec<&str>>) -> (Self, Arc<Mutex<Vec<PageRequest>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let pages = pages
                .into_iter()
                .map(|p| Ok(p.into_iter().map(String::from).collect()))
                .collect();
            (
                Self {
                    pages: Mutex::new(pages),
                    seen: seen.clone(),
                },
                seen,
            )
        }
    }

    #[async_trait]
    impl PageSource for CannedPages {
        type Item = String;

        async fn fetch_page(&self, request: PageRequest) -> Result<Vec<String>> {
            self.seen.lock().unwrap().push(request);
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        fn marker_of(item: &String) -> String {
            item.clone()
        }
    }

    #[tokio::test]
    async fn test_two_full_pages_then_empty() {
        let (source, seen) = CannedPages::new(vec![vec!["a", "b"], vec!["c", "d"], vec![]]);
        let items: Vec<String> = paginate(source, 2).try_collect().await.unwrap();
        assert_eq!(items, vec!["a", "b", "c", "d"]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].marker, None);
        assert_eq!(seen[1].marker.as_deref(), Some("b"));
        assert_eq!(seen[2].marker.as_deref(), Some("d"));
        assert!(seen.iter().all(|r| r.limit == 2));
    }

    #[tokio::test]
    async fn test_repeat_within_page_is_protocol_violation() {
        let (source, _) = CannedPages::new(vec![vec!["a", "a"]]);
        let mut stream = paginate(source, 10);

        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        assert!(matches!(
            stream.next().await,
            Some(Err(Error::ProtocolViolation(_)))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_repeat_across_pages_is_protocol_violation() {
        let (source, _) = CannedPages::new(vec![vec!["a", "b"], vec!["b", "c"]]);
        let result: Result<Vec<String>> = paginate(source, 2).try_collect().await;
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }

    #[tokio::test]
    async fn test_early_stop_fetches_one_page() {
        let (source, seen) = CannedPages::new(vec![vec!["x", "y"], vec!["z"]]);
        let first = paginate(source, 2).next().await.unwrap().unwrap();
        assert_eq!(first, "x");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_page_error_surfaces() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let source = CannedPages {
            pages: Mutex::new(VecDeque::from(vec![
                Ok(vec!["a".to_string()]),
                Err(Error::Network("reset".into())),
            ])),
            seen,
        };
        let mut stream = paginate(source, 1);
        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(stream.next().await, Some(Err(Error::Network(_)))));
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let (source, _) = CannedPages::new(vec![]);
        let items: Vec<String> = paginate(source, 5).try_collect().await.unwrap();
        assert!(items.is_empty());
    }
}
