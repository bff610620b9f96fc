//! Deduplication and quota tracking for one crawl session
//!
//! Two layers:
//! - [`Frontier`]: URLs seen anywhere in the run; gates detail fetches
//! - [`QuerySeen`]: URLs surfaced by the current query; drives quota and
//!   stagnation checks
//!
//! A URL may be in the global set and still count toward the current query's
//! quota. Quota measures listings surfaced, not listings newly fetched.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Run-wide set of seen job URLs
#[derive(Debug, Default)]
pub struct Frontier {
    seen: Mutex<HashSet<String>>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically records `url`, returning true if it was not seen before
    pub fn insert_if_absent(&self, url: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.contains(url) {
            return false;
        }
        seen.insert(url.to_string())
    }

    /// Records every URL without reporting which ones were new
    pub fn mark_all_seen<'a>(&self, urls: impl IntoIterator<Item = &'a String>) {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.extend(urls.into_iter().cloned());
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// URLs surfaced by one (title, location) query, bounded by its quota
#[derive(Debug)]
pub struct QuerySeen {
    urls: HashSet<String>,
    quota: usize,
}

impl QuerySeen {
    pub fn new(quota: usize) -> Self {
        Self {
            urls: HashSet::new(),
            quota,
        }
    }

    /// Records `url` for this query, returning true if the query had not seen it
    pub fn observe(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    pub fn quota_reached(&self) -> bool {
        self.urls.len() >= self.quota
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_if_absent() {
        let frontier = Frontier::new();
        assert!(frontier.insert_if_absent("https://a.test/jobs/1"));
        assert!(!frontier.insert_if_absent("https://a.test/jobs/1"));
        assert!(frontier.contains("https://a.test/jobs/1"));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_mark_all_seen() {
        let frontier = Frontier::new();
        let rest = vec!["https://a.test/1".to_string(), "https://a.test/2".to_string()];

        frontier.mark_all_seen(rest.iter());
        assert_eq!(frontier.len(), 2);
        assert!(!frontier.insert_if_absent("https://a.test/2"));
    }

    #[test]
    fn test_query_quota() {
        let mut query = QuerySeen::new(2);
        assert!(query.observe("https://a.test/1"));
        assert!(!query.observe("https://a.test/1"));
        assert!(!query.quota_reached());
        assert!(query.observe("https://a.test/2"));
        assert!(query.quota_reached());
    }

    #[test]
    fn test_query_sets_are_independent_of_global() {
        // The same job surfaced by two queries counts toward both quotas
        let frontier = Frontier::new();
        let mut first = QuerySeen::new(5);
        let mut second = QuerySeen::new(5);
        let url = "https://a.test/jobs/shared";

        assert!(first.observe(url));
        assert!(frontier.insert_if_absent(url));
        assert!(second.observe(url));
        assert!(!frontier.insert_if_absent(url));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_concurrent_inserts_admit_each_url_once() {
        let frontier = Arc::new(Frontier::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| frontier.insert_if_absent(&format!("https://a.test/{}", i)))
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
        assert_eq!(frontier.len(), 100);
    }
}
