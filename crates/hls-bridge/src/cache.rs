use std::sync::Arc;

use bilivod_resolver::ByteRange;
use bytes::Bytes;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::Result;
use crate::fetcher::RangeFetcher;

type Slot = Arc<OnceCell<Bytes>>;

/// Index bytes keyed by remote URL and requested range.
///
/// Each key owns a slot that is filled at most once. Concurrent callers for
/// the same key wait on the first caller's fetch. A failed fetch leaves the
/// slot empty, so the next caller tries again.
#[derive(Debug, Default)]
pub struct IndexCache {
    slots: Mutex<FxHashMap<(String, ByteRange), Slot>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch(
        &self,
        url: &str,
        range: ByteRange,
        fetcher: &dyn RangeFetcher,
    ) -> Result<Bytes> {
        let slot = self
            .slots
            .lock()
            .entry((url.to_string(), range))
            .or_default()
            .clone();

        if let Some(bytes) = slot.get() {
            debug!("index cache hit for {} ({})", url, range);
            return Ok(bytes.clone());
        }

        slot.get_or_try_init(|| fetcher.fetch_range(url, range))
            .await
            .cloned()
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::BridgeError;

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl RangeFetcher for CountingFetcher {
        async fn fetch_range(&self, url: &str, _range: ByteRange) -> Result<Bytes> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && call == 0 {
                return Err(BridgeError::range_fetch(url, "boom"));
            }
            Ok(Bytes::from_static(b"sidx"))
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = IndexCache::new();
        let fetcher = CountingFetcher::default();
        let range = ByteRange::new(0, 3).unwrap();

        let (a, b) = tokio::join!(
            cache.get_or_fetch("https://a/v.m4s", range, &fetcher),
            cache.get_or_fetch("https://a/v.m4s", range, &fetcher),
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);

        cache.get_or_fetch("https://a/a.m4s", range, &fetcher).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = IndexCache::new();
        let fetcher = CountingFetcher {
            fail_first: true,
            ..Default::default()
        };
        let range = ByteRange::new(0, 3).unwrap();

        assert!(cache.get_or_fetch("https://a/v.m4s", range, &fetcher).await.is_err());
        assert!(cache.is_empty());
        assert!(cache.get_or_fetch("https://a/v.m4s", range, &fetcher).await.is_ok());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
