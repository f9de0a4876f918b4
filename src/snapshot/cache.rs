use std::future::Future;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::snapshot::{RawRow, SnapshotError, SnapshotSource};

#[derive(Debug)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// Single-slot cache whose entry lives for a fixed `ttl` after it is stored.
///
/// The slot lock is held while a refresh runs, so callers arriving during a
/// fetch wait for it and then read the stored value instead of fetching again.
/// Failed fetches leave the slot untouched.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Mutex<Option<CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_or_fetch<F, Fut, E>(&self, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.as_ref() {
            if Instant::now() < entry.expires_at {
                return Ok(entry.value.clone());
            }
        }

        let value = fetch().await?;
        *slot = Some(CacheEntry {
            value: value.clone(),
            expires_at: Instant::now() + self.ttl,
        });
        Ok(value)
    }
}

pub struct CachedSnapshotSource<S> {
    inner: S,
    cache: TtlCache<Option<RawRow>>,
}

impl<S: SnapshotSource> CachedSnapshotSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl),
        }
    }
}

#[async_trait]
impl<S: SnapshotSource> SnapshotSource for CachedSnapshotSource<S> {
    async fn latest(&self) -> Result<Option<RawRow>, SnapshotError> {
        self.cache
            .get_or_fetch(|| async {
                debug!(ttl_secs = self.cache.ttl().as_secs(), "snapshot cache expired, refetching");
                self.inner.latest().await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::time::{advance, sleep, Duration};

    use super::{CachedSnapshotSource, TtlCache};
    use crate::snapshot::{RawRow, SnapshotError, SnapshotSource};

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SnapshotSource for CountingSource {
        async fn latest(&self) -> Result<Option<RawRow>, SnapshotError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            sleep(Duration::from_millis(200)).await;
            if self.fail {
                return Err(SnapshotError::NotConfigured("source.url"));
            }
            let row = json!({ "call": call });
            Ok(row.as_object().cloned())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn serves_cached_value_inside_window() {
        let cache = TtlCache::new(Duration::from_secs(50));
        let first: Result<u32, ()> = cache.get_or_fetch(|| async { Ok(1) }).await;
        advance(Duration::from_secs(49)).await;
        let second: Result<u32, ()> = cache.get_or_fetch(|| async { Ok(2) }).await;
        assert_eq!(first, Ok(1));
        assert_eq!(second, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn refetches_once_window_has_elapsed() {
        let cache = TtlCache::new(Duration::from_secs(50));
        let _: Result<u32, ()> = cache.get_or_fetch(|| async { Ok(1) }).await;
        advance(Duration::from_secs(50)).await;
        let refreshed: Result<u32, ()> = cache.get_or_fetch(|| async { Ok(2) }).await;
        assert_eq!(refreshed, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn errors_are_not_cached() {
        let cache = TtlCache::new(Duration::from_secs(50));
        let failed: Result<u32, &str> = cache.get_or_fetch(|| async { Err("down") }).await;
        let recovered: Result<u32, &str> = cache.get_or_fetch(|| async { Ok(7) }).await;
        assert_eq!(failed, Err("down"));
        assert_eq!(recovered, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_readers_share_one_fetch() {
        let inner = Arc::new(CountingSource::default());
        let cached = CachedSnapshotSource::new(inner.clone(), Duration::from_secs(50));

        let (a, b) = tokio::join!(cached.latest(), cached.latest());
        let a = a.expect("first read");
        let b = b.expect("second read");
        assert_eq!(a, b);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        advance(Duration::from_secs(51)).await;
        let c = cached.latest().await.expect("third read");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.and_then(|row| row.get("call").cloned()), Some(json!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_upstream_is_retried_on_next_read() {
        let inner = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cached = CachedSnapshotSource::new(inner.clone(), Duration::from_secs(50));
        assert!(cached.latest().await.is_err());
        assert!(cached.latest().await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
