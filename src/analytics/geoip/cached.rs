use async_trait::async_trait;
use moka::future::Cache;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use super::{GeoInfo, GeoResolver};

/// Read-through TTL cache in front of another resolver.
///
/// Only successful lookups are cached, so a transient resolver failure is
/// retried on the next visit from the same address.
pub struct CachedGeoResolver {
    inner: Arc<dyn GeoResolver>,
    cache: Cache<IpAddr, GeoInfo>,
}

impl CachedGeoResolver {
    pub fn new(inner: Arc<dyn GeoResolver>, max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl GeoResolver for CachedGeoResolver {
    async fn resolve(&self, ip: IpAddr) -> Option<GeoInfo> {
        self.cache
            .optionally_get_with(ip, self.inner.resolve(ip))
            .await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
        answer: Option<GeoInfo>,
    }

    #[async_trait]
    impl GeoResolver for CountingResolver {
        async fn resolve(&self, _ip: IpAddr) -> Option<GeoInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn counting(answer: Option<GeoInfo>) -> Arc<CountingResolver> {
        Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
            answer,
        })
    }

    #[tokio::test]
    async fn test_successful_lookups_are_cached() {
        let inner = counting(Some(GeoInfo {
            country: Some("US".to_string()),
            ..Default::default()
        }));
        let cached = CachedGeoResolver::new(inner.clone(), 100, Duration::from_secs(60));
        let ip: IpAddr = "203.0.113.5".parse().unwrap();

        for _ in 0..3 {
            let info = cached.resolve(ip).await.unwrap();
            assert_eq!(info.country.as_deref(), Some("US"));
        }
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let inner = counting(None);
        let cached = CachedGeoResolver::new(inner.clone(), 100, Duration::from_secs(60));
        let ip: IpAddr = "203.0.113.5".parse().unwrap();

        assert_eq!(cached.resolve(ip).await, None);
        assert_eq!(cached.resolve(ip).await, None);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
