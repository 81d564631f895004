use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use tracing::warn;

/// Rotates a shared pool of proxy URLs, either randomly or round-robin.
///
/// An empty pool is the "disabled" state (`enabled() == false`) — callers
/// fetch directly rather than through a proxy.
pub struct ProxyPool {
    proxies: RwLock<Vec<String>>,
    index: AtomicUsize,
}

impl ProxyPool {
    pub fn new(proxy_urls: Vec<String>) -> Self {
        Self {
            proxies: RwLock::new(proxy_urls),
            index: AtomicUsize::new(0),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.proxies.read().is_empty()
    }

    pub fn get_random(&self) -> Option<String> {
        let proxies = self.proxies.read();
        proxies.choose(&mut rand::thread_rng()).cloned()
    }

    /// Next proxy in round-robin order. The shared index only ever grows,
    /// so concurrent callers still each get a distinct slot modulo the
    /// pool size.
    pub fn get_next(&self) -> Option<String> {
        let proxies = self.proxies.read();
        if proxies.is_empty() {
            return None;
        }
        let i = self.index.fetch_add(1, Ordering::Relaxed);
        Some(proxies[i % proxies.len()].clone())
    }

    pub fn add_proxy(&self, proxy_url: String) {
        let mut proxies = self.proxies.write();
        if !proxies.contains(&proxy_url) {
            proxies.push(proxy_url);
        }
    }

    pub fn remove_proxy(&self, proxy_url: &str) {
        let mut proxies = self.proxies.write();
        if let Some(pos) = proxies.iter().position(|p| p == proxy_url) {
            proxies.remove(pos);
            warn!(proxy_url, remaining = proxies.len(), "removed proxy from pool");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_is_disabled() {
        let pool = ProxyPool::new(vec![]);
        assert!(!pool.enabled());
        assert_eq!(pool.get_random(), None);
        assert_eq!(pool.get_next(), None);
    }

    #[test]
    fn round_robin_cycles_in_order() {
        let pool = ProxyPool::new(vec![
            "http://p1".to_string(),
            "http://p2".to_string(),
            "http://p3".to_string(),
        ]);
        assert!(pool.enabled());
        assert_eq!(pool.get_next(), Some("http://p1".to_string()));
        assert_eq!(pool.get_next(), Some("http://p2".to_string()));
        assert_eq!(pool.get_next(), Some("http://p3".to_string()));
        assert_eq!(pool.get_next(), Some("http://p1".to_string()));
    }

    #[test]
    fn remove_proxy_drops_it_from_rotation() {
        let pool = ProxyPool::new(vec!["http://p1".to_string(), "http://p2".to_string()]);
        pool.remove_proxy("http://p1");
        assert_eq!(pool.get_random(), Some("http://p2".to_string()));
    }

    #[test]
    fn add_proxy_is_idempotent() {
        let pool = ProxyPool::new(vec!["http://p1".to_string()]);
        pool.add_proxy("http://p1".to_string());
        assert_eq!(pool.proxies.read().len(), 1);
    }
}
