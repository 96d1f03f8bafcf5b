//! Per-issuer signing-key fetcher registry.
//!
//! The [`KeyStore`] maps issuer domains to long-lived
//! [`SigningKeyFetcher`]s so every token from the same issuer shares one
//! key cache. Entries are never evicted.

use crate::auth::jwks::{FetcherOptions, SigningKeyFetcher};
use crate::observability::metrics;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Path of the key-set document on an issuer domain.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Domain → fetcher map shared by all validations in a process.
pub struct KeyStore {
    /// URL scheme used to reach issuers ("https" outside tests).
    scheme: String,

    options: FetcherOptions,

    fetchers: RwLock<HashMap<String, Arc<SigningKeyFetcher>>>,
}

impl KeyStore {
    /// Key store reaching issuers over HTTPS.
    pub fn new(options: FetcherOptions) -> Self {
        Self::with_scheme("https", options)
    }

    /// Key store reaching issuers over `scheme`.
    ///
    /// Only affects where keys are fetched from; the expected `iss` claim
    /// is always `https://{domain}/`.
    pub fn with_scheme(scheme: impl Into<String>, options: FetcherOptions) -> Self {
        Self {
            scheme: scheme.into(),
            options,
            fetchers: RwLock::new(HashMap::new()),
        }
    }

    /// Key-set URL for an issuer domain.
    pub fn jwks_url(&self, domain: &str) -> String {
        format!("{}://{domain}{JWKS_PATH}", self.scheme)
    }

    /// Fetcher for `domain`, created on first use.
    ///
    /// Concurrent first calls for the same domain all receive the same
    /// instance; exactly one is ever constructed.
    pub async fn get_fetcher(&self, domain: &str) -> Arc<SigningKeyFetcher> {
        {
            let fetchers = self.fetchers.read().await;
            if let Some(fetcher) = fetchers.get(domain) {
                return Arc::clone(fetcher);
            }
        }

        let mut fetchers = self.fetchers.write().await;

        // Another task may have inserted it while we waited for the write lock
        if let Some(fetcher) = fetchers.get(domain) {
            return Arc::clone(fetcher);
        }

        let jwks_url = self.jwks_url(domain);
        tracing::info!(target: "guard.auth.key_store", url = %jwks_url, "Creating signing key fetcher");

        let fetcher = Arc::new(SigningKeyFetcher::new(jwks_url, self.options.clone()));
        fetchers.insert(domain.to_string(), Arc::clone(&fetcher));
        metrics::set_key_store_fetchers(fetchers.len());

        fetcher
    }

    /// Number of issuers with a fetcher.
    pub async fn fetcher_count(&self) -> usize {
        self.fetchers.read().await.len()
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new(FetcherOptions::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_jwks_url() {
        let store = KeyStore::default();
        assert_eq!(
            store.jwks_url("tenant.auth0.com"),
            "https://tenant.auth0.com/.well-known/jwks.json"
        );

        let store = KeyStore::with_scheme("http", FetcherOptions::default());
        assert_eq!(
            store.jwks_url("127.0.0.1:8080"),
            "http://127.0.0.1:8080/.well-known/jwks.json"
        );
    }

    #[tokio::test]
    async fn test_get_fetcher_reuses_instance() {
        let store = KeyStore::default();

        let first = store.get_fetcher("a.example.com").await;
        let second = store.get_fetcher("a.example.com").await;
        let other = store.get_fetcher("b.example.com").await;

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(other.jwks_url(), "https://b.example.com/.well-known/jwks.json");
        assert_eq!(store.fetcher_count().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_creates_one_fetcher() {
        let store = Arc::new(KeyStore::default());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get_fetcher("race.example.com").await })
            })
            .collect();

        let mut fetchers = Vec::new();
        for handle in handles {
            fetchers.push(handle.await.unwrap());
        }

        let first = fetchers.first().unwrap();
        assert!(fetchers.iter().all(|f| Arc::ptr_eq(f, first)));
        assert_eq!(store.fetcher_count().await, 1);
    }
}
