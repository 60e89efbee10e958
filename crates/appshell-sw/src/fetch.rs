//! Cache-first fetch interception.
//!
//! Same-origin requests are answered from the current cache when possible;
//! on a miss the network is consulted and a copy of the response is stored
//! before it is returned. Cross-origin requests are not intercepted.

use std::sync::Arc;

use appshell_net::{FetchRequest, FetchResponse, NetworkFetch};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};
use url::Url;

use crate::cache::CacheStorage;

/// Disposition of one intercepted request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Served from the cache; no network activity occurred.
    Hit(FetchResponse),

    /// Cache miss; fetched from the network, a copy is now cached.
    Network(FetchResponse),

    /// Cache miss and the network failed; no response is substituted.
    Offline,

    /// Cross-origin request; the default network path applies unmodified.
    PassThrough,
}

impl FetchOutcome {
    /// The response handed back to the page, if any.
    pub fn response(&self) -> Option<&FetchResponse> {
        match self {
            FetchOutcome::Hit(response) | FetchOutcome::Network(response) => Some(response),
            FetchOutcome::Offline | FetchOutcome::PassThrough => None,
        }
    }

    /// Whether the response was served from the cache.
    pub fn from_cache(&self) -> bool {
        matches!(self, FetchOutcome::Hit(_))
    }
}

/// Cache-first interceptor over the worker's shared cache storage.
pub struct FetchInterceptor {
    origin: Url,
    cache_name: String,
    caches: Arc<RwLock<CacheStorage>>,
    fetcher: Arc<dyn NetworkFetch>,
}

impl FetchInterceptor {
    pub(crate) fn new(
        origin: Url,
        cache_name: String,
        caches: Arc<RwLock<CacheStorage>>,
        fetcher: Arc<dyn NetworkFetch>,
    ) -> Self {
        Self {
            origin,
            cache_name,
            caches,
            fetcher,
        }
    }

    /// Intercept one outgoing request.
    pub async fn intercept(&self, request: &FetchRequest) -> FetchOutcome {
        if !self.same_origin(&request.url) {
            trace!(url = %request.url, "cross-origin request, not intercepting");
            return FetchOutcome::PassThrough;
        }

        {
            let caches = self.caches.read().await;
            if let Some(response) = caches
                .get(&self.cache_name)
                .and_then(|cache| cache.lookup(request))
                .and_then(|entry| entry.to_response())
            {
                debug!(url = %request.url, "serving from cache");
                return FetchOutcome::Hit(response);
            }
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                let mut caches = self.caches.write().await;
                caches.open(&self.cache_name).put(request, &response);
                debug!(url = %request.url, status = %response.status, "caching new resource");
                FetchOutcome::Network(response)
            }
            Err(error) => {
                // A configured offline fallback document would be served here.
                warn!(url = %request.url, %error, "network fetch failed and no cache match");
                FetchOutcome::Offline
            }
        }
    }

    /// Scheme, host, and port must all match the worker's origin.
    fn same_origin(&self, url: &Url) -> bool {
        self.origin.origin() == url.origin()
    }
}
