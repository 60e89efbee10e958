//! Scripted network double for lifecycle and interception tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use appshell_net::{FetchRequest, FetchResponse, NetError, NetworkFetch};
use async_trait::async_trait;
use bytes::Bytes;
use hashbrown::HashMap;
use http::{HeaderMap, StatusCode};

/// In-memory fetcher serving scripted bodies; unscripted URLs fail the way
/// an unreachable network would. Counts every call it receives.
pub(crate) struct MockFetcher {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Script a 200 response for a URL.
    pub(crate) fn serve(&self, url: &str, body: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_vec());
    }

    /// Number of fetches issued so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkFetch for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned();

        match scripted {
            Some(body) => Ok(FetchResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::from(body),
                url: request.url.clone(),
            }),
            None => Err(NetError::RequestFailed(format!(
                "no route to {}",
                request.url
            ))),
        }
    }
}
