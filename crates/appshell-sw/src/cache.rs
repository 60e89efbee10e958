//! Versioned cache stores mapping requests to stored responses.
//!
//! A [`Cache`] is one named generation of cached assets; [`CacheStorage`]
//! owns every generation known to the worker. Entries are keyed by request
//! URL plus method.

use std::time::{SystemTime, UNIX_EPOCH};

use appshell_net::{FetchRequest, FetchResponse};
use bytes::Bytes;
use hashbrown::HashMap;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

/// A cached request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request URL.
    pub url: String,

    /// Request method.
    pub method: String,

    /// Response status.
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body.
    pub body: Vec<u8>,

    /// Cached at timestamp (ms since epoch).
    pub cached_at: u64,
}

impl CacheEntry {
    /// Snapshot a response for storage.
    pub fn from_response(request: &FetchRequest, response: &FetchResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        Self {
            url: request.url.to_string(),
            method: request.method.to_string(),
            status: response.status.as_u16(),
            headers,
            body: response.body.to_vec(),
            cached_at: now_ms(),
        }
    }

    /// Rebuild the stored response. `None` if the stored record is corrupt.
    pub fn to_response(&self) -> Option<FetchResponse> {
        let url = Url::parse(&self.url).ok()?;
        let status = StatusCode::from_u16(self.status).ok()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) =
                (name.parse::<HeaderName>(), HeaderValue::from_str(value))
            {
                headers.insert(name, value);
            }
        }

        Some(FetchResponse {
            status,
            headers,
            body: Bytes::from(self.body.clone()),
            url,
        })
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn entry_key(request: &FetchRequest) -> String {
    format!("{} {}", request.method, request.url)
}

/// One named generation of cached assets.
#[derive(Debug, Default)]
pub struct Cache {
    name: String,
    entries: HashMap<String, CacheEntry>,
}

impl Cache {
    /// Create an empty cache.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Cache name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a stored entry for a request.
    pub fn lookup(&self, request: &FetchRequest) -> Option<&CacheEntry> {
        self.entries.get(&entry_key(request))
    }

    /// Whether a request has a stored entry.
    pub fn contains(&self, request: &FetchRequest) -> bool {
        self.entries.contains_key(&entry_key(request))
    }

    /// Store a copy of a response under the request's identity.
    pub fn put(&mut self, request: &FetchRequest, response: &FetchResponse) {
        self.entries
            .insert(entry_key(request), CacheEntry::from_response(request, response));
    }

    /// Delete a stored entry.
    pub fn delete(&mut self, request: &FetchRequest) -> bool {
        self.entries.remove(&entry_key(request)).is_some()
    }

    /// URLs of all stored entries.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.values().map(|e| e.url.as_str()).collect()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every cache generation owned by the worker's origin.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: HashMap<String, Cache>,
}

impl CacheStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a cache by name, creating it if absent.
    pub fn open(&mut self, name: &str) -> &mut Cache {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(name))
    }

    /// Get a cache without creating it.
    pub fn get(&self, name: &str) -> Option<&Cache> {
        self.caches.get(name)
    }

    /// Whether a cache with this name exists.
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Delete a cache by name.
    pub fn delete(&mut self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// Names of all caches.
    pub fn keys(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn request(url: &str) -> FetchRequest {
        FetchRequest::get(Url::parse(url).unwrap())
    }

    fn response(url: &str, body: &'static [u8]) -> FetchResponse {
        FetchResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body),
            url: Url::parse(url).unwrap(),
        }
    }

    #[test]
    fn test_put_and_lookup() {
        let mut cache = Cache::new("my-app-cache-v1");
        let req = request("https://app.example/style.css");

        cache.put(&req, &response("https://app.example/style.css", b"css"));

        let entry = cache.lookup(&req).unwrap();
        assert_eq!(entry.body, b"css");
        assert_eq!(entry.status, 200);
        assert!(cache.lookup(&request("https://app.example/other.css")).is_none());

        assert_eq!(cache.name(), "my-app-cache-v1");
        assert_eq!(cache.keys(), vec!["https://app.example/style.css"]);
    }

    #[test]
    fn test_key_includes_method() {
        let mut cache = Cache::new("my-app-cache-v1");
        let url = "https://app.example/api";
        let get = request(url);
        let head = FetchRequest::new(Method::HEAD, Url::parse(url).unwrap());

        cache.put(&get, &response(url, b"payload"));

        assert!(cache.contains(&get));
        assert!(!cache.contains(&head));
    }

    #[test]
    fn test_delete() {
        let mut cache = Cache::new("my-app-cache-v1");
        let req = request("https://app.example/app.js");

        cache.put(&req, &response("https://app.example/app.js", b"js"));
        assert!(cache.delete(&req));
        assert!(!cache.delete(&req));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entry_to_response() {
        let req = request("https://app.example/index.html");
        let mut original = response("https://app.example/index.html", b"<html></html>");
        original
            .headers
            .insert("content-type", "text/html".parse().unwrap());

        let entry = CacheEntry::from_response(&req, &original);
        let rebuilt = entry.to_response().unwrap();

        assert_eq!(rebuilt.status, StatusCode::OK);
        assert_eq!(rebuilt.content_type(), Some("text/html"));
        assert_eq!(rebuilt.body, original.body);
    }

    #[test]
    fn test_storage_open_is_create_if_absent() {
        let mut storage = CacheStorage::new();
        assert!(!storage.has("my-app-cache-v1"));

        storage.open("my-app-cache-v1");
        assert!(storage.has("my-app-cache-v1"));

        // Re-opening returns the same store.
        storage
            .open("my-app-cache-v1")
            .put(&request("https://app.example/"), &response("https://app.example/", b"root"));
        assert_eq!(storage.get("my-app-cache-v1").unwrap().len(), 1);
    }

    #[test]
    fn test_storage_delete_and_keys() {
        let mut storage = CacheStorage::new();
        storage.open("my-app-cache-v0");
        storage.open("my-app-cache-v1");

        let mut keys = storage.keys();
        keys.sort();
        assert_eq!(keys, vec!["my-app-cache-v0", "my-app-cache-v1"]);

        assert!(storage.delete("my-app-cache-v0"));
        assert!(!storage.delete("my-app-cache-v0"));
        assert!(!storage.has("my-app-cache-v0"));
    }
}
