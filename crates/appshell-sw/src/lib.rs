//! # AppShell SW
//!
//! Offline app-shell worker for the AppShell runtime.
//!
//! ## Features
//!
//! - **Versioned caches**: named request/response stores, one current at a time
//! - **Install**: pre-cache the asset manifest as an all-or-nothing batch
//! - **Activate**: purge stale cache versions, claim open pages
//! - **Fetch interception**: cache-first with network fallback for
//!   same-origin requests
//!
//! ## Architecture
//!
//! ```text
//! AppShellWorker
//!     ├── WorkerConfig (origin, cache version, manifest)
//!     ├── CacheStorage
//!     │       └── Cache
//!     │               └── Request → CacheEntry
//!     ├── Clients (controlled pages)
//!     └── FetchInterceptor
//!             └── cache hit │ network (+ store) │ offline │ pass-through
//! ```
//!
//! The host runtime drives the lifecycle: it awaits [`AppShellWorker::install`]
//! and [`AppShellWorker::activate`] (or [`AppShellWorker::start`] for the whole
//! chain) before treating the corresponding event as handled, and routes page
//! requests through [`AppShellWorker::handle_fetch`].

pub mod cache;
pub mod clients;
pub mod fetch;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_util;

pub use cache::{Cache, CacheEntry, CacheStorage};
pub use clients::{Client, Clients};
pub use fetch::{FetchInterceptor, FetchOutcome};
pub use worker::{AppShellWorker, WorkerConfig, WorkerEvent, WorkerId, WorkerState};
