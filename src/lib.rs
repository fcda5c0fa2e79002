//! # fetchpool
//!
//! Concurrent URL fetcher built around a fixed pool of workers.
//!
//! ## Architecture
//!
//! ```text
//! submit → Dispatch (handoff) → Worker → Fetcher → Transport / Resolver
//!                                  ↓
//!                               callback → outstanding count → wait
//! ```
//!
//! Each submitted URL is handed to exactly one idle worker; the submitter is
//! suspended until a worker takes it. Every URL produces exactly one
//! [`FetchResponse`](domain::FetchResponse), successful or not.
//!
//! ## Quick Start
//!
//! ```bash
//! # Fetch a few URLs with 8 workers
//! fetchpool -w 8 https://example.com/ https://www.rust-lang.org/
//!
//! # Fetch a list, one JSON object per response
//! fetchpool --json -i urls.txt
//! ```

/// Error types shared across the crate.
pub mod app;

/// Command-line interface using clap.
///
/// - `fetchpool [URLS]...` - fetch the given URLs
/// - `-i <FILE>` - read URLs from a file or stdin
pub mod cli;

/// Configuration loaded from `~/.config/fetchpool/config.toml`.
pub mod config;

/// The [`FetchResponse`](domain::FetchResponse) record and its outcome.
pub mod domain;

/// Single-URL fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): turns a URL into a `FetchResponse`
/// - [`Transport`](fetcher::Transport): HTTP GET capability, reqwest-backed by default
/// - [`Resolver`](fetcher::Resolver): best-effort DNS lookup
pub mod fetcher;

/// Worker pool with unbuffered dispatch and wait-for-completion.
pub mod pool;

pub use app::{FetchPoolError, Result};
pub use domain::{FailureKind, FetchOutcome, FetchResponse};
pub use pool::{FetchPool, PoolConfig};
