//! Bounded pool of fetch workers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fetchpool::pool::{FetchPool, PoolConfig};
//!
//! let pool = FetchPool::new(PoolConfig::with_workers(8), |response| {
//!     println!("{} {}", response.response_code, response.target_url);
//! })?;
//! pool.start()?;
//! pool.submit(["https://example.com/", "https://www.rust-lang.org/"]).await?;
//! pool.wait().await;
//! pool.shutdown().await;
//! ```
//!
//! Only the submit-then-wait batch pattern is supported: `wait` makes no
//! promise about submissions racing with it from other tasks.

mod config;
pub mod dispatch;
mod outstanding;
mod worker;

pub use config::{PoolConfig, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS};
pub use dispatch::FetchRequest;
pub use outstanding::Outstanding;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::app::{FetchPoolError, Result};
use crate::domain::FetchResponse;
use crate::fetcher::Fetcher;
use crate::pool::dispatch::{dispatch_channel, DispatchReceiver, DispatchSender, HandoffError};
use crate::pool::worker::Worker;

/// Invoked once per submitted URL, concurrently from any worker.
pub type ResponseCallback = Arc<dyn Fn(FetchResponse) + Send + Sync>;

pub struct FetchPool {
    config: PoolConfig,
    fetcher: Arc<Fetcher>,
    callback: ResponseCallback,
    outstanding: Arc<Outstanding>,
    shutdown: CancellationToken,
    sender: DispatchSender,
    receiver: DispatchReceiver,
    started: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl FetchPool {
    /// Pool fetching over HTTP with the system resolver.
    pub fn new<F>(config: PoolConfig, callback: F) -> Result<Self>
    where
        F: Fn(FetchResponse) + Send + Sync + 'static,
    {
        config.validate()?;
        let fetcher = Fetcher::from_config(&config)?;
        Self::with_fetcher(config, Arc::new(fetcher), callback)
    }

    pub fn with_fetcher<F>(config: PoolConfig, fetcher: Arc<Fetcher>, callback: F) -> Result<Self>
    where
        F: Fn(FetchResponse) + Send + Sync + 'static,
    {
        config.validate()?;

        let shutdown = CancellationToken::new();
        let (sender, receiver) = dispatch_channel(shutdown.clone());

        Ok(Self {
            config,
            fetcher,
            callback: Arc::new(callback),
            outstanding: Arc::new(Outstanding::new()),
            shutdown,
            sender,
            receiver,
            started: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Number of submitted fetches whose callback has not yet run.
    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.shutdown.is_cancelled()
    }

    /// Spawn the worker loops on the current tokio runtime.
    pub fn start(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(FetchPoolError::Closed);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| FetchPoolError::NoRuntime)?;

        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(FetchPoolError::AlreadyStarted);
        }

        for id in 0..self.config.workers {
            let worker = Worker {
                id,
                receiver: self.receiver.clone(),
                fetcher: self.fetcher.clone(),
                callback: self.callback.clone(),
                outstanding: self.outstanding.clone(),
                shutdown: self.shutdown.clone(),
            };
            workers.push(runtime.spawn(worker.run()));
        }

        info!(
            workers = self.config.workers,
            timeout_secs = self.config.timeout_secs,
            "fetch pool started"
        );
        Ok(())
    }

    pub async fn submit_one(&self, url: impl Into<String>) -> Result<()> {
        self.submit([url]).await.map(|_| ())
    }

    /// Hand each URL to a worker, suspending until one takes it. Returns the
    /// number of URLs handed off.
    ///
    /// Not cancel-safe: dropping the future mid-handoff leaves the outstanding
    /// count raised. Stop a batch with [`submit_with`](Self::submit_with).
    pub async fn submit<I, S>(&self, urls: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submit_with(urls, &CancellationToken::new()).await
    }

    /// Like [`submit`](Self::submit), but the batch stops at `cancel`: URLs not
    /// yet handed off are dropped, and in-flight fetches of the batch end with
    /// a cancelled outcome.
    pub async fn submit_with<I, S>(&self, urls: I, cancel: &CancellationToken) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_running()?;

        let mut submitted = 0;
        for url in urls {
            let request = FetchRequest {
                url: url.into(),
                cancel: cancel.clone(),
            };

            // count first: a worker may finish before handoff returns
            self.outstanding.add();
            if let Err(e) = self.sender.handoff(request).await {
                self.outstanding.done();
                return Err(match e {
                    HandoffError::Cancelled => FetchPoolError::Cancelled { submitted },
                    HandoffError::Closed => FetchPoolError::Closed,
                });
            }
            submitted += 1;
        }

        debug!(submitted, "batch handed off");
        Ok(submitted)
    }

    /// Suspend until every submitted URL has been fetched and reported.
    pub async fn wait(&self) {
        self.outstanding.wait_zero().await;
    }

    /// Stop accepting work and join the workers. In-flight fetches finish and
    /// are reported first.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handles = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        let count = handles.len();
        for (id, result) in futures::future::join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = result {
                error!(worker = id, error = %e, "worker task failed");
            }
        }

        info!(workers = count, "fetch pool stopped");
    }

    fn ensure_running(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(FetchPoolError::Closed);
        }
        if !self.started.load(Ordering::SeqCst) {
            return Err(FetchPoolError::NotStarted);
        }
        Ok(())
    }
}

impl Drop for FetchPool {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
