use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::domain::FetchResponse;
use crate::fetcher::Fetcher;
use crate::pool::dispatch::DispatchReceiver;
use crate::pool::outstanding::Outstanding;
use crate::pool::ResponseCallback;

/// One fetch loop: receive, fetch, report, repeat.
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) receiver: DispatchReceiver,
    pub(crate) fetcher: Arc<Fetcher>,
    pub(crate) callback: ResponseCallback,
    pub(crate) outstanding: Arc<Outstanding>,
    pub(crate) shutdown: CancellationToken,
}

impl Worker {
    pub(crate) async fn run(self) {
        debug!(worker = self.id, "worker started");

        loop {
            let request = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                request = self.receiver.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            debug!(worker = self.id, url = %request.url, "fetching");
            let response = self.fetcher.fetch_with(&request.url, &request.cancel).await;

            // count drops only after the callback has returned
            if let Err(panic) = self.report(response) {
                error!(
                    worker = self.id,
                    url = %request.url,
                    panic = %panic_message(panic.as_ref()),
                    "response callback panicked"
                );
            }
            self.outstanding.done();
        }

        debug!(worker = self.id, "worker stopped");
    }

    /// Run the callback off the async scheduler where the runtime allows it,
    /// so a slow callback does not hold up tasks sharing this thread.
    fn report(&self, response: FetchResponse) -> std::thread::Result<()> {
        let callback = &self.callback;
        let call = || catch_unwind(AssertUnwindSafe(|| callback(response)));
        match Handle::try_current().map(|handle| handle.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(call),
            _ => call(),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");

        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
