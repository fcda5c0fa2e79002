use tokio::sync::watch;

/// Count of submitted-but-unfinished fetches, with wait-for-zero.
///
/// Backed by a watch channel so any number of waiters can observe the count
/// reaching zero without polling.
#[derive(Debug)]
pub struct Outstanding {
    count: watch::Sender<usize>,
}

impl Default for Outstanding {
    fn default() -> Self {
        Self::new()
    }
}

impl Outstanding {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self { count }
    }

    pub fn add(&self) {
        self.count.send_modify(|n| *n += 1);
    }

    /// Mark one unit finished. The count saturates at zero.
    pub fn done(&self) {
        self.count.send_modify(|n| match n.checked_sub(1) {
            Some(next) => *n = next,
            None => tracing::error!("outstanding count decremented below zero"),
        });
    }

    pub fn get(&self) -> usize {
        *self.count.borrow()
    }

    /// Resolves once the count is zero; immediately if it already is.
    pub async fn wait_zero(&self) {
        let mut rx = self.count.subscribe();
        // the sender lives in `self`, so this cannot see a closed channel
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}
