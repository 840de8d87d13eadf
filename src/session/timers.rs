use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cancellation handle shared by every async chain started under one session
/// generation. `SessionState::reset` cancels the current token and installs a
/// fresh one, so chains holding the old token observe cancellation.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleeps for `delay` unless the token is cancelled first. Returns `true` when
/// the full delay elapsed.
pub async fn pause(token: &CancellationToken, delay: Duration) -> bool {
    if token.is_cancelled() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => !token.is_cancelled(),
        _ = token.cancelled() => false,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeoutId(u64);

/// Delayed and background tasks scheduled on behalf of a session.
#[derive(Debug, Default)]
pub struct TimeoutRegistry {
    next_id: u64,
    handles: HashMap<TimeoutId, JoinHandle<()>>,
}

impl TimeoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime.
    pub fn add_timeout<F>(&mut self, delay: Duration, task: F) -> TimeoutId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        self.track(handle)
    }

    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&mut self, task: F) -> TimeoutId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        self.track(handle)
    }

    fn track(&mut self, handle: JoinHandle<()>) -> TimeoutId {
        self.handles.retain(|_, h| !h.is_finished());
        let id = TimeoutId(self.next_id);
        self.next_id += 1;
        self.handles.insert(id, handle);
        id
    }

    pub fn clear_timeout(&mut self, id: TimeoutId) -> bool {
        match self.handles.remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self) -> usize {
        let count = self.handles.len();
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
        count
    }

    pub fn active_count(&self) -> usize {
        self.handles.values().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for TimeoutRegistry {
    fn drop(&mut self) {
        self.clear_all();
    }
}
