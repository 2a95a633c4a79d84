//! Per-invocation context and background work tracking

use std::{future::Future, sync::Arc};

use tokio::{sync::watch, time::Instant};
use tracing_futures::Instrument;

/// The context of a single invocation.
#[derive(Clone, Debug)]
pub struct Context {
    /// Identifier of the invocation, echoed from `x-request-id` when present.
    pub request_id: String,
    /// Point in time after which the runtime abandons the handler future.
    ///
    /// Handlers that must answer on their own terms should bound their work
    /// with `tokio::time::timeout_at(deadline, ..)`: a handler future polled
    /// at the deadline still completes before the runtime gives up on it.
    pub deadline: Instant,
    background: Background,
}

impl Context {
    /// Create a context for one invocation.
    pub fn new(request_id: impl Into<String>, deadline: Instant, background: Background) -> Self {
        Self {
            request_id: request_id.into(),
            deadline,
            background,
        }
    }

    /// Keep `fut` running after the response has been sent.
    ///
    /// The future is detached from the invocation: nothing it returns or
    /// fails with reaches the caller. The runtime waits for it to finish
    /// before shutting down.
    pub fn wait_until<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.background.spawn(fut);
    }
}

/// Tracks futures scheduled with [`Context::wait_until`].
///
/// Cloning yields a handle to the same tracker.
#[derive(Clone, Debug)]
pub struct Background {
    pending: Arc<watch::Sender<usize>>,
}

impl Background {
    /// Create an empty tracker.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { pending: Arc::new(tx) }
    }

    /// Spawn `fut` on the executor and count it as pending until it
    /// completes, panics or is cancelled.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.send_modify(|n| *n += 1);
        let guard = PendingGuard(Arc::clone(&self.pending));
        let fut = fut.instrument(tracing::Span::current());
        tokio::spawn(async move {
            let _guard = guard;
            fut.await;
        });
    }

    /// Number of tasks still running.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Resolve once every spawned task has finished.
    pub async fn drain(&self) {
        let mut rx = self.pending.subscribe();
        // the sender lives as long as `self`, so this only fails if it is dropped
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::new()
    }
}

struct PendingGuard(Arc<watch::Sender<usize>>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::{Background, Context};
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };
    use tokio::{
        sync::oneshot,
        time::{timeout, Instant},
    };

    #[tokio::test]
    async fn drain_with_nothing_pending_is_immediate() {
        let background = Background::new();
        assert_eq!(background.pending(), 0);
        timeout(Duration::from_millis(100), background.drain())
            .await
            .expect("drain should not block");
    }

    #[tokio::test]
    async fn drain_waits_for_detached_work() {
        let background = Background::new();
        let ctx = Context::new("req-1", Instant::now() + Duration::from_secs(1), background.clone());
        let (tx, rx) = oneshot::channel::<()>();
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);

        ctx.wait_until(async move {
            let _ = rx.await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(background.pending(), 1);
        assert!(timeout(Duration::from_millis(50), background.drain()).await.is_err());

        tx.send(()).expect("receiver dropped");
        timeout(Duration::from_secs(1), background.drain())
            .await
            .expect("drain should finish");
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(background.pending(), 0);
    }

    #[tokio::test]
    async fn panicking_task_is_still_released() {
        let background = Background::new();
        background.spawn(async {
            panic!("background failure");
        });
        timeout(Duration::from_secs(1), background.drain())
            .await
            .expect("drain should finish after a panic");
        assert_eq!(background.pending(), 0);
    }
}
