//! Task spawning helpers.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn a future on the runtime.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Spawn a future that is dropped as soon as `token` is cancelled.
///
/// The future's output is discarded; cancellation-scoped tasks communicate
/// through channels instead.
pub fn spawn_cancellable<F>(token: CancellationToken, future: F) -> JoinHandle<()>
where
    F: Future + Send + 'static,
{
    tokio::task::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = future => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn spawn_cancellable_stops_on_cancel() {
        let token = CancellationToken::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = spawn_cancellable(token.clone(), async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let _ = tx.send(());
        });
        token.cancel();
        handle.await.unwrap();
        assert!(rx.await.is_err(), "task should not have completed");
    }

    #[tokio::test]
    async fn spawn_cancellable_runs_to_completion() {
        let token = CancellationToken::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        spawn_cancellable(token, async move {
            let _ = tx.send(7u32);
        });
        assert_eq!(rx.await.unwrap(), 7);
    }
}
