// Cancellable deferred work owned by a conversation view

use log::error;
use std::future::Future;
use tokio::task::JoinSet;
use tokio::time::Duration;

/// Every task a conversation scheduled. Dropping the set aborts whatever
/// has not run yet.
#[derive(Default)]
pub struct TaskSet {
    tasks: JoinSet<()>,
}

impl TaskSet {
    pub fn new() -> Self {
        TaskSet::default()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reap();
        self.tasks.spawn(task);
    }

    /// Run `task` once `delay` has elapsed.
    pub fn spawn_after<F>(&mut self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
    }

    /// Tasks that have not completed yet.
    pub fn pending(&mut self) -> usize {
        self.reap();
        self.tasks.len()
    }

    /// Abort everything; returns how many tasks were still pending.
    pub fn cancel_all(&mut self) -> usize {
        let pending = self.pending();
        self.tasks.abort_all();
        self.tasks.detach_all();
        pending
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                if e.is_panic() {
                    error!("Conversation task panicked: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_deferred_task_runs_after_delay() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut tasks = TaskSet::new();
        let counter = hits.clone();
        tasks.spawn_after(Duration::from_secs(1), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(tasks.pending(), 1);

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_prevents_late_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut tasks = TaskSet::new();
        for secs in 1..=3 {
            let counter = hits.clone();
            tasks.spawn_after(Duration::from_secs(secs), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(tasks.cancel_all(), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending() {
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let mut tasks = TaskSet::new();
            let counter = hits.clone();
            tasks.spawn_after(Duration::from_secs(1), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
