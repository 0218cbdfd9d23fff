// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Fire-and-forget background work that outlives the request which scheduled
//! it (cache writes, DAG size accounting).

use crate::utils::flume::FlumeSenderExt as _;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, warn};

struct Job {
    name: &'static str,
    task: BoxFuture<'static, anyhow::Result<()>>,
}

struct Shared {
    in_flight: AtomicUsize,
    idle: Notify,
    closed: AtomicBool,
}

impl Shared {
    fn finish_one(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// A queue of background tasks, run concurrently by a single worker.
///
/// Cloning is cheap; every clone feeds the same worker.
#[derive(Clone)]
pub struct TaskQueue {
    sender: flume::Sender<Job>,
    shared: Arc<Shared>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TaskQueue {
    /// Starts the worker on the current tokio runtime.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        let shared = Arc::new(Shared {
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
            closed: AtomicBool::new(false),
        });
        let worker = tokio::spawn(run_worker(receiver, shared.clone()));
        Self {
            sender,
            shared,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Schedules `task`. Errors and panics are logged under `name`.
    ///
    /// Returns `false` when the queue has been shut down.
    pub fn submit(
        &self,
        name: &'static str,
        task: impl Future<Output = anyhow::Result<()>> + Send + 'static,
    ) -> bool {
        if self.shared.closed.load(Ordering::SeqCst) {
            warn!(task = name, "task queue is shut down, dropping task");
            return false;
        }
        self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
        // `shutdown` may have checked for idleness before the increment.
        if self.shared.closed.load(Ordering::SeqCst) {
            self.shared.finish_one();
            warn!(task = name, "task queue is shut down, dropping task");
            return false;
        }
        let queued = self.sender.send_or_warn(Job {
            name,
            task: Box::pin(task),
        });
        if !queued {
            self.shared.finish_one();
        }
        queued
    }

    /// Number of tasks submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once every submitted task has finished.
    pub async fn idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stops accepting tasks and waits for the queued ones to finish.
    pub async fn shutdown(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.idle().await;
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.abort();
        }
    }
}

async fn run_worker(receiver: flume::Receiver<Job>, shared: Arc<Shared>) {
    let mut running = JoinSet::new();
    loop {
        tokio::select! {
            job = receiver.recv_async() => match job {
                Ok(Job { name, task }) => {
                    running.spawn(async move { (name, task.await) });
                }
                // Every sender is gone.
                Err(_) => break,
            },
            Some(joined) = running.join_next(), if !running.is_empty() => {
                log_outcome(joined);
                shared.finish_one();
            }
        }
    }
    while let Some(joined) = running.join_next().await {
        log_outcome(joined);
        shared.finish_one();
    }
}

fn log_outcome(joined: Result<(&'static str, anyhow::Result<()>), tokio::task::JoinError>) {
    match joined {
        Ok((task, Ok(()))) => debug!(task, "background task finished"),
        Ok((task, Err(e))) => warn!(task, "background task failed: {e:#}"),
        Err(e) if e.is_panic() => error!("background task panicked: {e}"),
        Err(e) => warn!("background task cancelled: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn idle_waits_for_every_task() {
        let queue = TaskQueue::new();
        let done = Arc::new(AtomicUsize::new(0));
        for delay in [30, 10, 20] {
            let done = done.clone();
            assert!(queue.submit("sleep", async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                done.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }));
        }
        queue.idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test]
    async fn idle_on_empty_queue_returns() {
        TaskQueue::new().idle().await;
    }

    #[tokio::test]
    async fn failures_and_panics_do_not_stop_the_worker() {
        let queue = TaskQueue::new();
        async fn fails() -> anyhow::Result<()> {
            anyhow::bail!("nope")
        }
        async fn panics() -> anyhow::Result<()> {
            panic!("boom")
        }
        queue.submit("fails", fails());
        queue.submit("panics", panics());
        queue.idle().await;

        let (tx, rx) = flume::bounded(1);
        queue.submit("after", async move {
            tx.send_async(()).await?;
            anyhow::Ok(())
        });
        queue.idle().await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn shutdown_drains_then_rejects() {
        let queue = TaskQueue::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        queue.submit("slow", async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
            anyhow::Ok(())
        });
        queue.shutdown().await;
        assert!(done.load(Ordering::SeqCst));
        assert!(!queue.submit("late", async { anyhow::Ok(()) }));
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn tasks_accepted_during_shutdown_still_run() {
        let queue = TaskQueue::new();
        let accepted = Arc::new(AtomicUsize::new(0));
        let ran = Arc::new(AtomicUsize::new(0));
        let submitters = (0..4)
            .map(|_| {
                let (queue, accepted, ran) = (queue.clone(), accepted.clone(), ran.clone());
                tokio::spawn(async move {
                    loop {
                        let ran = ran.clone();
                        let task = async move {
                            ran.fetch_add(1, Ordering::SeqCst);
                            anyhow::Ok(())
                        };
                        if !queue.submit("counted", task) {
                            break;
                        }
                        accepted.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect::<Vec<_>>();
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.shutdown().await;
        let ran_at_shutdown = ran.load(Ordering::SeqCst);
        for submitter in submitters {
            submitter.await.unwrap();
        }
        assert_eq!(queue.in_flight(), 0);
        assert_eq!(ran.load(Ordering::SeqCst), ran_at_shutdown);
        assert_eq!(ran_at_shutdown, accepted.load(Ordering::SeqCst));
    }
}
