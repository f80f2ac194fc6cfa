//! Bounded worker pool with a FIFO admission queue.
//!
//! `submit` either enqueues a job id or rejects it when the queue is full;
//! it never blocks. Each worker task pops ids one at a time, so a job is
//! dispatched to exactly one worker, and an idle worker picks up queued
//! work immediately.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vaani_core::error::PipelineError;
use vaani_core::types::JobId;

use crate::executor::PipelineExecutor;

pub struct Scheduler {
    executor: Arc<PipelineExecutor>,
    queue: Mutex<VecDeque<JobId>>,
    queue_depth: usize,
    worker_count: usize,
    notify: Notify,
    active: AtomicUsize,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Create the scheduler and spawn its worker tasks.
    pub fn start(
        worker_count: usize,
        queue_depth: usize,
        executor: Arc<PipelineExecutor>,
    ) -> Arc<Self> {
        let scheduler = Arc::new(Self {
            executor,
            queue: Mutex::new(VecDeque::new()),
            queue_depth,
            worker_count,
            notify: Notify::new(),
            active: AtomicUsize::new(0),
            shutdown: CancellationToken::new(),
        });

        for worker in 0..worker_count {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.worker_loop(worker).await });
        }
        info!(worker_count, queue_depth, "scheduler started");
        scheduler
    }

    /// Admit a job for execution.
    ///
    /// Never blocks: a full queue rejects with `QueueFull` so the caller
    /// can surface a retryable error.
    pub fn submit(&self, id: JobId) -> Result<(), PipelineError> {
        let queued = {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            if queue.len() >= self.queue_depth {
                return Err(PipelineError::QueueFull);
            }
            queue.push_back(id);
            queue.len()
        };
        self.notify.notify_one();
        debug!(job_id = %id, queued, "job admitted");
        Ok(())
    }

    /// Workers currently executing a job.
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Jobs admitted but not yet picked up.
    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Stop accepting pops: workers finish their current job and exit.
    /// Queued ids stay in the queue; unserved work is reconciled on the
    /// next startup from the snapshot.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.notify.notify_waiters();
    }

    async fn worker_loop(self: Arc<Self>, worker: usize) {
        debug!(worker, "worker started");
        loop {
            let next = {
                let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
                queue.pop_front()
            };
            match next {
                Some(id) => {
                    // Hand the baton on if more work is waiting for the
                    // other workers.
                    if self.queue_len() > 0 {
                        self.notify.notify_one();
                    }
                    self.active.fetch_add(1, Ordering::SeqCst);
                    self.executor.run_job(id).await;
                    self.active.fetch_sub(1, Ordering::SeqCst);
                }
                None => {
                    if self.shutdown.is_cancelled() {
                        break;
                    }
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = self.notify.notified() => {}
                    }
                }
            }
        }
        debug!(worker, "worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;
    use vaani_core::layout::ArtifactLayout;
    use vaani_core::stage::{Stage, SEQUENCE};
    use vaani_core::status::JobStatus;
    use vaani_engines::{EngineError, StageContext, StageEngine, StageOutput};
    use vaani_store::{JobStore, NewJob};

    use crate::cancel::CancelRegistry;

    use super::*;

    struct InstantStage(Stage);

    #[async_trait]
    impl StageEngine for InstantStage {
        fn stage(&self) -> Stage {
            self.0
        }

        async fn run(&self, _ctx: &StageContext) -> Result<StageOutput, EngineError> {
            Ok(StageOutput::default())
        }
    }

    /// First stage waits for a permit; the rest run instantly. Lets tests
    /// hold jobs in a worker deliberately.
    struct GatedStage {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl StageEngine for GatedStage {
        fn stage(&self) -> Stage {
            Stage::IngestValidate
        }

        async fn run(&self, _ctx: &StageContext) -> Result<StageOutput, EngineError> {
            let permit = self.gate.acquire().await.unwrap();
            permit.forget();
            Ok(StageOutput::default())
        }
    }

    fn engines(gate: Option<Arc<Semaphore>>) -> Vec<Arc<dyn StageEngine>> {
        SEQUENCE
            .iter()
            .map(|&stage| match (&gate, stage) {
                (Some(gate), Stage::IngestValidate) => {
                    Arc::new(GatedStage { gate: gate.clone() }) as Arc<dyn StageEngine>
                }
                _ => Arc::new(InstantStage(stage)) as Arc<dyn StageEngine>,
            })
            .collect()
    }

    struct Harness {
        store: Arc<JobStore>,
        scheduler: Arc<Scheduler>,
        _dir: tempfile::TempDir,
    }

    fn harness(worker_count: usize, queue_depth: usize, gate: Option<Arc<Semaphore>>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JobStore::new());
        let executor = Arc::new(PipelineExecutor::new(
            store.clone(),
            engines(gate),
            Arc::new(CancelRegistry::new()),
            ArtifactLayout::new(dir.path()),
            1.0,
        ));
        Harness {
            store,
            scheduler: Scheduler::start(worker_count, queue_depth, executor),
            _dir: dir,
        }
    }

    async fn create_job(store: &JobStore) -> JobId {
        store
            .create(NewJob {
                source_path: PathBuf::from("uploads/originals/1700000000000.mp4"),
                from_lang: "en".to_string(),
                to_lang: "hi".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn wait_for_status(store: &JobStore, id: JobId, status: JobStatus) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if store.get(id).await.unwrap().status == status {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("job never reached {status}"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn submitted_jobs_run_to_completion() {
        let h = harness(2, 10, None);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let id = create_job(&h.store).await;
            h.scheduler.submit(id).unwrap();
            ids.push(id);
        }
        for id in ids {
            wait_for_status(&h.store, id, JobStatus::Completed).await;
        }
        assert_eq!(h.scheduler.active_workers(), 0);
        assert_eq!(h.scheduler.queue_len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn a_full_queue_rejects_without_blocking() {
        let gate = Arc::new(Semaphore::new(0));
        let h = harness(1, 2, Some(gate.clone()));

        let running = create_job(&h.store).await;
        h.scheduler.submit(running).unwrap();
        wait_for_status(&h.store, running, JobStatus::Running).await;

        for _ in 0..2 {
            let id = create_job(&h.store).await;
            h.scheduler.submit(id).unwrap();
        }

        let rejected = create_job(&h.store).await;
        assert!(matches!(
            h.scheduler.submit(rejected),
            Err(PipelineError::QueueFull)
        ));
        assert_eq!(h.scheduler.queue_len(), 2);

        // Unblock everything so the pool drains.
        gate.add_permits(16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn an_oversubscribed_job_waits_for_a_free_worker() {
        let gate = Arc::new(Semaphore::new(0));
        let h = harness(1, 10, Some(gate.clone()));

        let first = create_job(&h.store).await;
        let second = create_job(&h.store).await;
        h.scheduler.submit(first).unwrap();
        wait_for_status(&h.store, first, JobStatus::Running).await;
        h.scheduler.submit(second).unwrap();

        // The single worker is held at the gate; the second job has not
        // been claimed.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.store.get(second).await.unwrap().status, JobStatus::Queued);
        assert_eq!(h.scheduler.queue_len(), 1);

        gate.add_permits(1);
        wait_for_status(&h.store, first, JobStatus::Completed).await;
        gate.add_permits(1);
        wait_for_status(&h.store, second, JobStatus::Completed).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_stops_workers_after_their_current_job() {
        let h = harness(2, 10, None);
        let id = create_job(&h.store).await;
        h.scheduler.submit(id).unwrap();
        wait_for_status(&h.store, id, JobStatus::Completed).await;

        h.scheduler.shutdown();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Post-shutdown submissions are still admitted to the queue but no
        // worker serves them; callers gate submission on shutdown upstream.
        assert_eq!(h.scheduler.active_workers(), 0);
    }
}
