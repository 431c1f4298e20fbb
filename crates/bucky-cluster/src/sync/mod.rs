// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! Concurrent execution of planned sync jobs.
//!
//! # Architecture
//!
//! [`SyncExecutor::run`] flattens a [`JobSet`] into a shared read-only queue and
//! starts a fixed pool of worker tasks. Each worker claims the next job through
//! an atomic cursor, runs it against the [`MetricTransfer`] collaborator and
//! reports the [`JobOutcome`] over a channel. The coordinating task is the only
//! writer of the run's [`SyncReport`].
//!
//! A failed job never stops its siblings. Once every job has run the executor
//! returns [`SyncError::JobsFailed`] if any of them failed, so operators can
//! re-run the same plan: transfers overwrite, which makes completed jobs safe
//! to repeat.
//!
//! Cancellation is signalled through a `watch` channel. Workers stop claiming
//! jobs once the flag is set; transfers already in flight finish normally.

mod config;
mod events;
mod job;
mod traits;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bucky_core::split_host_port;
pub use config::SyncConfig;
use dashmap::DashMap;
pub use events::{JobFailure, JobOutcome, PairProgress, SyncError, SyncEvent, SyncReport};
pub use job::{JobSet, NodePair, SyncJob};
use metrics::{counter, gauge, histogram};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
pub use traits::{MetricTransfer, NoOpTransfer, TransferError, TransferRequest, TransferStatus};

/// A job together with the node pair it moves data between.
#[derive(Debug, Clone)]
struct QueuedJob {
    pair: NodePair,
    job: SyncJob,
}

impl QueuedJob {
    fn request(&self) -> TransferRequest {
        TransferRequest {
            source: self.pair.source.clone(),
            old_name: self.job.old_name.clone(),
            destination: self.pair.destination.clone(),
            new_name: self.job.new_name.clone(),
        }
    }
}

/// State shared by all workers of one run.
struct Worker<T: ?Sized> {
    config: SyncConfig,
    transfer: Arc<T>,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl<T> Worker<T>
where
    T: MetricTransfer + ?Sized,
{
    async fn execute(&self, item: &QueuedJob) -> JobOutcome {
        let request = item.request();

        if self.config.dry_run {
            info!(
                src = %request.source,
                dst = %request.destination,
                old = %request.old_name,
                new = %request.new_name,
                "Dry run, would copy"
            );
            let _ = self
                .event_tx
                .send(SyncEvent::JobPlanned { pair: item.pair.clone(), job: item.job.clone() });
            return JobOutcome::DryRun;
        }

        if request.is_noop() {
            debug!(node = %request.source, metric = %request.old_name, "Skipping no-op job");
            return JobOutcome::SkippedNoop;
        }

        for address in [&request.source, &request.destination] {
            if split_host_port(address).is_err() {
                let error = TransferError::MalformedAddress(address.clone());
                return JobOutcome::Failed { error: error.to_string() };
            }
        }

        let started = Instant::now();
        let result = timeout(self.config.transfer_timeout, self.transfer(&request)).await;
        histogram!("bucky_sync_transfer_duration_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => JobOutcome::Failed { error: e.to_string() },
            Err(_) => {
                let error = TransferError::Timeout(self.config.transfer_timeout.as_secs());
                JobOutcome::Failed { error: error.to_string() }
            }
        }
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<JobOutcome, TransferError> {
        match self.transfer.transfer(request).await? {
            TransferStatus::SourceNotFound if self.config.ignore_missing_source => {
                warn!(
                    node = %request.source,
                    metric = %request.old_name,
                    "Source metric not found, skipping"
                );
                Ok(JobOutcome::SkippedMissing)
            }
            TransferStatus::SourceNotFound => Err(TransferError::Other(format!(
                "metric {} not found on {}",
                request.old_name, request.source
            ))),
            TransferStatus::Copied { bytes } => {
                if self.config.delete_source {
                    self.transfer.delete_source(request).await?;
                    debug!(node = %request.source, metric = %request.old_name, "Deleted source");
                }
                Ok(JobOutcome::Copied { bytes })
            }
        }
    }
}

/// Runs job sets over a bounded pool of workers.
pub struct SyncExecutor<T: ?Sized> {
    config: SyncConfig,
    transfer: Arc<T>,
    /// Live progress of the current or last run, per node pair.
    progress: Arc<DashMap<NodePair, PairProgress>>,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl<T> SyncExecutor<T>
where
    T: MetricTransfer + ?Sized + 'static,
{
    /// Creates an executor that moves data with `transfer`.
    pub fn new(config: SyncConfig, transfer: Arc<T>) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        Self { config, transfer, progress: Arc::new(DashMap::new()), event_tx }
    }

    /// Subscribes to sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Returns the progress of `pair` in the current or last run.
    pub fn progress(&self, pair: &NodePair) -> Option<PairProgress> {
        self.progress.get(pair).map(|entry| *entry.value())
    }

    /// Executes every job in `jobs`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::JobsFailed`] if any job failed.
    pub async fn run(&self, jobs: &JobSet) -> Result<SyncReport, SyncError> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.run_until(jobs, shutdown_rx).await
    }

    /// Executes `jobs` until done or until `shutdown` turns true.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] if some jobs were never started, or
    /// [`SyncError::JobsFailed`] if any job failed.
    pub async fn run_until(
        &self,
        jobs: &JobSet,
        shutdown: watch::Receiver<bool>,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let queue: Arc<[QueuedJob]> = jobs
            .iter()
            .map(|(pair, job)| QueuedJob { pair, job: job.clone() })
            .collect::<Vec<_>>()
            .into();
        let workers = self.config.workers.clamp(1, queue.len().max(1));

        let mut report = SyncReport { total: queue.len(), ..Default::default() };
        self.progress.clear();
        for (pair, planned) in jobs.pairs() {
            let progress = PairProgress { total: planned.len(), ..Default::default() };
            self.progress.insert(pair.clone(), progress);
            report.pairs.insert(pair, progress);
        }

        info!(
            jobs = queue.len(),
            pairs = jobs.pair_count(),
            workers,
            dry_run = self.config.dry_run,
            "Starting sync"
        );
        let _ = self.event_tx.send(SyncEvent::RunStarted {
            jobs: queue.len(),
            workers,
            dry_run: self.config.dry_run,
        });
        gauge!("bucky_sync_active_workers").set(workers as f64);

        let worker = Arc::new(Worker {
            config: self.config.clone(),
            transfer: Arc::clone(&self.transfer),
            event_tx: self.event_tx.clone(),
        });
        let cursor = Arc::new(AtomicUsize::new(0));
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<(usize, JobOutcome)>(workers * 2);

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let worker = Arc::clone(&worker);
            let queue = Arc::clone(&queue);
            let cursor = Arc::clone(&cursor);
            let outcome_tx = outcome_tx.clone();
            let shutdown = shutdown.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    if *shutdown.borrow() {
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(item) = queue.get(index) else {
                        break;
                    };
                    let outcome = worker.execute(item).await;
                    if outcome_tx.send((index, outcome)).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(outcome_tx);

        let mut finished = vec![false; queue.len()];
        while let Some((index, outcome)) = outcome_rx.recv().await {
            finished[index] = true;
            self.record(&mut report, &queue[index], outcome);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Sync worker terminated abnormally");
            }
        }
        gauge!("bucky_sync_active_workers").set(0.0);

        let cancelled = *shutdown.borrow();
        for (index, done) in finished.iter().enumerate() {
            if !*done {
                let outcome = if cancelled {
                    JobOutcome::Cancelled
                } else {
                    JobOutcome::Failed { error: "worker terminated before finishing".to_string() }
                };
                self.record(&mut report, &queue[index], outcome);
            }
        }

        report.duration = started.elapsed();
        let _ = self.event_tx.send(SyncEvent::RunCompleted {
            succeeded: report.succeeded(),
            failed: report.failed,
            cancelled: report.cancelled,
            bytes_copied: report.bytes_copied,
            duration: report.duration,
        });
        info!(
            copied = report.copied,
            dry_run = report.dry_run,
            skipped_missing = report.skipped_missing,
            skipped_noop = report.skipped_noop,
            failed = report.failed,
            cancelled = report.cancelled,
            bytes = report.bytes_copied,
            duration_ms = report.duration.as_millis() as u64,
            "Sync finished"
        );

        if report.cancelled > 0 {
            warn!(cancelled = report.cancelled, "Sync cancelled");
            Err(SyncError::Cancelled(Box::new(report)))
        } else if report.failed > 0 {
            Err(SyncError::JobsFailed(Box::new(report)))
        } else {
            Ok(report)
        }
    }

    fn record(&self, report: &mut SyncReport, item: &QueuedJob, outcome: JobOutcome) {
        let label = match &outcome {
            JobOutcome::Copied { .. } => "copied",
            JobOutcome::DryRun => "dry_run",
            JobOutcome::SkippedMissing => "skipped_missing",
            JobOutcome::SkippedNoop => "skipped_noop",
            JobOutcome::Failed { .. } => "failed",
            JobOutcome::Cancelled => "cancelled",
        };
        counter!("bucky_sync_jobs_total", "outcome" => label).increment(1);

        match &outcome {
            JobOutcome::Failed { error } => error!(
                src = %item.pair.source,
                dst = %item.pair.destination,
                old = %item.job.old_name,
                new = %item.job.new_name,
                error = %error,
                "Sync job failed"
            ),
            JobOutcome::Cancelled => {}
            _ if self.config.verbose => info!(
                src = %item.pair.source,
                dst = %item.pair.destination,
                old = %item.job.old_name,
                new = %item.job.new_name,
                outcome = label,
                "Sync job finished"
            ),
            _ => {}
        }

        report.record(&item.pair, &item.job, &outcome);
        if let Some(progress) = report.pairs.get(&item.pair) {
            self.progress.insert(item.pair.clone(), *progress);
        }

        let _ = self.event_tx.send(SyncEvent::JobFinished {
            pair: item.pair.clone(),
            job: item.job.clone(),
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::testing::InMemoryStore;

    fn jobs_of(entries: &[(&str, &str, SyncJob)]) -> JobSet {
        let mut jobs = JobSet::new();
        for (dst, src, job) in entries {
            jobs.push(*dst, *src, job.clone());
        }
        jobs
    }

    fn config() -> SyncConfig {
        SyncConfig { workers: 3, ..Default::default() }
    }

    #[tokio::test]
    async fn test_dry_run_performs_no_transfers() {
        let store = Arc::new(InMemoryStore::new());
        let jobs = jobs_of(&[
            ("d:1", "s:1", SyncJob::relocate("a")),
            ("d:1", "s:1", SyncJob::relocate("b")),
            ("d:1", "t:1", SyncJob::relocate("c")),
            ("e:1", "s:1", SyncJob::new("d", "dd")),
            ("e:1", "e:1", SyncJob::relocate("e")),
        ]);
        let executor =
            SyncExecutor::new(SyncConfig { dry_run: true, ..config() }, Arc::clone(&store));
        let mut events = executor.subscribe();

        let report = executor.run(&jobs).await.unwrap();

        assert_eq!(store.transfer_calls(), 0);
        assert_eq!(report.dry_run, 5);
        assert_eq!(report.total, 5);

        let mut planned = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SyncEvent::JobPlanned { .. }) {
                planned += 1;
            }
        }
        assert_eq!(planned, 5);
    }

    #[tokio::test]
    async fn test_copies_and_renames() {
        let store = Arc::new(InMemoryStore::new());
        store.insert("s:1", "a", b"aaaa".to_vec());
        store.insert("s:1", "old", b"oo".to_vec());
        let jobs = jobs_of(&[
            ("d:1", "s:1", SyncJob::relocate("a")),
            ("d:1", "s:1", SyncJob::new("old", "new")),
        ]);

        let executor = SyncExecutor::new(config(), Arc::clone(&store));
        let report = executor.run(&jobs).await.unwrap();

        assert_eq!(report.copied, 2);
        assert_eq!(report.bytes_copied, 6);
        assert_eq!(store.get("d:1", "a").unwrap(), b"aaaa");
        assert_eq!(store.get("d:1", "new").unwrap(), b"oo");
        assert!(store.contains("s:1", "old"));
        assert_eq!(
            executor.progress(&NodePair::new("d:1", "s:1")),
            Some(PairProgress { total: 2, finished: 2, failed: 0 })
        );
    }

    #[tokio::test]
    async fn test_missing_source_tolerated() {
        let store = Arc::new(InMemoryStore::new());
        store.insert("s:1", "a", b"a".to_vec());
        store.insert("s:1", "b", b"b".to_vec());
        let jobs = jobs_of(&[
            ("d:1", "s:1", SyncJob::relocate("a")),
            ("d:1", "s:1", SyncJob::relocate("b")),
            ("d:1", "s:1", SyncJob::relocate("missing")),
        ]);

        let executor = SyncExecutor::new(
            SyncConfig { ignore_missing_source: true, ..config() },
            Arc::clone(&store),
        );
        let report = executor.run(&jobs).await.unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(report.skipped_missing, 1);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_missing_source_fails_without_tolerance() {
        let store = Arc::new(InMemoryStore::new());
        store.insert("s:1", "a", b"a".to_vec());
        store.insert("s:1", "b", b"b".to_vec());
        let jobs = jobs_of(&[
            ("d:1", "s:1", SyncJob::relocate("a")),
            ("d:1", "s:1", SyncJob::relocate("b")),
            ("d:1", "s:1", SyncJob::relocate("missing")),
        ]);

        let executor = SyncExecutor::new(config(), Arc::clone(&store));
        let err = executor.run(&jobs).await.unwrap_err();

        let SyncError::JobsFailed(report) = err else {
            panic!("expected JobsFailed");
        };
        assert_eq!(report.failed, 1);
        assert_eq!(report.copied, 2);
        assert_eq!(report.failures[0].job, SyncJob::relocate("missing"));
        assert!(store.contains("d:1", "a"));
        assert!(store.contains("d:1", "b"));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        store.insert("s:1", "a", b"a".to_vec());
        store.insert("s:1", "b", b"bb".to_vec());
        let jobs = jobs_of(&[
            ("d:1", "s:1", SyncJob::relocate("a")),
            ("d:1", "s:1", SyncJob::relocate("b")),
            ("d:1", "s:1", SyncJob::relocate("b")),
        ]);
        let executor = SyncExecutor::new(config(), Arc::clone(&store));

        executor.run(&jobs).await.unwrap();
        let before = store.snapshot();
        let report = executor.run(&jobs).await.unwrap();

        assert_eq!(report.failed, 0);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_malformed_address_fails_only_its_job() {
        let store = Arc::new(InMemoryStore::new());
        store.insert("s:1", "a", b"a".to_vec());
        let jobs = jobs_of(&[
            ("d:1", "s:1", SyncJob::relocate("a")),
            ("d", "s:1", SyncJob::relocate("a")),
        ]);

        let executor = SyncExecutor::new(config(), Arc::clone(&store));
        let err = executor.run(&jobs).await.unwrap_err();

        assert_eq!(err.report().failed, 1);
        assert_eq!(err.report().copied, 1);
        assert!(err.report().failures[0].error.contains("malformed"));
        assert_eq!(store.transfer_calls(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_node_fails_job() {
        let store = Arc::new(InMemoryStore::new().with_unreachable("d:1"));
        store.insert("s:1", "a", b"a".to_vec());
        let jobs = jobs_of(&[("d:1", "s:1", SyncJob::relocate("a"))]);

        let executor = SyncExecutor::new(config(), Arc::clone(&store));
        let err = executor.run(&jobs).await.unwrap_err();
        assert!(matches!(err, SyncError::JobsFailed(_)));
        assert!(err.report().failures[0].error.contains("unreachable"));
    }

    #[tokio::test]
    async fn test_noop_jobs_are_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let jobs = jobs_of(&[("s:1", "s:1", SyncJob::relocate("a"))]);

        let executor = SyncExecutor::new(config(), Arc::clone(&store));
        let report = executor.run(&jobs).await.unwrap();
        assert_eq!(report.skipped_noop, 1);
        assert_eq!(store.transfer_calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_source_after_copy() {
        let store = Arc::new(InMemoryStore::new());
        store.insert("s:1", "a", b"a".to_vec());
        let jobs = jobs_of(&[("d:1", "s:1", SyncJob::relocate("a"))]);

        let executor =
            SyncExecutor::new(SyncConfig { delete_source: true, ..config() }, Arc::clone(&store));
        executor.run(&jobs).await.unwrap();

        assert!(store.contains("d:1", "a"));
        assert!(!store.contains("s:1", "a"));
        assert_eq!(store.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_source_is_never_deleted() {
        let store = Arc::new(InMemoryStore::new());
        let jobs = jobs_of(&[("d:1", "s:1", SyncJob::relocate("gone"))]);
        let tolerant = SyncConfig { delete_source: true, ignore_missing_source: true, ..config() };

        let executor = SyncExecutor::new(tolerant, Arc::clone(&store));
        let report = executor.run(&jobs).await.unwrap();

        assert_eq!(report.skipped_missing, 1);
        assert_eq!(store.transfer_calls(), 1);
        assert_eq!(store.delete_calls(), 0);

        let strict = SyncConfig { delete_source: true, ..config() };
        let executor = SyncExecutor::new(strict, Arc::clone(&store));
        let err = executor.run(&jobs).await.unwrap_err();
        assert_eq!(err.report().failed, 1);
        assert_eq!(store.delete_calls(), 0);
    }

    /// Copies through an in-memory store but refuses every delete.
    struct UndeletableSource {
        store: InMemoryStore,
    }

    #[async_trait]
    impl MetricTransfer for UndeletableSource {
        async fn transfer(
            &self,
            request: &TransferRequest,
        ) -> Result<TransferStatus, TransferError> {
            self.store.transfer(request).await
        }

        async fn delete_source(&self, request: &TransferRequest) -> Result<(), TransferError> {
            Err(TransferError::Rejected { node: request.source.clone(), status: 403 })
        }
    }

    #[tokio::test]
    async fn test_failed_delete_fails_job_and_keeps_copy() {
        let store = InMemoryStore::new();
        store.insert("s:1", "a", b"series".to_vec());
        store.insert("s:1", "b", b"other".to_vec());
        let transfer = Arc::new(UndeletableSource { store });
        let jobs = jobs_of(&[
            ("d:1", "s:1", SyncJob::relocate("a")),
            ("d:1", "s:1", SyncJob::new("b", "b.renamed")),
        ]);

        let deleting = SyncConfig { delete_source: true, ..config() };
        let executor = SyncExecutor::new(deleting, Arc::clone(&transfer));
        let err = executor.run(&jobs).await.unwrap_err();

        let SyncError::JobsFailed(report) = err else {
            panic!("expected JobsFailed");
        };
        assert_eq!(report.failed, 2);
        assert_eq!(report.copied, 0);
        assert!(report.failures.iter().all(|failure| failure.error.contains("403")));
        assert_eq!(transfer.store.get("d:1", "a").unwrap(), b"series");
        assert_eq!(transfer.store.get("d:1", "b.renamed").unwrap(), b"other");
        assert!(transfer.store.contains("s:1", "a"));
        assert!(transfer.store.contains("s:1", "b"));
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let store = Arc::new(InMemoryStore::new());
        let jobs = jobs_of(&[
            ("d:1", "s:1", SyncJob::relocate("a")),
            ("d:1", "s:1", SyncJob::relocate("b")),
        ]);
        let (_tx, rx) = watch::channel(true);

        let executor = SyncExecutor::new(config(), Arc::clone(&store));
        let err = executor.run_until(&jobs, rx).await.unwrap_err();

        let SyncError::Cancelled(report) = err else {
            panic!("expected Cancelled");
        };
        assert_eq!(report.cancelled, 2);
        assert_eq!(store.transfer_calls(), 0);
    }

    /// Raises the shutdown flag from inside the first transfer.
    struct CancelOnFirstTransfer {
        shutdown: watch::Sender<bool>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetricTransfer for CancelOnFirstTransfer {
        async fn transfer(
            &self,
            _request: &TransferRequest,
        ) -> Result<TransferStatus, TransferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.shutdown.send(true);
            Ok(TransferStatus::Copied { bytes: 1 })
        }

        async fn delete_source(&self, _request: &TransferRequest) -> Result<(), TransferError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cancel_lets_in_flight_job_finish() {
        let (tx, rx) = watch::channel(false);
        let transfer = Arc::new(CancelOnFirstTransfer { shutdown: tx, calls: AtomicUsize::new(0) });
        let jobs = jobs_of(&[
            ("d:1", "s:1", SyncJob::relocate("a")),
            ("d:1", "s:1", SyncJob::relocate("b")),
            ("d:1", "s:1", SyncJob::relocate("c")),
        ]);

        let executor =
            SyncExecutor::new(SyncConfig { workers: 1, ..config() }, Arc::clone(&transfer));
        let err = executor.run_until(&jobs, rx).await.unwrap_err();

        assert!(matches!(err, SyncError::Cancelled(_)));
        assert_eq!(err.report().copied, 1);
        assert_eq!(err.report().cancelled, 2);
        assert_eq!(transfer.calls.load(Ordering::SeqCst), 1);
    }

    /// Never finishes a transfer.
    struct StalledTransfer;

    #[async_trait]
    impl MetricTransfer for StalledTransfer {
        async fn transfer(
            &self,
            _request: &TransferRequest,
        ) -> Result<TransferStatus, TransferError> {
            std::future::pending().await
        }

        async fn delete_source(&self, _request: &TransferRequest) -> Result<(), TransferError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_timeout_fails_job() {
        let jobs = jobs_of(&[("d:1", "s:1", SyncJob::relocate("a"))]);
        let config = SyncConfig { transfer_timeout: Duration::from_secs(5), ..config() };

        let executor = SyncExecutor::new(config, Arc::new(StalledTransfer));
        let err = executor.run(&jobs).await.unwrap_err();
        assert_eq!(err.report().failures[0].error, "transfer timed out after 5s");
    }

    #[tokio::test]
    async fn test_empty_job_set() {
        let executor = SyncExecutor::new(config(), Arc::new(NoOpTransfer));
        let report = executor.run(&JobSet::new()).await.unwrap();
        assert_eq!(report.total, 0);
        assert!(report.is_complete());
    }
}
