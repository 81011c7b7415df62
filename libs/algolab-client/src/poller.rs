/// Job Poller - Run/Submit Status Tracking
///
/// **Core Responsibility:**
/// Create a remote job, then fetch its status at a fixed interval until
/// the grader reports a terminal status.
///
/// **Critical Properties:**
/// - One tracked job per tracker; a new start supersedes the old one
/// - Every write is tagged with the generation of the job that produced it,
///   so a superseded loop can never overwrite the current job's state
/// - Status only moves forward (Pending -> Started -> terminal)
/// - Terminal status stops polling; the last result stays visible until
///   the next start
/// - Creation errors are returned to the caller; poll errors are retried
///   unless `ApiError::is_transient` says otherwise
///
/// Dropping the tracker aborts the poll loop.

use algolab_common::types::{
    CreateJobRequest, FailedTestcase, JobId, JobKind, JobStatus, JobStatusResponse, Language,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::JobApi;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// Stop after this many status requests. `None` polls until terminal.
    pub max_polls: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(algolab_common::config::DEFAULT_POLL_INTERVAL_MS),
            max_polls: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    Creating,
    Polling,
    /// Terminal status received
    Done,
    /// Request-level failure; `JobSnapshot::error` carries the message
    Errored,
}

impl JobPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Errored)
    }
}

/// What the view layer renders for the tracked job
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSnapshot {
    pub phase: JobPhase,
    pub job_id: Option<JobId>,
    pub status: Option<JobStatus>,
    pub std_out: Option<String>,
    pub std_err: Option<String>,
    pub failed_testcases: Vec<FailedTestcase>,
    pub error: Option<String>,
    /// Status requests issued for this job
    pub polls: u32,
}

impl JobSnapshot {
    pub fn is_success(&self) -> bool {
        self.phase == JobPhase::Done && self.status.as_ref().is_some_and(JobStatus::is_success)
    }

    /// Merge a status response, refusing to move backwards.
    /// Returns false when the response was ignored.
    pub(crate) fn apply(&mut self, response: JobStatusResponse) -> bool {
        if let Some(current) = &self.status {
            if current.is_terminal() || response.status.rank() < current.rank() {
                return false;
            }
        }

        if response.status.is_terminal() {
            self.phase = JobPhase::Done;
        }
        self.status = Some(response.status);
        self.std_out = response.std_out;
        self.std_err = response.std_err;
        self.failed_testcases = response.failed_testcases;
        true
    }
}

/// State shared between the tracker and its poll loop
struct Shared {
    generation: AtomicU64,
    tx: watch::Sender<JobSnapshot>,
}

impl Shared {
    /// Start a new job cycle: bump the generation and reset the snapshot
    /// under the channel lock so no stale write can land in between.
    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|snapshot| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *snapshot = JobSnapshot {
                phase: JobPhase::Creating,
                ..JobSnapshot::default()
            };
        });
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Apply `f` only if `generation` is still the tracked job
    fn publish<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut JobSnapshot),
    {
        let mut applied = false;
        self.tx.send_if_modified(|snapshot| {
            if !self.is_current(generation) {
                return false;
            }
            f(snapshot);
            applied = true;
            true
        });
        applied
    }
}

/// Tracks the newest run or submission for one problem
pub struct JobTracker<A: JobApi> {
    api: Arc<A>,
    kind: JobKind,
    problem: String,
    options: PollOptions,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<A: JobApi> JobTracker<A> {
    pub fn new(api: Arc<A>, kind: JobKind, problem: impl Into<String>, options: PollOptions) -> Self {
        let (tx, _rx) = watch::channel(JobSnapshot::default());
        Self {
            api,
            kind,
            problem: problem.into(),
            options,
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                tx,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn problem(&self) -> &str {
        &self.problem
    }

    /// Run code against the problem's public testcases
    pub async fn start_run(&self, code: impl Into<String>) -> Result<JobId, ApiError> {
        self.start(CreateJobRequest {
            code: code.into(),
            language: None,
        })
        .await
    }

    /// Submit code for full grading
    pub async fn start_submit(
        &self,
        code: impl Into<String>,
        language: Language,
    ) -> Result<JobId, ApiError> {
        self.start(CreateJobRequest {
            code: code.into(),
            language: Some(language),
        })
        .await
    }

    async fn start(&self, request: CreateJobRequest) -> Result<JobId, ApiError> {
        self.abort_task();
        let generation = self.shared.begin();

        info!(
            kind = %self.kind,
            problem = %self.problem,
            language = ?request.language,
            source_size = request.code.len(),
            "Creating job"
        );

        let job_id = match self.api.create_job(self.kind, &self.problem, &request).await {
            Ok(id) => id,
            Err(e) => {
                error!(kind = %self.kind, problem = %self.problem, error = %e, "Job creation failed");
                let message = e.to_string();
                self.shared.publish(generation, |snapshot| {
                    snapshot.phase = JobPhase::Errored;
                    snapshot.error = Some(message);
                });
                return Err(e);
            }
        };

        let accepted = self.shared.publish(generation, |snapshot| {
            snapshot.phase = JobPhase::Polling;
            snapshot.job_id = Some(job_id.clone());
        });

        if !accepted {
            // A newer start won the race; its loop owns the snapshot
            debug!(job_id = %job_id, "Job superseded before polling began");
            return Ok(job_id);
        }

        info!(job_id = %job_id, kind = %self.kind, "Job created, polling for status");

        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.api),
            Arc::clone(&self.shared),
            self.kind,
            job_id.clone(),
            generation,
            self.options,
        ));
        self.store_task(generation, handle);

        Ok(job_id)
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.tx.borrow().clone()
    }

    /// Incremental status updates for the view layer
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.tx.subscribe()
    }

    /// Resolve once the current job is terminal or has failed.
    /// Returns immediately when nothing has been started.
    pub async fn wait_terminal(&self) -> JobSnapshot {
        let mut rx = self.subscribe();
        let result = rx
            .wait_for(|s| s.phase.is_finished() || s.phase == JobPhase::Idle)
            .await
            .map(|s| s.clone());
        match result {
            Ok(snapshot) => snapshot,
            // Sender lives in `self`, so this only happens during teardown
            Err(_) => self.snapshot(),
        }
    }

    fn store_task(&self, generation: u64, handle: JoinHandle<()>) {
        let mut slot = self.task.lock().unwrap_or_else(|p| p.into_inner());
        if !self.shared.is_current(generation) {
            handle.abort();
            return;
        }
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn abort_task(&self) {
        let mut slot = self.task.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }
    }
}

impl<A: JobApi> Drop for JobTracker<A> {
    fn drop(&mut self) {
        self.abort_task();
    }
}

async fn poll_loop<A: JobApi>(
    api: Arc<A>,
    shared: Arc<Shared>,
    kind: JobKind,
    job_id: JobId,
    generation: u64,
    options: PollOptions,
) {
    let mut polls = 0u32;

    loop {
        if !shared.is_current(generation) {
            debug!(job_id = %job_id, "Job superseded, stopping poll loop");
            return;
        }

        if let Some(max) = options.max_polls {
            if polls >= max {
                let err = ApiError::PollLimit(max);
                warn!(job_id = %job_id, polls, "Poll limit reached");
                shared.publish(generation, |snapshot| {
                    snapshot.phase = JobPhase::Errored;
                    snapshot.error = Some(err.to_string());
                });
                return;
            }
        }

        polls += 1;
        match api.fetch_status(kind, &job_id).await {
            Ok(response) => {
                let status = response.status.clone();
                let mut changed = false;
                let current = shared.publish(generation, |snapshot| {
                    snapshot.polls = polls;
                    changed = snapshot.apply(response);
                });
                if !current {
                    return;
                }

                if !changed {
                    debug!(job_id = %job_id, status = %status, "Ignoring backward status");
                } else if status.is_terminal() {
                    info!(job_id = %job_id, status = %status, polls, "Job finished");
                    return;
                } else {
                    debug!(job_id = %job_id, status = %status, polls, "Job in progress");
                }
            }
            Err(e) if e.is_transient() => {
                warn!(job_id = %job_id, error = %e, polls, "Status check failed, retrying");
                shared.publish(generation, |snapshot| snapshot.polls = polls);
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, polls, "Status check failed, giving up");
                let message = e.to_string();
                shared.publish(generation, |snapshot| {
                    snapshot.polls = polls;
                    snapshot.phase = JobPhase::Errored;
                    snapshot.error = Some(message);
                });
                return;
            }
        }

        tokio::time::sleep(options.interval).await;
    }
}
