use parking_lot::RwLock;
use sched_core::{CancelToken, ScheduleError, Solver};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{error, info, warn};
use types::{FeasibilityIssue, GenerateRequest, GenerationDiagnostic, GenerationOutcome};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct JobId(pub String);

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Generated { outcome: GenerationOutcome },
    Rejected { issues: Vec<FeasibilityIssue> },
    Failed {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostic: Option<GenerationDiagnostic>,
    },
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, JobStatus::Queued | JobStatus::Running)
    }

    fn from_result(res: Result<GenerationOutcome, ScheduleError>) -> Self {
        match res {
            Ok(outcome) => JobStatus::Generated { outcome },
            Err(ScheduleError::Feasibility(issues)) => JobStatus::Rejected { issues },
            Err(ScheduleError::Cancelled) => JobStatus::Cancelled,
            Err(ScheduleError::GenerationFailed(d)) => JobStatus::Failed {
                message: ScheduleError::GenerationFailed(d.clone()).to_string(),
                diagnostic: Some(d),
            },
            Err(e) => JobStatus::Failed {
                message: e.to_string(),
                diagnostic: None,
            },
        }
    }
}

/// Finished jobs kept for polling before the oldest are dropped.
pub const DEFAULT_KEEP_FINISHED: usize = 1024;

struct Entry {
    status: JobStatus,
    cancel: CancelToken,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<String, Entry>,
    /// Finished job ids, oldest first.
    finished: VecDeque<String>,
    keep_finished: usize,
}

impl Registry {
    fn mark_finished(&mut self, id: &str) {
        self.finished.push_back(id.to_string());
        while self.finished.len() > self.keep_finished {
            if let Some(old) = self.finished.pop_front() {
                self.entries.remove(&old);
            }
        }
    }
}

#[derive(Clone)]
pub struct InMemJobs<S: Solver> {
    inner: Arc<RwLock<Registry>>,
    solver: Arc<S>,
}

impl<S: Solver> InMemJobs<S> {
    pub fn new(solver: S) -> Self {
        Self::with_retention(solver, DEFAULT_KEEP_FINISHED)
    }

    /// Keeps at most `keep_finished` finished jobs; queued and running jobs
    /// are never evicted.
    pub fn with_retention(solver: S, keep_finished: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Registry {
                keep_finished,
                ..Registry::default()
            })),
            solver: Arc::new(solver),
        }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn enqueue(&self, req: GenerateRequest) -> JobId {
        let id = Uuid::new_v4().to_string();
        let cancel = CancelToken::new();
        self.inner.write().entries.insert(
            id.clone(),
            Entry {
                status: JobStatus::Queued,
                cancel: cancel.clone(),
            },
        );

        let map = self.inner.clone();
        let solver = self.solver.clone();
        let id_for_task = id.clone();

        tokio::spawn(async move {
            {
                let mut w = map.write();
                match w.entries.get_mut(&id_for_task) {
                    Some(e) if matches!(e.status, JobStatus::Queued) => e.status = JobStatus::Running,
                    _ => return,
                }
            }
            let res = solver.solve(req, cancel).await;
            if let Err(e) = &res {
                match e {
                    ScheduleError::Cancelled => info!(job = %id_for_task, "job cancelled"),
                    ScheduleError::Feasibility(_) | ScheduleError::GenerationFailed(_) => {
                        warn!(job = %id_for_task, error = %e, "job finished without a timetable")
                    }
                    _ => error!(job = %id_for_task, ?e, "job failed"),
                }
            }
            let mut w = map.write();
            if let Some(entry) = w.entries.get_mut(&id_for_task) {
                if matches!(entry.status, JobStatus::Running) {
                    entry.status = JobStatus::from_result(res);
                    w.mark_finished(&id_for_task);
                }
            }
        });

        JobId(id)
    }

    pub fn get(&self, id: &str) -> Option<JobStatus> {
        self.inner.read().entries.get(id).map(|e| e.status.clone())
    }

    /// Signals a queued or running job to stop. Returns the status after the
    /// request, or `None` for an unknown id. Finished jobs are left as they are.
    pub fn cancel(&self, id: &str) -> Option<JobStatus> {
        let mut w = self.inner.write();
        let entry = w.entries.get_mut(id)?;
        let was_running = matches!(entry.status, JobStatus::Running);
        if entry.status.is_finished() {
            return Some(entry.status.clone());
        }
        entry.cancel.cancel();
        entry.status = JobStatus::Cancelled;
        if was_running {
            info!(job = %id, "cancellation requested");
        }
        w.mark_finished(id);
        Some(JobStatus::Cancelled)
    }
}
