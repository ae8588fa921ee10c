use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::ScopedJoinHandle;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sched_core::config::resolve_or_default;
use sched_core::feasibility::check_workloads;
use sched_core::{CancelToken, ScheduleError};
use tracing::{debug, info, info_span, warn};
use types::{
    ConflictedTeacher, GenerateRequest, GenerationDiagnostic, GenerationOutcome, GenerationParams,
    GenerationResult, Room, SchoolSettings, TeacherWorkload, UnplacedPeriods,
};

use crate::generator::Problem;

/// How many teachers a failure report names.
const TOP_CONFLICTED: usize = 3;

/// Best-of-N driver over independent greedy attempts.
pub struct RetryController<'p> {
    problem: &'p Problem<'p>,
    max_attempts: u32,
    threshold: f64,
    seed: u64,
    workers: u32,
}

/// Higher completion wins; equal rates keep the earlier attempt.
fn better(candidate: &GenerationResult, best: &Option<GenerationResult>) -> bool {
    match best {
        None => true,
        Some(b) => {
            candidate.completion_rate > b.completion_rate
                || (candidate.completion_rate == b.completion_rate && candidate.attempt < b.attempt)
        }
    }
}

/// Worker threads actually started: never more than there are attempts to
/// claim or cores to run them on.
fn worker_count(requested: u32, max_attempts: u32) -> u32 {
    let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    let cores = u32::try_from(cores).unwrap_or(u32::MAX);
    requested.min(max_attempts).min(cores).max(1)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "attempt worker panicked".to_string())
}

/// Joins every worker; one panicked worker fails the whole run.
fn join_workers<T>(handles: Vec<ScopedJoinHandle<'_, T>>) -> Result<Vec<T>, ScheduleError> {
    let mut out = Vec::with_capacity(handles.len());
    let mut failure = None;
    for h in handles {
        match h.join() {
            Ok(v) => out.push(v),
            Err(payload) => failure = failure.or(Some(panic_message(payload.as_ref()))),
        }
    }
    match failure {
        Some(message) => Err(ScheduleError::Worker(message)),
        None => Ok(out),
    }
}

impl<'p> RetryController<'p> {
    pub fn new(problem: &'p Problem<'p>, params: &GenerationParams) -> Self {
        let max_attempts = params.max_attempts.max(1);
        Self {
            problem,
            max_attempts,
            threshold: params.acceptance_threshold,
            seed: params.seed.unwrap_or_else(rand::random),
            workers: worker_count(params.workers, max_attempts),
        }
    }

    fn attempt(&self, attempt: u32, cancel: &CancelToken) -> Option<GenerationResult> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(attempt as u64));
        self.problem.run_attempt(attempt, &mut rng, cancel)
    }

    fn run_sequential(&self, cancel: &CancelToken) -> (Option<GenerationResult>, u32) {
        let mut best = None;
        let mut used = 0;
        for attempt in 0..self.max_attempts {
            let Some(r) = self.attempt(attempt, cancel) else {
                break;
            };
            used += 1;
            debug!(attempt, rate = r.completion_rate, "attempt done");
            let complete = r.completion_rate >= 100.0;
            if better(&r, &best) {
                best = Some(r);
            }
            if complete {
                break;
            }
        }
        (best, used)
    }

    /// Workers claim attempt indices from a shared counter. A complete grid
    /// stops new claims, but claimed attempts finish, so the lowest complete
    /// index always survives the reduction.
    fn run_parallel(
        &self,
        cancel: &CancelToken,
    ) -> Result<(Option<GenerationResult>, u32), ScheduleError> {
        let next = AtomicU32::new(0);
        let used = AtomicU32::new(0);
        let complete = AtomicBool::new(false);

        let bests: Vec<Option<GenerationResult>> = std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.workers as usize);
            for _ in 0..self.workers {
                handles.push(scope.spawn(|| {
                    let mut best = None;
                    while !complete.load(Ordering::Acquire) {
                        let attempt = next.fetch_add(1, Ordering::AcqRel);
                        if attempt >= self.max_attempts {
                            break;
                        }
                        let Some(r) = self.attempt(attempt, cancel) else {
                            break;
                        };
                        used.fetch_add(1, Ordering::AcqRel);
                        if r.completion_rate >= 100.0 {
                            complete.store(true, Ordering::Release);
                        }
                        if better(&r, &best) {
                            best = Some(r);
                        }
                    }
                    best
                }));
            }
            join_workers(handles)
        })?;

        let mut best = None;
        for r in bests.into_iter().flatten() {
            if better(&r, &best) {
                best = Some(r);
            }
        }
        Ok((best, used.into_inner()))
    }

    pub fn run(&self, cancel: &CancelToken) -> Result<GenerationOutcome, ScheduleError> {
        let span = info_span!("generate", seed = self.seed, workers = self.workers);
        let _g = span.enter();

        let required = self.problem.required();
        let (best, attempts_used) = if self.workers > 1 {
            self.run_parallel(cancel)?
        } else {
            self.run_sequential(cancel)
        };
        let Some(best) = best else {
            warn!("cancelled before the first attempt finished");
            return Err(ScheduleError::Cancelled);
        };

        let tally = unplaced_by_teacher(self.problem.workloads, &best);
        if best.completion_rate >= self.threshold {
            info!(
                rate = best.completion_rate,
                attempt = best.attempt,
                attempts_used,
                "schedule accepted"
            );
            let unplaced = unplaced_periods(self.problem.workloads, &best);
            let warnings = outcome_warnings(required, &best, &tally);
            Ok(GenerationOutcome {
                result: best,
                required,
                attempts_used,
                warnings,
                unplaced,
            })
        } else {
            warn!(rate = best.completion_rate, threshold = self.threshold, "schedule rejected");
            let conflicted_teachers: Vec<ConflictedTeacher> =
                tally.into_iter().take(TOP_CONFLICTED).collect();
            let suggestions = suggestions(&conflicted_teachers);
            Err(ScheduleError::GenerationFailed(GenerationDiagnostic {
                required,
                attempts_used,
                best_rate: best.completion_rate,
                conflicted_teachers,
                suggestions,
            }))
        }
    }
}

fn teacher_names(workloads: &[TeacherWorkload]) -> HashMap<&str, &str> {
    workloads
        .iter()
        .map(|t| (t.teacher_id.0.as_str(), t.name.as_str()))
        .collect()
}

/// Missing periods grouped by teacher, subject and class.
pub fn unplaced_periods(workloads: &[TeacherWorkload], r: &GenerationResult) -> Vec<UnplacedPeriods> {
    let names = teacher_names(workloads);
    let mut grouped: BTreeMap<(&str, &str, &str), u32> = BTreeMap::new();
    for req in &r.unplaced_requests {
        *grouped
            .entry((
                req.teacher_id.0.as_str(),
                req.subject.0.as_str(),
                req.class_id.0.as_str(),
            ))
            .or_default() += 1;
    }
    grouped
        .into_iter()
        .map(|((teacher, subject, class), missing)| UnplacedPeriods {
            teacher_id: teacher.into(),
            teacher_name: names.get(teacher).copied().unwrap_or(teacher).to_string(),
            subject: subject.into(),
            class_id: class.into(),
            missing,
        })
        .collect()
}

/// Teachers with unplaced periods, worst first.
fn unplaced_by_teacher(workloads: &[TeacherWorkload], r: &GenerationResult) -> Vec<ConflictedTeacher> {
    let names = teacher_names(workloads);
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for req in &r.unplaced_requests {
        *counts.entry(req.teacher_id.0.as_str()).or_default() += 1;
    }
    let mut out: Vec<ConflictedTeacher> = counts
        .into_iter()
        .map(|(id, unplaced)| ConflictedTeacher {
            teacher_id: id.into(),
            name: names.get(id).copied().unwrap_or(id).to_string(),
            unplaced,
        })
        .collect();
    out.sort_by(|a, b| b.unplaced.cmp(&a.unplaced).then_with(|| a.name.cmp(&b.name)));
    out
}

fn outcome_warnings(required: u32, r: &GenerationResult, tally: &[ConflictedTeacher]) -> Vec<String> {
    if required == 0 {
        return vec!["no periods were requested; the timetable is empty".to_string()];
    }
    if r.unplaced_requests.is_empty() {
        return Vec::new();
    }
    let mut w = vec![
        format!(
            "{:.1}% of periods placed ({} of {})",
            r.completion_rate,
            r.placed_lessons.len(),
            required
        ),
        format!("{} periods could not be placed", r.unplaced_requests.len()),
    ];
    let worst = tally
        .iter()
        .take(TOP_CONFLICTED)
        .map(|t| format!("{} ({})", t.name, t.unplaced))
        .collect::<Vec<_>>()
        .join(", ");
    w.push(format!("most affected teachers: {worst}"));
    w.push("place the remaining lessons by hand or generate again".to_string());
    w
}

fn suggestions(conflicted: &[ConflictedTeacher]) -> Vec<String> {
    let mut s = Vec::new();
    if !conflicted.is_empty() {
        let names = conflicted
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        s.push(format!("review the availability and daily limits of {names}"));
    }
    s.push("reduce weekly periods for the busiest classes or teachers".to_string());
    s.push("allow more attempts or a lower acceptance threshold".to_string());
    s
}

fn cancel_for(params: &GenerationParams, cancel: &CancelToken) -> CancelToken {
    match params.time_limit_ms {
        Some(ms) => cancel.with_deadline(Instant::now() + Duration::from_millis(ms)),
        None => cancel.clone(),
    }
}

/// Request params, with the attempt count capped by the server's own
/// `max_attempts`.
fn bounded_params(requested: Option<&GenerationParams>, defaults: &GenerationParams) -> GenerationParams {
    let mut params = requested.unwrap_or(defaults).clone();
    params.max_attempts = params.max_attempts.min(defaults.max_attempts);
    params
}

/// Full pipeline for a request: resolve settings, gate on feasibility, check
/// locks, then run the attempts.
pub fn generate(
    req: &GenerateRequest,
    defaults: &GenerationParams,
    cancel: &CancelToken,
) -> Result<GenerationOutcome, ScheduleError> {
    let config = resolve_or_default(req.settings.as_ref())?;
    check_workloads(&req.workloads, &config)?;
    let problem = Problem::new(&req.workloads, &config, &req.rooms, &req.locked)?;
    let params = bounded_params(req.params.as_ref(), defaults);
    RetryController::new(&problem, &params).run(&cancel_for(&params, cancel))
}

pub fn generate_schedule(
    workloads: &[TeacherWorkload],
    settings: Option<&SchoolSettings>,
    rooms: &[Room],
    params: &GenerationParams,
) -> Result<GenerationOutcome, ScheduleError> {
    let config = resolve_or_default(settings)?;
    check_workloads(workloads, &config)?;
    let problem = Problem::new(workloads, &config, rooms, &[])?;
    RetryController::new(&problem, params).run(&cancel_for(params, &CancelToken::new()))
}
