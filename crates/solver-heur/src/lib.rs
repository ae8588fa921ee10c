pub mod generator;
pub mod retry;

use async_trait::async_trait;
use sched_core::{CancelToken, ScheduleError, Solver};
use types::{GenerateRequest, GenerationOutcome, GenerationParams};

pub use generator::Problem;
pub use retry::{generate, generate_schedule, RetryController};

/// Randomized greedy generator with best-of-N restarts.
pub struct HeurSolver {
    defaults: GenerationParams,
}

impl HeurSolver {
    pub fn new() -> Self {
        Self::with_defaults(GenerationParams::default())
    }

    /// Params used for requests that carry none of their own. Their
    /// `max_attempts` is also the ceiling for requests that do.
    pub fn with_defaults(defaults: GenerationParams) -> Self {
        Self { defaults }
    }
}

impl Default for HeurSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Solver for HeurSolver {
    async fn solve(
        &self,
        req: GenerateRequest,
        cancel: CancelToken,
    ) -> Result<GenerationOutcome, ScheduleError> {
        let defaults = self.defaults.clone();
        tokio::task::spawn_blocking(move || generate(&req, &defaults, &cancel))
            .await
            .map_err(|e| ScheduleError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Allocation, TeacherWorkload};

    #[tokio::test]
    async fn solver_trait_runs_on_the_blocking_pool() {
        let req = GenerateRequest {
            workloads: vec![TeacherWorkload {
                teacher_id: "ana".into(),
                name: "Ana".into(),
                workload_monthly: None,
                allocations: vec![Allocation {
                    subject: "Math".into(),
                    lessons_per_week: 3,
                    class_ids: vec!["6A".into(), "6B".into()],
                }],
                preferences: None,
            }],
            settings: None,
            rooms: vec![],
            locked: vec![],
            params: None,
        };
        let solver = HeurSolver::with_defaults(GenerationParams {
            seed: Some(5),
            ..Default::default()
        });
        let out = solver.solve(req, CancelToken::new()).await.unwrap();
        assert_eq!(out.result.completion_rate, 100.0);
        assert_eq!(out.result.grid.len(), 6);
    }
}
