use std::sync::Arc;

use jobs::InMemJobs;
use solver_heur::HeurSolver;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<InMemJobs<HeurSolver>>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let solver = HeurSolver::with_defaults(config.generation.clone());
        Self {
            jobs: Arc::new(InMemJobs::with_retention(solver, config.keep_finished_jobs)),
        }
    }

    pub fn new_default() -> Self {
        Self::new(&AppConfig::default())
    }
}
