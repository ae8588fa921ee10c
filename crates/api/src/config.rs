use std::time::Duration;

use anyhow::Context;
use types::GenerationParams;

/// Process settings, read from `TIMETABLE__*` environment variables.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub body_limit_bytes: usize,
    pub request_timeout: Duration,
    /// Finished background jobs kept for polling.
    pub keep_finished_jobs: usize,
    /// Used for generation requests that carry no `params`; its `max_attempts`
    /// also caps requests that do.
    pub generation: GenerationParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            body_limit_bytes: 2 * 1024 * 1024,
            request_timeout: Duration::from_secs(120),
            keep_finished_jobs: jobs::DEFAULT_KEEP_FINISHED,
            generation: GenerationParams::default(),
        }
    }
}

fn parse<T>(var: &str, get: &impl Fn(&str) -> Option<String>) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{var}={raw:?}")),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut c = Self::default();
        if let Some(p) = parse("TIMETABLE__SERVER__PORT", &get)? {
            c.port = p;
        }
        if let Some(n) = parse("TIMETABLE__HTTP__BODY_LIMIT_BYTES", &get)? {
            c.body_limit_bytes = n;
        }
        if let Some(s) = parse("TIMETABLE__HTTP__REQUEST_TIMEOUT_SECS", &get)? {
            c.request_timeout = Duration::from_secs(s);
        }
        if let Some(n) = parse("TIMETABLE__JOBS__KEEP_FINISHED", &get)? {
            c.keep_finished_jobs = n;
        }
        if let Some(n) = parse("TIMETABLE__GENERATION__MAX_ATTEMPTS", &get)? {
            c.generation.max_attempts = n;
        }
        if let Some(t) = parse::<f64>("TIMETABLE__GENERATION__ACCEPTANCE_THRESHOLD", &get)? {
            anyhow::ensure!(
                (0.0..=100.0).contains(&t),
                "TIMETABLE__GENERATION__ACCEPTANCE_THRESHOLD must be a percentage, got {t}"
            );
            c.generation.acceptance_threshold = t;
        }
        if let Some(n) = parse("TIMETABLE__GENERATION__WORKERS", &get)? {
            c.generation.workers = n;
        }
        Ok(c)
    }
}
