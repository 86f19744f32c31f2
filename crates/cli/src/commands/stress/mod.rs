//! Stress harnesses for the product write path.
//!
//! Each harness runs a fixed list of cases in order, logs PASS/FAIL per case
//! with the error that caused a failure, keeps going after failures, cleans
//! up the rows it created, and returns a [`StressReport`].
//!
//! # Usage
//!
//! ```bash
//! # Direct database layer (service-role key)
//! sm-cli stress db
//!
//! # Admin REST API (bearer token or admin credentials)
//! sm-cli stress api --base-url http://localhost:3001 --token "$ADMIN_TOKEN"
//! ```

pub mod api;
pub mod db;

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use shelfmark_admin::backend::BackendError;
use shelfmark_admin::config::ConfigError;

/// Number of concurrent title updates in the race case.
pub const CONCURRENT_UPDATES: usize = 5;

/// Errors a stress case (or harness setup) can fail with.
#[derive(Debug, Error)]
pub enum StressError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Managed backend call failed where success was expected.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// HTTP request to the admin API failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Admin login did not produce a token.
    #[error("Login failed: {0}")]
    Login(String),

    /// Invalid base URL for the admin API.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The call worked but the result was not what the case expects.
    #[error("{0}")]
    Assertion(String),
}

/// Fail a case unless `cond` holds.
pub(crate) fn ensure(cond: bool, message: impl FnOnce() -> String) -> Result<(), StressError> {
    if cond {
        Ok(())
    } else {
        Err(StressError::Assertion(message()))
    }
}

/// Slug prefix unique to one harness run, so runs never collide.
#[must_use]
pub fn run_slug(kind: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    let short: String = id.chars().take(12).collect();
    format!("stress-{kind}-{short}")
}

/// Outcome of one case.
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub name: &'static str,
    /// `None` on pass, the error message on failure.
    pub error: Option<String>,
}

impl CaseResult {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Results of a harness run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct StressReport {
    pub harness: &'static str,
    pub cases: Vec<CaseResult>,
}

impl StressReport {
    #[must_use]
    pub const fn new(harness: &'static str) -> Self {
        Self {
            harness,
            cases: Vec::new(),
        }
    }

    /// Run one case, log its outcome and record it.
    pub async fn case<F>(&mut self, name: &'static str, case: F)
    where
        F: Future<Output = Result<(), StressError>>,
    {
        let error = match case.await {
            Ok(()) => {
                tracing::info!(harness = self.harness, case = name, "PASS");
                None
            }
            Err(e) => {
                tracing::error!(harness = self.harness, case = name, error = %e, "FAIL");
                Some(e.to_string())
            }
        };
        self.cases.push(CaseResult { name, error });
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(CaseResult::passed)
    }

    /// The result of the case called `name`, if it ran.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CaseResult> {
        self.cases.iter().find(|c| c.name == name)
    }

    /// Log the pass/fail totals.
    pub fn log_summary(&self) {
        if self.all_passed() {
            tracing::info!(
                harness = self.harness,
                passed = self.passed(),
                "all stress cases passed"
            );
        } else {
            tracing::error!(
                harness = self.harness,
                passed = self.passed(),
                failed = self.failed(),
                "stress cases failed"
            );
        }
    }
}
