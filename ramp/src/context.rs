//! Per-iteration context of the virtual user running the current task.
//!
//! These accessors return `None` when called outside of a workload iteration.
use ramp_core::RequestResult;
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

#[derive(Clone)]
pub(crate) struct IterationScope {
    pub vu: u64,
    pub iteration: u64,
    pub scenario: Arc<str>,
    pub base_url: Arc<Url>,
    requests: Arc<Mutex<Vec<RequestResult>>>,
}

impl IterationScope {
    pub fn new(vu: u64, iteration: u64, scenario: Arc<str>, base_url: Arc<Url>) -> Self {
        Self {
            vu,
            iteration,
            scenario,
            base_url,
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn record(&self, result: RequestResult) {
        // A panicking workload cannot leave a Vec half-pushed, so poisoning is harmless here.
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
    }

    pub fn take_requests(&self) -> Vec<RequestResult> {
        std::mem::take(&mut *self.requests.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

tokio::task_local! {
    pub(crate) static ITERATION: IterationScope;
}

/// Id of the virtual user running the current iteration (starting at 1).
pub fn vu_id() -> Option<u64> {
    ITERATION.try_with(|scope| scope.vu).ok()
}

/// Zero-based count of iterations this virtual user has completed before the current one.
pub fn iteration() -> Option<u64> {
    ITERATION.try_with(|scope| scope.iteration).ok()
}

/// Name of the scenario being run.
pub fn scenario_name() -> Option<String> {
    ITERATION.try_with(|scope| scope.scenario.to_string()).ok()
}

/// Base URL the run was configured with.
pub fn base_url() -> Option<Url> {
    ITERATION.try_with(|scope| (*scope.base_url).clone()).ok()
}
