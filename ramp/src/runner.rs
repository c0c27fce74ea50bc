//! Executes single iterations of the workload function.
use crate::context::{IterationScope, ITERATION};
use futures_util::FutureExt;
use ramp_core::{IterationResult, RequestResult};
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

/// Return types a workload function may have.
///
/// `()` never faults; for `Result<(), E>` an `Err` is an unhandled fault of the iteration.
pub trait IterationOutcome {
    fn into_fault(self) -> Option<String>;
}

impl IterationOutcome for () {
    fn into_fault(self) -> Option<String> {
        None
    }
}

impl<E: Display> IterationOutcome for Result<(), E> {
    fn into_fault(self) -> Option<String> {
        self.err().map(|err| err.to_string())
    }
}

/// Runs the workload once per call, isolating faults to the iteration that raised them.
pub(crate) struct WorkloadRunner<T> {
    workload: T,
    scenario: Arc<str>,
    base_url: Arc<Url>,
}

impl<T, F> WorkloadRunner<T>
where
    T: Fn() -> F + Send + Sync + 'static,
    F: Future + Send + 'static,
    F::Output: IterationOutcome,
{
    pub fn new(scenario: &str, base_url: Url, workload: T) -> Self {
        Self {
            workload,
            scenario: Arc::from(scenario),
            base_url: Arc::new(base_url),
        }
    }

    pub async fn run_once(&self, vu: u64, iteration: u64) -> IterationResult {
        let scope = IterationScope::new(vu, iteration, self.scenario.clone(), self.base_url.clone());

        let started_at = SystemTime::now();
        let start = Instant::now();
        let outcome = ITERATION
            .scope(
                scope.clone(),
                AssertUnwindSafe((self.workload)()).catch_unwind(),
            )
            .await;
        let duration = start.elapsed();

        let fault = match outcome {
            Ok(outcome) => outcome.into_fault(),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        let mut requests = scope.take_requests();
        if let Some(reason) = &fault {
            debug!("Virtual user {vu} iteration {iteration} faulted: {reason}");

            // A fault that no failed request accounts for still has to show up as a failure.
            if requests.iter().all(RequestResult::is_success) {
                requests.push(RequestResult::failure(
                    &*self.scenario,
                    None,
                    reason.clone(),
                    duration,
                ));
            }
        }

        IterationResult::new(started_at, duration, requests, fault)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}
