//! Aggregation of iteration results into a [`Summary`].
use metrics_util::AtomicBucket;
use ramp_core::{EngineError, IterationResult, LatencySummary, Summary, TagSummary};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Thread-safe sink every virtual user reports into.
///
/// Recording is commutative: the summary only depends on the set of recorded results, not on the
/// order they arrived in.
pub struct ResultCollector {
    name: Arc<str>,
    iterations: AtomicU64,
    failed_iterations: AtomicU64,
    requests: AtomicU64,
    failures: AtomicU64,
    latency: AtomicBucket<Duration>,
    iteration_duration: AtomicBucket<Duration>,
    tags: Mutex<HashMap<String, TagSummary>>,
}

impl ResultCollector {
    pub fn new(name: &str) -> Self {
        #[cfg(feature = "metrics")]
        describe_metrics();

        Self {
            name: Arc::from(name),
            iterations: AtomicU64::new(0),
            failed_iterations: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            latency: AtomicBucket::new(),
            iteration_duration: AtomicBucket::new(),
            tags: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, iteration: IterationResult) -> Result<(), EngineError> {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        if iteration.failed {
            self.failed_iterations.fetch_add(1, Ordering::Relaxed);
        }
        self.iteration_duration.push(iteration.duration);

        let mut failures = 0;
        {
            let mut tags = self.tags.lock()?;
            for request in &iteration.requests {
                let tag = tags.entry(request.name.clone()).or_default();
                tag.requests += 1;
                if !request.is_success() {
                    tag.failures += 1;
                    failures += 1;
                }
            }
        }

        self.requests
            .fetch_add(iteration.requests.len() as u64, Ordering::Relaxed);
        self.failures.fetch_add(failures, Ordering::Relaxed);
        for request in &iteration.requests {
            self.latency.push(request.latency);

            #[cfg(feature = "metrics")]
            self.emit(&request.name, request.is_success(), request.latency);
        }

        Ok(())
    }

    /// Snapshot of everything recorded so far.
    ///
    /// Virtual user figures (`vus_max`, `timeline`) are left empty; the scheduler owns those.
    pub fn finalize(&self, elapsed: Duration) -> Result<Summary, EngineError> {
        let tags: BTreeMap<_, _> = self
            .tags
            .lock()?
            .iter()
            .map(|(name, tag)| (name.clone(), *tag))
            .collect();

        Ok(Summary {
            name: self.name.to_string(),
            elapsed,
            iterations: self.iterations.load(Ordering::Relaxed),
            failed_iterations: self.failed_iterations.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            failure_count: self.failures.load(Ordering::Relaxed),
            latency: LatencySummary::from_samples(&mut self.latency.data()),
            iteration_duration: LatencySummary::from_samples(&mut self.iteration_duration.data()),
            tags,
            ..Summary::default()
        })
    }

    #[cfg(feature = "metrics")]
    fn emit(&self, name: &str, success: bool, latency: Duration) {
        let scenario = self.name.to_string();
        metrics::counter!("ramp_requests_total", "scenario" => scenario.clone(), "name" => name.to_string())
            .increment(1);
        if !success {
            metrics::counter!("ramp_request_failures_total", "scenario" => scenario.clone(), "name" => name.to_string())
                .increment(1);
        }
        metrics::histogram!("ramp_request_duration_seconds", "scenario" => scenario, "name" => name.to_string())
            .record(latency.as_secs_f64());
    }
}

#[cfg(feature = "metrics")]
fn describe_metrics() {
    metrics::describe_counter!("ramp_requests_total", "Requests issued by virtual users");
    metrics::describe_counter!(
        "ramp_request_failures_total",
        "Requests that failed or returned an unexpected status"
    );
    metrics::describe_histogram!(
        "ramp_request_duration_seconds",
        metrics::Unit::Seconds,
        "Latency of individual requests"
    );
    metrics::describe_gauge!("ramp_vus", "Active virtual users");
    metrics::describe_gauge!("ramp_vus_target", "Virtual users the ramp profile asks for");
}
