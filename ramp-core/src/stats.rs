use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Latency distribution of a set of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub count: u64,
    pub min: Duration,
    pub mean: Duration,
    pub max: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

impl LatencySummary {
    /// Build a summary from raw samples. Order of `samples` does not matter.
    pub fn from_samples(samples: &mut [Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        samples.sort_unstable();

        let total: Duration = samples.iter().sum();
        let count = samples.len() as u64;

        Self {
            count,
            min: samples[0],
            mean: Duration::from_nanos((total.as_nanos() / samples.len() as u128) as u64),
            max: samples[samples.len() - 1],
            p50: percentile(samples, 0.5),
            p90: percentile(samples, 0.9),
            p95: percentile(samples, 0.95),
            p99: percentile(samples, 0.99),
        }
    }
}

/// Nearest-rank percentile of a sorted, non-empty slice.
fn percentile(sorted: &[Duration], q: f64) -> Duration {
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Counters for one request tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TagSummary {
    pub requests: u64,
    pub failures: u64,
}

/// Number of virtual users observed at one scheduler tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VuSample {
    pub elapsed: Duration,
    pub target: usize,
    pub active: usize,
}

/// Final statistics of a run.
#[derive(Clone, Debug, Default)]
pub struct Summary {
    pub name: String,
    pub elapsed: Duration,
    pub iterations: u64,
    pub failed_iterations: u64,
    pub requests: u64,
    /// Number of failed requests
    pub failure_count: u64,
    pub vus_max: usize,
    pub latency: LatencySummary,
    pub iteration_duration: LatencySummary,
    pub tags: BTreeMap<String, TagSummary>,
    pub timeline: Vec<VuSample>,
    /// The run was stopped before the ramp profile completed
    pub cancelled: bool,
}

impl Summary {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.requests == 0 {
            0.
        } else {
            self.failure_count as f64 / self.requests as f64
        }
    }

    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0. {
            0.
        } else {
            self.requests as f64 / secs
        }
    }
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min={:?} avg={:?} max={:?} p50={:?} p90={:?} p95={:?} p99={:?}",
            self.min, self.mean, self.max, self.p50, self.p90, self.p95, self.p99,
        )
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "scenario {}{}",
            self.name,
            if self.cancelled { " (cancelled)" } else { "" }
        )?;
        writeln!(
            f,
            "  elapsed ........... {}",
            humantime::format_duration(truncate_to_millis(self.elapsed))
        )?;
        writeln!(f, "  vus_max ........... {}", self.vus_max)?;
        writeln!(
            f,
            "  iterations ........ {} ({} failed)",
            self.iterations, self.failed_iterations
        )?;
        writeln!(
            f,
            "  requests .......... {} ({:.2}/s)",
            self.requests,
            self.requests_per_second()
        )?;
        writeln!(
            f,
            "  failed ............ {} ({:.2}%)",
            self.failure_count,
            self.error_rate() * 100.
        )?;
        writeln!(f, "  request_duration .. {}", self.latency)?;
        writeln!(f, "  iteration_duration  {}", self.iteration_duration)?;
        for (name, tag) in &self.tags {
            writeln!(
                f,
                "  {{ name: {name} }} requests={} failed={}",
                tag.requests, tag.failures
            )?;
        }
        Ok(())
    }
}

fn truncate_to_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}
