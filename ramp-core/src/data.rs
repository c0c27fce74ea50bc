use std::time::{Duration, SystemTime};

/// How a single request ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    Success {
        status: Option<u16>,
    },
    Failure {
        status: Option<u16>,
        reason: String,
    },
}

impl RequestOutcome {
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestOutcome::Success { status } | RequestOutcome::Failure { status, .. } => *status,
        }
    }
}

/// Result of one request issued from inside a workload iteration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestResult {
    /// Tag used to group requests in the summary
    pub name: String,
    pub outcome: RequestOutcome,
    pub latency: Duration,
}

impl RequestResult {
    pub fn success(name: impl Into<String>, status: Option<u16>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            outcome: RequestOutcome::Success { status },
            latency,
        }
    }

    pub fn failure(
        name: impl Into<String>,
        status: Option<u16>,
        reason: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            outcome: RequestOutcome::Failure {
                status,
                reason: reason.into(),
            },
            latency,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RequestOutcome::Success { .. })
    }
}

/// Everything observed during one pass of the workload function.
#[derive(Clone, Debug)]
pub struct IterationResult {
    pub started_at: SystemTime,
    pub duration: Duration,
    pub requests: Vec<RequestResult>,
    /// True if any request failed or the workload itself faulted
    pub failed: bool,
    /// Message of an unhandled fault (panic or error returned by the workload)
    pub fault: Option<String>,
}

impl IterationResult {
    pub fn new(
        started_at: SystemTime,
        duration: Duration,
        requests: Vec<RequestResult>,
        fault: Option<String>,
    ) -> Self {
        let failed = fault.is_some() || requests.iter().any(|r| !r.is_success());
        Self {
            started_at,
            duration,
            requests,
            failed,
            fault,
        }
    }

    pub fn failed_requests(&self) -> usize {
        self.requests.iter().filter(|r| !r.is_success()).count()
    }
}
