use std::time::Duration;

/// How often the scheduler re-evaluates the ramp curve.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// The pause a virtual user takes after every iteration.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// How long in-flight iterations get to finish once the last stage has elapsed.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// Upper bound on any stage target.
pub const MAX_VUS: usize = 1_000_000;

pub const DEFAULT_SCENARIO_NAME: &str = "default";
