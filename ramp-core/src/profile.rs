use std::time::Duration;

/// One segment of a ramp: reach `target` virtual users over `duration`.
///
/// Use `Stage::new(Duration::from_secs(10), 100)` to ramp to 100 users over 10s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    /// Concurrent virtual users at the end of the stage
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

/// A validated, ordered sequence of [`Stage`]s.
///
/// The stages describe a piecewise-linear curve of target concurrency over elapsed time. Each
/// stage starts from the target of the previous one (0 for the first) and moves linearly to its
/// own target:
///
/// ```text
/// target(t) = start + (end - start) * (t - stage_start) / stage_duration
/// ```
///
/// A stage with a zero duration jumps straight to its target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RampProfile {
    stages: Vec<Stage>,
}

impl RampProfile {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .fold(Duration::ZERO, |total, s| total.saturating_add(s.duration))
    }

    /// Highest target reached anywhere on the curve.
    pub fn peak(&self) -> usize {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// A profile whose every target is zero never starts a virtual user.
    pub fn is_idle(&self) -> bool {
        self.peak() == 0
    }

    /// Index of the stage active at `elapsed`, or `None` once the profile is over.
    pub fn stage_index_at(&self, elapsed: Duration) -> Option<usize> {
        let mut stage_end = Duration::ZERO;
        for (idx, stage) in self.stages.iter().enumerate() {
            stage_end = stage_end.saturating_add(stage.duration);
            if elapsed < stage_end {
                return Some(idx);
            }
        }
        None
    }

    /// Integer number of virtual users that should be active at `elapsed`.
    ///
    /// The continuous curve value is truncated toward the stage's starting level, so a user is
    /// only added (or removed) once the curve fully crosses an integer. At the end of a stage the
    /// result is exactly the stage target, and past the end of the profile it stays at the last
    /// target.
    pub fn target_at(&self, elapsed: Duration) -> usize {
        let mut level = 0;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let stage_end = stage_start.saturating_add(stage.duration);
            // Zero-duration stages never match here and simply move the level.
            if elapsed < stage_end {
                let progress =
                    (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                return interpolate(level, stage.target, progress);
            }
            level = stage.target;
            stage_start = stage_end;
        }

        level
    }
}

impl From<Vec<Stage>> for RampProfile {
    fn from(stages: Vec<Stage>) -> Self {
        Self::new(stages)
    }
}

fn interpolate(start: usize, end: usize, progress: f64) -> usize {
    let progress = progress.clamp(0., 1.);
    let value = start as f64 + (end as f64 - start as f64) * progress;

    if end >= start {
        (value.floor() as usize).clamp(start, end)
    } else {
        (value.ceil() as usize).clamp(end, start)
    }
}
