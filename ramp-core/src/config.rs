use crate::{
    ConfigError, RampProfile, Stage, DEFAULT_GRACEFUL_STOP, DEFAULT_PACING,
    DEFAULT_SCENARIO_NAME, DEFAULT_TICK, MAX_VUS,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::time::Duration;
use url::Url;

/// Stage duration as written in a configuration: seconds, or a humantime string (`"2s"`,
/// `"1m 30s"`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    Seconds(f64),
    Text(String),
}

impl DurationSpec {
    fn resolve(&self, index: usize) -> Result<Duration, ConfigError> {
        match self {
            DurationSpec::Seconds(secs) if *secs < 0. => Err(ConfigError::NegativeDuration {
                index,
                value: secs.to_string(),
            }),
            DurationSpec::Seconds(secs) => {
                Duration::try_from_secs_f64(*secs).map_err(|e| ConfigError::InvalidDuration {
                    index,
                    value: secs.to_string(),
                    reason: e.to_string(),
                })
            }
            DurationSpec::Text(text) => {
                let text = text.trim();
                if text.starts_with('-') {
                    return Err(ConfigError::NegativeDuration {
                        index,
                        value: text.to_string(),
                    });
                }
                humantime::parse_duration(text).map_err(|e| ConfigError::InvalidDuration {
                    index,
                    value: text.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl From<Duration> for DurationSpec {
    fn from(duration: Duration) -> Self {
        DurationSpec::Text(humantime::format_duration(duration).to_string())
    }
}

impl From<&str> for DurationSpec {
    fn from(text: &str) -> Self {
        DurationSpec::Text(text.to_string())
    }
}

impl From<f64> for DurationSpec {
    fn from(secs: f64) -> Self {
        DurationSpec::Seconds(secs)
    }
}

/// Unvalidated stage, as accepted from configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    pub duration: DurationSpec,
    pub target: i64,
}

impl StageSpec {
    pub fn new(duration: impl Into<DurationSpec>, target: i64) -> Self {
        Self {
            duration: duration.into(),
            target,
        }
    }

    pub fn validate(&self, index: usize) -> Result<Stage, ConfigError> {
        let duration = self.duration.resolve(index)?;

        if self.target < 0 {
            return Err(ConfigError::NegativeTarget {
                index,
                target: self.target,
            });
        }

        let target = usize::try_from(self.target)
            .ok()
            .filter(|t| *t <= MAX_VUS)
            .ok_or(ConfigError::TargetTooLarge {
                index,
                target: self.target,
                max: MAX_VUS,
            })?;

        Ok(Stage::new(duration, target))
    }
}

impl From<Stage> for StageSpec {
    fn from(stage: Stage) -> Self {
        // MAX_VUS keeps every valid target well inside i64
        Self::new(stage.duration, stage.target as i64)
    }
}

/// Options of a run: the ramp profile, the target service and pacing.
///
/// Field names follow the load-testing convention (`stages`, `baseURL`), so a profile such as
/// `{ "stages": [{ "duration": "2s", "target": 10000 }], "baseURL": "http://localhost:3000" }`
/// deserializes directly.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub stages: Vec<StageSpec>,
    #[serde(default, rename = "baseURL", alias = "baseUrl", alias = "base_url")]
    pub base_url: Option<String>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub pacing: Option<humantime::Duration>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub tick: Option<humantime::Duration>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default, rename = "gracefulStop", alias = "graceful_stop")]
    pub graceful_stop: Option<humantime::Duration>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub timeout: Option<humantime::Duration>,
}

fn default_name() -> String {
    DEFAULT_SCENARIO_NAME.to_string()
}

impl RunConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stages: vec![],
            base_url: None,
            pacing: None,
            tick: None,
            graceful_stop: None,
            timeout: None,
        }
    }

    /// Check every option and produce the plan the scheduler runs.
    pub fn validate(&self) -> Result<RunPlan, ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }

        let stages = self
            .stages
            .iter()
            .enumerate()
            .map(|(idx, stage)| stage.validate(idx))
            .collect::<Result<Vec<_>, _>>()?;

        stages
            .iter()
            .enumerate()
            .try_fold(Duration::ZERO, |total, (index, stage)| {
                total
                    .checked_add(stage.duration)
                    .ok_or(ConfigError::DurationOverflow { index })
            })?;

        let base_url = parse_base_url(self.base_url.as_deref())?;

        let tick = self.tick.map(Into::into).unwrap_or(DEFAULT_TICK);
        if tick.is_zero() {
            return Err(ConfigError::ZeroTick);
        }

        Ok(RunPlan {
            name: self.name.clone(),
            profile: RampProfile::new(stages),
            base_url,
            pacing: self.pacing.map(Into::into).unwrap_or(DEFAULT_PACING),
            tick,
            graceful_stop: self
                .graceful_stop
                .map(Into::into)
                .unwrap_or(DEFAULT_GRACEFUL_STOP),
            timeout: self.timeout.map(Into::into),
        })
    }
}

fn parse_base_url(value: Option<&str>) -> Result<Url, ConfigError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingBaseUrl)?;

    let url = Url::parse(value).map_err(|e| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::InvalidBaseUrl {
            value: value.to_string(),
            reason: format!("unsupported scheme {scheme:?}"),
        }),
    }
}

/// A validated [`RunConfig`] with every default filled in.
#[derive(Clone, Debug)]
pub struct RunPlan {
    pub name: String,
    pub profile: RampProfile,
    pub base_url: Url,
    pub pacing: Duration,
    pub tick: Duration,
    pub graceful_stop: Duration,
    pub timeout: Option<Duration>,
}
