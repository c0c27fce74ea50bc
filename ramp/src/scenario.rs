//! Scenario logic and constants
use crate::orchestrator;
use crate::runner::IterationOutcome;
use ramp_core::{RampError, RunConfig, Stage, StageSpec, Summary};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::watch;

/// Load test scenario structure
///
/// Handler for running scenarios. Not intended for manual creation, use the
/// [`#[scenario]`](ramp_macros::scenario) macro which will add these methods to functions.
/// Awaiting the scenario runs it and resolves to its [`Summary`].
#[pin_project::pin_project]
pub struct Scenario<T> {
    func: T,
    runner_fut: Option<Pin<Box<dyn Future<Output = Result<Summary, RampError>> + Send>>>,
    config: RunConfig,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl<T> Scenario<T> {
    #[doc(hidden)]
    pub fn new(name: &str, func: T) -> Self {
        Self::with_config(RunConfig::new(name), func)
    }

    /// Scenario driven by an already loaded configuration.
    pub fn with_config(config: RunConfig, func: T) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            func,
            runner_fut: None,
            config,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}

impl<T, F> Future for Scenario<T>
where
    T: Fn() -> F + Send + Sync + Clone + 'static,
    F: Future + Send + 'static,
    F::Output: IterationOutcome,
{
    type Output = Result<Summary, RampError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if this.runner_fut.is_none() {
            let func = this.func.clone();
            let config = this.config.clone();
            let stop = this.stop_rx.clone();
            *this.runner_fut = Some(Box::pin(async move {
                orchestrator::run_until_stopped(config, func, stop).await
            }));
        }

        if let Some(runner) = this.runner_fut {
            runner.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}

/// Stops a running scenario early. The scenario still resolves to a (partial) [`Summary`].
#[derive(Clone)]
pub struct StopHandle(Arc<watch::Sender<bool>>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.0.borrow()
    }
}

pub trait ConfigurableScenario: Future<Output = Result<Summary, RampError>> + Sized + Send {
    fn stages(self, stages: impl IntoIterator<Item = Stage>) -> Self;
    fn stage(self, duration: Duration, target: usize) -> Self;
    fn base_url(self, base_url: &str) -> Self;
    fn pacing(self, pacing: Duration) -> Self;
    fn tick(self, tick: Duration) -> Self;
    fn graceful_stop(self, graceful_stop: Duration) -> Self;
    fn timeout(self, timeout: Duration) -> Self;
    fn stop_handle(&self) -> StopHandle;
}

impl<T, F> ConfigurableScenario for Scenario<T>
where
    T: Fn() -> F + Send + Sync + Clone + 'static,
    F: Future + Send + 'static,
    F::Output: IterationOutcome,
{
    /// Replace all stages of the ramp profile.
    ///
    /// # Example
    /// ```no_run
    /// use ramp::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     my_scenario()
    ///         .stages([
    ///             Stage::new(Duration::from_secs(30), 100),
    ///             Stage::new(Duration::from_secs(60), 100),
    ///             Stage::new(Duration::from_secs(10), 0),
    ///         ])
    ///         .base_url("http://localhost:3000")
    ///         .await
    ///         .unwrap();
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn stages(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.config.stages = stages.into_iter().map(StageSpec::from).collect();
        self
    }

    /// Append one stage to the ramp profile.
    ///
    /// # Example
    /// ```no_run
    /// use ramp::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     my_scenario()
    ///         .stage(Duration::from_secs(2), 10_000)
    ///         .base_url("http://localhost:3000")
    ///         .await
    ///         .unwrap();
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn stage(mut self, duration: Duration, target: usize) -> Self {
        self.config
            .stages
            .push(StageSpec::from(Stage::new(duration, target)));
        self
    }

    /// Base URL relative request URLs are resolved against. Required.
    fn base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = Some(base_url.to_string());
        self
    }

    /// Pause of each virtual user between two iterations. Defaults to 1s.
    fn pacing(mut self, pacing: Duration) -> Self {
        self.config.pacing = Some(pacing.into());
        self
    }

    /// How often the number of virtual users is adjusted. Defaults to 100ms.
    fn tick(mut self, tick: Duration) -> Self {
        self.config.tick = Some(tick.into());
        self
    }

    /// How long in-flight iterations may run once the profile is over. Defaults to 30s.
    fn graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.config.graceful_stop = Some(graceful_stop.into());
        self
    }

    /// Cancel the run once it has been going for `timeout`.
    fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout.into());
        self
    }

    /// Handle to stop the scenario from another task.
    ///
    /// # Example
    /// ```no_run
    /// use ramp::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let scenario = my_scenario()
    ///         .stage(Duration::from_secs(600), 100)
    ///         .base_url("http://localhost:3000");
    ///     let stop = scenario.stop_handle();
    ///     tokio::spawn(async move {
    ///         tokio::time::sleep(Duration::from_secs(30)).await;
    ///         stop.stop();
    ///     });
    ///     let summary = scenario.await.unwrap();
    ///     assert!(summary.cancelled);
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop_tx.clone())
    }
}
