//! Drives the number of running virtual users along the ramp profile.
use crate::clock::{RunClock, Ticker};
use crate::collector::ResultCollector;
use crate::runner::{IterationOutcome, WorkloadRunner};
use futures_util::stream::{FuturesUnordered, StreamExt};
use ramp_core::{EngineError, RunPlan, Summary, VuSample};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

mod virtual_user;

pub use virtual_user::VuState;
use virtual_user::{UserShared, VirtualUser};

pub(crate) struct Scheduler<T> {
    plan: RunPlan,
    runtime: Handle,
    shared: Arc<UserShared<T>>,
    stop: watch::Receiver<bool>,
    abandon: watch::Sender<bool>,
    /// Running users, oldest first
    users: Vec<VirtualUser>,
    retiring: Vec<VirtualUser>,
    next_id: u64,
    vus_max: usize,
    timeline: Vec<VuSample>,
}

impl<T, F> Scheduler<T>
where
    T: Fn() -> F + Send + Sync + 'static,
    F: Future + Send + 'static,
    F::Output: IterationOutcome,
{
    pub fn new(plan: RunPlan, workload: T, stop: watch::Receiver<bool>) -> Result<Self, EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let shared = Arc::new(UserShared {
            runner: WorkloadRunner::new(&plan.name, plan.base_url.clone(), workload),
            collector: Arc::new(ResultCollector::new(&plan.name)),
            pacing: plan.pacing,
        });
        let (abandon, _) = watch::channel(false);

        Ok(Self {
            plan,
            runtime,
            shared,
            stop,
            abandon,
            users: vec![],
            retiring: vec![],
            next_id: 1,
            vus_max: 0,
            timeline: vec![],
        })
    }

    #[instrument(name = "scenario", skip_all, fields(name = %self.plan.name))]
    pub async fn run(mut self) -> Result<Summary, EngineError> {
        let profile = self.plan.profile.clone();
        if profile.is_idle() {
            info!("Every stage targets 0 virtual users; nothing to run.");
            return self.shared.collector.finalize(Duration::ZERO);
        }

        let total = profile.total_duration();
        let clock = RunClock::start();
        let mut ticker = Ticker::new(self.plan.tick);
        let mut stop = self.stop.clone();
        let mut stage = None;
        let mut cancelled = false;

        info!(
            "Ramping over {} (peak {} virtual users, tick {ticker})",
            humantime::format_duration(total),
            profile.peak(),
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop_requested(&mut stop) => {
                    info!("Stop requested");
                    cancelled = true;
                    break;
                }
            }

            let elapsed = clock.elapsed();
            if let Some(timeout) = self.plan.timeout {
                if elapsed >= timeout {
                    warn!("Run exceeded its timeout of {}", humantime::format_duration(timeout));
                    cancelled = true;
                    break;
                }
            }

            let current = profile.stage_index_at(elapsed);
            if current != stage {
                if let Some(idx) = current {
                    let s = profile.stages()[idx];
                    info!(
                        "Stage {idx}: ramping to {} virtual users over {}",
                        s.target,
                        humantime::format_duration(s.duration)
                    );
                }
                stage = current;
            }

            // Past the end of the profile the final target still has to be applied once.
            let target = profile.target_at(elapsed.min(total));
            self.scale_to(target);
            self.reap()?;
            self.sample(elapsed, target);

            if elapsed >= total {
                break;
            }
        }

        if cancelled {
            self.abandon_all().await?;
        } else {
            let timeout_at = self.plan.timeout.and_then(|t| clock.at(t));
            cancelled = self.drain(timeout_at).await?;
        }

        let mut summary = self.shared.collector.finalize(clock.elapsed())?;
        summary.vus_max = self.vus_max;
        summary.timeline = std::mem::take(&mut self.timeline);
        summary.cancelled = cancelled;

        info!(
            "Finished after {} iterations ({} failed)",
            summary.iterations, summary.failed_iterations
        );
        Ok(summary)
    }

    fn scale_to(&mut self, target: usize) {
        let active = self.users.len();
        if active < target {
            for _ in active..target {
                let user = VirtualUser::spawn(
                    &self.runtime,
                    self.next_id,
                    self.shared.clone(),
                    self.abandon.subscribe(),
                );
                self.next_id += 1;
                self.users.push(user);
            }
            debug!("Spawned {} virtual users", target - active);
        } else if active > target {
            // Newest users retire first.
            let retired: Vec<_> = self.users.drain(target..).collect();
            for user in &retired {
                user.retire();
            }
            debug!("Retiring {} virtual users", retired.len());
            self.retiring.extend(retired);
        }

        self.vus_max = self.vus_max.max(self.users.len());
    }

    /// Collect users whose task already ended and surface their failures.
    fn reap(&mut self) -> Result<(), EngineError> {
        let (done, busy): (Vec<_>, Vec<_>) = std::mem::take(&mut self.retiring)
            .into_iter()
            .partition(VirtualUser::is_finished);
        self.retiring = busy;
        for user in done {
            user.try_join()?;
        }

        // Running users only end on their own when something went wrong.
        if self.users.iter().any(VirtualUser::is_finished) {
            let (done, busy): (Vec<_>, Vec<_>) = std::mem::take(&mut self.users)
                .into_iter()
                .partition(VirtualUser::is_finished);
            self.users = busy;
            for user in done {
                let id = user.id();
                user.try_join()?;
                warn!("Virtual user {id} stopped unexpectedly");
            }
        }

        Ok(())
    }

    fn sample(&mut self, elapsed: Duration, target: usize) {
        let active = self.users.len();
        trace!("t={elapsed:?} target={target} active={active}");

        #[cfg(feature = "metrics")]
        {
            let name = self.plan.name.clone();
            metrics::gauge!("ramp_vus", "scenario" => name.clone()).set(active as f64);
            metrics::gauge!("ramp_vus_target", "scenario" => name).set(target as f64);
        }

        self.timeline.push(VuSample {
            elapsed,
            target,
            active,
        });
    }

    /// End of profile: let in-flight iterations finish for up to `graceful_stop`.
    ///
    /// Returns `true` when a stop request or the run timeout cut the wait short.
    async fn drain(&mut self, timeout_at: Option<Instant>) -> Result<bool, EngineError> {
        for user in &self.users {
            user.retire();
        }
        let users: Vec<_> = self.users.drain(..).chain(self.retiring.drain(..)).collect();
        let busy = users
            .iter()
            .filter(|user| user.state() == VuState::Running)
            .count();
        info!(
            "Waiting for {} virtual users to finish ({busy} mid-iteration)",
            users.len()
        );

        self.join_all(users, self.plan.graceful_stop, timeout_at).await
    }

    /// Cancellation: drop in-flight iterations right away.
    async fn abandon_all(&mut self) -> Result<(), EngineError> {
        self.abandon.send_replace(true);
        let users: Vec<_> = self.users.drain(..).chain(self.retiring.drain(..)).collect();

        self.join_all(users, Duration::ZERO, None).await?;
        Ok(())
    }

    async fn join_all(
        &self,
        users: Vec<VirtualUser>,
        grace: Duration,
        timeout_at: Option<Instant>,
    ) -> Result<bool, EngineError> {
        let mut pending: FuturesUnordered<_> = users.into_iter().map(VirtualUser::join).collect();
        let deadline = tokio::time::sleep(grace);
        tokio::pin!(deadline);
        let mut stop = self.stop.clone();

        let mut abandoned = *self.abandon.borrow();
        let mut cancelled = false;
        let mut result = Ok(());

        loop {
            tokio::select! {
                next = pending.next() => match next {
                    None => break,
                    Some(Ok(())) => {}
                    Some(Err(err)) => {
                        error!("{err}");
                        if result.is_ok() {
                            result = Err(err);
                        }
                    }
                },
                _ = &mut deadline, if !abandoned => {
                    warn!(
                        "{} virtual users still busy after {}; abandoning their iterations",
                        pending.len(),
                        humantime::format_duration(grace)
                    );
                    self.abandon.send_replace(true);
                    abandoned = true;
                }
                _ = stop_requested(&mut stop), if !abandoned => {
                    info!("Stop requested while {} virtual users were finishing", pending.len());
                    self.abandon.send_replace(true);
                    abandoned = true;
                    cancelled = true;
                }
                _ = timeout_reached(timeout_at), if !abandoned => {
                    warn!("Run exceeded its timeout while {} virtual users were finishing", pending.len());
                    self.abandon.send_replace(true);
                    abandoned = true;
                    cancelled = true;
                }
            }
        }

        result.map(|()| cancelled)
    }
}

/// Resolves once a stop is requested. A dropped stop handle never stops the run.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|v| *v).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn timeout_reached(timeout_at: Option<Instant>) {
    match timeout_at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
