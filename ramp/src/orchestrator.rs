//! Top-level entry points: validate a configuration, run it, report the result.
use crate::runner::IterationOutcome;
use crate::scheduler::Scheduler;
use ramp_core::{RampError, RunConfig, Summary};
use std::future::Future;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info};

/// Validate `config` and run `workload` along its ramp profile.
///
/// Configuration problems are reported before any virtual user starts. Failing requests and
/// faulting iterations never make this return `Err`; they are counted in the [`Summary`].
pub async fn run<T, F>(config: RunConfig, workload: T) -> Result<Summary, RampError>
where
    T: Fn() -> F + Send + Sync + 'static,
    F: Future + Send + 'static,
    F::Output: IterationOutcome,
{
    let (_stop, stop_rx) = watch::channel(false);
    run_until_stopped(config, workload, stop_rx).await
}

/// Run to completion, print the summary and turn the outcome into a process exit code.
///
/// Exit codes: `0` when the run completed (even with failed requests), `2` for an invalid
/// configuration and `1` for an engine fault.
pub async fn main<T, F>(config: RunConfig, workload: T) -> ExitCode
where
    T: Fn() -> F + Send + Sync + 'static,
    F: Future + Send + 'static,
    F::Output: IterationOutcome,
{
    report(run(config, workload).await)
}

/// Print the outcome of a run and map it to a process exit code.
pub fn report(result: Result<Summary, RampError>) -> ExitCode {
    let code = exit_code(&result);
    match result {
        Ok(summary) => println!("{summary}"),
        Err(err) => eprintln!("{err}"),
    }
    ExitCode::from(code)
}

fn exit_code(result: &Result<Summary, RampError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(err) => err.exit_code(),
    }
}

pub(crate) async fn run_until_stopped<T, F>(
    config: RunConfig,
    workload: T,
    stop: watch::Receiver<bool>,
) -> Result<Summary, RampError>
where
    T: Fn() -> F + Send + Sync + 'static,
    F: Future + Send + 'static,
    F::Output: IterationOutcome,
{
    let plan = config.validate().map_err(|err| {
        error!("Invalid configuration for {}: {err}", config.name);
        err
    })?;
    info!("Running {} with config {:?}", plan.name, &plan);

    let summary = Scheduler::new(plan, workload, stop)?
        .run()
        .await
        .map_err(|err| {
            error!("Engine fault: {err}");
            err
        })?;

    info!("Scenario complete");
    Ok(summary)
}
