use crate::collector::ResultCollector;
use crate::runner::{IterationOutcome, WorkloadRunner};
use futures_util::FutureExt;
use ramp_core::EngineError;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::trace;

/// Lifecycle of a virtual user: Idle -> Running <-> Sleeping -> Stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum VuState {
    Idle = 0,
    Running = 1,
    Sleeping = 2,
    Stopped = 3,
}

impl From<u8> for VuState {
    fn from(value: u8) -> Self {
        match value {
            0 => VuState::Idle,
            1 => VuState::Running,
            2 => VuState::Sleeping,
            _ => VuState::Stopped,
        }
    }
}

/// Everything a virtual user task needs, shared across all users of a run.
pub(crate) struct UserShared<T> {
    pub runner: WorkloadRunner<T>,
    pub collector: Arc<ResultCollector>,
    pub pacing: Duration,
}

/// Handle to one spawned virtual user.
pub(crate) struct VirtualUser {
    id: u64,
    state: Arc<AtomicU8>,
    retire: watch::Sender<bool>,
    handle: JoinHandle<Result<(), EngineError>>,
}

impl VirtualUser {
    /// Spawn a user that loops the workload until retired or until `abandon` fires.
    ///
    /// Retiring lets an in-flight iteration finish; `abandon` drops it.
    pub fn spawn<T, F>(
        runtime: &Handle,
        id: u64,
        shared: Arc<UserShared<T>>,
        abandon: watch::Receiver<bool>,
    ) -> Self
    where
        T: Fn() -> F + Send + Sync + 'static,
        F: Future + Send + 'static,
        F::Output: IterationOutcome,
    {
        let state = Arc::new(AtomicU8::new(VuState::Idle as u8));
        let (retire, retire_rx) = watch::channel(false);

        let handle = runtime.spawn(user_loop(id, shared, state.clone(), retire_rx, abandon));

        Self {
            id,
            state,
            retire,
            handle,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> VuState {
        self.state.load(Ordering::Relaxed).into()
    }

    pub fn retire(&self) {
        self.retire.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the user task to end.
    pub async fn join(self) -> Result<(), EngineError> {
        let id = self.id;
        join_result(id, self.handle.await)
    }

    /// Result of an already finished user; `Ok` if it is still running.
    pub fn try_join(self) -> Result<(), EngineError> {
        let id = self.id;
        match self.handle.now_or_never() {
            Some(res) => join_result(id, res),
            None => Ok(()),
        }
    }
}

fn join_result(
    id: u64,
    res: Result<Result<(), EngineError>, JoinError>,
) -> Result<(), EngineError> {
    match res {
        Ok(res) => res,
        Err(err) if err.is_panic() => Err(EngineError::WorkerPanicked { id }),
        Err(_) => Ok(()),
    }
}

async fn user_loop<T, F>(
    id: u64,
    shared: Arc<UserShared<T>>,
    state: Arc<AtomicU8>,
    mut retire: watch::Receiver<bool>,
    mut abandon: watch::Receiver<bool>,
) -> Result<(), EngineError>
where
    T: Fn() -> F + Send + Sync + 'static,
    F: Future + Send + 'static,
    F::Output: IterationOutcome,
{
    trace!("Virtual user {id} started");
    let mut iteration = 0;

    loop {
        if *retire.borrow() || *abandon.borrow() {
            break;
        }

        state.store(VuState::Running as u8, Ordering::Relaxed);
        let result = tokio::select! {
            result = shared.runner.run_once(id, iteration) => result,
            _ = abandon.wait_for(|v| *v) => break,
        };
        shared.collector.record(result)?;
        iteration += 1;

        state.store(VuState::Sleeping as u8, Ordering::Relaxed);
        tokio::select! {
            _ = tokio::time::sleep(shared.pacing) => {}
            _ = retire.wait_for(|v| *v) => break,
            _ = abandon.wait_for(|v| *v) => break,
        }
    }

    state.store(VuState::Stopped as u8, Ordering::Relaxed);
    trace!("Virtual user {id} stopped after {iteration} iterations");
    Ok(())
}
