use crate::context::ITERATION;
use ramp_core::RequestResult;
use std::fmt::Display;
use std::future::Future;
use tokio::time::Instant;

/// Request hook used by the `#[request]` macro.
///
/// Times `func` and records it as a request named `name` in the current iteration. An `Err` is
/// recorded as a failed request and handed back to the caller unchanged.
pub async fn request_hook<T, R, E>(name: &str, func: T) -> T::Output
where
    T: Future<Output = Result<R, E>>,
    E: Display,
{
    if let Ok(scope) = ITERATION.try_with(|v| v.clone()) {
        let start = Instant::now();
        let res = func.await;
        let latency = start.elapsed();

        let result = match &res {
            Ok(_) => RequestResult::success(name, None, latency),
            Err(err) => RequestResult::failure(name, None, err.to_string(), latency),
        };
        scope.record(result);

        res
    } else {
        tracing::warn!("No hook available for request {name}.");
        func.await
    }
}

/// Record an already measured request in the current iteration.
///
/// Returns `false` (and drops the result) when called outside a virtual user.
pub fn record_request(result: RequestResult) -> bool {
    match ITERATION.try_with(|scope| scope.clone()) {
        Ok(scope) => {
            scope.record(result);
            true
        }
        Err(_) => {
            tracing::warn!("No hook available for request {}.", result.name);
            false
        }
    }
}
