use axum::{debug_handler, extract::Path, http::StatusCode, routing::get, Json, Router};
use lazy_static::lazy_static;
use metrics::{counter, gauge};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub fn app() -> Router {
    Router::new()
        .route("/users/:id", get(user))
        .route("/delay/ms/:delay_ms", get(delay))
        .route("/status/:code", get(status))
        .layer(TraceLayer::new_for_http())
}

/// Serve the mock API on `addr` until the process exits.
pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    debug!("Mock service listening on {}", listener.local_addr()?);
    axum::serve(listener, app()).await?;
    Ok(())
}

/// Serve the mock API in the background. Returns the bound address, so port 0 works.
pub async fn spawn(addr: SocketAddr) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app()).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });
    Ok(local)
}

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: u32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

lazy_static! {
    static ref USERS: HashMap<u32, User> = [
        (1, "George", "Bluth"),
        (2, "Janet", "Weaver"),
        (3, "Emma", "Wong"),
        (4, "Eve", "Holt"),
        (5, "Charles", "Morris"),
        (6, "Tracey", "Ramos"),
    ]
    .into_iter()
    .map(|(id, first, last)| {
        let user = User {
            id,
            email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
            first_name: first.to_string(),
            last_name: last.to_string(),
        };
        (id, user)
    })
    .collect();
}

#[debug_handler]
pub async fn user(Path(id): Path<u32>) -> Result<Json<User>, StatusCode> {
    counter!("mock-service.requests").increment(1);
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);

    USERS.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[debug_handler]
pub async fn delay(Path(delay_ms): Path<u64>) {
    counter!("mock-service.requests").increment(1);
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

/// Answers with whatever status was asked for.
#[debug_handler]
pub async fn status(Path(code): Path<u16>) -> StatusCode {
    counter!("mock-service.requests").increment(1);
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/** TPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let transactions = TPS_MEASURE.swap(0, Ordering::Relaxed);
        if transactions > 0 {
            println!("{transactions} TPS");
        }
        gauge!("mock-service.tps").set(transactions as f64);
    }
}
