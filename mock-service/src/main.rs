use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=info,tower_http=warn")),
        )
        .init();

    if let Ok(addr) = std::env::var("MOCK_PROMETHEUS_ADDR") {
        PrometheusBuilder::new()
            .with_http_listener(addr.parse::<SocketAddr>()?)
            .install()?;
    }

    tokio::spawn(mock_service::tps_measure_task());

    let addr: SocketAddr = std::env::var("MOCK_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()?;
    mock_service::run(addr).await
}
