use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

static PROMETHEUS: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install logging and the metrics recorder once per test binary, then start a fresh mock
/// service on an ephemeral port. Returns its base URL.
#[allow(unused)]
pub async fn init() -> String {
    PROMETHEUS.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter("ramp=debug,mock_service=info,axum::rejection=trace")
            .try_init();

        PrometheusBuilder::new()
            .install_recorder()
            .expect("metrics recorder")
    });

    let addr = mock_service::spawn("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .unwrap();
    format!("http://{addr}")
}

#[allow(unused)]
pub fn rendered_metrics() -> String {
    PROMETHEUS.get().map(PrometheusHandle::render).unwrap_or_default()
}
