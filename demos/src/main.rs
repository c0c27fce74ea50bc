//! Ramp from 0 to 10000 virtual users over 2s, each one fetching `/users/2` once per second.
//!
//! Environment:
//! - `BASE_URL`: service under test (default `http://localhost:3000`)
//! - `RAMP_CONFIG`: path to a JSON run configuration replacing the built-in profile
//! - `RAMP_PROMETHEUS_ADDR`: serve metrics on this address
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use ramp::prelude::*;
use ramp::Scenario;
use reqwest::Client;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

#[tokio::main]
async fn main() -> ExitCode {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ramp=info")),
        )
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{err:#}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = install_metrics() {
        error!("Unable to install the Prometheus exporter: {err:#}");
        return ExitCode::FAILURE;
    }

    let scenario = Scenario::with_config(config, user_query);
    let stop = scenario.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping virtual users");
            stop.stop();
        }
    });

    ramp::report(scenario.await)
}

fn load_config() -> anyhow::Result<RunConfig> {
    let mut config = match std::env::var("RAMP_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?
        }
        Err(_) => {
            let mut config = RunConfig::new("user_query");
            config.stages = vec![StageSpec::new(Duration::from_secs(2), 10_000)];
            config
        }
    };

    if let Ok(base_url) = std::env::var("BASE_URL") {
        config.base_url = Some(base_url);
    } else if config.base_url.is_none() {
        config.base_url = Some(DEFAULT_BASE_URL.to_string());
    }

    Ok(config)
}

fn install_metrics() -> anyhow::Result<()> {
    if let Ok(addr) = std::env::var("RAMP_PROMETHEUS_ADDR") {
        PrometheusBuilder::new()
            .with_http_listener(addr.parse::<SocketAddr>()?)
            .install()?;
        info!("Serving metrics on {addr}");
    }
    Ok(())
}

async fn user_query() {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    let client = CLIENT.get_or_init(Client::new);

    batch(client, [BatchRequest::get("/users/2").name("User query")]).await;
}
