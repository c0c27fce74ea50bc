mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use ramp::prelude::*;
    use reqwest::Client;
    use std::sync::OnceLock;
    use std::time::{Duration, Instant};

    static CLIENT: OnceLock<Client> = OnceLock::new();

    #[scenario]
    async fn slow_user_query() {
        let client = CLIENT.get_or_init(Client::new);
        batch(client, [BatchRequest::get("/delay/ms/300").name("Slow query")]).await;
    }

    #[scenario]
    async fn stuck_user_query() {
        let client = CLIENT.get_or_init(Client::new);
        batch(client, [BatchRequest::get("/delay/ms/60000").name("Stuck query")]).await;
    }

    #[tokio::test]
    async fn stop_after_ramp_skips_graceful_stop() {
        let base_url = init().await;

        let scenario = stuck_user_query()
            .stage(Duration::from_millis(500), 3)
            .base_url(&base_url);
        let stop = scenario.stop_handle();

        let start = Instant::now();
        let run = tokio::spawn(scenario);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        stop.stop();

        let summary = run.await.unwrap().unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.vus_max, 3);
        assert_eq!(summary.iterations, 0);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn stop_mid_ramp_returns_partial_summary() {
        let base_url = init().await;

        let scenario = slow_user_query()
            .stage(Duration::from_secs(30), 200)
            .base_url(&base_url)
            .pacing(Duration::from_secs(1));
        let stop = scenario.stop_handle();

        let start = Instant::now();
        let run = tokio::spawn(scenario);
        tokio::time::sleep(Duration::from_secs(2)).await;
        stop.stop();

        let summary = run.await.unwrap().unwrap();
        assert!(summary.cancelled);
        assert!(summary.vus_max > 0 && summary.vus_max < 200);
        // Every user is gone well within one pacing interval of the stop.
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(summary.failure_count, 0);
    }

    #[tokio::test]
    async fn timeout_cancels() {
        let base_url = init().await;

        let summary = slow_user_query()
            .stage(Duration::from_secs(30), 20)
            .base_url(&base_url)
            .timeout(Duration::from_secs(1))
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert!(summary.elapsed < Duration::from_millis(1_500));
    }
}
