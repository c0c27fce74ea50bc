mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use ramp::prelude::*;
    use ramp::{Stage, TagSummary};
    use reqwest::Client;
    use std::sync::OnceLock;
    use std::time::Duration;

    static CLIENT: OnceLock<Client> = OnceLock::new();

    #[scenario]
    async fn user_query() {
        let client = CLIENT.get_or_init(Client::new);
        batch(client, [BatchRequest::get("/users/2").name("User query")]).await;
    }

    #[scenario]
    async fn missing_user() {
        let client = CLIENT.get_or_init(Client::new);
        batch(client, [BatchRequest::get("/users/99").name("Missing user")]).await;
    }

    #[tokio::test]
    async fn ramps_and_tags_requests() {
        let base_url = init().await;

        let summary = user_query()
            .stage(Duration::from_secs(2), 50)
            .base_url(&base_url)
            .pacing(Duration::from_millis(200))
            .await
            .unwrap();

        assert!(!summary.cancelled);
        assert_eq!(summary.vus_max, 50);
        assert!(summary.requests > 50);
        assert_eq!(summary.failure_count, 0);
        assert_eq!(summary.iterations, summary.requests);
        assert_eq!(summary.latency.count, summary.requests);
        assert_eq!(
            summary.tags["User query"],
            TagSummary {
                requests: summary.requests,
                failures: 0,
            }
        );
        assert!(summary.latency.p50 <= summary.latency.p99);
        assert!(summary.elapsed >= Duration::from_secs(2));

        let metrics = rendered_metrics();
        assert!(metrics.contains("ramp_requests_total"));
        assert!(metrics.contains("scenario=\"user_query\""));
    }

    #[tokio::test]
    async fn ramp_up_and_down_returns_to_zero() {
        let base_url = init().await;

        let summary = user_query()
            .stages([
                Stage::new(Duration::from_millis(500), 20),
                Stage::new(Duration::from_millis(500), 20),
                Stage::new(Duration::from_millis(500), 0),
            ])
            .base_url(&base_url)
            .pacing(Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(summary.vus_max, 20);
        assert_eq!(summary.failure_count, 0);
        let peak = summary.timeline.iter().map(|s| s.active).max().unwrap();
        assert_eq!(peak, 20);
        assert_eq!(summary.timeline.last().unwrap().active, 0);
    }

    #[tokio::test]
    async fn not_found_is_a_failed_request() {
        let base_url = init().await;

        let summary = missing_user()
            .stage(Duration::from_secs(1), 5)
            .base_url(&base_url)
            .pacing(Duration::from_millis(100))
            .await
            .unwrap();

        assert!(summary.requests > 0);
        assert_eq!(summary.failure_count, summary.requests);
        assert_eq!(summary.failed_iterations, summary.iterations);
        assert_eq!(summary.tags["Missing user"].failures, summary.requests);
    }

    #[cfg(feature = "integration")]
    #[tokio::test(flavor = "multi_thread")]
    async fn ten_thousand_users_in_two_seconds() {
        let base_url = init().await;

        let summary = user_query()
            .stage(Duration::from_secs(2), 10_000)
            .base_url(&base_url)
            .pacing(Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(summary.vus_max, 10_000);
        assert_eq!(summary.timeline.last().unwrap().active, 10_000);
        assert!(summary.requests >= 10_000);
    }
}
