mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use ramp::prelude::*;
    use reqwest::Client;
    use std::sync::OnceLock;
    use std::time::Duration;

    static CLIENT: OnceLock<Client> = OnceLock::new();

    #[scenario]
    async fn overloaded() {
        let client = CLIENT.get_or_init(Client::new);
        batch(
            client,
            [
                BatchRequest::get("/status/503").name("Overloaded"),
                BatchRequest::get("/users/1").name("User query"),
            ],
        )
        .await;
    }

    #[scenario]
    async fn checked_call() -> Result<(), anyhow::Error> {
        fetch_user().await?;
        Ok(())
    }

    #[request]
    async fn fetch_user() -> Result<(), anyhow::Error> {
        let base_url = ramp::context::base_url().ok_or_else(|| anyhow::anyhow!("no context"))?;
        let client = CLIENT.get_or_init(Client::new);
        let res = client.get(base_url.join("/status/500")?).send().await?;

        if res.status().is_server_error() {
            Err(anyhow::anyhow!("server error {}", res.status()))
        } else {
            Ok(())
        }
    }

    #[scenario]
    async fn panicking() {
        let client = CLIENT.get_or_init(Client::new);
        let results = batch(client, [BatchRequest::get("/users/3")]).await;
        if results.iter().all(|r| r.is_success()) {
            panic!("workload bug");
        }
    }

    #[tokio::test]
    async fn server_errors_are_data() {
        let base_url = init().await;

        let summary = overloaded()
            .stage(Duration::from_secs(1), 10)
            .base_url(&base_url)
            .pacing(Duration::from_millis(100))
            .await
            .unwrap();

        let overloaded = summary.tags["Overloaded"];
        let users = summary.tags["User query"];
        assert!(overloaded.requests > 0);
        assert_eq!(overloaded.failures, overloaded.requests);
        assert_eq!(users.failures, 0);
        assert_eq!(summary.failure_count, overloaded.requests);
        assert_eq!(summary.failed_iterations, summary.iterations);
        assert!((summary.error_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_request_macro_is_not_double_counted() {
        let base_url = init().await;

        let summary = checked_call()
            .stage(Duration::from_secs(1), 4)
            .base_url(&base_url)
            .pacing(Duration::from_millis(100))
            .await
            .unwrap();

        assert!(summary.iterations > 0);
        assert_eq!(summary.requests, summary.iterations);
        assert_eq!(summary.tags["fetch_user"].failures, summary.requests);
        assert!(!summary.tags.contains_key("checked_call"));
    }

    #[tokio::test]
    async fn panics_stay_in_their_iteration() {
        let base_url = init().await;

        let summary = panicking()
            .stage(Duration::from_secs(1), 3)
            .base_url(&base_url)
            .pacing(Duration::from_millis(100))
            .await
            .unwrap();

        assert!(summary.iterations > 0);
        assert_eq!(summary.failed_iterations, summary.iterations);
        // One real request plus one synthetic failure per iteration.
        assert_eq!(summary.requests, summary.iterations * 2);
        assert_eq!(summary.tags["panicking"].failures, summary.iterations);
    }

    #[tokio::test]
    async fn unreachable_service_completes() {
        let _ = init().await;

        let summary = overloaded()
            .stage(Duration::from_millis(500), 3)
            .base_url("http://127.0.0.1:9")
            .pacing(Duration::from_millis(100))
            .await
            .unwrap();

        assert!(summary.requests > 0);
        assert_eq!(summary.failure_count, summary.requests);
    }
}
