mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use ramp::prelude::*;
    use ramp::{ConfigError, RampError};
    use reqwest::Client;
    use std::sync::OnceLock;
    use std::time::Duration;

    static CLIENT: OnceLock<Client> = OnceLock::new();

    async fn workload() {
        let client = CLIENT.get_or_init(Client::new);
        batch(client, [BatchRequest::get("/users/2").name("User query")]).await;
    }

    fn load(json: &str) -> RunConfig {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn runs_a_loaded_profile() {
        let base_url = init().await;

        let config = load(&format!(
            r#"{{
                "name": "loaded",
                "stages": [{{ "duration": "1s", "target": 8 }}, {{ "duration": 0.5, "target": 0 }}],
                "baseURL": "{base_url}",
                "pacing": "200ms"
            }}"#
        ));

        let summary = ramp::run(config, workload).await.unwrap();
        assert_eq!(summary.name, "loaded");
        assert_eq!(summary.vus_max, 8);
        assert_eq!(summary.failure_count, 0);
        assert!(summary.tags.contains_key("User query"));
    }

    #[tokio::test]
    async fn invalid_profiles_never_start() {
        let cases = [
            (r#"{ "stages": [], "baseURL": "http://localhost" }"#, 2),
            (
                r#"{ "stages": [{ "duration": "1s", "target": -5 }], "baseURL": "http://localhost" }"#,
                2,
            ),
            (
                r#"{ "stages": [{ "duration": "-1s", "target": 5 }], "baseURL": "http://localhost" }"#,
                2,
            ),
            (r#"{ "stages": [{ "duration": "1s", "target": 5 }] }"#, 2),
            (
                r#"{ "stages": [{ "duration": "1s", "target": 5 }], "baseURL": "ftp://localhost" }"#,
                2,
            ),
        ];

        for (json, code) in cases {
            let res = ramp::run(load(json), || async {
                if true {
                    panic!("workload must not run for an invalid profile");
                }
            })
            .await;

            let err = res.unwrap_err();
            assert!(matches!(err, RampError::Config(_)), "{json}: {err}");
            assert_eq!(err.exit_code(), code);
        }
    }

    #[tokio::test]
    async fn all_zero_targets_do_nothing() {
        let base_url = init().await;

        let summary = ramp::run(
            load(&format!(
                r#"{{ "stages": [{{ "duration": "10s", "target": 0 }}], "baseURL": "{base_url}" }}"#
            )),
            workload,
        )
        .await
        .unwrap();

        assert_eq!(summary.iterations, 0);
        assert_eq!(summary.requests, 0);
        assert_eq!(summary.elapsed, Duration::ZERO);
    }

    #[tokio::test]
    async fn missing_stages_message() {
        let err = ramp::run(load(r#"{ "baseURL": "http://localhost" }"#), workload)
            .await
            .unwrap_err();

        assert!(matches!(err, RampError::Config(ConfigError::NoStages)));
        assert_eq!(err.to_string(), "Configuration error: No stages configured");
    }
}
