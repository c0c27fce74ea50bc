use ramp::prelude::*;
use std::time::Duration;
use tracing_test::traced_test;

#[scenario]
async fn quiet() {}

#[tokio::test]
#[traced_test]
async fn logs_stage_transitions() {
    let summary = quiet()
        .stage(Duration::from_millis(300), 2)
        .stage(Duration::from_millis(300), 0)
        .base_url("http://localhost:3000")
        .await
        .unwrap();

    assert_eq!(summary.vus_max, 2);
    assert!(logs_contain("Stage 0: ramping to 2 virtual users over 300ms"));
    assert!(logs_contain("Stage 1: ramping to 0 virtual users over 300ms"));
    assert!(logs_contain("Scenario complete"));
}
