use crate::photon::PhotonWorld;
use cucumber::{given, then, when};
use libphoton::codes::ACTORS_COUNT_PROPERTY;
use libphoton::Value;
use photon_client::{DrainOptions, DrainOutcome};
use std::time::Duration;

#[given(regex = r"^the server reports (\d+) actors before the reset$")]
fn initial_actors(world: &mut PhotonWorld, count: i64) {
    world.model.properties.insert(ACTORS_COUNT_PROPERTY.to_string(), Value::from(count.to_string()));
}

#[given(regex = r"^the server reports actor counts (.+) after a reset$")]
fn actor_counts(world: &mut PhotonWorld, counts: String) {
    world.model.actor_counts = counts
        .split(',')
        .map(|c| c.trim().parse::<i64>().expect("actor counts are integers"))
        .collect();
}

#[given(expr = "the server answers Reset with result {int}")]
fn reset_result(world: &mut PhotonWorld, result: i64) {
    world.model.reset_result = result;
}

#[given(expr = "the server drops the connection after {int} answer(s)")]
fn drop_after(world: &mut PhotonWorld, answers: usize) {
    world.model.disconnect_after = Some(answers);
}

#[given("the client is connected")]
async fn connected(world: &mut PhotonWorld) {
    world.client().connect().await.expect("connect to the loopback server");
    assert!(world.client().is_connected());
}

#[when(regex = r"^the administrator drains the server to (\d+) actors within (\d+) ms polling every (\d+) ms$")]
async fn drain(world: &mut PhotonWorld, threshold: i64, timeout_ms: u64, interval_ms: u64) {
    let options = DrainOptions::new(threshold, Duration::from_millis(timeout_ms))
        .with_update_interval(Duration::from_millis(interval_ms));
    let report = world.client().drain(options).await.expect("drain workflow runs");
    world.drain = Some(report);
}

#[then(regex = r"^the drain succeeds with (\d+) actors after (\d+) polls$")]
fn drained(world: &mut PhotonWorld, actors: i64, polls: usize) {
    let report = world.drain_report();
    assert_eq!(report.outcome, DrainOutcome::Drained { actors, polls });
    assert_eq!(report.log.successes, 1);
}

#[then(regex = r"^the drain times out with (\d+) actors remaining$")]
fn timed_out(world: &mut PhotonWorld, actors: i64) {
    let report = world.drain_report();
    assert!(
        matches!(report.outcome, DrainOutcome::TimedOut { actors: Some(a), polls } if a == actors && polls >= 2),
        "{}",
        report.outcome
    );
    assert_eq!(report.log.successes, 1);
}

#[then(expr = "the drain fails while {string}")]
fn failed(world: &mut PhotonWorld, stage: String) {
    let report = world.drain_report();
    let DrainOutcome::Failed { stage: actual, .. } = &report.outcome else {
        panic!("expected a failure, got {}", report.outcome);
    };
    assert_eq!(actual.to_string(), stage);
    assert_eq!(report.log.successes, 0);
    assert_eq!(report.log.errors.len(), 1);
}

#[then("no drain errors are reported")]
fn no_errors(world: &mut PhotonWorld) {
    let report = world.drain_report();
    assert!(report.log.errors.is_empty(), "{:?}", report.log.errors);
}

#[then(expr = "a drain error mentioning {string} is reported")]
fn error_mentioning(world: &mut PhotonWorld, text: String) {
    let report = world.drain_report();
    assert!(report.log.errors.iter().any(|e| e.contains(&text)), "{:?}", report.log.errors);
}
