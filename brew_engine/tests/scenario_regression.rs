use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use anyhow::{Context, Result};
use serde::Deserialize;
use tempfile::tempdir;

#[derive(Debug, Deserialize)]
struct RunSummary {
    scenario: String,
    sessions_started: u32,
    order_state: String,
    npc_phase: String,
    launches: Vec<Launch>,
    disable_calls: u32,
    reload_requests: u32,
    catch_distance: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct Launch {
    kind: String,
    impulse: f32,
}

#[derive(Debug, Deserialize)]
struct EventLog {
    events: Vec<EventLogEntry>,
}

#[derive(Debug, Deserialize)]
struct EventLogEntry {
    sequence: usize,
    label: String,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum AudioEvent {
    LayerStart { layer: String, clip: String },
    Cue { clip: String, volume: f32 },
    StopAll,
}

fn run_engine(args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_brew_engine"))
        .args(args)
        .output()
        .context("executing brew_engine")?;
    assert!(
        output.status.success(),
        "brew_engine exited with {:?}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(output)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str().context("temporary path is not valid UTF-8")
}

#[test]
fn full_scenario_ends_in_a_catch() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for logs")?;
    let summary_path = temp_dir.path().join("summary.json");
    let events_path = temp_dir.path().join("events.json");
    let audio_path = temp_dir.path().join("audio.json");

    run_engine(&[
        "--scenario",
        "full",
        "--summary-json",
        path_str(&summary_path)?,
        "--event-log-json",
        path_str(&events_path)?,
        "--audio-log-json",
        path_str(&audio_path)?,
    ])?;

    let summary: RunSummary = read_json(&summary_path)?;
    assert_eq!(summary.scenario, "full");
    assert_eq!(summary.order_state, "can_take_cup");
    assert_eq!(summary.npc_phase, "caught");
    assert_eq!(summary.disable_calls, 1);
    assert_eq!(summary.reload_requests, 1);
    assert_eq!(summary.launches.len(), 1);
    assert_eq!(summary.launches[0].kind, "sealed_cup");
    assert_eq!(summary.launches[0].impulse, 10.0);
    let distance = summary.catch_distance.context("chase distance recorded")?;
    assert!(distance <= 1.2);

    let log: EventLog = read_json(&events_path)?;
    assert_eq!(log.events.first().map(|entry| entry.sequence), Some(1));
    let labels: Vec<&str> = log.events.iter().map(|entry| entry.label.as_str()).collect();
    let position = |needle: &str| {
        labels
            .iter()
            .position(|label| *label == needle)
            .with_context(|| format!("missing event {needle}"))
    };
    let sealed = position("order.state has_lid -> cup_in_machine")?;
    let ready = position("order.state cup_in_machine -> coffee_ready")?;
    let reacting = position("npc.phase idle -> reaction_pending")?;
    let chasing = position("npc.phase reaction_pending -> chasing")?;
    let caught = position("npc.phase chasing -> caught")?;
    assert!(sealed < ready && ready < reacting && reacting < chasing && chasing < caught);

    let audio: Vec<AudioEvent> = read_json(&audio_path)?;
    assert!(audio.contains(&AudioEvent::Cue {
        clip: "coffee_brew".to_string(),
        volume: 0.7,
    }));
    assert!(audio.iter().any(|event| {
        matches!(event, AudioEvent::LayerStart { layer, .. } if layer == "heartbeat")
    }));
    assert_eq!(audio.last(), Some(&AudioEvent::StopAll));
    Ok(())
}

#[test]
fn unsealed_scenario_rejects_the_throw() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for logs")?;
    let summary_path = temp_dir.path().join("summary.json");

    let output = run_engine(&[
        "--scenario",
        "unsealed",
        "--summary-json",
        path_str(&summary_path)?,
    ])?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("throw rejected"), "stderr was: {stderr}");

    let summary: RunSummary = read_json(&summary_path)?;
    assert_eq!(summary.order_state, "has_lid");
    assert_eq!(summary.npc_phase, "idle");
    assert!(summary.launches.is_empty());
    assert_eq!(summary.disable_calls, 0);
    Ok(())
}

#[test]
fn replay_scenario_restarts_the_session() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for logs")?;
    let config_path = temp_dir.path().join("session.json");
    let summary_path = temp_dir.path().join("summary.json");
    fs::write(
        &config_path,
        r#"{
            "order": { "brew_time_secs": 0.5 },
            "dialogue": { "lines": ["Coffee."], "line_pause_secs": 0.1, "end_delay_secs": 0.1 },
            "npc": { "reaction_secs": 0.25, "reset_delay_secs": 0.5 }
        }"#,
    )?;

    let output = run_engine(&[
        "--scenario",
        "replay",
        "--config",
        path_str(&config_path)?,
        "--tick-ms",
        "10",
        "--summary-json",
        path_str(&summary_path)?,
    ])?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Scenario: replay"));

    let summary: RunSummary = read_json(&summary_path)?;
    assert_eq!(summary.sessions_started, 2);
    assert_eq!(summary.order_state, "can_take_cup");
    assert_eq!(summary.npc_phase, "approaching");
    assert_eq!(summary.reload_requests, 1);
    Ok(())
}

#[test]
fn invalid_config_is_reported() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for config")?;
    let config_path = temp_dir.path().join("session.json");
    fs::write(&config_path, r#"{ "npc": { "reaction_secs": -2.0 } }"#)?;

    let output = Command::new(env!("CARGO_BIN_EXE_brew_engine"))
        .args(["--config", path_str(&config_path)?])
        .output()
        .context("executing brew_engine")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("npc.reaction_secs"), "stderr was: {stderr}");
    Ok(())
}

#[test]
fn oversized_durations_are_rejected_before_running() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_brew_engine"))
        .args(["--max-seconds", "1e30"])
        .output()
        .context("executing brew_engine")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--max-seconds"), "stderr was: {stderr}");
    assert!(!stderr.contains("panicked"), "stderr was: {stderr}");

    let temp_dir = tempdir().context("creating temporary directory for config")?;
    let config_path = temp_dir.path().join("session.json");
    fs::write(&config_path, r#"{ "order": { "brew_time_secs": 1e30 } }"#)?;
    let output = Command::new(env!("CARGO_BIN_EXE_brew_engine"))
        .args(["--config", path_str(&config_path)?])
        .output()
        .context("executing brew_engine")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("order.brew_time_secs"), "stderr was: {stderr}");
    assert!(!stderr.contains("panicked"), "stderr was: {stderr}");
    Ok(())
}
