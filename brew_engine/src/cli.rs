use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    about = "Headless host that drives scripted coffee-shop sessions",
    version
)]
pub struct Args {
    /// Optional JSON file overriding the session defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Scripted sequence to play
    #[arg(long, value_enum, default_value_t = Scenario::Full)]
    pub scenario: Scenario,

    /// Simulation step in milliseconds
    #[arg(long, default_value_t = 16)]
    pub tick_ms: u64,

    /// Give up on waits that take longer than this many simulated seconds
    #[arg(long, default_value_t = 60.0)]
    pub max_seconds: f32,

    /// Path to write the session event log as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the audio event log as JSON
    #[arg(long)]
    pub audio_log_json: Option<PathBuf>,

    /// Path to write the run summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Print every event label after the summary
    #[arg(long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Brew and lid the cup without sealing, then try to throw it
    Unsealed,
    /// Wait for the customer, brew and seal, throw, get chased and caught
    Full,
    /// `full`, followed by the scene reload the catch requests
    Replay,
}

impl Scenario {
    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Unsealed => "unsealed",
            Scenario::Full => "full",
            Scenario::Replay => "replay",
        }
    }
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            bail!("--tick-ms must be at least 1");
        }
        if self.max_seconds <= 0.0 || Duration::try_from_secs_f32(self.max_seconds).is_err() {
            bail!(
                "--max-seconds must be a positive number of seconds (got {})",
                self.max_seconds
            );
        }
        Ok(())
    }
}
