use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use brew_core::effects::EffectorState;
use brew_core::host::LayerMix;
use brew_core::sim::Launch;
use brew_core::{NpcPhase, ObjectKind, OrderState, Session, SessionConfig, SimulatedHost};
use glam::Vec3;
use serde::Serialize;

use crate::audio_bridge::RecordingAudioSink;
use crate::cli::{Args, Scenario};

#[derive(Debug, Serialize)]
struct RunSummary {
    scenario: &'static str,
    sessions_started: u32,
    order_state: OrderState,
    npc_phase: NpcPhase,
    simulated_secs: f32,
    frames: u64,
    launches: Vec<Launch>,
    disable_calls: u32,
    reload_requests: u32,
    catch_distance: Option<f32>,
    final_mix: Option<LayerMix>,
    effects: Vec<(String, EffectorState)>,
    event_count: usize,
}

#[derive(Debug, Serialize)]
struct EventLog<'a> {
    events: Vec<EventLogEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct EventLogEntry<'a> {
    sequence: usize,
    label: &'a str,
}

/// Steps the simulated host and the session in lockstep.
struct Driver {
    session: Session,
    host: SimulatedHost,
    tick: Duration,
    limit: Duration,
    frames: u64,
}

impl Driver {
    fn step(&mut self) {
        self.host.step(self.tick);
        self.session.tick(self.tick);
        self.frames += 1;
    }

    fn wait_until(
        &mut self,
        label: &str,
        done: impl Fn(&Session, &SimulatedHost) -> bool,
    ) -> Result<()> {
        let started = self.session.now();
        while !done(&self.session, &self.host) {
            if self.session.now() - started > self.limit {
                bail!(
                    "timed out after {:.1}s waiting for {label}",
                    self.limit.as_secs_f32()
                );
            }
            self.step();
        }
        log::info!("{label} at {:.2}s", self.session.now().as_secs_f32());
        Ok(())
    }

    fn interact(&mut self, kind: ObjectKind) -> Result<()> {
        if let Some(prompt) = self.session.prompt(kind) {
            log::info!("{prompt}");
        }
        self.session
            .interact(kind)
            .with_context(|| format!("interacting with {}", kind.as_str()))
    }

    fn brew(&mut self) -> Result<()> {
        self.interact(ObjectKind::CupStack)?;
        self.interact(ObjectKind::CoffeeMachine)?;
        self.wait_until("coffee brewed", |session, _| {
            !session.order().appliance().is_brewing()
        })
    }

    fn customer_waiting(&mut self) -> Result<()> {
        self.wait_until("customer waiting", |session, _| {
            session.npc().phase() == NpcPhase::Idle
        })
    }

    fn play_unsealed(&mut self) -> Result<()> {
        self.customer_waiting()?;
        self.brew()?;
        self.interact(ObjectKind::CoffeeMachine)?;
        self.interact(ObjectKind::LidStack)?;
        match self.session.throw_pressed() {
            Ok(()) => bail!("an unsealed cup was thrown"),
            Err(err) => eprintln!("[brew_engine] info: throw rejected: {err}"),
        }
        Ok(())
    }

    fn play_full(&mut self) -> Result<()> {
        self.customer_waiting()?;
        self.brew()?;
        self.interact(ObjectKind::LidStack)?;
        self.interact(ObjectKind::CoffeeMachine)?;
        self.interact(ObjectKind::CoffeeMachine)?;
        if self.session.order().state() != OrderState::CoffeeReady {
            bail!(
                "expected a sealed coffee, order is {}",
                self.session.order().state().as_str()
            );
        }
        self.session
            .throw_pressed()
            .context("throwing the sealed coffee")?;

        // Flee at walking pace; the chase is faster.
        let flee = Vec3::Z * self.session.config().npc.walk_speed;
        self.host.set_player_velocity(flee);
        self.wait_until("caught", |session, _| {
            session.npc().phase() == NpcPhase::Caught
        })?;
        self.wait_until("reload requested", |_, host| {
            host.state().reload_requests > 0
        })
    }

    fn reload(&mut self) -> Result<()> {
        self.session.on_session_end();
        self.host.reload();
        self.session.on_session_start();
        let order = self.session.order().state();
        let phase = self.session.npc().phase();
        if order != OrderState::CanTakeCup || phase != NpcPhase::Approaching {
            bail!(
                "reload left order {} and npc {}",
                order.as_str(),
                phase.as_str()
            );
        }
        Ok(())
    }

    fn summary(&self, scenario: Scenario, final_mix: Option<LayerMix>) -> RunSummary {
        let host = self.host.state();
        RunSummary {
            scenario: scenario.as_str(),
            sessions_started: self.session.sessions_started(),
            order_state: self.session.order().state(),
            npc_phase: self.session.npc().phase(),
            simulated_secs: self.session.now().as_secs_f32(),
            frames: self.frames,
            launches: host.launches.clone(),
            disable_calls: host.disable_calls,
            reload_requests: host.reload_requests,
            catch_distance: self.session.npc().last_distance(),
            final_mix,
            effects: self.session.effects().states(),
            event_count: self.session.events().len(),
        }
    }
}

pub fn execute(args: Args) -> Result<()> {
    args.validate()?;
    let Args {
        config,
        scenario,
        tick_ms,
        max_seconds,
        event_log_json,
        audio_log_json,
        summary_json,
        verbose,
    } = args;

    let config = SessionConfig::from_json_file(config.as_deref())?;
    if let Some(path) = audio_log_json.as_ref() {
        eprintln!(
            "[brew_engine] info: capturing audio events to {}",
            path.display()
        );
    }

    let limit = Duration::try_from_secs_f32(max_seconds).context("converting --max-seconds")?;
    let host = SimulatedHost::new(&config);
    let (sink, recording) = RecordingAudioSink::wrap(host.audio_sink());
    let session = Session::new(config, host.collaborators(), Box::new(sink))
        .context("building session")?;
    let mut driver = Driver {
        session,
        host,
        tick: Duration::from_millis(tick_ms),
        limit,
        frames: 0,
    };

    driver.session.on_session_start();
    match scenario {
        Scenario::Unsealed => driver.play_unsealed()?,
        Scenario::Full => driver.play_full()?,
        Scenario::Replay => {
            driver.play_full()?;
            driver.reload()?;
        }
    }

    let summary = driver.summary(scenario, recording.last_mix());
    println!("Scenario: {}", summary.scenario);
    println!(
        "Order: {} | npc: {} | sessions: {}",
        summary.order_state.as_str(),
        summary.npc_phase.as_str(),
        summary.sessions_started
    );
    println!(
        "Simulated {:.2}s over {} frames, {} events",
        summary.simulated_secs, summary.frames, summary.event_count
    );
    if let Some(distance) = summary.catch_distance {
        println!("Last chase distance: {distance:.2}");
    }
    if verbose {
        for event in driver.session.events() {
            println!("  {event}");
        }
    }

    if let Some(path) = summary_json.as_ref() {
        write_json(path, &summary, "run summary")?;
    }

    if let Some(path) = event_log_json.as_ref() {
        let log = EventLog {
            events: driver
                .session
                .events()
                .iter()
                .enumerate()
                .map(|(sequence, label)| EventLogEntry {
                    sequence: sequence + 1,
                    label,
                })
                .collect(),
        };
        write_json(path, &log, "session event log")?;
    }

    if let Some(path) = audio_log_json.as_ref() {
        write_json(path, &recording.events(), "audio event log")?;
    }

    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<()> {
    let json =
        serde_json::to_string_pretty(value).with_context(|| format!("serializing {what} to JSON"))?;
    fs::write(path, &json).with_context(|| format!("writing {what} to {}", path.display()))?;
    println!("Saved {what} to {}", path.display());
    Ok(())
}
