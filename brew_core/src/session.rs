//! One play session: owns both state machines, the timer service and the
//! feedback controllers, and routes host signals between them.

use std::time::Duration;

use crate::audio::AudioOrchestrator;
use crate::config::SessionConfig;
use crate::effects::EffectsController;
use crate::error::{ConfigError, InteractionError};
use crate::hint::HintBoard;
use crate::host::{AudioSink, Collaborators};
use crate::interact::{default_interactables, Interactable, ObjectKind};
use crate::npc::NpcController;
use crate::order::OrderMachine;
use crate::runtime::{Runtime, TimerEvent};
use crate::timer::{TimerHandle, TimerService};

pub struct Session {
    config: SessionConfig,
    order: OrderMachine,
    npc: NpcController,
    interactables: Vec<Box<dyn Interactable>>,
    timers: TimerService<TimerEvent>,
    hints: HintBoard,
    audio: AudioOrchestrator,
    effects: EffectsController,
    host: Collaborators,
    events: Vec<String>,
    sessions_started: u32,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        host: Collaborators,
        audio_sink: Box<dyn AudioSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Session {
            order: OrderMachine::new(config.order.clone()),
            npc: NpcController::new(config.npc.clone(), config.dialogue.clone()),
            interactables: default_interactables(),
            timers: TimerService::new(),
            hints: HintBoard::new(),
            audio: AudioOrchestrator::new(config.audio.clone(), audio_sink),
            effects: EffectsController::from_config(&config.effects),
            host,
            events: Vec::new(),
            sessions_started: 0,
            config,
        })
    }

    /// Scene (re)load hook. Puts the order back to `CanTakeCup`, restarts the
    /// ambience and sends the NPC walking again.
    pub fn on_session_start(&mut self) {
        self.sessions_started += 1;
        let count = self.sessions_started;
        let missing = self.config.missing_references();
        log::info!("session {count} starting");

        let (order, npc, _, mut rt) = self.parts();
        rt.log_event(format!("session.start {count}"));
        for reference in missing {
            log::warn!("{reference}");
            rt.log_event(format!("session.missing {reference}"));
        }
        order.reset(&mut rt);
        rt.clear_hint();
        rt.effects.set_active(false);
        rt.audio.start();
        npc.initialize(&mut rt);
    }

    /// Scene unload hook. Nothing scheduled during this session survives it.
    pub fn on_session_end(&mut self) {
        let (_, npc, _, mut rt) = self.parts();
        npc.shutdown(&mut rt);
        rt.clear_hint();
        rt.effects.set_active(false);
        rt.audio.stop_all();
        let dropped = rt.timers.clear();
        rt.log_event(format!("session.end dropped {dropped} timers"));
    }

    /// Player used `kind`. Ignored while the player collaborator has input
    /// disabled.
    pub fn interact(&mut self, kind: ObjectKind) -> Result<(), InteractionError> {
        if !self.host.player.can_interact() {
            return Err(self.blocked(kind.as_str()));
        }
        let (order, _, interactables, mut rt) = self.parts();
        let Some(target) = interactables.iter().find(|object| object.kind() == kind) else {
            log::warn!("no interactable registered for {}", kind.as_str());
            return Err(InteractionError::invalid(kind.as_str(), "unregistered"));
        };
        rt.log_event(format!("interact {}", kind.as_str()));
        target.interact(order, &mut rt)
    }

    /// Throw input. A successful throw always reaches the NPC; whether it
    /// reacts is the NPC's call.
    pub fn throw_pressed(&mut self) -> Result<(), InteractionError> {
        if !self.host.player.can_interact() {
            return Err(self.blocked("throw"));
        }
        let (order, npc, _, mut rt) = self.parts();
        let signal = order.throw_at_target(&mut rt)?;
        if let Err(err) = npc.on_threat(signal, &mut rt) {
            log::info!("threat not taken: {err}");
        }
        Ok(())
    }

    /// Arrival pushed by a movement collaborator that reports it directly
    /// instead of being polled.
    pub fn destination_reached(&mut self) -> Result<(), InteractionError> {
        let (_, npc, _, mut rt) = self.parts();
        npc.on_destination_reached(&mut rt)
    }

    /// Advances the session clock by `dt`: fires due timers in order, then
    /// polls the NPC and eases audio and effects.
    pub fn tick(&mut self, dt: Duration) {
        let deadline = self.timers.now() + dt;
        while let Some((handle, event)) = self.timers.pop_due(deadline) {
            self.dispatch(handle, event);
        }
        self.timers.settle(deadline);

        let (_, npc, _, mut rt) = self.parts();
        npc.update(&mut rt);
        self.audio.update(dt);
        self.effects.update(dt);
    }

    /// Runs `f` against the order machine with a live runtime. Hosts use this
    /// for operations that have no player-facing trigger, such as clearing the
    /// appliance.
    pub fn drive_order<R>(
        &mut self,
        f: impl FnOnce(&mut OrderMachine, &mut Runtime<'_>) -> R,
    ) -> R {
        let (order, _, _, mut rt) = self.parts();
        f(order, &mut rt)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn order(&self) -> &OrderMachine {
        &self.order
    }

    pub fn npc(&self) -> &NpcController {
        &self.npc
    }

    pub fn hints(&self) -> &HintBoard {
        &self.hints
    }

    pub fn audio(&self) -> &AudioOrchestrator {
        &self.audio
    }

    pub fn effects(&self) -> &EffectsController {
        &self.effects
    }

    pub fn timers(&self) -> &TimerService<TimerEvent> {
        &self.timers
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn sessions_started(&self) -> u32 {
        self.sessions_started
    }

    /// Prompt text for `kind`, if such an object is registered.
    pub fn prompt(&self, kind: ObjectKind) -> Option<&str> {
        self.interactables
            .iter()
            .find(|object| object.kind() == kind)
            .map(|object| object.label())
    }

    fn dispatch(&mut self, handle: TimerHandle, event: TimerEvent) {
        log::trace!("timer {} fired: {event}", handle.id());
        let (order, npc, _, mut rt) = self.parts();
        let outcome = match event {
            TimerEvent::BrewComplete(cup) => order.on_brew_complete(cup, &mut rt),
            TimerEvent::HintExpired(serial) => rt.expire_hint(serial),
            TimerEvent::Dialogue(step) => npc.on_dialogue_step(handle, step, &mut rt),
            TimerEvent::ReactionElapsed => npc.on_reaction_elapsed(handle, &mut rt),
            TimerEvent::SceneReset => npc.on_reset_elapsed(handle, &mut rt),
        };
        if let Err(err) = outcome {
            log::debug!("{err}");
            rt.log_event(format!("timer.stale {}", event.label()));
        }
    }

    fn blocked(&mut self, action: &'static str) -> InteractionError {
        self.events.push(format!("input.blocked {action}"));
        InteractionError::invalid(action, "input_disabled")
    }

    fn parts(
        &mut self,
    ) -> (
        &mut OrderMachine,
        &mut NpcController,
        &[Box<dyn Interactable>],
        Runtime<'_>,
    ) {
        let Session {
            config,
            order,
            npc,
            interactables,
            timers,
            hints,
            audio,
            effects,
            host,
            events,
            ..
        } = self;
        let rt = Runtime {
            timers,
            hints,
            audio,
            effects,
            host,
            panels: &config.panels,
            events,
        };
        (order, npc, interactables.as_slice(), rt)
    }
}
