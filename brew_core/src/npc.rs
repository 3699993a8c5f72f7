//! The customer: walks in, talks, waits, and chases whoever throws coffee at
//! them.

mod dialogue;

pub use dialogue::{DialogueCursor, DialogueStep, Reveal};

use serde::Serialize;

use crate::config::{DialogueConfig, NpcConfig};
use crate::error::{InteractionError, MissingReference};
use crate::order::ThreatSignal;
use crate::runtime::{Runtime, TimerEvent};
use crate::timer::TimerHandle;

const WALK_FLAG: &str = "isWalking";
const RUN_FLAG: &str = "isRunning";
const CATCH_TRIGGER: &str = "catch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcPhase {
    Approaching,
    InDialogue,
    Idle,
    ReactionPending,
    Chasing,
    Caught,
}

impl NpcPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            NpcPhase::Approaching => "approaching",
            NpcPhase::InDialogue => "in_dialogue",
            NpcPhase::Idle => "idle",
            NpcPhase::ReactionPending => "reaction_pending",
            NpcPhase::Chasing => "chasing",
            NpcPhase::Caught => "caught",
        }
    }

    /// Phases in which a new threat is ignored.
    pub fn is_pursuing(self) -> bool {
        matches!(
            self,
            NpcPhase::ReactionPending | NpcPhase::Chasing | NpcPhase::Caught
        )
    }
}

pub struct NpcController {
    config: NpcConfig,
    dialogue: DialogueConfig,
    phase: NpcPhase,
    cursor: Option<DialogueCursor>,
    dialogue_timer: Option<TimerHandle>,
    reaction_timer: Option<TimerHandle>,
    reset_timer: Option<TimerHandle>,
    chase_start_distance: Option<f32>,
    last_distance: Option<f32>,
    target_missing: bool,
}

impl NpcController {
    pub fn new(config: NpcConfig, dialogue: DialogueConfig) -> Self {
        NpcController {
            config,
            dialogue,
            phase: NpcPhase::Approaching,
            cursor: None,
            dialogue_timer: None,
            reaction_timer: None,
            reset_timer: None,
            chase_start_distance: None,
            last_distance: None,
            target_missing: false,
        }
    }

    pub fn phase(&self) -> NpcPhase {
        self.phase
    }

    pub fn cursor(&self) -> Option<&DialogueCursor> {
        self.cursor.as_ref()
    }

    pub fn last_distance(&self) -> Option<f32> {
        self.last_distance
    }

    pub fn config(&self) -> &NpcConfig {
        &self.config
    }

    /// Starts a fresh approach. Runs on every session start.
    pub fn initialize(&mut self, rt: &mut Runtime<'_>) {
        self.cancel_timers(rt);
        self.cursor = None;
        self.chase_start_distance = None;
        self.last_distance = None;
        self.phase = NpcPhase::Approaching;
        rt.host.presentation.hide_panel(&rt.panels.dialogue);

        self.target_missing = rt.host.target.position().is_none();
        if self.target_missing {
            warn_missing(MissingReference::Target, rt);
        }

        rt.host.movement.set_speed(self.config.walk_speed);
        match self.config.goal_point() {
            Some(goal) => {
                rt.host.movement.set_destination(goal);
                rt.host.animation.set_flag(WALK_FLAG, true);
                rt.log_event(format!(
                    "npc.approach {:.2},{:.2},{:.2}",
                    goal.x, goal.y, goal.z
                ));
            }
            None => {
                // Without a goal there is nothing to walk to; talk in place.
                warn_missing(MissingReference::NpcGoal, rt);
                self.begin_dialogue(rt);
            }
        }
    }

    /// Arrival signal from the movement collaborator.
    pub fn on_destination_reached(&mut self, rt: &mut Runtime<'_>) -> Result<(), InteractionError> {
        if self.phase != NpcPhase::Approaching {
            return Err(InteractionError::invalid(
                "destination_reached",
                self.phase.as_str(),
            ));
        }
        rt.host.animation.set_flag(WALK_FLAG, false);
        rt.log_event("npc.arrived".to_string());
        self.begin_dialogue(rt);
        Ok(())
    }

    pub fn on_dialogue_step(
        &mut self,
        handle: TimerHandle,
        step: DialogueStep,
        rt: &mut Runtime<'_>,
    ) -> Result<(), InteractionError> {
        if self.phase != NpcPhase::InDialogue || self.dialogue_timer != Some(handle) {
            return Err(InteractionError::StaleCallback("dialogue"));
        }
        self.dialogue_timer = None;
        match step {
            DialogueStep::Reveal => self.reveal(rt),
            DialogueStep::NextLine => {
                if let Some(cursor) = self.cursor.as_mut() {
                    cursor.advance_line();
                }
                self.start_line(rt);
            }
            DialogueStep::Finish => self.finish_dialogue(rt),
        }
        Ok(())
    }

    pub fn on_threat(
        &mut self,
        signal: ThreatSignal,
        rt: &mut Runtime<'_>,
    ) -> Result<(), InteractionError> {
        if self.phase.is_pursuing() {
            rt.log_event(format!("npc.threat ignored {}", self.phase.as_str()));
            return Err(InteractionError::invalid("threat", self.phase.as_str()));
        }
        if self.phase == NpcPhase::InDialogue {
            self.interrupt_dialogue(rt);
        }
        rt.log_event(format!("npc.threat {}", signal.projectile.as_str()));

        rt.audio.set_chasing(true);
        rt.audio.set_intensity(0.5);
        rt.audio.play_cue(&self.config.chase_cue);
        rt.effects.set_active(true);
        rt.timers.reschedule(
            &mut self.reaction_timer,
            self.config.reaction_delay(),
            TimerEvent::ReactionElapsed,
        );
        self.enter(NpcPhase::ReactionPending, rt);
        Ok(())
    }

    pub fn on_reaction_elapsed(
        &mut self,
        handle: TimerHandle,
        rt: &mut Runtime<'_>,
    ) -> Result<(), InteractionError> {
        if self.phase != NpcPhase::ReactionPending || self.reaction_timer != Some(handle) {
            return Err(InteractionError::StaleCallback("reaction_elapsed"));
        }
        self.reaction_timer = None;
        rt.host.movement.set_speed(self.config.chase_speed);
        rt.host.animation.set_flag(WALK_FLAG, false);
        rt.host.animation.set_flag(RUN_FLAG, true);
        self.chase_start_distance = None;
        self.enter(NpcPhase::Chasing, rt);
        Ok(())
    }

    pub fn on_reset_elapsed(
        &mut self,
        handle: TimerHandle,
        rt: &mut Runtime<'_>,
    ) -> Result<(), InteractionError> {
        if self.phase != NpcPhase::Caught || self.reset_timer != Some(handle) {
            return Err(InteractionError::StaleCallback("scene_reset"));
        }
        self.reset_timer = None;
        rt.host.scene.request_reload();
        rt.log_event("npc.reset requested".to_string());
        Ok(())
    }

    /// Per-tick polling: arrival while approaching, retarget and capture
    /// check while chasing.
    pub fn update(&mut self, rt: &mut Runtime<'_>) {
        match self.phase {
            NpcPhase::Approaching => {
                if self.config.goal.is_some() && rt.host.movement.has_arrived() {
                    let _ = self.on_destination_reached(rt);
                }
            }
            NpcPhase::Chasing => self.pursue(rt),
            _ => {}
        }
    }

    /// Drops pending timers and quiets the chase signals. Runs on session end.
    pub fn shutdown(&mut self, rt: &mut Runtime<'_>) {
        self.cancel_timers(rt);
        if self.phase == NpcPhase::InDialogue {
            rt.host.presentation.hide_panel(&rt.panels.dialogue);
        }
        self.cursor = None;
        rt.effects.set_active(false);
        rt.audio.set_chasing(false);
    }

    fn pursue(&mut self, rt: &mut Runtime<'_>) {
        let Some(target) = rt.host.target.position() else {
            if !self.target_missing {
                self.target_missing = true;
                warn_missing(MissingReference::Target, rt);
            }
            return;
        };
        self.target_missing = false;
        rt.host.movement.set_destination(target);
        let distance = rt.host.movement.position().distance(target);
        self.last_distance = Some(distance);

        let start = *self.chase_start_distance.get_or_insert(distance);
        let span = start - self.config.catch_distance;
        let progress = if span > f32::EPSILON {
            1.0 - ((distance - self.config.catch_distance) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        rt.audio.set_intensity(0.5 + 0.5 * progress);

        if distance <= self.config.catch_distance {
            self.catch(distance, rt);
        }
    }

    fn catch(&mut self, distance: f32, rt: &mut Runtime<'_>) {
        rt.host.movement.stop();
        rt.host.animation.set_flag(RUN_FLAG, false);
        rt.host.animation.trigger(CATCH_TRIGGER);
        rt.host.player.disable();
        rt.host.presentation.show_panel(&rt.panels.caught);
        rt.audio.stop_all();
        rt.effects.set_active(false);
        rt.log_event(format!("npc.catch distance {distance:.2}"));
        rt.timers.reschedule(
            &mut self.reset_timer,
            self.config.reset_delay(),
            TimerEvent::SceneReset,
        );
        self.enter(NpcPhase::Caught, rt);
    }

    fn begin_dialogue(&mut self, rt: &mut Runtime<'_>) {
        self.enter(NpcPhase::InDialogue, rt);
        if self.dialogue.lines.is_empty() {
            warn_missing(MissingReference::DialogueLines, rt);
        }
        rt.host.presentation.show_panel(&rt.panels.dialogue);
        rt.host.presentation.play_one_shot(&self.config.dialogue_cue);
        self.cursor = Some(DialogueCursor::new());
        self.start_line(rt);
    }

    fn start_line(&mut self, rt: &mut Runtime<'_>) {
        rt.host.presentation.set_text(&rt.panels.dialogue, "");
        if let Some(cursor) = self.cursor.as_ref() {
            rt.log_event(format!("npc.dialogue line {}", cursor.line() + 1));
        }
        self.reveal(rt);
    }

    fn reveal(&mut self, rt: &mut Runtime<'_>) {
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };
        let (step, delay) = match cursor.reveal_next(&self.dialogue.lines) {
            Reveal::Partial(text) => {
                rt.host.presentation.set_text(&rt.panels.dialogue, &text);
                (DialogueStep::Reveal, self.dialogue.char_delay())
            }
            Reveal::LineComplete { last_line: false } => {
                (DialogueStep::NextLine, self.dialogue.line_pause())
            }
            Reveal::LineComplete { last_line: true } => {
                (DialogueStep::Finish, self.dialogue.end_delay())
            }
        };
        rt.timers
            .reschedule(&mut self.dialogue_timer, delay, TimerEvent::Dialogue(step));
    }

    fn finish_dialogue(&mut self, rt: &mut Runtime<'_>) {
        self.cursor = None;
        rt.host.presentation.hide_panel(&rt.panels.dialogue);
        rt.log_event("npc.dialogue done".to_string());
        self.enter(NpcPhase::Idle, rt);
        rt.show_hint(&self.config.idle_hint);
    }

    fn interrupt_dialogue(&mut self, rt: &mut Runtime<'_>) {
        rt.timers.cancel_slot(&mut self.dialogue_timer);
        self.cursor = None;
        rt.host.presentation.hide_panel(&rt.panels.dialogue);
        rt.log_event("npc.dialogue interrupted".to_string());
    }

    fn cancel_timers(&mut self, rt: &mut Runtime<'_>) {
        rt.timers.cancel_slot(&mut self.dialogue_timer);
        rt.timers.cancel_slot(&mut self.reaction_timer);
        rt.timers.cancel_slot(&mut self.reset_timer);
    }

    fn enter(&mut self, next: NpcPhase, rt: &mut Runtime<'_>) {
        let previous = self.phase;
        self.phase = next;
        rt.log_event(format!(
            "npc.phase {} -> {}",
            previous.as_str(),
            next.as_str()
        ));
    }
}

fn warn_missing(missing: MissingReference, rt: &mut Runtime<'_>) {
    log::warn!("{missing}; dependent behaviour disabled");
    rt.log_event(format!("npc.missing {missing}"));
}
