use std::fmt;

use crate::audio::AudioOrchestrator;
use crate::config::{HintConfig, PanelConfig};
use crate::effects::EffectsController;
use crate::error::InteractionError;
use crate::hint::{HintBoard, HintRequest};
use crate::host::Collaborators;
use crate::npc::DialogueStep;
use crate::slots::CupId;
use crate::timer::TimerService;

/// Payloads carried by the session's timer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    BrewComplete(CupId),
    HintExpired(u64),
    Dialogue(DialogueStep),
    ReactionElapsed,
    SceneReset,
}

impl TimerEvent {
    pub fn label(&self) -> &'static str {
        match self {
            TimerEvent::BrewComplete(_) => "brew_complete",
            TimerEvent::HintExpired(_) => "hint_expired",
            TimerEvent::Dialogue(DialogueStep::Reveal) => "dialogue_reveal",
            TimerEvent::Dialogue(DialogueStep::NextLine) => "dialogue_next_line",
            TimerEvent::Dialogue(DialogueStep::Finish) => "dialogue_finish",
            TimerEvent::ReactionElapsed => "reaction_elapsed",
            TimerEvent::SceneReset => "scene_reset",
        }
    }
}

impl fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerEvent::BrewComplete(cup) => write!(f, "{} {cup}", self.label()),
            TimerEvent::HintExpired(serial) => write!(f, "{} #{serial}", self.label()),
            _ => f.write_str(self.label()),
        }
    }
}

/// Borrowed view over everything a state machine may touch while handling one
/// operation. Built fresh by the session for every call.
pub struct Runtime<'a> {
    pub timers: &'a mut TimerService<TimerEvent>,
    pub hints: &'a mut HintBoard,
    pub audio: &'a mut AudioOrchestrator,
    pub effects: &'a mut EffectsController,
    pub host: &'a mut Collaborators,
    pub panels: &'a PanelConfig,
    pub(crate) events: &'a mut Vec<String>,
}

impl<'a> Runtime<'a> {
    pub fn log_event(&mut self, message: String) {
        log::debug!("{message}");
        self.events.push(message);
    }

    pub fn show_hint(&mut self, hint: &HintConfig) {
        let serial = self.hints.request(
            HintRequest::from(hint),
            &self.panels.hint,
            self.timers,
            self.host.presentation.as_mut(),
        );
        self.log_event(format!("hint.show #{serial} {}", hint.message));
    }

    pub fn expire_hint(&mut self, serial: u64) -> Result<(), InteractionError> {
        self.hints
            .expire(serial, &self.panels.hint, self.host.presentation.as_mut())?;
        self.log_event(format!("hint.hide #{serial}"));
        Ok(())
    }

    pub fn clear_hint(&mut self) {
        if self
            .hints
            .clear(&self.panels.hint, self.timers, self.host.presentation.as_mut())
        {
            self.log_event("hint.clear".to_string());
        }
    }
}
