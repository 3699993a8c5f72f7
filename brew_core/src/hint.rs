use std::time::Duration;

use crate::config::HintConfig;
use crate::error::InteractionError;
use crate::host::Presentation;
use crate::runtime::TimerEvent;
use crate::timer::{TimerHandle, TimerService};

#[derive(Debug, Clone, PartialEq)]
pub struct HintRequest {
    pub message: String,
    pub duration: Duration,
}

impl From<&HintConfig> for HintRequest {
    fn from(config: &HintConfig) -> Self {
        HintRequest {
            message: config.message.clone(),
            duration: config.duration(),
        }
    }
}

#[derive(Debug)]
struct ActiveHint {
    serial: u64,
    message: String,
    expiry: TimerHandle,
}

/// Owns the single on-screen hint. A new request replaces the text and
/// cancels the previous expiry before scheduling its own.
#[derive(Debug, Default)]
pub struct HintBoard {
    active: Option<ActiveHint>,
    serial: u64,
}

impl HintBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(
        &mut self,
        request: HintRequest,
        panel: &str,
        timers: &mut TimerService<TimerEvent>,
        presentation: &mut dyn Presentation,
    ) -> u64 {
        if let Some(previous) = self.active.take() {
            timers.cancel(previous.expiry);
        }
        self.serial += 1;
        let serial = self.serial;
        presentation.set_text(panel, &request.message);
        presentation.show_panel(panel);
        let expiry = timers.schedule(request.duration, TimerEvent::HintExpired(serial));
        self.active = Some(ActiveHint {
            serial,
            message: request.message,
            expiry,
        });
        serial
    }

    /// Hides the panel if `serial` is still the active request.
    pub fn expire(
        &mut self,
        serial: u64,
        panel: &str,
        presentation: &mut dyn Presentation,
    ) -> Result<(), InteractionError> {
        match self.active.as_ref() {
            Some(active) if active.serial == serial => {
                self.active = None;
                presentation.hide_panel(panel);
                Ok(())
            }
            _ => Err(InteractionError::StaleCallback("hint_expired")),
        }
    }

    pub fn clear(
        &mut self,
        panel: &str,
        timers: &mut TimerService<TimerEvent>,
        presentation: &mut dyn Presentation,
    ) -> bool {
        match self.active.take() {
            Some(active) => {
                timers.cancel(active.expiry);
                presentation.hide_panel(panel);
                true
            }
            None => false,
        }
    }

    pub fn active_message(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.message.as_str())
    }

    pub fn active_serial(&self) -> Option<u64> {
        self.active.as_ref().map(|active| active.serial)
    }

    pub fn expiry(&self) -> Option<TimerHandle> {
        self.active.as_ref().map(|active| active.expiry)
    }
}
