//! Beverage preparation: cup, brew, lid, seal, throw.

use glam::Vec3;
use serde::Serialize;

use crate::config::OrderConfig;
use crate::error::InteractionError;
use crate::host::{Anchor, RepresentationKind};
use crate::runtime::{Runtime, TimerEvent};
use crate::slots::{ApplianceSlot, Cup, CupId, CupMint, HeldItemSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    CanTakeCup,
    HasEmptyCup,
    CupInMachine,
    HasFilledCup,
    HasLid,
    CoffeeReady,
}

impl OrderState {
    pub const ALL: [OrderState; 6] = [
        OrderState::CanTakeCup,
        OrderState::HasEmptyCup,
        OrderState::CupInMachine,
        OrderState::HasFilledCup,
        OrderState::HasLid,
        OrderState::CoffeeReady,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderState::CanTakeCup => "can_take_cup",
            OrderState::HasEmptyCup => "has_empty_cup",
            OrderState::CupInMachine => "cup_in_machine",
            OrderState::HasFilledCup => "has_filled_cup",
            OrderState::HasLid => "has_lid",
            OrderState::CoffeeReady => "coffee_ready",
        }
    }

    fn allows_cup_pickup(self) -> bool {
        matches!(self, OrderState::CanTakeCup | OrderState::HasLid)
    }

    fn allows_lid_pickup(self) -> bool {
        matches!(
            self,
            OrderState::CanTakeCup | OrderState::HasFilledCup | OrderState::CupInMachine
        )
    }
}

/// Edge-triggered notice that something was thrown at the NPC. Consumed once
/// by whoever receives it.
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub struct ThreatSignal {
    pub projectile: RepresentationKind,
}

/// What happened on the most recent appliance interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplianceAction {
    Sealed,
    StartedBrewing,
    Collected { sealed: bool },
}

pub struct OrderMachine {
    config: OrderConfig,
    state: OrderState,
    held: HeldItemSlot,
    appliance: ApplianceSlot,
    mint: CupMint,
}

impl OrderMachine {
    pub fn new(config: OrderConfig) -> Self {
        OrderMachine {
            config,
            state: OrderState::CanTakeCup,
            held: HeldItemSlot::default(),
            appliance: ApplianceSlot::default(),
            mint: CupMint::default(),
        }
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn held(&self) -> &HeldItemSlot {
        &self.held
    }

    pub fn appliance(&self) -> &ApplianceSlot {
        &self.appliance
    }

    pub fn config(&self) -> &OrderConfig {
        &self.config
    }

    pub fn take_cup_from_stack(&mut self, rt: &mut Runtime<'_>) -> Result<(), InteractionError> {
        let state = self.state;
        if !state.allows_cup_pickup() {
            return Err(self.reject("take_cup", rt));
        }
        let visuals = rt.host.visuals.as_mut();
        self.held.discard_lid(visuals);
        let cup = self
            .mint
            .spawn(RepresentationKind::EmptyCup, Anchor::Hand, visuals);
        let id = cup.id();
        self.held.hold_new(cup, visuals);
        rt.log_event(format!("order.hand take {id}"));
        self.transition(OrderState::HasEmptyCup, rt);
        Ok(())
    }

    /// The hand shows only the lid afterwards; a filled cup that was held is
    /// discarded.
    pub fn take_lid(&mut self, rt: &mut Runtime<'_>) -> Result<(), InteractionError> {
        let state = self.state;
        if !state.allows_lid_pickup() {
            return Err(self.reject("take_lid", rt));
        }
        let visuals = rt.host.visuals.as_mut();
        let discarded = self.held.take_cup();
        self.held.put_lid(visuals);
        if let Some(cup) = discarded {
            let id = cup.id();
            cup.destroy(visuals);
            rt.log_event(format!("order.hand discard {id}"));
        }
        rt.log_event("order.hand take lid".to_string());
        self.transition(OrderState::HasLid, rt);
        Ok(())
    }

    pub fn interact_with_appliance(
        &mut self,
        rt: &mut Runtime<'_>,
    ) -> Result<ApplianceAction, InteractionError> {
        let state = self.state;
        if self.appliance.is_brewing() {
            rt.log_event("order.appliance still brewing".to_string());
            return Err(InteractionError::invalid("use_appliance", "brewing"));
        }

        if state == OrderState::HasLid
            && self.appliance.cup().is_some()
            && !self.appliance.is_sealed()
        {
            self.seal(rt);
            return Ok(ApplianceAction::Sealed);
        }

        if state == OrderState::HasEmptyCup {
            self.begin_brew(rt);
            return Ok(ApplianceAction::StartedBrewing);
        }

        if let Some((cup, sealed)) = self.appliance.unload() {
            self.collect(cup, sealed, rt);
            return Ok(ApplianceAction::Collected { sealed });
        }

        Err(self.reject("use_appliance", rt))
    }

    /// Timer callback. Does nothing unless the appliance still holds the cup
    /// that started brewing.
    pub fn on_brew_complete(
        &mut self,
        cup: CupId,
        rt: &mut Runtime<'_>,
    ) -> Result<(), InteractionError> {
        if !self.appliance.is_brewing() || !self.appliance.holds(cup) {
            return Err(InteractionError::StaleCallback("brew_complete"));
        }
        self.appliance.finish_brewing();
        if let Some(placed) = self.appliance.cup_mut() {
            placed.reskin(
                RepresentationKind::FilledCup,
                Anchor::Appliance,
                rt.host.visuals.as_mut(),
            );
        }
        rt.log_event(format!("order.appliance brewed {cup}"));
        Ok(())
    }

    pub fn throw_at_target(
        &mut self,
        rt: &mut Runtime<'_>,
    ) -> Result<ThreatSignal, InteractionError> {
        if self.state != OrderState::CoffeeReady {
            return Err(self.reject("throw", rt));
        }
        let Some(cup) = self.held.take_cup() else {
            // CoffeeReady always pairs with a held sealed cup.
            log::warn!("coffee marked ready but the hand is empty");
            return Err(self.reject("throw", rt));
        };

        let id = cup.id();
        let projectile = cup.kind();
        cup.destroy(rt.host.visuals.as_mut());
        let direction = rt.host.player.forward() + Vec3::Y * self.config.throw_lift;
        rt.host.physics.launch(
            projectile,
            direction,
            self.config.throw_force,
            self.config.projectile_lifetime_secs,
        );
        rt.log_event(format!(
            "order.throw {id} force {:.1}",
            self.config.throw_force
        ));
        self.clear_slots(rt);
        self.transition(OrderState::CanTakeCup, rt);
        Ok(ThreatSignal { projectile })
    }

    /// Unconditionally returns to `CanTakeCup` with both slots empty.
    pub fn reset(&mut self, rt: &mut Runtime<'_>) {
        self.clear_slots(rt);
        if self.state != OrderState::CanTakeCup {
            self.transition(OrderState::CanTakeCup, rt);
        }
        rt.log_event("order.reset".to_string());
    }

    /// Empties the appliance and cancels any pending brew. Returns whether a
    /// cup was removed.
    pub fn clear_appliance(&mut self, rt: &mut Runtime<'_>) -> bool {
        rt.timers.cancel_slot(&mut self.appliance.brew_timer);
        match self.appliance.unload() {
            Some((cup, _)) => {
                let id = cup.id();
                cup.destroy(rt.host.visuals.as_mut());
                rt.log_event(format!("order.appliance clear {id}"));
                true
            }
            None => false,
        }
    }

    /// Whether the slots match what the current state says should be shown.
    pub fn hand_matches_state(&self) -> bool {
        let cup = self.held.cup().map(Cup::kind);
        let lid = self.held.has_lid();
        let exclusive = match (self.held.cup(), self.appliance.cup()) {
            (Some(held), Some(placed)) => held.id() != placed.id(),
            _ => true,
        };
        let shown = match self.state {
            OrderState::CanTakeCup | OrderState::CupInMachine => cup.is_none() && !lid,
            OrderState::HasEmptyCup => cup == Some(RepresentationKind::EmptyCup) && !lid,
            OrderState::HasFilledCup => cup == Some(RepresentationKind::FilledCup) && !lid,
            OrderState::HasLid => cup.is_none() && lid,
            OrderState::CoffeeReady => cup == Some(RepresentationKind::SealedCup) && !lid,
        };
        exclusive && shown
    }

    fn seal(&mut self, rt: &mut Runtime<'_>) {
        let visuals = rt.host.visuals.as_mut();
        self.held.discard_lid(visuals);
        if let Some(placed) = self.appliance.cup_mut() {
            placed.reskin(RepresentationKind::SealedCup, Anchor::Appliance, visuals);
            let id = placed.id();
            rt.log_event(format!("order.appliance seal {id}"));
        }
        self.appliance.mark_sealed();
        self.transition(OrderState::CupInMachine, rt);
        rt.show_hint(&self.config.seal_hint);
    }

    fn begin_brew(&mut self, rt: &mut Runtime<'_>) {
        if let Some((stale, _)) = self.appliance.unload() {
            let id = stale.id();
            stale.destroy(rt.host.visuals.as_mut());
            rt.log_event(format!("order.appliance discard {id}"));
        }
        let Some(cup) = self.held.take_cup() else {
            return;
        };
        let id = cup.id();
        self.appliance.load(cup, rt.host.visuals.as_mut());
        rt.timers.reschedule(
            &mut self.appliance.brew_timer,
            self.config.brew_time(),
            TimerEvent::BrewComplete(id),
        );
        rt.audio.play_cue(&self.config.brew_cue);
        rt.log_event(format!(
            "order.appliance brew {id} {:.2}s",
            self.config.brew_time_secs
        ));
        self.transition(OrderState::CupInMachine, rt);
    }

    fn collect(&mut self, cup: Cup, sealed: bool, rt: &mut Runtime<'_>) {
        let id = cup.id();
        let visuals = rt.host.visuals.as_mut();
        self.held.discard_lid(visuals);
        self.held.put_cup(cup, visuals);
        rt.log_event(format!("order.appliance collect {id} sealed={sealed}"));
        let next = if sealed {
            OrderState::CoffeeReady
        } else {
            OrderState::HasFilledCup
        };
        self.transition(next, rt);
    }

    fn clear_slots(&mut self, rt: &mut Runtime<'_>) {
        self.held.clear(rt.host.visuals.as_mut());
        self.clear_appliance(rt);
    }

    fn transition(&mut self, next: OrderState, rt: &mut Runtime<'_>) {
        let previous = self.state;
        self.state = next;
        rt.log_event(format!(
            "order.state {} -> {}",
            previous.as_str(),
            next.as_str()
        ));
    }

    fn reject(&self, action: &'static str, rt: &mut Runtime<'_>) -> InteractionError {
        let state = self.state.as_str();
        log::warn!("{action} rejected while {state}");
        rt.log_event(format!("order.reject {action} {state}"));
        InteractionError::invalid(action, state)
    }
}
