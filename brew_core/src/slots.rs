//! Single-owner holders for the hand and the brewing appliance.
//!
//! A [`Cup`] is neither `Clone` nor `Copy`: moving it between slots goes
//! through `Option::take`, so the same cup can never be referenced by both
//! slots at once.

use std::fmt;

use serde::Serialize;

use crate::host::{Anchor, RepresentationKind, VisualHandle, Visuals};
use crate::timer::TimerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CupId(u32);

impl fmt::Display for CupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cup#{}", self.0)
    }
}

#[derive(Debug)]
pub struct Cup {
    id: CupId,
    kind: RepresentationKind,
    visual: Option<VisualHandle>,
}

impl Cup {
    pub fn id(&self) -> CupId {
        self.id
    }

    pub fn kind(&self) -> RepresentationKind {
        self.kind
    }

    pub fn visual(&self) -> Option<VisualHandle> {
        self.visual
    }

    /// Swaps the attached representation in place; the cup keeps its id.
    pub(crate) fn reskin(
        &mut self,
        kind: RepresentationKind,
        anchor: Anchor,
        visuals: &mut dyn Visuals,
    ) {
        if let Some(handle) = self.visual.take() {
            visuals.detach(handle);
        }
        self.kind = kind;
        self.visual = attach(visuals, kind, anchor);
    }

    /// Detaches from the current anchor and re-attaches at `anchor`.
    pub(crate) fn move_to(&mut self, anchor: Anchor, visuals: &mut dyn Visuals) {
        if let Some(handle) = self.visual.take() {
            visuals.detach(handle);
        }
        self.visual = attach(visuals, self.kind, anchor);
    }

    pub(crate) fn destroy(mut self, visuals: &mut dyn Visuals) {
        if let Some(handle) = self.visual.take() {
            visuals.detach(handle);
        }
    }
}

/// Issues cup ids for one session.
#[derive(Debug, Default)]
pub struct CupMint {
    next: u32,
}

impl CupMint {
    pub(crate) fn spawn(
        &mut self,
        kind: RepresentationKind,
        anchor: Anchor,
        visuals: &mut dyn Visuals,
    ) -> Cup {
        self.next += 1;
        Cup {
            id: CupId(self.next),
            kind,
            visual: attach(visuals, kind, anchor),
        }
    }
}

fn attach(
    visuals: &mut dyn Visuals,
    kind: RepresentationKind,
    anchor: Anchor,
) -> Option<VisualHandle> {
    let handle = visuals.attach(kind, anchor);
    if handle.is_none() {
        log::warn!(
            "no {} representation available for the {} anchor",
            kind.as_str(),
            anchor.as_str()
        );
    }
    handle
}

/// What the actor's hand currently shows: at most one cup plus a secondary
/// lid slot.
#[derive(Debug, Default)]
pub struct HeldItemSlot {
    cup: Option<Cup>,
    lid: Option<Option<VisualHandle>>,
}

impl HeldItemSlot {
    pub fn cup(&self) -> Option<&Cup> {
        self.cup.as_ref()
    }

    pub fn has_lid(&self) -> bool {
        self.lid.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.cup.is_none() && self.lid.is_none()
    }

    /// Stores `cup`, destroying whatever cup was held before.
    pub(crate) fn put_cup(&mut self, mut cup: Cup, visuals: &mut dyn Visuals) {
        self.discard_cup(visuals);
        cup.move_to(Anchor::Hand, visuals);
        self.cup = Some(cup);
    }

    /// Stores a freshly spawned cup that is already attached to the hand.
    pub(crate) fn hold_new(&mut self, cup: Cup, visuals: &mut dyn Visuals) {
        self.discard_cup(visuals);
        self.cup = Some(cup);
    }

    pub(crate) fn take_cup(&mut self) -> Option<Cup> {
        self.cup.take()
    }

    pub(crate) fn discard_cup(&mut self, visuals: &mut dyn Visuals) -> bool {
        match self.cup.take() {
            Some(cup) => {
                cup.destroy(visuals);
                true
            }
            None => false,
        }
    }

    pub(crate) fn put_lid(&mut self, visuals: &mut dyn Visuals) {
        self.discard_lid(visuals);
        self.lid = Some(attach(visuals, RepresentationKind::Lid, Anchor::Hand));
    }

    pub(crate) fn discard_lid(&mut self, visuals: &mut dyn Visuals) -> bool {
        match self.lid.take() {
            Some(handle) => {
                if let Some(handle) = handle {
                    visuals.detach(handle);
                }
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self, visuals: &mut dyn Visuals) {
        self.discard_cup(visuals);
        self.discard_lid(visuals);
    }
}

/// Contents of the brewing appliance.
#[derive(Debug, Default)]
pub struct ApplianceSlot {
    cup: Option<Cup>,
    brewing: bool,
    sealed: bool,
    pub(crate) brew_timer: Option<TimerHandle>,
}

impl ApplianceSlot {
    pub fn cup(&self) -> Option<&Cup> {
        self.cup.as_ref()
    }

    pub fn is_brewing(&self) -> bool {
        self.brewing
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn holds(&self, id: CupId) -> bool {
        self.cup.as_ref().map(Cup::id) == Some(id)
    }

    pub(crate) fn cup_mut(&mut self) -> Option<&mut Cup> {
        self.cup.as_mut()
    }

    /// Places `cup` and starts brewing. The caller owns scheduling the timer.
    pub(crate) fn load(&mut self, mut cup: Cup, visuals: &mut dyn Visuals) {
        cup.move_to(Anchor::Appliance, visuals);
        self.cup = Some(cup);
        self.sealed = false;
        self.brewing = true;
    }

    pub(crate) fn finish_brewing(&mut self) {
        self.brewing = false;
        self.brew_timer = None;
    }

    pub(crate) fn mark_sealed(&mut self) {
        self.sealed = true;
    }

    /// Removes the cup, clearing the sealed flag. Returns the flag's previous
    /// value alongside the cup.
    pub(crate) fn unload(&mut self) -> Option<(Cup, bool)> {
        let cup = self.cup.take()?;
        let sealed = self.sealed;
        self.sealed = false;
        self.brewing = false;
        Some((cup, sealed))
    }
}
