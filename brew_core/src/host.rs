//! Contracts for the collaborators the core drives but never implements:
//! scene graph attachment, UI panels, navigation, animation, physics, input
//! gating, scene reloads and audio output.

use glam::Vec3;
use serde::Serialize;

/// Visual variants that can be attached to an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentationKind {
    EmptyCup,
    FilledCup,
    SealedCup,
    Lid,
}

impl RepresentationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RepresentationKind::EmptyCup => "empty_cup",
            RepresentationKind::FilledCup => "filled_cup",
            RepresentationKind::SealedCup => "sealed_cup",
            RepresentationKind::Lid => "lid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Hand,
    Appliance,
}

impl Anchor {
    pub fn as_str(self) -> &'static str {
        match self {
            Anchor::Hand => "hand",
            Anchor::Appliance => "appliance",
        }
    }
}

/// Handle to an attached representation owned by the visual collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VisualHandle(pub u32);

pub trait Visuals {
    /// Returns `None` when the collaborator has no representation configured
    /// for `kind` or no such anchor exists.
    fn attach(&mut self, kind: RepresentationKind, anchor: Anchor) -> Option<VisualHandle>;
    fn detach(&mut self, handle: VisualHandle);
}

pub trait Presentation {
    fn show_panel(&mut self, panel: &str);
    fn hide_panel(&mut self, panel: &str);
    fn set_text(&mut self, panel: &str, text: &str);
    fn play_one_shot(&mut self, clip: &str);
}

/// Navigation agent steering the NPC.
pub trait Movement {
    fn set_destination(&mut self, point: Vec3);
    fn has_arrived(&self) -> bool;
    fn remaining_distance(&self) -> f32;
    fn set_speed(&mut self, speed: f32);
    fn stop(&mut self);
    fn position(&self) -> Vec3;
}

pub trait Animation {
    fn set_flag(&mut self, name: &str, value: bool);
    fn trigger(&mut self, name: &str);
}

pub trait Physics {
    /// Spawns a short-lived projectile at the hand and applies `impulse` along
    /// `direction`.
    fn launch(
        &mut self,
        kind: RepresentationKind,
        direction: Vec3,
        impulse: f32,
        lifetime_secs: f32,
    );
}

pub trait PlayerControl {
    fn can_interact(&self) -> bool;
    fn disable(&mut self);
    /// Direction the player is facing; throws are aimed along it.
    fn forward(&self) -> Vec3 {
        Vec3::NEG_Z
    }
}

pub trait SceneLifecycle {
    fn request_reload(&mut self);
}

/// Live position of whoever the NPC pursues.
pub trait TargetTracker {
    fn position(&self) -> Option<Vec3>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioLayer {
    Background,
    Chase,
    Heartbeat,
}

impl AudioLayer {
    pub const ALL: [AudioLayer; 3] = [
        AudioLayer::Background,
        AudioLayer::Chase,
        AudioLayer::Heartbeat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AudioLayer::Background => "background",
            AudioLayer::Chase => "chase",
            AudioLayer::Heartbeat => "heartbeat",
        }
    }
}

/// Per-layer output of the orchestrator after one smoothing step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerMix {
    pub background: f32,
    pub chase: f32,
    pub heartbeat: f32,
    pub heartbeat_pitch: f32,
}

/// Mixer-side receiver for the orchestrator.
pub trait AudioSink {
    fn layer_start(&mut self, layer: AudioLayer, clip: &str);
    fn mix(&mut self, mix: &LayerMix);
    fn cue(&mut self, clip: &str, volume: f32);
    fn stop_all(&mut self);
}

/// Bundle of boxed collaborators owned by a session.
pub struct Collaborators {
    pub visuals: Box<dyn Visuals>,
    pub presentation: Box<dyn Presentation>,
    pub movement: Box<dyn Movement>,
    pub animation: Box<dyn Animation>,
    pub physics: Box<dyn Physics>,
    pub player: Box<dyn PlayerControl>,
    pub scene: Box<dyn SceneLifecycle>,
    pub target: Box<dyn TargetTracker>,
}
