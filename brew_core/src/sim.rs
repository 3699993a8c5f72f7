//! Deterministic in-memory host. Every collaborator trait is implemented over
//! one shared [`HostState`], so tests and the headless harness can script the
//! player and inspect what the core asked for.

use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Duration;

use glam::Vec3;
use serde::Serialize;

use crate::config::{RepresentationConfig, SessionConfig};
use crate::error::ConfigError;
use crate::host::{
    Anchor, Animation, AudioLayer, AudioSink, Collaborators, LayerMix, Movement, Physics,
    PlayerControl, Presentation, RepresentationKind, SceneLifecycle, TargetTracker, VisualHandle,
    Visuals,
};
use crate::session::Session;

/// Distance under which the simulated agent counts as arrived.
pub const STOPPING_DISTANCE: f32 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Launch {
    pub kind: RepresentationKind,
    pub direction: [f32; 3],
    pub impulse: f32,
    pub lifetime_secs: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioRecord {
    pub started: Vec<(AudioLayer, String)>,
    pub cues: Vec<String>,
    pub stops: u32,
    pub last_mix: Option<LayerMix>,
}

#[derive(Debug)]
pub struct HostState {
    representations: RepresentationConfig,
    spawn: Vec3,
    player_start: Vec3,

    pub npc_position: Vec3,
    pub npc_destination: Option<Vec3>,
    pub npc_speed: f32,
    pub player_position: Option<Vec3>,
    pub player_velocity: Vec3,
    pub player_forward: Vec3,
    pub player_enabled: bool,

    pub disable_calls: u32,
    pub reload_requests: u32,
    pub visible_panels: BTreeSet<String>,
    pub texts: BTreeMap<String, String>,
    pub one_shots: Vec<String>,
    pub flags: BTreeMap<String, bool>,
    pub triggers: Vec<String>,
    pub launches: Vec<Launch>,
    pub attached: BTreeMap<VisualHandle, (RepresentationKind, Anchor)>,
    next_visual: u32,
    pub audio: AudioRecord,
}

impl HostState {
    fn new(config: &SessionConfig) -> Self {
        let spawn = config.npc.spawn_point();
        HostState {
            representations: config.order.representations.clone(),
            spawn,
            player_start: Vec3::ZERO,
            npc_position: spawn,
            npc_destination: None,
            npc_speed: 0.0,
            player_position: Some(Vec3::ZERO),
            player_velocity: Vec3::ZERO,
            player_forward: Vec3::NEG_Z,
            player_enabled: true,
            disable_calls: 0,
            reload_requests: 0,
            visible_panels: BTreeSet::new(),
            texts: BTreeMap::new(),
            one_shots: Vec::new(),
            flags: BTreeMap::new(),
            triggers: Vec::new(),
            launches: Vec::new(),
            attached: BTreeMap::new(),
            next_visual: 1,
            audio: AudioRecord::default(),
        }
    }

    /// Representations currently attached to `anchor`.
    pub fn attached_at(&self, anchor: Anchor) -> Vec<RepresentationKind> {
        self.attached
            .values()
            .filter(|(_, at)| *at == anchor)
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn panel_visible(&self, panel: &str) -> bool {
        self.visible_panels.contains(panel)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn distance_to_player(&self) -> Option<f32> {
        self.player_position
            .map(|player| self.npc_position.distance(player))
    }
}

#[derive(Clone)]
pub struct SimulatedHost {
    state: Rc<RefCell<HostState>>,
}

impl SimulatedHost {
    pub fn new(config: &SessionConfig) -> Self {
        SimulatedHost {
            state: Rc::new(RefCell::new(HostState::new(config))),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            visuals: Box::new(self.clone()),
            presentation: Box::new(self.clone()),
            movement: Box::new(self.clone()),
            animation: Box::new(self.clone()),
            physics: Box::new(self.clone()),
            player: Box::new(self.clone()),
            scene: Box::new(self.clone()),
            target: Box::new(self.clone()),
        }
    }

    pub fn audio_sink(&self) -> Box<dyn AudioSink> {
        Box::new(self.clone())
    }

    pub fn state(&self) -> Ref<'_, HostState> {
        self.state.borrow()
    }

    /// Moves the NPC toward its destination and the player along its
    /// velocity.
    pub fn step(&self, dt: Duration) {
        let dt = dt.as_secs_f32();
        let mut state = self.state.borrow_mut();
        if let Some(destination) = state.npc_destination {
            let offset = destination - state.npc_position;
            let reach = state.npc_speed * dt;
            state.npc_position = if offset.length() <= reach {
                destination
            } else {
                state.npc_position + offset.normalize_or_zero() * reach
            };
        }
        if state.player_enabled {
            let velocity = state.player_velocity;
            if let Some(position) = state.player_position.as_mut() {
                *position += velocity * dt;
            }
        }
    }

    pub fn set_player_position(&self, position: Vec3) {
        self.state.borrow_mut().player_position = Some(position);
    }

    pub fn set_player_velocity(&self, velocity: Vec3) {
        self.state.borrow_mut().player_velocity = velocity;
    }

    pub fn set_npc_position(&self, position: Vec3) {
        self.state.borrow_mut().npc_position = position;
    }

    /// Takes the pursuit target out of the scene.
    pub fn remove_player(&self) {
        self.state.borrow_mut().player_position = None;
    }

    /// Scene reload: the NPC respawns, the player regains control at its
    /// start point and everything attached to the old scene is gone.
    pub fn reload(&self) {
        let mut state = self.state.borrow_mut();
        state.npc_position = state.spawn;
        state.npc_destination = None;
        state.npc_speed = 0.0;
        state.player_position = Some(state.player_start);
        state.player_velocity = Vec3::ZERO;
        state.player_enabled = true;
        state.visible_panels.clear();
        state.texts.clear();
        state.flags.clear();
        state.attached.clear();
    }
}

/// Builds a session wired to a fresh simulated host.
pub fn simulated_session(config: SessionConfig) -> Result<(Session, SimulatedHost), ConfigError> {
    let host = SimulatedHost::new(&config);
    let session = Session::new(config, host.collaborators(), host.audio_sink())?;
    Ok((session, host))
}

impl Visuals for SimulatedHost {
    fn attach(&mut self, kind: RepresentationKind, anchor: Anchor) -> Option<VisualHandle> {
        let mut state = self.state.borrow_mut();
        state.representations.get(kind)?;
        let handle = VisualHandle(state.next_visual);
        state.next_visual += 1;
        state.attached.insert(handle, (kind, anchor));
        Some(handle)
    }

    fn detach(&mut self, handle: VisualHandle) {
        self.state.borrow_mut().attached.remove(&handle);
    }
}

impl Presentation for SimulatedHost {
    fn show_panel(&mut self, panel: &str) {
        self.state.borrow_mut().visible_panels.insert(panel.to_string());
    }

    fn hide_panel(&mut self, panel: &str) {
        self.state.borrow_mut().visible_panels.remove(panel);
    }

    fn set_text(&mut self, panel: &str, text: &str) {
        self.state
            .borrow_mut()
            .texts
            .insert(panel.to_string(), text.to_string());
    }

    fn play_one_shot(&mut self, clip: &str) {
        self.state.borrow_mut().one_shots.push(clip.to_string());
    }
}

impl Movement for SimulatedHost {
    fn set_destination(&mut self, point: Vec3) {
        self.state.borrow_mut().npc_destination = Some(point);
    }

    fn has_arrived(&self) -> bool {
        self.remaining_distance() <= STOPPING_DISTANCE
    }

    fn remaining_distance(&self) -> f32 {
        let state = self.state.borrow();
        state
            .npc_destination
            .map_or(0.0, |destination| state.npc_position.distance(destination))
    }

    fn set_speed(&mut self, speed: f32) {
        self.state.borrow_mut().npc_speed = speed;
    }

    fn stop(&mut self) {
        self.state.borrow_mut().npc_destination = None;
    }

    fn position(&self) -> Vec3 {
        self.state.borrow().npc_position
    }
}

impl Animation for SimulatedHost {
    fn set_flag(&mut self, name: &str, value: bool) {
        self.state.borrow_mut().flags.insert(name.to_string(), value);
    }

    fn trigger(&mut self, name: &str) {
        self.state.borrow_mut().triggers.push(name.to_string());
    }
}

impl Physics for SimulatedHost {
    fn launch(
        &mut self,
        kind: RepresentationKind,
        direction: Vec3,
        impulse: f32,
        lifetime_secs: f32,
    ) {
        self.state.borrow_mut().launches.push(Launch {
            kind,
            direction: direction.to_array(),
            impulse,
            lifetime_secs,
        });
    }
}

impl PlayerControl for SimulatedHost {
    fn can_interact(&self) -> bool {
        self.state.borrow().player_enabled
    }

    fn disable(&mut self) {
        let mut state = self.state.borrow_mut();
        state.player_enabled = false;
        state.disable_calls += 1;
    }

    fn forward(&self) -> Vec3 {
        self.state.borrow().player_forward
    }
}

impl SceneLifecycle for SimulatedHost {
    fn request_reload(&mut self) {
        self.state.borrow_mut().reload_requests += 1;
    }
}

impl TargetTracker for SimulatedHost {
    fn position(&self) -> Option<Vec3> {
        self.state.borrow().player_position
    }
}

impl AudioSink for SimulatedHost {
    fn layer_start(&mut self, layer: AudioLayer, clip: &str) {
        self.state
            .borrow_mut()
            .audio
            .started
            .push((layer, clip.to_string()));
    }

    fn mix(&mut self, mix: &LayerMix) {
        self.state.borrow_mut().audio.last_mix = Some(*mix);
    }

    fn cue(&mut self, clip: &str, _volume: f32) {
        self.state.borrow_mut().audio.cues.push(clip.to_string());
    }

    fn stop_all(&mut self) {
        self.state.borrow_mut().audio.stops += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_walks_at_configured_speed_and_arrives() {
        let config = SessionConfig::default();
        let mut host = SimulatedHost::new(&config);
        host.set_speed(2.0);
        host.set_destination(Vec3::new(0.0, 0.0, -10.0));
        host.step(Duration::from_millis(500));
        assert!((host.state().npc_position.z - -11.0).abs() < 1e-5);
        assert!(!host.has_arrived());

        host.step(Duration::from_secs(1));
        assert!(host.has_arrived());
        assert_eq!(host.state().npc_position, Vec3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn missing_representation_attaches_nothing() {
        let mut config = SessionConfig::default();
        config.order.representations.lid = None;
        let mut host = SimulatedHost::new(&config);
        assert!(host.attach(RepresentationKind::Lid, Anchor::Hand).is_none());
        let handle = host.attach(RepresentationKind::EmptyCup, Anchor::Hand);
        assert!(handle.is_some());
        assert_eq!(
            host.state().attached_at(Anchor::Hand),
            vec![RepresentationKind::EmptyCup]
        );
    }

    #[test]
    fn disabled_player_stops_moving_until_reload() {
        let config = SessionConfig::default();
        let mut host = SimulatedHost::new(&config);
        host.set_player_velocity(Vec3::X);
        host.disable();
        host.step(Duration::from_secs(1));
        assert_eq!(host.state().player_position, Some(Vec3::ZERO));
        assert_eq!(host.state().disable_calls, 1);

        host.reload();
        assert!(host.can_interact());
        assert_eq!(host.state().npc_position, config.npc.spawn_point());
    }
}
