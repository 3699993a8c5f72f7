//! Camera jitter and light flicker toggled in lockstep with the chase.
//!
//! Each effector owns its own procedural motion and its own way back to rest;
//! the controller only broadcasts activation and advances the clock.

use std::time::Duration;

use glam::Vec3;
use serde::Serialize;

use crate::config::{EffectsConfig, FlickerConfig, ShakeConfig};

/// Observable output of one effector, for hosts that apply it to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectorState {
    Shake { offset: [f32; 3] },
    Light { intensity: f32, color: [f32; 3] },
}

pub trait Effector {
    fn name(&self) -> &str;
    fn set_active(&mut self, active: bool);
    fn is_active(&self) -> bool;
    /// `time` is the controller clock in seconds.
    fn update(&mut self, time: f32, dt: f32);
    fn state(&self) -> EffectorState;
}

pub struct CameraShake {
    config: ShakeConfig,
    offset: Vec3,
    active: bool,
}

impl CameraShake {
    pub fn new(config: ShakeConfig) -> Self {
        CameraShake {
            config,
            offset: Vec3::ZERO,
            active: false,
        }
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }
}

impl Effector for CameraShake {
    fn name(&self) -> &str {
        "camera_shake"
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn update(&mut self, time: f32, dt: f32) {
        if self.active {
            let phase = time * self.config.frequency;
            let x = (value_noise(phase, 0.0, 0) - 0.5) * 2.0;
            let y = (value_noise(0.0, phase, 0) - 0.5) * 2.0;
            self.offset = Vec3::new(x, y, 0.0) * self.config.intensity;
        } else {
            let blend = 1.0 - (-self.config.return_speed * dt).exp();
            self.offset = self.offset.lerp(Vec3::ZERO, blend);
        }
    }

    fn state(&self) -> EffectorState {
        EffectorState::Shake {
            offset: self.offset.to_array(),
        }
    }
}

pub struct LightFlicker {
    config: FlickerConfig,
    intensity: f32,
    color: Vec3,
    active: bool,
}

impl LightFlicker {
    pub fn new(config: FlickerConfig) -> Self {
        let color = Vec3::from_array(config.normal_color);
        LightFlicker {
            intensity: config.base_intensity,
            color,
            config,
            active: false,
        }
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }
}

impl Effector for LightFlicker {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.intensity = self.config.base_intensity;
            self.color = Vec3::from_array(self.config.normal_color);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn update(&mut self, time: f32, dt: f32) {
        if !self.active {
            return;
        }
        let noise = value_noise(time * self.config.flicker_speed, 0.0, self.config.seed);
        let span = self.config.max_intensity - self.config.min_intensity;
        self.intensity = self.config.min_intensity + span * noise;
        let blend = 1.0 - (-self.config.color_change_speed * dt).exp();
        self.color = self
            .color
            .lerp(Vec3::from_array(self.config.fear_color), blend);
    }

    fn state(&self) -> EffectorState {
        EffectorState::Light {
            intensity: self.intensity,
            color: self.color.to_array(),
        }
    }
}

pub struct EffectsController {
    effectors: Vec<Box<dyn Effector>>,
    active: bool,
    clock: f32,
}

impl EffectsController {
    pub fn new(effectors: Vec<Box<dyn Effector>>) -> Self {
        EffectsController {
            effectors,
            active: false,
            clock: 0.0,
        }
    }

    pub fn from_config(config: &EffectsConfig) -> Self {
        let mut effectors: Vec<Box<dyn Effector>> = Vec::with_capacity(config.lights.len() + 1);
        effectors.push(Box::new(CameraShake::new(config.shake.clone())));
        for light in &config.lights {
            effectors.push(Box::new(LightFlicker::new(light.clone())));
        }
        Self::new(effectors)
    }

    /// Broadcasts activation. Returns `false` when nothing changed.
    pub fn set_active(&mut self, active: bool) -> bool {
        if self.active == active {
            return false;
        }
        self.active = active;
        log::info!(
            "{} chase effects on {} effectors",
            if active { "starting" } else { "stopping" },
            self.effectors.len()
        );
        for effector in &mut self.effectors {
            effector.set_active(active);
        }
        true
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn update(&mut self, dt: Duration) {
        let dt = dt.as_secs_f32();
        self.clock += dt;
        for effector in &mut self.effectors {
            effector.update(self.clock, dt);
        }
    }

    pub fn states(&self) -> Vec<(String, EffectorState)> {
        self.effectors
            .iter()
            .map(|effector| (effector.name().to_string(), effector.state()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.effectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effectors.is_empty()
    }
}

/// Smooth 2D value noise in `[0, 1]` over a hashed integer lattice.
pub fn value_noise(x: f32, y: f32, seed: u32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = smoothstep(x - x0);
    let ty = smoothstep(y - y0);
    let (ix, iy) = (x0 as i32, y0 as i32);

    let a = lattice(ix, iy, seed);
    let b = lattice(ix + 1, iy, seed);
    let c = lattice(ix, iy + 1, seed);
    let d = lattice(ix + 1, iy + 1, seed);
    let top = a + (b - a) * tx;
    let bottom = c + (d - c) * tx;
    top + (bottom - top) * ty
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lattice(x: i32, y: i32, seed: u32) -> f32 {
    let mut h = u64::from(seed).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    h ^= (x as u32 as u64).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h ^= (y as u32 as u64).wrapping_mul(0x94d0_49bb_1331_11eb);
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^= h >> 31;
    (h >> 40) as f32 / (1u64 << 24) as f32
}
