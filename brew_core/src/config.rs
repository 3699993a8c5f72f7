use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, MissingReference};
use crate::host::RepresentationKind;

/// Tunables for a whole session. Every section falls back to its defaults, so
/// a JSON file only needs the fields it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub order: OrderConfig,
    pub npc: NpcConfig,
    pub dialogue: DialogueConfig,
    pub audio: AudioConfig,
    pub effects: EffectsConfig,
    pub panels: PanelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    pub brew_time_secs: f32,
    pub throw_force: f32,
    /// Upward component added to the hand's forward vector when throwing.
    pub throw_lift: f32,
    pub projectile_lifetime_secs: f32,
    pub brew_cue: String,
    pub seal_hint: HintConfig,
    pub representations: RepresentationConfig,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            brew_time_secs: 3.0,
            throw_force: 10.0,
            throw_lift: 0.2,
            projectile_lifetime_secs: 3.0,
            brew_cue: "coffee_brew".to_string(),
            seal_hint: HintConfig {
                message: "Left click to throw it at the unfriendly customer".to_string(),
                duration_secs: 5.0,
            },
            representations: RepresentationConfig::default(),
        }
    }
}

impl OrderConfig {
    pub fn brew_time(&self) -> Duration {
        secs(self.brew_time_secs)
    }
}

/// Asset names per representation; `None` means nothing is attached for that
/// kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepresentationConfig {
    pub empty_cup: Option<String>,
    pub filled_cup: Option<String>,
    pub sealed_cup: Option<String>,
    pub lid: Option<String>,
}

impl Default for RepresentationConfig {
    fn default() -> Self {
        Self {
            empty_cup: Some("cup_empty".to_string()),
            filled_cup: Some("cup_filled".to_string()),
            sealed_cup: Some("cup_sealed".to_string()),
            lid: Some("cup_lid".to_string()),
        }
    }
}

impl RepresentationConfig {
    pub fn get(&self, kind: RepresentationKind) -> Option<&str> {
        let entry = match kind {
            RepresentationKind::EmptyCup => &self.empty_cup,
            RepresentationKind::FilledCup => &self.filled_cup,
            RepresentationKind::SealedCup => &self.sealed_cup,
            RepresentationKind::Lid => &self.lid,
        };
        entry.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintConfig {
    pub message: String,
    pub duration_secs: f32,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            message: String::new(),
            duration_secs: 5.0,
        }
    }
}

impl HintConfig {
    pub fn duration(&self) -> Duration {
        secs(self.duration_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcConfig {
    pub spawn: [f32; 3],
    pub goal: Option<[f32; 3]>,
    pub walk_speed: f32,
    pub chase_speed: f32,
    /// Inclusive capture threshold.
    pub catch_distance: f32,
    pub reaction_secs: f32,
    pub reset_delay_secs: f32,
    pub dialogue_cue: String,
    pub chase_cue: String,
    pub idle_hint: HintConfig,
}

impl Default for NpcConfig {
    fn default() -> Self {
        Self {
            spawn: [0.0, 0.0, -12.0],
            goal: Some([0.0, 0.0, -3.0]),
            walk_speed: 2.0,
            chase_speed: 6.0,
            catch_distance: 1.2,
            reaction_secs: 1.5,
            reset_delay_secs: 3.0,
            dialogue_cue: "dialogue".to_string(),
            chase_cue: "chase_sting".to_string(),
            idle_hint: HintConfig {
                message: "Make the order: cup, machine, lid".to_string(),
                duration_secs: 5.0,
            },
        }
    }
}

impl NpcConfig {
    pub fn spawn_point(&self) -> Vec3 {
        Vec3::from_array(self.spawn)
    }

    pub fn goal_point(&self) -> Option<Vec3> {
        self.goal.map(Vec3::from_array)
    }

    pub fn reaction_delay(&self) -> Duration {
        secs(self.reaction_secs)
    }

    pub fn reset_delay(&self) -> Duration {
        secs(self.reset_delay_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    pub lines: Vec<String>,
    pub char_delay_secs: f32,
    pub line_pause_secs: f32,
    pub end_delay_secs: f32,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            lines: vec![
                "One coffee. Black.".to_string(),
                "And put a lid on it this time.".to_string(),
            ],
            char_delay_secs: 0.05,
            line_pause_secs: 2.0,
            end_delay_secs: 1.0,
        }
    }
}

impl DialogueConfig {
    pub fn char_delay(&self) -> Duration {
        secs(self.char_delay_secs)
    }

    pub fn line_pause(&self) -> Duration {
        secs(self.line_pause_secs)
    }

    pub fn end_delay(&self) -> Duration {
        secs(self.end_delay_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub background_volume: f32,
    pub sfx_volume: f32,
    pub heartbeat_volume: f32,
    pub crossfade_rate: f32,
    pub heartbeat_attack_rate: f32,
    pub heartbeat_decay_rate: f32,
    pub pitch_rate: f32,
    pub background_clip: String,
    pub chase_clip: String,
    pub heartbeat_clip: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            background_volume: 0.5,
            sfx_volume: 0.7,
            heartbeat_volume: 0.8,
            crossfade_rate: 2.0,
            heartbeat_attack_rate: 3.0,
            heartbeat_decay_rate: 2.0,
            pitch_rate: 0.5,
            background_clip: "cafe_ambience".to_string(),
            chase_clip: "chase_loop".to_string(),
            heartbeat_clip: "heartbeat".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub shake: ShakeConfig,
    pub lights: Vec<FlickerConfig>,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            shake: ShakeConfig::default(),
            lights: vec![
                FlickerConfig {
                    name: "counter_lamp".to_string(),
                    ..FlickerConfig::default()
                },
                FlickerConfig {
                    name: "ceiling_lamp".to_string(),
                    seed: 7,
                    ..FlickerConfig::default()
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeConfig {
    pub intensity: f32,
    pub frequency: f32,
    pub return_speed: f32,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            intensity: 0.1,
            frequency: 2.0,
            return_speed: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlickerConfig {
    pub name: String,
    pub base_intensity: f32,
    pub min_intensity: f32,
    pub max_intensity: f32,
    pub flicker_speed: f32,
    pub normal_color: [f32; 3],
    pub fear_color: [f32; 3],
    pub color_change_speed: f32,
    pub seed: u32,
}

impl Default for FlickerConfig {
    fn default() -> Self {
        Self {
            name: "lamp".to_string(),
            base_intensity: 1.0,
            min_intensity: 0.2,
            max_intensity: 1.0,
            flicker_speed: 10.0,
            normal_color: [1.0, 1.0, 1.0],
            fear_color: [1.0, 0.0, 0.0],
            color_change_speed: 2.0,
            seed: 0,
        }
    }
}

/// Ids of the UI panels the core toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub hint: String,
    pub dialogue: String,
    pub caught: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            hint: "hint".to_string(),
            dialogue: "dialogue".to_string(),
            caught: "caught".to_string(),
        }
    }
}

impl SessionConfig {
    /// Reads a JSON override file; a missing path yields the defaults.
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading session config {}", path.display()))?;
        let config: SessionConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing session config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating session config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_secs("order.brew_time_secs", self.order.brew_time_secs)?;
        check_secs(
            "order.projectile_lifetime_secs",
            self.order.projectile_lifetime_secs,
        )?;
        check_secs(
            "order.seal_hint.duration_secs",
            self.order.seal_hint.duration_secs,
        )?;
        check_scalar("order.throw_force", self.order.throw_force)?;

        check_scalar("npc.walk_speed", self.npc.walk_speed)?;
        check_scalar("npc.chase_speed", self.npc.chase_speed)?;
        check_scalar("npc.catch_distance", self.npc.catch_distance)?;
        check_secs("npc.reaction_secs", self.npc.reaction_secs)?;
        check_secs("npc.reset_delay_secs", self.npc.reset_delay_secs)?;
        check_secs("npc.idle_hint.duration_secs", self.npc.idle_hint.duration_secs)?;

        check_secs("dialogue.char_delay_secs", self.dialogue.char_delay_secs)?;
        check_secs("dialogue.line_pause_secs", self.dialogue.line_pause_secs)?;
        check_secs("dialogue.end_delay_secs", self.dialogue.end_delay_secs)?;

        check_unit("audio.background_volume", self.audio.background_volume)?;
        check_unit("audio.sfx_volume", self.audio.sfx_volume)?;
        check_unit("audio.heartbeat_volume", self.audio.heartbeat_volume)?;
        check_scalar("audio.crossfade_rate", self.audio.crossfade_rate)?;
        check_scalar("audio.heartbeat_attack_rate", self.audio.heartbeat_attack_rate)?;
        check_scalar("audio.heartbeat_decay_rate", self.audio.heartbeat_decay_rate)?;
        check_scalar("audio.pitch_rate", self.audio.pitch_rate)?;

        check_scalar("effects.shake.intensity", self.effects.shake.intensity)?;
        check_scalar("effects.shake.frequency", self.effects.shake.frequency)?;
        check_scalar("effects.shake.return_speed", self.effects.shake.return_speed)?;
        for light in &self.effects.lights {
            check_scalar("effects.lights.flicker_speed", light.flicker_speed)?;
            check_scalar("effects.lights.color_change_speed", light.color_change_speed)?;
            if light.min_intensity > light.max_intensity {
                return Err(ConfigError::InvertedFlickerRange {
                    min: light.min_intensity,
                    max: light.max_intensity,
                });
            }
        }
        Ok(())
    }

    /// References whose absence turns a feature into a no-op.
    pub fn missing_references(&self) -> Vec<MissingReference> {
        let mut missing = Vec::new();
        for kind in [
            RepresentationKind::EmptyCup,
            RepresentationKind::FilledCup,
            RepresentationKind::SealedCup,
            RepresentationKind::Lid,
        ] {
            if self.order.representations.get(kind).is_none() {
                missing.push(MissingReference::Representation(kind));
            }
        }
        if self.npc.goal.is_none() {
            missing.push(MissingReference::NpcGoal);
        }
        if self.dialogue.lines.is_empty() {
            missing.push(MissingReference::DialogueLines);
        }
        missing
    }
}

/// Out-of-range values saturate; `validate` reports them before this runs.
fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}

fn check_secs(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 && Duration::try_from_secs_f32(value).is_ok() {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration { field, value })
    }
}

fn check_scalar(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidScalar { field, value })
    }
}

fn check_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { field, value })
    }
}
