use std::time::Duration;

use crate::config::AudioConfig;
use crate::host::{AudioLayer, AudioSink, LayerMix};

const REST_PITCH: f32 = 1.0;

/// Layered ambience/tension mixer. Callers only set targets (`chasing`,
/// `intensity`); `update` eases every layer toward them.
pub struct AudioOrchestrator {
    config: AudioConfig,
    sink: Box<dyn AudioSink>,
    running: bool,
    heartbeat_started: bool,
    chasing: bool,
    intensity: f32,
    mix: LayerMix,
}

impl AudioOrchestrator {
    pub fn new(config: AudioConfig, sink: Box<dyn AudioSink>) -> Self {
        AudioOrchestrator {
            config,
            sink,
            running: false,
            heartbeat_started: false,
            chasing: false,
            intensity: 0.0,
            mix: silent_mix(),
        }
    }

    /// Starts the looping layers: ambience audible, chase loop muted.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.heartbeat_started = false;
        self.chasing = false;
        self.intensity = 0.0;
        self.mix = LayerMix {
            background: self.config.background_volume,
            ..silent_mix()
        };
        self.sink
            .layer_start(AudioLayer::Background, &self.config.background_clip);
        self.sink.layer_start(AudioLayer::Chase, &self.config.chase_clip);
        self.sink.mix(&self.mix);
    }

    pub fn set_chasing(&mut self, chasing: bool) {
        if self.chasing == chasing {
            return;
        }
        self.chasing = chasing;
        if chasing && self.running && !self.heartbeat_started {
            self.heartbeat_started = true;
            self.mix.heartbeat = 0.0;
            self.sink
                .layer_start(AudioLayer::Heartbeat, &self.config.heartbeat_clip);
        }
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity.clamp(0.0, 1.0);
    }

    pub fn play_cue(&mut self, clip: &str) {
        if self.running {
            self.sink.cue(clip, self.config.sfx_volume);
        }
    }

    pub fn stop_all(&mut self) {
        self.running = false;
        self.chasing = false;
        self.heartbeat_started = false;
        self.mix = silent_mix();
        self.sink.stop_all();
    }

    pub fn update(&mut self, dt: Duration) -> LayerMix {
        if !self.running {
            return self.mix;
        }
        let dt = dt.as_secs_f32();
        let volume = self.config.background_volume;
        let (background_target, chase_target) = if self.chasing {
            (0.0, volume)
        } else {
            (volume, 0.0)
        };
        let crossfade = self.config.crossfade_rate;
        self.mix.background = ease(self.mix.background, background_target, crossfade, dt);
        self.mix.chase = ease(self.mix.chase, chase_target, crossfade, dt);

        if self.chasing {
            let level = self.intensity.clamp(0.1, 1.0);
            let target = self.config.heartbeat_volume * level;
            self.mix.heartbeat = ease(
                self.mix.heartbeat,
                target,
                self.config.heartbeat_attack_rate,
                dt,
            );
            self.mix.heartbeat_pitch = ease(
                self.mix.heartbeat_pitch,
                0.8 + 0.4 * level,
                self.config.pitch_rate,
                dt,
            );
        } else {
            self.mix.heartbeat = ease(
                self.mix.heartbeat,
                0.0,
                self.config.heartbeat_decay_rate,
                dt,
            );
            if self.mix.heartbeat < 0.1 {
                self.mix.heartbeat_pitch = REST_PITCH;
            }
        }

        self.sink.mix(&self.mix);
        self.mix
    }

    pub fn mix(&self) -> LayerMix {
        self.mix
    }

    pub fn is_chasing(&self) -> bool {
        self.chasing
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }
}

fn silent_mix() -> LayerMix {
    LayerMix {
        background: 0.0,
        chase: 0.0,
        heartbeat: 0.0,
        heartbeat_pitch: REST_PITCH,
    }
}

/// Frame-rate independent exponential approach.
fn ease(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    let blend = 1.0 - (-rate * dt).exp();
    current + (target - current) * blend
}
