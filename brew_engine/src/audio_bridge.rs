use std::{cell::RefCell, rc::Rc};

use brew_core::host::{AudioLayer, AudioSink, LayerMix};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioEvent {
    LayerStart { layer: AudioLayer, clip: String },
    Cue { clip: String, volume: f32 },
    StopAll,
}

/// Audio sink that records discrete events and forwards everything to the
/// wrapped sink. Per-frame mixes are only kept as the latest value.
pub struct RecordingAudioSink {
    inner: Box<dyn AudioSink>,
    events: Rc<RefCell<Vec<AudioEvent>>>,
    last_mix: Rc<RefCell<Option<LayerMix>>>,
}

#[derive(Clone, Default)]
pub struct AudioRecording {
    events: Rc<RefCell<Vec<AudioEvent>>>,
    last_mix: Rc<RefCell<Option<LayerMix>>>,
}

impl AudioRecording {
    pub fn events(&self) -> Vec<AudioEvent> {
        self.events.borrow().clone()
    }

    pub fn last_mix(&self) -> Option<LayerMix> {
        *self.last_mix.borrow()
    }
}

impl RecordingAudioSink {
    pub fn wrap(inner: Box<dyn AudioSink>) -> (Self, AudioRecording) {
        let recording = AudioRecording::default();
        let sink = RecordingAudioSink {
            inner,
            events: recording.events.clone(),
            last_mix: recording.last_mix.clone(),
        };
        (sink, recording)
    }
}

impl AudioSink for RecordingAudioSink {
    fn layer_start(&mut self, layer: AudioLayer, clip: &str) {
        self.events.borrow_mut().push(AudioEvent::LayerStart {
            layer,
            clip: clip.to_string(),
        });
        self.inner.layer_start(layer, clip);
    }

    fn mix(&mut self, mix: &LayerMix) {
        *self.last_mix.borrow_mut() = Some(*mix);
        self.inner.mix(mix);
    }

    fn cue(&mut self, clip: &str, volume: f32) {
        self.events.borrow_mut().push(AudioEvent::Cue {
            clip: clip.to_string(),
            volume,
        });
        self.inner.cue(clip, volume);
    }

    fn stop_all(&mut self) {
        self.events.borrow_mut().push(AudioEvent::StopAll);
        self.inner.stop_all();
    }
}
