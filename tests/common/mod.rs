//! Test infrastructure for espeak-wav-rs integration tests.
//!
//! Provides a scripted mock engine implementing the full `Engine` trait so
//! the orchestrator, gate, sessions and container assembly can be exercised
//! without a system eSpeak-NG library.

use espeak_wav_rs::engine::{
    CallbackOutcome, Engine, EngineError, EngineResult, InitOptions, Parameter, PositionType,
    SynthCallback, SynthFlags,
};
use espeak_wav_rs::event::{encode_event, DeliveryMode, EventKind, EventTiming, SynthEvent};
use espeak_wav_rs::voice::{Gender, Language, Voice, VoiceFilter};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const MOCK_SAMPLE_RATE: u32 = 22050;

/// Call counters observable from the outside after the engine has been boxed
/// away into the synthesizer.
#[derive(Default)]
pub struct EngineProbe {
    pub synth_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub parameter_sets: Mutex<Vec<(Parameter, i32)>>,
    pub current_voice: Mutex<Option<String>>,
}

impl EngineProbe {
    pub fn synth_calls(&self) -> usize {
        self.synth_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn parameter_sets(&self) -> Vec<(Parameter, i32)> {
        self.parameter_sets.lock().unwrap().clone()
    }

    pub fn current_voice(&self) -> Option<String> {
        self.current_voice.lock().unwrap().clone()
    }
}

/// Scripted engine: each synth command consumes the next utterance from the
/// script and plays its sample chunks through the registered callback, ending
/// with a MsgTerminated batch, exactly like the real engine in retrieval mode.
pub struct MockEngine {
    pub probe: Arc<EngineProbe>,
    callback: Option<SynthCallback>,
    script: VecDeque<Vec<Vec<i16>>>,
    voices: Vec<Voice>,
    /// Number of synth commands to accept without ever invoking the callback.
    stall_remaining: usize,
    synth_error: Option<EngineError>,
    init_error: bool,
    message_counter: u32,
}

impl Default for MockEngine {
    fn default() -> Self {
        MockEngine {
            probe: Arc::new(EngineProbe::default()),
            callback: None,
            script: VecDeque::new(),
            voices: default_voices(),
            stall_remaining: 0,
            synth_error: None,
            init_error: false,
            message_counter: 0,
        }
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an utterance delivered as the given sample chunks, one callback
    /// invocation per chunk.
    pub fn script_utterance(mut self, chunks: &[&[i16]]) -> Self {
        self.script
            .push_back(chunks.iter().map(|c| c.to_vec()).collect());
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stall_remaining = usize::MAX;
        self
    }

    /// Stall only the next synth command; later ones are served normally.
    pub fn stalled_once(mut self) -> Self {
        self.stall_remaining = 1;
        self
    }

    pub fn failing_synth(mut self, error: EngineError) -> Self {
        self.synth_error = Some(error);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.init_error = true;
        self
    }

    fn deliver(&mut self, token: u64) {
        let chunks = self.script.pop_front().unwrap_or_default();
        self.message_counter += 1;
        let message_id = self.message_counter;

        let callback = self
            .callback
            .as_mut()
            .expect("synth issued without a registered callback");

        let mut sample_index = 0u32;
        for (i, chunk) in chunks.iter().enumerate() {
            let mut records = Vec::new();
            encode_event(
                &mut records,
                &event(token, message_id, sample_index, EventKind::Word { number: i as u32 + 1 }),
            );
            encode_event(
                &mut records,
                &event(token, message_id, sample_index, EventKind::ListTerminated),
            );

            if callback(chunk, &records) == CallbackOutcome::Stop {
                return;
            }
            sample_index += chunk.len() as u32;
        }

        let mut records = Vec::new();
        encode_event(
            &mut records,
            &event(token, message_id, sample_index, EventKind::MsgTerminated),
        );
        encode_event(
            &mut records,
            &event(token, message_id, sample_index, EventKind::ListTerminated),
        );
        callback(&[], &records);
    }
}

fn event(token: u64, message_id: u32, sample: u32, kind: EventKind) -> SynthEvent {
    SynthEvent {
        token,
        timing: EventTiming {
            message_id,
            sample,
            ..Default::default()
        },
        kind,
    }
}

impl Engine for MockEngine {
    fn initialize(
        &mut self,
        _mode: DeliveryMode,
        _buffer_length_ms: u32,
        _data_path: Option<&Path>,
        _options: InitOptions,
    ) -> EngineResult<u32> {
        if self.init_error {
            return Err(EngineError::Internal);
        }

        Ok(MOCK_SAMPLE_RATE)
    }

    fn set_callback(&mut self, callback: SynthCallback) {
        self.callback = Some(callback);
    }

    fn set_parameter(&mut self, param: Parameter, value: i32) -> EngineResult<()> {
        self.probe.parameter_sets.lock().unwrap().push((param, value));
        Ok(())
    }

    fn set_voice_by_name(&mut self, name: &str) -> EngineResult<()> {
        if !self.voices.iter().any(|v| v.name == name) {
            return Err(EngineError::NotFound);
        }

        *self.probe.current_voice.lock().unwrap() = Some(name.to_string());
        Ok(())
    }

    fn set_voice_by_properties(&mut self, filter: &VoiceFilter) -> EngineResult<()> {
        let matches = self.list_voices(Some(filter))?;
        let voice = matches
            .get(filter.variant as usize)
            .ok_or(EngineError::NotFound)?;

        *self.probe.current_voice.lock().unwrap() = Some(voice.name.clone());
        Ok(())
    }

    fn synth(
        &mut self,
        _text: &str,
        _position: u32,
        _position_type: PositionType,
        _flags: SynthFlags,
        token: u64,
    ) -> EngineResult<()> {
        self.probe.synth_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.synth_error {
            return Err(error);
        }
        if self.stall_remaining > 0 {
            self.stall_remaining -= 1;
            return Ok(());
        }

        self.deliver(token);
        Ok(())
    }

    fn cancel(&mut self) -> EngineResult<()> {
        self.probe.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn list_voices(&mut self, filter: Option<&VoiceFilter>) -> EngineResult<Vec<Voice>> {
        let mut matches: Vec<Voice> = self
            .voices
            .iter()
            .filter(|voice| {
                let Some(filter) = filter else { return true };

                if let Some(name) = &filter.name {
                    if &voice.name != name {
                        return false;
                    }
                }
                if let Some(language) = &filter.language {
                    if !voice.languages.iter().any(|l| &l.name == language) {
                        return false;
                    }
                }
                if let Some(gender) = filter.gender {
                    if voice.gender != gender {
                        return false;
                    }
                }

                true
            })
            .cloned()
            .collect();

        // Preference order: lowest language priority first.
        if filter.is_some() {
            matches.sort_by_key(|voice| {
                voice
                    .languages
                    .iter()
                    .map(|l| l.priority)
                    .min()
                    .unwrap_or(u8::MAX)
            });
        }

        Ok(matches)
    }
}

fn default_voices() -> Vec<Voice> {
    vec![
        Voice {
            name: "alice".to_string(),
            languages: vec![Language {
                priority: 5,
                name: "en".to_string(),
            }],
            identifier: "en/alice".to_string(),
            gender: Gender::Female,
            age: 0,
        },
        Voice {
            name: "bertil".to_string(),
            languages: vec![
                Language {
                    priority: 2,
                    name: "sv".to_string(),
                },
                Language {
                    priority: 8,
                    name: "en".to_string(),
                },
            ],
            identifier: "sv/bertil".to_string(),
            gender: Gender::Male,
            age: 40,
        },
        Voice {
            name: "carol".to_string(),
            languages: vec![Language {
                priority: 1,
                name: "en".to_string(),
            }],
            identifier: "en/carol".to_string(),
            gender: Gender::Female,
            age: 0,
        },
    ]
}

pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}
