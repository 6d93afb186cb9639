//! The synthesis orchestrator.
//!
//! [`Synthesizer`] is the public entry point. It owns the gate: a single
//! mutual-exclusion region around every engine interaction, because the engine
//! keeps process-wide parameter/voice state and a single callback slot. One
//! synth call at a time acquires the gate, reconciles the engine's applied
//! configuration with the request, issues the asynchronous command and then
//! waits on the session's completion signal with a bound. The gate is held
//! across the whole call, including the cancel-on-timeout, so a second
//! caller's parameters can never leak into a still-in-flight synthesis.

use crate::config::Config;
use crate::engine::{Engine, InitOptions, PositionType, SynthFlags};
use crate::error::SynthError;
use crate::event::DeliveryMode;
use crate::params::Parameters;
use crate::session::{synth_callback, Session, SessionRegistry};
use crate::voice::{Voice, VoiceFilter};
use crate::wav::{finish_wav, start_wav, SeekBuffer};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Per-call overrides. `None` means the documented default, not "keep the
/// value from the previous call".
#[derive(Clone, Debug, Default)]
pub struct SynthOptions {
    /// Voice name, as listed in the catalog. `None` keeps the current voice.
    pub voice: Option<String>,
    /// Words per minute, [80, 450].
    pub rate: Option<i32>,
    /// Percent of normal volume, non-negative.
    pub volume: Option<i32>,
    /// Base pitch, [0, 100].
    pub pitch: Option<i32>,
    /// Pitch range, [0, 100].
    pub tone: Option<i32>,
}

impl SynthOptions {
    /// Validate and resolve against defaults. Fails before the engine is ever
    /// touched.
    fn to_parameters(&self) -> Result<Parameters, SynthError> {
        let mut params = Parameters::default();

        if let Some(rate) = self.rate {
            params.set_rate(rate)?;
        }
        if let Some(volume) = self.volume {
            params.set_volume(volume)?;
        }
        if let Some(pitch) = self.pitch {
            params.set_pitch(pitch)?;
        }
        if let Some(tone) = self.tone {
            params.set_tone(tone)?;
        }

        Ok(params)
    }
}

/// Engine handle plus the snapshot of what has actually been pushed to it.
/// Everything in here is only touched while the gate is held.
struct EngineState {
    engine: Box<dyn Engine>,
    applied: Parameters,
    applied_voice: Option<String>,
}

impl EngineState {
    fn apply_voice(&mut self, voice: Option<&str>) -> Result<(), SynthError> {
        let Some(name) = voice else { return Ok(()) };

        if self.applied_voice.as_deref() == Some(name) {
            return Ok(());
        }

        // On failure the engine keeps its previous voice, so the snapshot
        // stays as-is too.
        self.engine.set_voice_by_name(name)?;
        debug!("voice changed to {name}");
        self.applied_voice = Some(name.to_string());

        Ok(())
    }

    fn apply_params(&mut self, params: &Parameters) -> Result<(), SynthError> {
        for (param, value) in params.diff(&self.applied) {
            self.engine.set_parameter(param, value)?;
            self.applied.set_unchecked(param, value);
        }

        Ok(())
    }
}

pub struct Synthesizer {
    /// The gate. Exactly one synthesis pipeline owns the engine's shared
    /// configuration and callback slot at a time.
    state: Mutex<EngineState>,
    registry: Arc<SessionRegistry>,
    sample_rate: u32,
    synth_timeout: Duration,
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("sample_rate", &self.sample_rate)
            .field("synth_timeout", &self.synth_timeout)
            .finish_non_exhaustive()
    }
}

impl Synthesizer {
    /// Initialize the engine in retrieval mode and install the callback
    /// adapter. Failure here is fatal: no synthesis is possible without a
    /// running engine.
    pub fn new(mut engine: Box<dyn Engine>, config: &Config) -> Result<Synthesizer, SynthError> {
        let registry = Arc::new(SessionRegistry::new());

        let options = InitOptions {
            phoneme_events: config.phoneme_events.unwrap_or(false),
            ..Default::default()
        };

        let sample_rate = engine
            .initialize(
                DeliveryMode::Retrieval,
                config.buffer_length_ms(),
                config.data_path.as_deref(),
                options,
            )
            .map_err(|e| {
                error!("engine initialization failed: {e}");
                SynthError::Initialization
            })?;

        let callback_registry = registry.clone();
        engine.set_callback(Box::new(move |samples, records| {
            synth_callback(&callback_registry, DeliveryMode::Retrieval, samples, records)
        }));

        let mut applied_voice = None;
        if let Some(name) = &config.default_voice {
            engine.set_voice_by_name(name)?;
            applied_voice = Some(name.clone());
        }

        info!("engine initialized, output sample rate {sample_rate} Hz");

        Ok(Synthesizer {
            state: Mutex::new(EngineState {
                engine,
                applied: Parameters::default(),
                applied_voice,
            }),
            registry,
            sample_rate,
            synth_timeout: config.synth_timeout(),
        })
    }

    /// Output sample rate reported by the engine at initialization.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Synthesize `text` into a complete WAV container written to `out`.
    /// Returns the number of bytes written.
    pub async fn synth<W: Write>(
        &self,
        out: &mut W,
        text: &str,
        opts: &SynthOptions,
    ) -> Result<u64, SynthError> {
        let params = opts.to_parameters()?;

        let mut state = self.state.lock().await;
        state.apply_voice(opts.voice.as_deref())?;
        state.apply_params(&params)?;

        let pcm = self.run_synth(&mut state, text).await?;
        drop(state);

        write_container(out, self.sample_rate, &pcm)
    }

    /// Start a multi-utterance accumulation producing a single container.
    pub fn concat(&self) -> Concat<'_> {
        Concat {
            synthesizer: self,
            pcm: Vec::new(),
        }
    }

    /// All voices in the engine's catalog, in undefined order.
    pub async fn list_voices(&self) -> Result<Vec<Voice>, SynthError> {
        let mut state = self.state.lock().await;
        Ok(state.engine.list_voices(None)?)
    }

    /// Voices matching the filter, ranked by the engine's own match quality.
    pub async fn find_voices(&self, filter: &VoiceFilter) -> Result<Vec<Voice>, SynthError> {
        let mut state = self.state.lock().await;
        Ok(state.engine.list_voices(Some(filter))?)
    }

    /// Issue the synth command and wait, bounded, for the session to resolve.
    /// Must be called with the gate held.
    async fn run_synth(
        &self,
        state: &mut EngineState,
        text: &str,
    ) -> Result<Vec<u8>, SynthError> {
        let (session, done) = Session::new();
        let token = self.registry.register(session.clone());
        debug!("synth request {token}: {} chars", text.chars().count());

        if let Err(e) = state.engine.synth(
            text,
            0,
            PositionType::Character,
            SynthFlags::default(),
            token,
        ) {
            // The command never made it into the engine, so no callback will
            // ever reference this session.
            self.registry.release(token);
            return Err(e.into());
        }

        let result = match timeout(self.synth_timeout, done).await {
            Ok(Ok(result)) => result,
            // The sender half only disappears if the session is torn down
            // without completing, which the registry keep-alive rules out
            // while we are waiting.
            Ok(Err(_)) => Err(SynthError::Internal),
            Err(_) => {
                warn!(
                    "synth request {token} did not complete within {:?}, cancelling",
                    self.synth_timeout
                );

                // Still under the gate: the engine's callback path cannot be
                // re-registered to another call while cancellation runs.
                if let Err(e) = state.engine.cancel() {
                    warn!("cancel after timeout failed: {e}");
                }

                self.registry.release(token);
                return Err(SynthError::Timeout);
            }
        };

        self.registry.release(token);
        result?;

        Ok(session.take_pcm())
    }
}

/// Accumulates the PCM of several sequential synth calls and emits them as
/// one container.
pub struct Concat<'a> {
    synthesizer: &'a Synthesizer,
    pcm: Vec<u8>,
}

impl Concat<'_> {
    pub async fn synth(&mut self, text: &str, opts: &SynthOptions) -> Result<(), SynthError> {
        let params = opts.to_parameters()?;

        let mut state = self.synthesizer.state.lock().await;
        state.apply_voice(opts.voice.as_deref())?;
        state.apply_params(&params)?;

        let pcm = self.synthesizer.run_synth(&mut state, text).await?;
        drop(state);

        self.pcm.extend_from_slice(&pcm);
        Ok(())
    }

    /// Write everything accumulated so far as one finished container.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<u64, SynthError> {
        write_container(out, self.synthesizer.sample_rate, &self.pcm)
    }
}

fn write_container<W: Write>(out: &mut W, sample_rate: u32, pcm: &[u8]) -> Result<u64, SynthError> {
    let mut buf = SeekBuffer::new();

    start_wav(&mut buf, sample_rate)?;
    buf.write_all(pcm)?;
    finish_wav(&mut buf)?;

    Ok(buf.write_to(out)?)
}
