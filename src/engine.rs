//! The narrow command surface of the speech synthesis engine.
//!
//! The engine is an external collaborator with process-wide mutable state: one
//! current voice, one set of prosody parameters and a single callback
//! registration. Everything above this trait (gate, sessions, container
//! assembly) treats it as opaque. A real eSpeak-NG implementation lives in
//! [`crate::espeak`] behind the `espeak` feature; tests use a scripted mock.

use crate::event::DeliveryMode;
use crate::voice::{Voice, VoiceFilter};
use std::path::Path;
use thiserror::Error;

/// Errors reported by engine commands, mirroring the engine's own codes.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("internal error")]
    Internal,
    #[error("buffer full")]
    BufferFull,
    #[error("not found")]
    NotFound,
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-global prosody parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Speaking rate in words per minute.
    Rate,
    /// Volume in percent of normal.
    Volume,
    /// Base pitch.
    Pitch,
    /// Pitch range (tone).
    Tone,
}

/// Interpretation of the `position` argument to [`Engine::synth`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PositionType {
    #[default]
    Character,
    Word,
    Sentence,
}

/// Flags for a single synth command.
#[derive(Clone, Copy, Debug, Default)]
pub struct SynthFlags {
    /// Treat elements within `< >` as SSML.
    pub ssml: bool,
    /// Treat text within `[[ ]]` as phoneme codes.
    pub phonemes: bool,
    /// Add a sentence pause at the end of the text.
    pub end_pause: bool,
}

/// Options for [`Engine::initialize`].
#[derive(Clone, Copy, Debug, Default)]
pub struct InitOptions {
    /// Deliver phoneme events during synthesis.
    pub phoneme_events: bool,
    /// Phoneme events carry IPA names instead of engine-internal ones.
    pub phoneme_ipa: bool,
    /// Do not exit the process if the voice data directory is missing.
    pub dont_exit: bool,
}

/// Returned by the synth callback to keep or stop the current synthesis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    Continue,
    Stop,
}

/// The single global callback registration point.
///
/// Invoked by the engine from its own delivery path, possibly many times per
/// synth command, with a chunk of 16-bit samples and a block of event records
/// in the fixed layout documented in [`crate::event`].
pub type SynthCallback = Box<dyn FnMut(&[i16], &[u8]) -> CallbackOutcome + Send>;

/// Command surface consumed from the engine binding.
///
/// All methods mutate or read engine-global state and must only be called
/// while the orchestrator's gate is held.
pub trait Engine: Send {
    /// Start the engine. Returns the output sample rate in Hz.
    fn initialize(
        &mut self,
        mode: DeliveryMode,
        buffer_length_ms: u32,
        data_path: Option<&Path>,
        options: InitOptions,
    ) -> EngineResult<u32>;

    /// Install the synth callback. The engine holds exactly one registration.
    fn set_callback(&mut self, callback: SynthCallback);

    fn set_parameter(&mut self, param: Parameter, value: i32) -> EngineResult<()>;

    /// Select a voice by its exact name. Language is not considered.
    fn set_voice_by_name(&mut self, name: &str) -> EngineResult<()>;

    /// Select the best voice matching the filter.
    fn set_voice_by_properties(&mut self, filter: &VoiceFilter) -> EngineResult<()>;

    /// Issue an asynchronous synthesis command. The command is internally
    /// buffered and returns as soon as possible; sample data and events
    /// arrive via the registered callback, each record carrying back `token`
    /// in its user-data field.
    fn synth(
        &mut self,
        text: &str,
        position: u32,
        position_type: PositionType,
        flags: SynthFlags,
        token: u64,
    ) -> EngineResult<()>;

    /// Stop synthesis of the current and any queued commands.
    fn cancel(&mut self) -> EngineResult<()>;

    /// Read the voice catalog. With a filter, matching voices are returned in
    /// preference order; without one, the order is undefined.
    fn list_voices(&mut self, filter: Option<&VoiceFilter>) -> EngineResult<Vec<Voice>>;
}
