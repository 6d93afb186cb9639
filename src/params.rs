//! Prosody parameters with range validation.
//!
//! Out-of-range values are contract violations rejected here, before any
//! engine command is issued. The engine itself keeps one process-wide copy of
//! these values; [`Parameters::diff`] computes which ones actually have to be
//! pushed for a given call.

use crate::constants::{
    DEFAULT_PITCH, DEFAULT_RATE, DEFAULT_TONE, DEFAULT_VOLUME, MAX_PITCH, MAX_RATE, MAX_TONE,
    MIN_PITCH, MIN_RATE, MIN_TONE,
};
use crate::engine::Parameter;
use crate::error::SynthError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parameters {
    rate: i32,
    volume: i32,
    pitch: i32,
    tone: i32,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            rate: DEFAULT_RATE,
            volume: DEFAULT_VOLUME,
            pitch: DEFAULT_PITCH,
            tone: DEFAULT_TONE,
        }
    }
}

impl Parameters {
    pub fn rate(&self) -> i32 {
        self.rate
    }

    pub fn volume(&self) -> i32 {
        self.volume
    }

    pub fn pitch(&self) -> i32 {
        self.pitch
    }

    pub fn tone(&self) -> i32 {
        self.tone
    }

    /// Speaking rate in words per minute, [80, 450].
    pub fn set_rate(&mut self, wpm: i32) -> Result<(), SynthError> {
        if !(MIN_RATE..=MAX_RATE).contains(&wpm) {
            return Err(SynthError::Validation(format!(
                "rate must be between {MIN_RATE} and {MAX_RATE} wpm, got {wpm}"
            )));
        }

        self.rate = wpm;
        Ok(())
    }

    /// Volume in percent. 0 is silent, 100 is normal full volume, values
    /// above 100 may be distorted.
    pub fn set_volume(&mut self, percent: i32) -> Result<(), SynthError> {
        if percent < 0 {
            return Err(SynthError::Validation(format!(
                "volume must not be negative, got {percent}"
            )));
        }

        self.volume = percent;
        Ok(())
    }

    /// Base pitch, [0, 100]. 50 is normal.
    pub fn set_pitch(&mut self, pitch: i32) -> Result<(), SynthError> {
        if !(MIN_PITCH..=MAX_PITCH).contains(&pitch) {
            return Err(SynthError::Validation(format!(
                "pitch must be between {MIN_PITCH} and {MAX_PITCH}, got {pitch}"
            )));
        }

        self.pitch = pitch;
        Ok(())
    }

    /// Pitch range, [0, 100]. 0 is monotone, 50 is normal.
    pub fn set_tone(&mut self, tone: i32) -> Result<(), SynthError> {
        if !(MIN_TONE..=MAX_TONE).contains(&tone) {
            return Err(SynthError::Validation(format!(
                "tone must be between {MIN_TONE} and {MAX_TONE}, got {tone}"
            )));
        }

        self.tone = tone;
        Ok(())
    }

    /// Record a value as applied without re-validating. Only for values that
    /// already passed a setter.
    pub(crate) fn set_unchecked(&mut self, param: Parameter, value: i32) {
        match param {
            Parameter::Rate => self.rate = value,
            Parameter::Volume => self.volume = value,
            Parameter::Pitch => self.pitch = value,
            Parameter::Tone => self.tone = value,
        }
    }

    /// Parameters that differ from the engine's last-applied snapshot, in a
    /// fixed order.
    pub fn diff(&self, applied: &Parameters) -> Vec<(Parameter, i32)> {
        let mut changed = Vec::new();

        if self.rate != applied.rate {
            changed.push((Parameter::Rate, self.rate));
        }
        if self.volume != applied.volume {
            changed.push((Parameter::Volume, self.volume));
        }
        if self.pitch != applied.pitch {
            changed.push((Parameter::Pitch, self.pitch));
        }
        if self.tone != applied.tone {
            changed.push((Parameter::Tone, self.tone));
        }

        changed
    }
}
