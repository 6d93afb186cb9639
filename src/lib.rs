//! espeak-wav-rs library crate
//!
//! Drives a callback-based speech synthesis engine (eSpeak-NG shaped) and
//! collects its asynchronous sample/event stream into finished WAV containers.
//! The engine itself is consumed through the [`engine::Engine`] trait; a real
//! binding over `espeakng-sys` is available behind the `espeak` feature.

#[macro_use]
extern crate log;

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
#[cfg(feature = "espeak")]
pub mod espeak;
pub mod event;
pub mod params;
pub mod session;
pub mod synth;
pub mod voice;
pub mod wav;

// Test modules
#[cfg(test)]
mod event_tests;
