use crate::constants::DEFAULT_SYNTH_TIMEOUT_MS;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::read_to_string;

#[derive(Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Length in milliseconds of the sound buffers passed to the synth
    /// callback. `None` uses the engine default.
    pub buffer_length_ms: Option<u32>,

    /// Directory containing the engine's voice data, `None` for the default
    /// location.
    pub data_path: Option<PathBuf>,

    /// Bound on the wait for a synthesis to complete before it is cancelled.
    pub synth_timeout_ms: Option<u64>,

    /// Voice selected right after engine initialization.
    pub default_voice: Option<String>,

    /// Deliver phoneme events during synthesis.
    pub phoneme_events: Option<bool>,
}

impl Config {
    pub fn synth_timeout(&self) -> Duration {
        Duration::from_millis(self.synth_timeout_ms.unwrap_or(DEFAULT_SYNTH_TIMEOUT_MS))
    }

    pub fn buffer_length_ms(&self) -> u32 {
        self.buffer_length_ms.unwrap_or(0)
    }
}

pub async fn load() -> Result<Config> {
    let config = read_to_string("Config.toml").await?;
    let config: Config = toml::from_str(&config)?;

    Ok(config)
}
