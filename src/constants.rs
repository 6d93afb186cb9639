// Parameter ranges and defaults as documented by the engine
pub const MIN_RATE: i32 = 80; // words per minute
pub const MAX_RATE: i32 = 450;
pub const DEFAULT_RATE: i32 = 175;

pub const DEFAULT_VOLUME: i32 = 100; // percent, no upper bound

pub const MIN_PITCH: i32 = 0;
pub const MAX_PITCH: i32 = 100;
pub const DEFAULT_PITCH: i32 = 50;

pub const MIN_TONE: i32 = 0; // pitch range, 0 is monotone
pub const MAX_TONE: i32 = 100;
pub const DEFAULT_TONE: i32 = 50;

/// How long to wait for the engine to report end of message before cancelling.
pub const DEFAULT_SYNTH_TIMEOUT_MS: u64 = 1000;
