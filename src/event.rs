//! Decoding of the engine's fixed-layout event records.
//!
//! Each callback invocation carries a block of consecutive 48-byte records.
//! The layout is fixed by the engine ABI; all integers are little-endian:
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | type tag (see `TAG_*`)                  |
//! | 4      | 4    | unique message identifier               |
//! | 8      | 4    | text position, characters from start    |
//! | 12     | 4    | length in characters (Word)             |
//! | 16     | 4    | audio position, ms from start of output |
//! | 20     | 4    | sample index                            |
//! | 24     | 8    | user-data token (request correlation)   |
//! | 32     | 16   | type-specific payload                   |
//!
//! Payload use per tag: Word/Sentence/SampleRate store a `u32` number at
//! offset 0 of the payload; Mark/Play store a NUL-terminated name of at most
//! 15 bytes; Phoneme stores a NUL-padded string of at most [`PHONEME_LEN`]
//! bytes, unterminated when it fills the field. Remaining payload bytes are
//! zero.
//!
//! A record block always ends with a ListTerminated record. A tag outside the
//! documented set, or a block that is not a whole number of records, means the
//! engine binding and this decoder disagree about the ABI version; both are
//! programming errors and panic.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::time::Duration;

pub const RECORD_SIZE: usize = 48;
pub const PAYLOAD_SIZE: usize = 16;
/// Phoneme strings are bounded by the engine ABI.
pub const PHONEME_LEN: usize = 8;

const TYPE_OFFSET: usize = 0;
const ID_OFFSET: usize = 4;
const TEXT_POSITION_OFFSET: usize = 8;
const LENGTH_OFFSET: usize = 12;
const AUDIO_POSITION_OFFSET: usize = 16;
const SAMPLE_OFFSET: usize = 20;
const TOKEN_OFFSET: usize = 24;
const PAYLOAD_OFFSET: usize = 32;

pub const TAG_LIST_TERMINATED: u32 = 0;
pub const TAG_WORD: u32 = 1;
pub const TAG_SENTENCE: u32 = 2;
pub const TAG_MARK: u32 = 3;
pub const TAG_PLAY: u32 = 4;
pub const TAG_END: u32 = 5;
pub const TAG_MSG_TERMINATED: u32 = 6;
pub const TAG_PHONEME: u32 = 7;
pub const TAG_SAMPLERATE: u32 = 8;

/// How many records a single callback invocation may carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Audio is handed to the caller; one invocation may carry a whole queue
    /// of records, terminated by a ListTerminated record.
    #[default]
    Retrieval,
    /// The engine plays audio itself and delivers at most one meaningful
    /// record per invocation.
    Playback,
}

/// Fields common to every event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventTiming {
    /// Message identifier assigned by the engine.
    pub message_id: u32,
    /// Characters from the start of the text.
    pub text_position: u32,
    /// Word length in characters.
    pub length: u32,
    /// Time within the generated speech output.
    pub audio_position: Duration,
    /// Sample index within the generated output.
    pub sample: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Start of word
    Word { number: u32 },
    /// Start of sentence
    Sentence { number: u32 },
    /// `<mark>` element
    Mark { name: String },
    /// `<audio>` element
    Play { name: String },
    /// End of sentence or clause
    End,
    /// End of message
    MsgTerminated,
    /// Phoneme, if enabled at engine initialization
    Phoneme { phoneme: String },
    /// Sample rate change
    SampleRate { rate: u32 },
    /// Terminates a record block in retrieval mode
    ListTerminated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthEvent {
    /// Opaque back-reference to the owning session.
    pub token: u64,
    pub timing: EventTiming,
    pub kind: EventKind,
}

impl SynthEvent {
    pub fn is_terminal(&self) -> bool {
        self.kind == EventKind::MsgTerminated
    }
}

/// Decode one callback invocation's record block into typed events.
///
/// Retrieval mode keeps decoding until the ListTerminated record, which is
/// emitted as the final event. Playback mode decodes exactly one record and
/// stops, whatever its tag.
pub fn decode_events(records: &[u8], mode: DeliveryMode) -> Vec<SynthEvent> {
    let mut events = Vec::new();
    let mut pos = 0;

    loop {
        let event = decode_record(records, pos);
        let terminated = event.kind == EventKind::ListTerminated;
        events.push(event);

        if terminated || mode == DeliveryMode::Playback {
            break;
        }

        pos += RECORD_SIZE;
    }

    events
}

fn decode_record(records: &[u8], pos: usize) -> SynthEvent {
    assert!(
        records.len() >= pos + RECORD_SIZE,
        "truncated event record at offset {pos}: {} bytes total",
        records.len()
    );
    let record = &records[pos..pos + RECORD_SIZE];
    let payload = &record[PAYLOAD_OFFSET..PAYLOAD_OFFSET + PAYLOAD_SIZE];

    let tag = LittleEndian::read_u32(&record[TYPE_OFFSET..]);
    let kind = match tag {
        TAG_LIST_TERMINATED => EventKind::ListTerminated,
        TAG_WORD => EventKind::Word {
            number: LittleEndian::read_u32(payload),
        },
        TAG_SENTENCE => EventKind::Sentence {
            number: LittleEndian::read_u32(payload),
        },
        TAG_MARK => EventKind::Mark {
            name: read_str(payload, PAYLOAD_SIZE),
        },
        TAG_PLAY => EventKind::Play {
            name: read_str(payload, PAYLOAD_SIZE),
        },
        TAG_END => EventKind::End,
        TAG_MSG_TERMINATED => EventKind::MsgTerminated,
        TAG_PHONEME => EventKind::Phoneme {
            phoneme: read_str(payload, PHONEME_LEN),
        },
        TAG_SAMPLERATE => EventKind::SampleRate {
            rate: LittleEndian::read_u32(payload),
        },
        tag => panic!("unexpected event type {tag}, engine ABI mismatch"),
    };

    SynthEvent {
        token: LittleEndian::read_u64(&record[TOKEN_OFFSET..]),
        timing: EventTiming {
            message_id: LittleEndian::read_u32(&record[ID_OFFSET..]),
            text_position: LittleEndian::read_u32(&record[TEXT_POSITION_OFFSET..]),
            length: LittleEndian::read_u32(&record[LENGTH_OFFSET..]),
            audio_position: Duration::from_millis(
                LittleEndian::read_u32(&record[AUDIO_POSITION_OFFSET..]) as u64,
            ),
            sample: LittleEndian::read_u32(&record[SAMPLE_OFFSET..]),
        },
        kind,
    }
}

/// Read a NUL-terminated string of at most `max` bytes from a payload.
fn read_str(payload: &[u8], max: usize) -> String {
    let bytes = &payload[..max];
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(max);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Append one record in the documented layout.
///
/// Used by engine bindings when translating native event structures onto the
/// wire, and by tests to script callback payloads.
pub fn encode_event(buf: &mut Vec<u8>, event: &SynthEvent) {
    let (tag, payload) = encode_payload(&event.kind);

    buf.write_u32::<LittleEndian>(tag).unwrap();
    buf.write_u32::<LittleEndian>(event.timing.message_id).unwrap();
    buf.write_u32::<LittleEndian>(event.timing.text_position)
        .unwrap();
    buf.write_u32::<LittleEndian>(event.timing.length).unwrap();
    buf.write_u32::<LittleEndian>(event.timing.audio_position.as_millis() as u32)
        .unwrap();
    buf.write_u32::<LittleEndian>(event.timing.sample).unwrap();
    buf.write_u64::<LittleEndian>(event.token).unwrap();
    buf.extend_from_slice(&payload);
}

fn encode_payload(kind: &EventKind) -> (u32, [u8; PAYLOAD_SIZE]) {
    let mut payload = [0u8; PAYLOAD_SIZE];

    let tag = match kind {
        EventKind::ListTerminated => TAG_LIST_TERMINATED,
        EventKind::Word { number } => {
            LittleEndian::write_u32(&mut payload, *number);
            TAG_WORD
        }
        EventKind::Sentence { number } => {
            LittleEndian::write_u32(&mut payload, *number);
            TAG_SENTENCE
        }
        EventKind::Mark { name } => {
            write_str(&mut payload, name, PAYLOAD_SIZE - 1);
            TAG_MARK
        }
        EventKind::Play { name } => {
            write_str(&mut payload, name, PAYLOAD_SIZE - 1);
            TAG_PLAY
        }
        EventKind::End => TAG_END,
        EventKind::MsgTerminated => TAG_MSG_TERMINATED,
        EventKind::Phoneme { phoneme } => {
            write_str(&mut payload, phoneme, PHONEME_LEN);
            TAG_PHONEME
        }
        EventKind::SampleRate { rate } => {
            LittleEndian::write_u32(&mut payload, *rate);
            TAG_SAMPLERATE
        }
    };

    (tag, payload)
}

fn write_str(payload: &mut [u8], s: &str, max: usize) {
    let len = s.len().min(max);
    payload[..len].copy_from_slice(&s.as_bytes()[..len]);
}
