//! Real eSpeak-NG engine binding over `espeakng-sys`.
//!
//! The C library supports a single process-wide callback registration, which
//! is exactly the contract the [`Engine`] trait exposes. The registered Rust
//! closure is kept in a global slot; the C trampoline translates the native
//! `espeak_EVENT` array into the record layout documented in [`crate::event`]
//! before handing it over, so everything above this module stays free of FFI
//! types.

#![allow(non_upper_case_globals)]

use crate::engine::{
    CallbackOutcome, Engine, EngineError, EngineResult, InitOptions, Parameter, PositionType,
    SynthCallback, SynthFlags,
};
use crate::event::{encode_event, DeliveryMode, EventKind, EventTiming, SynthEvent};
use crate::session::PoisonlessLock;
use crate::voice::{decode_language_list, Gender, Voice, VoiceFilter};
use espeakng_sys::*;
use lazy_static::lazy_static;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_int, c_short, c_uint};
use std::path::Path;
use std::ptr;
use std::sync::Mutex;
use std::time::Duration;

const OPTION_PHONEME_EVENTS: c_int = 1 << 0;
const OPTION_PHONEME_IPA: c_int = 1 << 1;
const OPTION_DONT_EXIT: c_int = 1 << 15;

lazy_static! {
    /// The single registered synth callback. The C library offers no per-call
    /// context for its trampoline, so this is global by necessity.
    static ref CALLBACK: Mutex<Option<SynthCallback>> = Mutex::new(None);
}

/// Engine implementation backed by the system eSpeak-NG library.
///
/// At most one instance may exist per process; the underlying library is a
/// singleton. The orchestrator's gate already guarantees serialized access.
#[derive(Default)]
pub struct EspeakEngine;

impl EspeakEngine {
    pub fn new() -> Self {
        EspeakEngine
    }
}

fn check(err: espeak_ERROR) -> EngineResult<()> {
    match err {
        espeak_ERROR_EE_OK => Ok(()),
        espeak_ERROR_EE_INTERNAL_ERROR => Err(EngineError::Internal),
        espeak_ERROR_EE_BUFFER_FULL => Err(EngineError::BufferFull),
        espeak_ERROR_EE_NOT_FOUND => Err(EngineError::NotFound),
        code => panic!("unknown engine error code {code}"),
    }
}

impl Engine for EspeakEngine {
    fn initialize(
        &mut self,
        mode: DeliveryMode,
        buffer_length_ms: u32,
        data_path: Option<&Path>,
        options: InitOptions,
    ) -> EngineResult<u32> {
        let output = match mode {
            DeliveryMode::Retrieval => espeak_AUDIO_OUTPUT_AUDIO_OUTPUT_RETRIEVAL,
            DeliveryMode::Playback => espeak_AUDIO_OUTPUT_AUDIO_OUTPUT_PLAYBACK,
        };

        let mut option_bits = 0;
        if options.phoneme_events {
            option_bits |= OPTION_PHONEME_EVENTS;
        }
        if options.phoneme_ipa {
            option_bits |= OPTION_PHONEME_IPA;
        }
        if options.dont_exit {
            option_bits |= OPTION_DONT_EXIT;
        }

        let path = data_path
            .map(|p| CString::new(p.to_string_lossy().into_owned()))
            .transpose()
            .map_err(|_| EngineError::Internal)?;
        let path_ptr = path
            .as_ref()
            .map_or(ptr::null(), |p| p.as_ptr());

        let sample_rate = unsafe {
            espeak_Initialize(output, buffer_length_ms as c_int, path_ptr, option_bits)
        };
        if sample_rate == -1 {
            return Err(EngineError::Internal);
        }

        Ok(sample_rate as u32)
    }

    fn set_callback(&mut self, callback: SynthCallback) {
        *CALLBACK.plock() = Some(callback);

        unsafe {
            espeak_SetSynthCallback(Some(synth_trampoline));
        }
    }

    fn set_parameter(&mut self, param: Parameter, value: i32) -> EngineResult<()> {
        let param = match param {
            Parameter::Rate => espeak_PARAMETER_espeakRATE,
            Parameter::Volume => espeak_PARAMETER_espeakVOLUME,
            Parameter::Pitch => espeak_PARAMETER_espeakPITCH,
            Parameter::Tone => espeak_PARAMETER_espeakRANGE,
        };

        check(unsafe { espeak_SetParameter(param, value as c_int, 0) })
    }

    fn set_voice_by_name(&mut self, name: &str) -> EngineResult<()> {
        let name = CString::new(name).map_err(|_| EngineError::NotFound)?;

        check(unsafe { espeak_SetVoiceByName(name.as_ptr()) })
    }

    fn set_voice_by_properties(&mut self, filter: &VoiceFilter) -> EngineResult<()> {
        let name = filter
            .name
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(|_| EngineError::NotFound)?;
        let language = filter
            .language
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(|_| EngineError::NotFound)?;

        let mut spec: espeak_VOICE = unsafe { std::mem::zeroed() };
        spec.name = name.as_ref().map_or(ptr::null(), |n| n.as_ptr());
        spec.languages = language.as_ref().map_or(ptr::null(), |l| l.as_ptr());
        spec.gender = filter.gender.unwrap_or_default().code();
        spec.age = filter.age;
        spec.variant = filter.variant;

        check(unsafe { espeak_SetVoiceByProperties(&mut spec) })
    }

    fn synth(
        &mut self,
        text: &str,
        position: u32,
        position_type: PositionType,
        flags: SynthFlags,
        token: u64,
    ) -> EngineResult<()> {
        // NUL bytes cannot cross the FFI boundary.
        let filtered: String = text.chars().filter(|&c| c != '\0').collect();
        let size = filtered.len() + 1;
        let text = CString::new(filtered).map_err(|_| EngineError::Internal)?;

        let position_type = match position_type {
            PositionType::Character => espeak_POSITION_TYPE_POS_CHARACTER,
            PositionType::Word => espeak_POSITION_TYPE_POS_WORD,
            PositionType::Sentence => espeak_POSITION_TYPE_POS_SENTENCE,
        };

        let mut flag_bits = espeakCHARS_UTF8;
        if flags.ssml {
            flag_bits |= espeakSSML;
        }
        if flags.phonemes {
            flag_bits |= espeakPHONEMES;
        }
        if flags.end_pause {
            flag_bits |= espeakENDPAUSE;
        }

        check(unsafe {
            espeak_Synth(
                text.as_ptr() as *const c_void,
                size,
                position as c_uint,
                position_type,
                0,
                flag_bits,
                ptr::null_mut(),
                token as usize as *mut c_void,
            )
        })
    }

    fn cancel(&mut self) -> EngineResult<()> {
        check(unsafe { espeak_Cancel() })
    }

    fn list_voices(&mut self, filter: Option<&VoiceFilter>) -> EngineResult<Vec<Voice>> {
        let name = filter
            .and_then(|f| f.name.as_deref())
            .map(CString::new)
            .transpose()
            .map_err(|_| EngineError::NotFound)?;
        let language = filter
            .and_then(|f| f.language.as_deref())
            .map(CString::new)
            .transpose()
            .map_err(|_| EngineError::NotFound)?;

        let mut spec: espeak_VOICE = unsafe { std::mem::zeroed() };
        let spec_ptr = match filter {
            Some(f) => {
                spec.name = name.as_ref().map_or(ptr::null(), |n| n.as_ptr());
                spec.languages = language.as_ref().map_or(ptr::null(), |l| l.as_ptr());
                spec.gender = f.gender.unwrap_or_default().code();
                spec.age = f.age;
                &mut spec as *mut espeak_VOICE
            }
            None => ptr::null_mut(),
        };

        let mut voices = Vec::new();
        unsafe {
            let mut entry = espeak_ListVoices(spec_ptr);
            while !entry.is_null() && !(*entry).is_null() {
                voices.push(convert_voice(*entry));
                entry = entry.add(1);
            }
        }

        Ok(voices)
    }
}

unsafe fn convert_voice(voice: *const espeak_VOICE) -> Voice {
    Voice {
        name: read_c_str((*voice).name),
        languages: decode_language_list(&packed_language_bytes((*voice).languages)),
        identifier: read_c_str((*voice).identifier),
        gender: Gender::from_code((*voice).gender),
        age: (*voice).age,
    }
}

unsafe fn read_c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }

    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// Copy the packed (priority, NUL-terminated name) language list, sentinel
/// included, into an owned buffer for the safe decoder.
unsafe fn packed_language_bytes(mut ptr: *const c_char) -> Vec<u8> {
    let mut bytes = Vec::new();
    if ptr.is_null() {
        return bytes;
    }

    loop {
        let priority = *ptr as u8;
        bytes.push(priority);
        if priority == 0 {
            return bytes;
        }
        ptr = ptr.add(1);

        loop {
            let b = *ptr as u8;
            bytes.push(b);
            ptr = ptr.add(1);
            if b == 0 {
                break;
            }
        }
    }
}

/// C trampoline: translates the native sample/event buffers into the
/// documented record layout and forwards them to the registered callback.
unsafe extern "C" fn synth_trampoline(
    wav: *mut c_short,
    numsamples: c_int,
    events: *mut espeak_EVENT,
) -> c_int {
    let samples: &[i16] = if wav.is_null() || numsamples <= 0 {
        &[]
    } else {
        std::slice::from_raw_parts(wav, numsamples as usize)
    };

    let mut records = Vec::new();
    let mut event = events;
    loop {
        if let Some(converted) = convert_event(event) {
            encode_event(&mut records, &converted);
        }

        if (*event).type_ == espeak_EVENT_TYPE_espeakEVENT_LIST_TERMINATED {
            break;
        }

        event = event.add(1);
    }

    let mut callback = CALLBACK.plock();
    let Some(callback) = callback.as_mut() else {
        // Nothing registered: nobody is interested, stop synthesis.
        return 1;
    };

    match callback(samples, &records) {
        CallbackOutcome::Continue => 0,
        CallbackOutcome::Stop => 1,
    }
}

unsafe fn convert_event(event: *const espeak_EVENT) -> Option<SynthEvent> {
    let kind = match (*event).type_ {
        espeak_EVENT_TYPE_espeakEVENT_LIST_TERMINATED => EventKind::ListTerminated,
        espeak_EVENT_TYPE_espeakEVENT_WORD => EventKind::Word {
            number: (*event).id.number as u32,
        },
        espeak_EVENT_TYPE_espeakEVENT_SENTENCE => EventKind::Sentence {
            number: (*event).id.number as u32,
        },
        espeak_EVENT_TYPE_espeakEVENT_MARK => EventKind::Mark {
            name: read_c_str((*event).id.name),
        },
        espeak_EVENT_TYPE_espeakEVENT_PLAY => EventKind::Play {
            name: read_c_str((*event).id.name),
        },
        espeak_EVENT_TYPE_espeakEVENT_END => EventKind::End,
        espeak_EVENT_TYPE_espeakEVENT_MSG_TERMINATED => EventKind::MsgTerminated,
        espeak_EVENT_TYPE_espeakEVENT_PHONEME => EventKind::Phoneme {
            phoneme: {
                let bytes: Vec<u8> = (*event)
                    .id
                    .string
                    .iter()
                    .map(|&c| c as u8)
                    .take_while(|&b| b != 0)
                    .collect();
                String::from_utf8_lossy(&bytes).into_owned()
            },
        },
        espeak_EVENT_TYPE_espeakEVENT_SAMPLERATE => EventKind::SampleRate {
            rate: (*event).id.number as u32,
        },
        _ => return None,
    };

    Some(SynthEvent {
        token: (*event).user_data as usize as u64,
        timing: EventTiming {
            message_id: (*event).unique_identifier,
            text_position: (*event).text_position as u32,
            length: (*event).length as u32,
            audio_position: Duration::from_millis((*event).audio_position as u64),
            sample: (*event).sample as u32,
        },
        kind,
    })
}
