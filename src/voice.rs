//! Voice catalog types.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub enum Gender {
    #[default]
    Unknown,
    Male,
    Female,
    Neutral,
}

impl Gender {
    pub fn from_code(code: u8) -> Gender {
        match code {
            1 => Gender::Male,
            2 => Gender::Female,
            3 => Gender::Neutral,
            _ => Gender::Unknown,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Gender::Unknown => 0,
            Gender::Male => 1,
            Gender::Female => 2,
            Gender::Neutral => 3,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Language {
    /// A low number indicates a more preferred voice.
    pub priority: u8,
    /// Language code with optional dialect qualifier, e.g. "en-uk".
    pub name: String,
}

/// A single entry of the engine's voice catalog. Immutable once read.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Voice {
    /// A given name for this voice.
    pub name: String,
    pub languages: Vec<Language>,
    /// The filename for this voice within the voice data directory.
    pub identifier: String,
    pub gender: Gender,
    /// Age in years, or 0 if not specified.
    pub age: u8,
}

/// Search criteria for voice lookup. Empty fields match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoiceFilter {
    pub name: Option<String>,
    /// A single language code, with optional dialect, e.g. "en" or "en-uk".
    pub language: Option<String>,
    pub gender: Option<Gender>,
    /// Age in years, 0 for any.
    pub age: u8,
    /// Index into the ranked match list, 0 for the best match.
    pub variant: u8,
}

impl VoiceFilter {
    pub fn by_name(name: &str) -> Self {
        VoiceFilter {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

/// Decode the engine's packed language list: (priority byte, NUL-terminated
/// language string) pairs terminated by a zero-priority sentinel.
///
/// Engine bindings read this form straight out of the voice structure.
pub fn decode_language_list(data: &[u8]) -> Vec<Language> {
    let mut languages = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let priority = data[pos];
        if priority == 0 {
            break;
        }
        pos += 1;

        let rest = &data[pos..];
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        languages.push(Language {
            priority,
            name: String::from_utf8_lossy(&rest[..len]).into_owned(),
        });

        pos += len + 1;
    }

    languages
}
