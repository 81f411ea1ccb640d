//! Musical parameters carried by events.
//!
//! Pitches and volumes are small value objects. Leaf events store them, along
//! with any other named attribute, as [`ParameterValue`]s. Playing and
//! notation indicators live in [`indicators`].

pub mod indicators;
mod pitches;
mod volumes;

pub use indicators::{Indicator, NotationIndicators, PlayingIndicators};

pub use pitches::{
    cents_to_ratio, hertz_to_cents, hertz_to_midi_pitch_number, midi_pitch_number_to_hertz,
    parse_pitches, ratio_to_cents, DirectPitch, JustIntonationPitch, Pitch, WesternPitch,
    DEFAULT_CONCERT_PITCH,
};
pub use volumes::{
    amplitude_ratio_to_decibel, amplitude_to_midi_velocity, decibel_to_amplitude_ratio,
    decibel_to_power_ratio, power_ratio_to_decibel, DecibelVolume, DirectVolume, Volume,
    WesternVolume, DYNAMIC_INDICATORS,
};

use crate::duration::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known parameter names used by the default extractors.
pub mod names {
    /// One pitch for a tone, several for a chord, none for a rest.
    pub const PITCH_OR_PITCHES: &str = "pitch_or_pitches";
    pub const VOLUME: &str = "volume";
    /// X-SAMPA vowel sung by ISiS.
    pub const VOWEL: &str = "vowel";
    /// X-SAMPA consonants sung before the vowel.
    pub const CONSONANTS: &str = "consonants";
    pub const PLAYING_INDICATORS: &str = "playing_indicators";
    pub const NOTATION_INDICATORS: &str = "notation_indicators";
}

/// Errors raised while building parameter values.
#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("unknown diatonic pitch name '{0}'")]
    UnknownPitchName(String),
    #[error("unknown accidental '{0}'")]
    UnknownAccidental(String),
    #[error("can't build a pitch from '{0}': expected a ratio like '3/2' or a name like 'c4', 'fs' or 'aqs2'")]
    InvalidPitchIndication(String),
    #[error("invalid frequency ratio '{0}'")]
    InvalidRatio(String),
    #[error("unknown dynamic indicator '{0}'")]
    UnknownDynamic(String),
    #[error("volume must be a finite number, got {0}")]
    InvalidVolume(f64),
}

/// A named attribute value stored on a [`SimpleEvent`](crate::events::SimpleEvent).
///
/// Serialized externally tagged, e.g. `{"number": 0.25}`, so the same shape
/// works for JSON and bincode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterValue {
    /// Empty for a rest.
    Pitches(Vec<Pitch>),
    Volume(Volume),
    /// A single word, e.g. a vowel.
    Text(String),
    /// A list of words, e.g. consonants.
    Symbols(Vec<String>),
    Number(f64),
    Duration(Duration),
    Flag(bool),
    PlayingIndicators(Box<PlayingIndicators>),
    NotationIndicators(Box<NotationIndicators>),
}

/// Typed views of a value. Each returns `None` for the other variants.
impl ParameterValue {
    pub fn as_pitches(&self) -> Option<&[Pitch]> {
        match self {
            ParameterValue::Pitches(pitches) => Some(pitches),
            _ => None,
        }
    }

    pub fn as_volume(&self) -> Option<&Volume> {
        match self {
            ParameterValue::Volume(volume) => Some(volume),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_symbols(&self) -> Option<&[String]> {
        match self {
            ParameterValue::Symbols(symbols) => Some(symbols),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_playing_indicators(&self) -> Option<&PlayingIndicators> {
        match self {
            ParameterValue::PlayingIndicators(indicators) => Some(&**indicators),
            _ => None,
        }
    }

    pub fn as_playing_indicators_mut(&mut self) -> Option<&mut PlayingIndicators> {
        match self {
            ParameterValue::PlayingIndicators(indicators) => Some(&mut **indicators),
            _ => None,
        }
    }

    pub fn as_notation_indicators(&self) -> Option<&NotationIndicators> {
        match self {
            ParameterValue::NotationIndicators(indicators) => Some(&**indicators),
            _ => None,
        }
    }

    pub fn as_notation_indicators_mut(&mut self) -> Option<&mut NotationIndicators> {
        match self {
            ParameterValue::NotationIndicators(indicators) => Some(&mut **indicators),
            _ => None,
        }
    }
}

impl From<Pitch> for ParameterValue {
    fn from(pitch: Pitch) -> Self {
        ParameterValue::Pitches(vec![pitch])
    }
}

impl From<Vec<Pitch>> for ParameterValue {
    fn from(pitches: Vec<Pitch>) -> Self {
        ParameterValue::Pitches(pitches)
    }
}

impl From<Volume> for ParameterValue {
    fn from(volume: Volume) -> Self {
        ParameterValue::Volume(volume)
    }
}

impl From<&str> for ParameterValue {
    fn from(text: &str) -> Self {
        ParameterValue::Text(text.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(text: String) -> Self {
        ParameterValue::Text(text)
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(symbols: Vec<String>) -> Self {
        ParameterValue::Symbols(symbols)
    }
}

impl From<f64> for ParameterValue {
    fn from(n: f64) -> Self {
        ParameterValue::Number(n)
    }
}

impl From<Duration> for ParameterValue {
    fn from(d: Duration) -> Self {
        ParameterValue::Duration(d)
    }
}

impl From<bool> for ParameterValue {
    fn from(flag: bool) -> Self {
        ParameterValue::Flag(flag)
    }
}

impl From<PlayingIndicators> for ParameterValue {
    fn from(indicators: PlayingIndicators) -> Self {
        ParameterValue::PlayingIndicators(Box::new(indicators))
    }
}

impl From<NotationIndicators> for ParameterValue {
    fn from(indicators: NotationIndicators) -> Self {
        ParameterValue::NotationIndicators(Box::new(indicators))
    }
}
