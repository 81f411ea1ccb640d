//! Pitch representations.
//!
//! Every pitch knows its frequency in Hertz and its (possibly fractional)
//! MIDI pitch number. Western note names, just-intonation ratios and raw
//! frequencies are supported.

use super::ParameterError;
use num_rational::Ratio;
use num_traits::{One, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Frequency of the reference pitch a4 in Hertz.
pub const DEFAULT_CONCERT_PITCH: f64 = 440.0;

/// MIDI pitch number of the reference pitch a4.
const CONCERT_PITCH_MIDI_NUMBER: f64 = 69.0;

/// Octave of the reference pitch a4 (MIDI convention, 4 = middle octave).
const CONCERT_PITCH_OCTAVE: i32 = 4;

/// Pitch class of the reference pitch a4.
const CONCERT_PITCH_PITCH_CLASS: f64 = 9.0;

/// Diatonic names of the chromatic scale mapped to their pitch class.
const DIATONIC_PITCH_CLASSES: [(char, f64); 7] = [
    ('c', 0.0),
    ('d', 2.0),
    ('e', 4.0),
    ('f', 5.0),
    ('g', 7.0),
    ('a', 9.0),
    ('b', 11.0),
];

/// Accidental suffixes and the pitch class modification they stand for.
/// s = sharp, f = flat, q = quarter tone, t = three quarter tones, e = eighth tone.
const ACCIDENTALS: [(&str, f64); 11] = [
    ("", 0.0),
    ("s", 1.0),
    ("f", -1.0),
    ("ss", 2.0),
    ("ff", -2.0),
    ("qs", 0.5),
    ("qf", -0.5),
    ("tqs", 1.5),
    ("tqf", -1.5),
    ("es", 0.25),
    ("ef", -0.25),
];

/// Difference in cents between two frequencies.
///
/// # Examples
///
/// ```
/// use motet::parameters::hertz_to_cents;
///
/// assert_eq!(hertz_to_cents(200.0, 400.0), 1200.0);
/// ```
pub fn hertz_to_cents(frequency0: f64, frequency1: f64) -> f64 {
    1200.0 * (frequency1 / frequency0).log2()
}

/// Converts a frequency ratio to cents.
pub fn ratio_to_cents(ratio: f64) -> f64 {
    1200.0 * ratio.log2()
}

/// Converts cents to a frequency ratio.
pub fn cents_to_ratio(cents: f64) -> f64 {
    2f64.powf(cents / 1200.0)
}

/// Converts a frequency to its MIDI pitch number (fractional between keys).
pub fn hertz_to_midi_pitch_number(frequency: f64) -> f64 {
    CONCERT_PITCH_MIDI_NUMBER + hertz_to_cents(DEFAULT_CONCERT_PITCH, frequency) / 100.0
}

/// Converts a MIDI pitch number to its frequency with a4 = 440 Hz.
pub fn midi_pitch_number_to_hertz(midi_pitch_number: f64) -> f64 {
    DEFAULT_CONCERT_PITCH * cents_to_ratio((midi_pitch_number - CONCERT_PITCH_MIDI_NUMBER) * 100.0)
}

/// A pitch of any supported tuning system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pitch {
    Western(WesternPitch),
    JustIntonation(JustIntonationPitch),
    Direct(DirectPitch),
}

impl Pitch {
    /// Frequency in Hertz.
    pub fn frequency(&self) -> f64 {
        match self {
            Pitch::Western(p) => p.frequency(),
            Pitch::JustIntonation(p) => p.frequency(),
            Pitch::Direct(p) => p.frequency(),
        }
    }

    /// MIDI pitch number; 60 = c4, fractional for microtones.
    pub fn midi_pitch_number(&self) -> f64 {
        match self {
            Pitch::Western(p) => p.midi_pitch_number(),
            _ => hertz_to_midi_pitch_number(self.frequency()),
        }
    }

    /// Interval in cents from `self` up to `other`.
    pub fn cents_to(&self, other: &Pitch) -> f64 {
        hertz_to_cents(self.frequency(), other.frequency())
    }
}

impl PartialEq for Pitch {
    fn eq(&self, other: &Self) -> bool {
        self.frequency() == other.frequency()
    }
}

impl PartialOrd for Pitch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.frequency().partial_cmp(&other.frequency())
    }
}

impl FromStr for Pitch {
    type Err = ParameterError;

    /// Reads `"3/2"` as a just-intonation ratio and anything starting with a
    /// diatonic letter as a Western pitch with optional octave (`"c"`, `"fs3"`).
    fn from_str(indication: &str) -> Result<Self, Self::Err> {
        let indication = indication.trim();
        if indication.contains('/') {
            return Ok(Pitch::JustIntonation(indication.parse()?));
        }
        match indication.chars().next() {
            Some(c) if DIATONIC_PITCH_CLASSES.iter().any(|(name, _)| *name == c) => {
                let octave_start = indication
                    .char_indices()
                    .skip(1)
                    .find(|(_, c)| c.is_ascii_digit() || *c == '-')
                    .map(|(i, _)| i);
                match octave_start {
                    Some(i) => {
                        let octave: i32 = indication[i..].parse().map_err(|_| {
                            ParameterError::InvalidPitchIndication(indication.to_string())
                        })?;
                        Ok(Pitch::Western(WesternPitch::new(&indication[..i], octave)?))
                    }
                    None => Ok(Pitch::Western(WesternPitch::new(
                        indication,
                        CONCERT_PITCH_OCTAVE,
                    )?)),
                }
            }
            _ => Err(ParameterError::InvalidPitchIndication(
                indication.to_string(),
            )),
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pitch::Western(p) => write!(f, "{}{}", p.name(), p.octave()),
            Pitch::JustIntonation(p) => write!(f, "{}", p.ratio()),
            Pitch::Direct(p) => write!(f, "{}Hz", p.frequency()),
        }
    }
}

/// Parses a whitespace separated list of pitch indications, e.g. `"c4 e4 3/2"`.
pub fn parse_pitches(indications: &str) -> Result<Vec<Pitch>, ParameterError> {
    indications.split_whitespace().map(str::parse).collect()
}

impl From<WesternPitch> for Pitch {
    fn from(p: WesternPitch) -> Self {
        Pitch::Western(p)
    }
}

impl From<JustIntonationPitch> for Pitch {
    fn from(p: JustIntonationPitch) -> Self {
        Pitch::JustIntonation(p)
    }
}

impl From<DirectPitch> for Pitch {
    fn from(p: DirectPitch) -> Self {
        Pitch::Direct(p)
    }
}

/// A pitch given directly by its frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectPitch {
    frequency: f64,
}

impl DirectPitch {
    pub fn new(frequency: f64) -> Self {
        Self { frequency }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }
}

/// Pitch in 12-tone equal temperament with Western English nomenclature.
///
/// Pitch classes are `c = 0` to `b = 11`; microtonal accidentals give
/// fractional pitch classes. Octaves follow the MIDI convention where `c4`
/// is middle c.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WesternPitch {
    pitch_class: f64,
    octave: i32,
    name: String,
    concert_pitch: f64,
}

impl WesternPitch {
    /// Creates a pitch from a name like `"c"`, `"fs"` or `"aqf"`.
    ///
    /// Names whose accidental leaves the octave (`"cf"`, `"bs"`) are moved
    /// into the neighbouring octave.
    pub fn new(name: &str, octave: i32) -> Result<Self, ParameterError> {
        let pitch_class = Self::name_to_pitch_class(name)?;
        let octave_shift = pitch_class.div_euclid(12.0) as i32;
        Ok(Self {
            pitch_class: pitch_class.rem_euclid(12.0),
            octave: octave + octave_shift,
            name: name.to_string(),
            concert_pitch: DEFAULT_CONCERT_PITCH,
        })
    }

    /// Creates a pitch from a pitch class number (`0.0..12.0`).
    pub fn from_pitch_class(pitch_class: f64, octave: i32) -> Self {
        let octave_shift = pitch_class.div_euclid(12.0) as i32;
        let pitch_class = pitch_class.rem_euclid(12.0);
        Self {
            pitch_class,
            octave: octave + octave_shift,
            name: Self::pitch_class_to_name(pitch_class),
            concert_pitch: DEFAULT_CONCERT_PITCH,
        }
    }

    /// Returns the same pitch tuned to another frequency for a4.
    pub fn with_concert_pitch(mut self, concert_pitch: f64) -> Self {
        self.concert_pitch = concert_pitch;
        self
    }

    pub fn pitch_class(&self) -> f64 {
        self.pitch_class
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn concert_pitch(&self) -> f64 {
        self.concert_pitch
    }

    /// Number of semitones between this pitch and a4.
    fn steps_from_concert_pitch(&self) -> f64 {
        (self.octave - CONCERT_PITCH_OCTAVE) as f64 * 12.0
            + (self.pitch_class - CONCERT_PITCH_PITCH_CLASS)
    }

    pub fn frequency(&self) -> f64 {
        self.concert_pitch * cents_to_ratio(self.steps_from_concert_pitch() * 100.0)
    }

    /// MIDI pitch number, exact for tempered pitches at the default concert pitch.
    pub fn midi_pitch_number(&self) -> f64 {
        CONCERT_PITCH_MIDI_NUMBER
            + self.steps_from_concert_pitch()
            + hertz_to_cents(DEFAULT_CONCERT_PITCH, self.concert_pitch) / 100.0
    }

    /// Transposes by a number of (possibly fractional) semitones.
    pub fn transpose(&mut self, semitones: f64) {
        let pitch_class = self.pitch_class + semitones;
        self.octave += pitch_class.div_euclid(12.0) as i32;
        self.pitch_class = pitch_class.rem_euclid(12.0);
        self.name = Self::pitch_class_to_name(self.pitch_class);
    }

    /// Interval in semitones from `other` up to `self`.
    pub fn semitones_from(&self, other: &WesternPitch) -> f64 {
        self.steps_from_concert_pitch() - other.steps_from_concert_pitch()
    }

    fn name_to_pitch_class(name: &str) -> Result<f64, ParameterError> {
        let mut chars = name.chars();
        let diatonic = chars
            .next()
            .ok_or_else(|| ParameterError::UnknownPitchName(name.to_string()))?;
        let base = DIATONIC_PITCH_CLASSES
            .iter()
            .find(|(n, _)| *n == diatonic)
            .map(|(_, pc)| *pc)
            .ok_or_else(|| ParameterError::UnknownPitchName(name.to_string()))?;
        let accidental = chars.as_str();
        let modification = ACCIDENTALS
            .iter()
            .find(|(a, _)| *a == accidental)
            .map(|(_, m)| *m)
            .ok_or_else(|| ParameterError::UnknownAccidental(accidental.to_string()))?;
        Ok(base + modification)
    }

    /// Spells a pitch class with the closest diatonic name and accidental.
    fn pitch_class_to_name(pitch_class: f64) -> String {
        let (diatonic, base) = DIATONIC_PITCH_CLASSES
            .iter()
            .min_by(|(_, a), (_, b)| {
                (pitch_class - a)
                    .abs()
                    .partial_cmp(&(pitch_class - b).abs())
                    .unwrap_or(Ordering::Equal)
            })
            .copied()
            .unwrap_or(('c', 0.0));
        let difference = pitch_class - base;
        let accidental = ACCIDENTALS
            .iter()
            .min_by(|(_, a), (_, b)| {
                (difference - a)
                    .abs()
                    .partial_cmp(&(difference - b).abs())
                    .unwrap_or(Ordering::Equal)
            })
            .map(|(a, _)| *a)
            .unwrap_or("");
        format!("{}{}", diatonic, accidental)
    }
}

impl Default for WesternPitch {
    fn default() -> Self {
        Self::from_pitch_class(0.0, CONCERT_PITCH_OCTAVE)
    }
}

/// Pitch defined by a frequency ratio relative to a concert pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JustIntonationPitch {
    ratio: Ratio<i64>,
    concert_pitch: f64,
}

impl JustIntonationPitch {
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    pub fn new(numer: i64, denom: i64) -> Self {
        Self {
            ratio: Ratio::new(numer, denom),
            concert_pitch: DEFAULT_CONCERT_PITCH,
        }
    }

    pub fn with_concert_pitch(mut self, concert_pitch: f64) -> Self {
        self.concert_pitch = concert_pitch;
        self
    }

    pub fn ratio(&self) -> Ratio<i64> {
        self.ratio
    }

    pub fn concert_pitch(&self) -> f64 {
        self.concert_pitch
    }

    pub fn frequency(&self) -> f64 {
        self.concert_pitch * self.ratio.to_f64().unwrap_or(f64::NAN)
    }

    /// Size of the ratio in cents.
    pub fn cents(&self) -> f64 {
        ratio_to_cents(self.ratio.to_f64().unwrap_or(f64::NAN))
    }

    /// Stacks another interval on top of this one.
    pub fn add(&mut self, interval: Ratio<i64>) {
        self.ratio *= interval;
    }

    /// Moves the ratio into the octave `[1, 2)`.
    pub fn normalize(&mut self) {
        let two = Ratio::from_integer(2);
        while self.ratio >= two {
            self.ratio /= two;
        }
        while self.ratio < Ratio::one() {
            self.ratio *= two;
        }
    }
}

impl FromStr for JustIntonationPitch {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParameterError::InvalidRatio(s.to_string());
        let (numer, denom) = s.trim().split_once('/').ok_or_else(invalid)?;
        let numer: i64 = numer.trim().parse().map_err(|_| invalid())?;
        let denom: i64 = denom.trim().parse().map_err(|_| invalid())?;
        if numer <= 0 || denom <= 0 {
            return Err(invalid());
        }
        Ok(Self::new(numer, denom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_western_midi_numbers() {
        assert_eq!(WesternPitch::new("c", 4).unwrap().midi_pitch_number(), 60.0);
        assert_eq!(WesternPitch::new("a", 4).unwrap().midi_pitch_number(), 69.0);
        assert_eq!(WesternPitch::new("c", -1).unwrap().midi_pitch_number(), 0.0);
        assert_eq!(WesternPitch::new("g", 9).unwrap().midi_pitch_number(), 127.0);
        assert_eq!(WesternPitch::new("cqs", 4).unwrap().midi_pitch_number(), 60.5);
    }

    #[test]
    fn test_western_frequency() {
        let a = WesternPitch::new("a", 4).unwrap();
        assert_eq!(a.frequency(), 440.0);
        let c = WesternPitch::new("c", 4).unwrap();
        assert!((c.frequency() - 261.6255653005986).abs() < 1e-9);
        let a443 = WesternPitch::new("a", 4).unwrap().with_concert_pitch(443.0);
        assert_eq!(a443.frequency(), 443.0);
    }

    #[test]
    fn test_accidentals_crossing_octave() {
        let cf = WesternPitch::new("cf", 4).unwrap();
        assert_eq!(cf.octave(), 3);
        assert_eq!(cf.pitch_class(), 11.0);
        assert_eq!(cf.midi_pitch_number(), 59.0);
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(
            WesternPitch::new("h", 4),
            Err(ParameterError::UnknownPitchName("h".to_string()))
        );
        assert_eq!(
            WesternPitch::new("cx", 4),
            Err(ParameterError::UnknownAccidental("x".to_string()))
        );
    }

    #[test]
    fn test_transpose() {
        let mut pitch = WesternPitch::new("b", 3).unwrap();
        pitch.transpose(1.0);
        assert_eq!(pitch.name(), "c");
        assert_eq!(pitch.octave(), 4);
        pitch.transpose(-2.0);
        assert_eq!(pitch.octave(), 3);
        assert_eq!(pitch.name(), "as");
    }

    #[test]
    fn test_parse_indications() {
        let pitches = parse_pitches("c4 fs3 3/2 d").unwrap();
        assert_eq!(pitches.len(), 4);
        assert_eq!(pitches[0].midi_pitch_number(), 60.0);
        assert_eq!(pitches[1].midi_pitch_number(), 54.0);
        assert_eq!(pitches[2].frequency(), 660.0);
        assert_eq!(pitches[3].midi_pitch_number(), 62.0);
        assert!("x4".parse::<Pitch>().is_err());
        assert!("c-1".parse::<Pitch>().is_ok());
    }

    #[test]
    fn test_just_intonation() {
        let mut fifth: JustIntonationPitch = "3/2".parse().unwrap();
        assert!((fifth.cents() - 701.9550008653874).abs() < 1e-9);
        fifth.add(Ratio::new(3, 2));
        fifth.normalize();
        assert_eq!(fifth.ratio(), Ratio::new(9, 8));
        assert!("0/2".parse::<JustIntonationPitch>().is_err());
    }

    #[test]
    fn test_midi_conversions() {
        assert_eq!(hertz_to_midi_pitch_number(440.0), 69.0);
        assert!((hertz_to_midi_pitch_number(660.0) - 76.01955000865388).abs() < 1e-9);
        assert!((midi_pitch_number_to_hertz(81.0) - 880.0).abs() < 1e-9);
    }

    #[test]
    fn test_pitch_equality_by_frequency() {
        let direct = Pitch::Direct(DirectPitch::new(440.0));
        let western = Pitch::Western(WesternPitch::new("a", 4).unwrap());
        assert_eq!(direct, western);
        assert!(Pitch::Direct(DirectPitch::new(220.0)) < western);
    }
}
