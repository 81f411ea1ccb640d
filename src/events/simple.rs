//! Leaf events.
//!
//! A simple event has a duration and any number of named parameters. The
//! converters read the well-known names in [`names`]; everything else is free
//! for the composer to use.

use super::{check_range, EventError};
use crate::duration::Duration;
use crate::parameters::{
    names, parse_pitches, NotationIndicators, ParameterError, ParameterValue, Pitch,
    PlayingIndicators, Volume,
};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event without children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleEvent {
    /// Length of the event. The unit is up to the converter.
    pub duration: Duration,

    /// Optional label, used by converters to annotate their output.
    pub tag: Option<String>,

    parameters: BTreeMap<String, ParameterValue>,
}

impl SimpleEvent {
    /// Creates a leaf without parameters (a rest for every converter).
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            tag: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Creates a note with pitches, a volume and default playing and
    /// notation indicators.
    pub fn note(pitches: Vec<Pitch>, duration: Duration, volume: Volume) -> Self {
        Self::new(duration)
            .with_parameter(names::PITCH_OR_PITCHES, pitches)
            .with_parameter(names::VOLUME, volume)
            .with_parameter(names::PLAYING_INDICATORS, PlayingIndicators::default())
            .with_parameter(names::NOTATION_INDICATORS, NotationIndicators::default())
    }

    /// Creates a note from textual indications.
    ///
    /// # Examples
    ///
    /// ```
    /// use motet::duration::duration;
    /// use motet::events::SimpleEvent;
    ///
    /// let chord = SimpleEvent::note_like("c4 e4 3/2", duration(1, 2), "mf").unwrap();
    /// assert_eq!(chord.pitches().map(|p| p.len()), Some(3));
    ///
    /// let quiet = SimpleEvent::note_like("a", duration(1, 4), "-12").unwrap();
    /// assert_eq!(quiet.volume().map(|v| v.decibel()), Some(-12.0));
    /// ```
    pub fn note_like(pitches: &str, duration: Duration, volume: &str) -> Result<Self, ParameterError> {
        Ok(Self::note(parse_pitches(pitches)?, duration, volume.parse()?))
    }

    pub fn with_parameter(mut self, name: &str, value: impl Into<ParameterValue>) -> Self {
        self.set_parameter(name, value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_vowel(self, vowel: &str) -> Self {
        self.with_parameter(names::VOWEL, vowel)
    }

    pub fn with_consonants(self, consonants: &[&str]) -> Self {
        let consonants: Vec<String> = consonants.iter().map(|c| c.to_string()).collect();
        self.with_parameter(names::CONSONANTS, consonants)
    }

    pub fn get_parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(name)
    }

    pub fn get_parameter_mut(&mut self, name: &str) -> Option<&mut ParameterValue> {
        self.parameters.get_mut(name)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn set_parameter(&mut self, name: &str, value: ParameterValue) {
        self.parameters.insert(name.to_string(), value);
    }

    pub fn remove_parameter(&mut self, name: &str) -> Option<ParameterValue> {
        self.parameters.remove(name)
    }

    /// Names of all assigned parameters, sorted.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn pitches(&self) -> Option<&[Pitch]> {
        self.get_parameter(names::PITCH_OR_PITCHES)?.as_pitches()
    }

    pub fn volume(&self) -> Option<&Volume> {
        self.get_parameter(names::VOLUME)?.as_volume()
    }

    pub fn vowel(&self) -> Option<&str> {
        self.get_parameter(names::VOWEL)?.as_text()
    }

    pub fn consonants(&self) -> Option<&[String]> {
        self.get_parameter(names::CONSONANTS)?.as_symbols()
    }

    pub fn playing_indicators(&self) -> Option<&PlayingIndicators> {
        self.get_parameter(names::PLAYING_INDICATORS)?.as_playing_indicators()
    }

    /// Mutable playing indicators, added with defaults if the leaf has none.
    ///
    /// Returns `None` only if the name holds a value of another type.
    pub fn playing_indicators_mut(&mut self) -> Option<&mut PlayingIndicators> {
        self.parameters
            .entry(names::PLAYING_INDICATORS.to_string())
            .or_insert_with(|| PlayingIndicators::default().into())
            .as_playing_indicators_mut()
    }

    pub fn notation_indicators(&self) -> Option<&NotationIndicators> {
        self.get_parameter(names::NOTATION_INDICATORS)?.as_notation_indicators()
    }

    /// Like [`playing_indicators_mut`](Self::playing_indicators_mut).
    pub fn notation_indicators_mut(&mut self) -> Option<&mut NotationIndicators> {
        self.parameters
            .entry(names::NOTATION_INDICATORS.to_string())
            .or_insert_with(|| NotationIndicators::default().into())
            .as_notation_indicators_mut()
    }

    /// Shortens the event to the window `start..end`.
    ///
    /// Fails when the window leaves nothing of the event.
    pub fn cut_out(&mut self, start: Duration, end: Duration) -> Result<(), EventError> {
        check_range(start, end)?;
        let mut removed = Duration::zero();
        if start > Duration::zero() {
            removed += start;
        }
        if end < self.duration {
            removed += self.duration - end;
        }
        if start == end || removed >= self.duration {
            return Err(EventError::EmptyCut {
                start,
                end,
                duration: self.duration,
            });
        }
        self.duration -= removed;
        Ok(())
    }

    /// Shortens the event by the part of `start..end` that overlaps it.
    pub fn cut_off(&mut self, start: Duration, end: Duration) -> Result<(), EventError> {
        check_range(start, end)?;
        let start = start.max(Duration::zero());
        let end = end.min(self.duration);
        if start < end {
            self.duration -= end - start;
        }
        Ok(())
    }

    /// Splits the leaf into two leaves with the same parameters.
    pub fn split_at(&self, time: Duration) -> Result<(SimpleEvent, SimpleEvent), EventError> {
        let mut before = self.clone();
        before.cut_out(Duration::zero(), time)?;
        let mut after = self.clone();
        after.cut_out(time, self.duration)?;
        Ok((before, after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::{beats, duration};

    #[test]
    fn test_note_like() {
        let note = SimpleEvent::note_like("c4 fs3", duration(1, 2), "0.5").unwrap();
        let midi: Vec<f64> = note.pitches().unwrap().iter().map(|p| p.midi_pitch_number()).collect();
        assert_eq!(midi, vec![60.0, 54.0]);
        assert_eq!(note.volume().map(|v| v.amplitude()), Some(0.5));
        assert_eq!(note.duration, duration(1, 2));

        assert!(SimpleEvent::note_like("x4", beats(1), "mf").is_err());
        assert!(SimpleEvent::note_like("c4", beats(1), "loud").is_err());
    }

    #[test]
    fn test_typed_accessors() {
        let event = SimpleEvent::new(beats(1))
            .with_vowel("a")
            .with_consonants(&["t", "s"]);
        assert_eq!(event.vowel(), Some("a"));
        assert_eq!(event.consonants().map(|c| c.len()), Some(2));
        assert!(event.pitches().is_none());
        assert_eq!(event.parameter_names().collect::<Vec<_>>(), vec!["consonants", "vowel"]);
    }

    #[test]
    fn test_note_carries_indicators() {
        let mut note = SimpleEvent::note_like("c4", beats(1), "mf").unwrap();
        assert_eq!(note.playing_indicators(), Some(&PlayingIndicators::default()));
        assert_eq!(note.notation_indicators().map(|i| i.active()), Some(vec!["ottava"]));

        if let Some(indicators) = note.playing_indicators_mut() {
            indicators.articulation.name = Some(".".to_string());
        }
        assert_eq!(note.playing_indicators().map(|i| i.active()), Some(vec!["articulation"]));

        let (before, after) = note.split_at(duration(1, 2)).unwrap();
        assert_eq!(before.playing_indicators(), after.playing_indicators());
    }

    #[test]
    fn test_indicators_added_on_demand() {
        let mut rest = SimpleEvent::new(beats(1));
        assert!(rest.notation_indicators().is_none());
        if let Some(indicators) = rest.notation_indicators_mut() {
            indicators.rehearsal_mark.markup = Some("A".to_string());
        }
        assert_eq!(rest.notation_indicators().map(|i| i.active()), Some(vec!["ottava", "rehearsal_mark"]));

        let mut wrong = SimpleEvent::new(beats(1)).with_parameter(names::PLAYING_INDICATORS, true);
        assert!(wrong.playing_indicators_mut().is_none());
    }

    #[test]
    fn test_wrong_type_is_absent() {
        let event = SimpleEvent::new(beats(1)).with_parameter(names::VOWEL, 3.0);
        assert!(event.vowel().is_none());
        assert!(event.has_parameter(names::VOWEL));
    }

    #[test]
    fn test_cut_out() {
        let mut event = SimpleEvent::new(beats(4));
        event.cut_out(beats(1), beats(3)).unwrap();
        assert_eq!(event.duration, beats(2));

        // window larger than the event keeps everything
        let mut event = SimpleEvent::new(beats(2));
        event.cut_out(beats(-1), beats(5)).unwrap();
        assert_eq!(event.duration, beats(2));

        let mut event = SimpleEvent::new(beats(2));
        assert!(matches!(
            event.cut_out(beats(2), beats(3)),
            Err(EventError::EmptyCut { .. })
        ));
        assert!(matches!(
            event.cut_out(beats(1), beats(0)),
            Err(EventError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_cut_off() {
        let mut event = SimpleEvent::new(beats(4));
        event.cut_off(beats(1), beats(2)).unwrap();
        assert_eq!(event.duration, beats(3));

        event.cut_off(beats(2), beats(10)).unwrap();
        assert_eq!(event.duration, beats(2));

        // outside the event
        event.cut_off(beats(5), beats(6)).unwrap();
        assert_eq!(event.duration, beats(2));
    }

    #[test]
    fn test_cut_off_before_start() {
        let mut event = SimpleEvent::new(beats(2));
        event.cut_off(beats(-3), beats(-1)).unwrap();
        assert_eq!(event.duration, beats(2));

        event.cut_off(beats(-1), beats(1)).unwrap();
        assert_eq!(event.duration, beats(1));
    }

    #[test]
    fn test_split_keeps_parameters() {
        let event = SimpleEvent::new(beats(3)).with_vowel("o");
        let (a, b) = event.split_at(beats(1)).unwrap();
        assert_eq!(a.duration, beats(1));
        assert_eq!(b.duration, beats(2));
        assert_eq!(b.vowel(), Some("o"));
    }
}
