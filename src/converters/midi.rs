//! Standard MIDI File (SMF) export.
//!
//! Leaves become note-on/note-off pairs. Microtonal pitches are played on the
//! nearest MIDI key, detuned by a pitch-bend message sent just before the
//! note starts. Each pitch takes the next channel of its track's channel
//! cycle, so chords and overlapping detuned notes need several channels.
//!
//! # Track layout
//!
//! - A leaf or a sequential event is written to a single track.
//! - A simultaneous event writes one track per child (type 1) or merges all
//!   children into one track (type 0).
//! - The first track carries the time signature (always 4/4) and the tempo.

use crate::duration::{beats_to_ticks, Duration, DEFAULT_TEMPO, TICKS_PER_BEAT};
use crate::events::{Event, SimpleEvent};
use crate::parameters::{hertz_to_cents, midi_pitch_number_to_hertz, Pitch};
use midly::num::{u14, u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, PitchBend, Smf, Timing, Track, TrackEvent, TrackEventKind};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_MIDI_INSTRUMENT_NAME: &str = "Acoustic Grand Piano";

/// Slowest tempo a set-tempo message can hold, as beat length in microseconds.
pub const MAXIMUM_MICROSECONDS_PER_BEAT: u32 = 0xFF_FFFF;

const MAXIMUM_PITCH_BEND: f64 = 16383.0;
const MAXIMUM_DELTA: u32 = 0x0FFF_FFFF;
const N_MIDI_CHANNELS: u8 = 16;
const N_MIDI_KEYS: u8 = 128;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("unknown midi file type {0}, only type 0 and 1 are supported")]
    InvalidFileType(u8),
    #[error("unknown midi channel {0}, only channels 0 to 15 are allowed")]
    InvalidChannel(u8),
    #[error("midi channel {0} appears more than once in the available channels")]
    DuplicateChannel(u8),
    #[error("no midi channels available")]
    NoChannels,
    #[error("tempo must be a positive number of beats per minute, got {0}")]
    InvalidTempo(f64),
    #[error("ticks per beat must be between 1 and 32767, got {0}")]
    InvalidTicksPerBeat(u16),
    #[error("failed to write midi file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How events are laid out in the midi file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiSettings {
    /// 0 for a single track, 1 for synchronous tracks.
    pub midi_file_type: u8,
    pub available_midi_channels: Vec<u8>,
    /// Give every track its own `n_midi_channels_per_track` channels instead
    /// of letting each track use all available channels.
    pub distribute_midi_channels: bool,
    pub n_midi_channels_per_track: usize,
    /// Pitch-bend range of the synthesizer, in cents up or down.
    pub maximum_pitch_bend_deviation: f64,
    pub ticks_per_beat: u16,
    pub instrument_name: String,
    /// `(position in beats, beats per minute)` pairs.
    pub tempo_points: Vec<(Duration, f64)>,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            midi_file_type: 1,
            available_midi_channels: (0..N_MIDI_CHANNELS).collect(),
            distribute_midi_channels: false,
            n_midi_channels_per_track: 1,
            maximum_pitch_bend_deviation: 200.0,
            ticks_per_beat: TICKS_PER_BEAT,
            instrument_name: DEFAULT_MIDI_INSTRUMENT_NAME.to_string(),
            tempo_points: vec![(Duration::zero(), DEFAULT_TEMPO)],
        }
    }
}

/// A track event with its absolute position, sorted before deltas are computed.
struct TimedEvent<'a> {
    tick: u32,
    kind: TrackEventKind<'a>,
    /// Orders events at the same tick (lower = first).
    priority: u8,
}

impl<'a> TimedEvent<'a> {
    fn new(tick: u32, kind: TrackEventKind<'a>, priority: u8) -> Self {
        Self { tick, kind, priority }
    }

    fn midi(tick: u32, channel: u8, message: MidiMessage, priority: u8) -> Self {
        Self::new(
            tick,
            TrackEventKind::Midi {
                channel: u4::new(channel),
                message,
            },
            priority,
        )
    }
}

/// Sorts by tick and priority and turns absolute ticks into deltas.
fn build_track(mut events: Vec<TimedEvent<'_>>) -> Track<'_> {
    events.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.priority.cmp(&b.priority)));

    let mut last_tick = 0u32;
    events
        .into_iter()
        .map(|timed_event| {
            let delta = timed_event.tick.saturating_sub(last_tick);
            last_tick = timed_event.tick;
            TrackEvent {
                delta: u28::new(delta.min(MAXIMUM_DELTA)),
                kind: timed_event.kind,
            }
        })
        .collect()
}

/// Renders events to standard midi files.
#[derive(Debug, Clone)]
pub struct MidiFileConverter {
    settings: MidiSettings,
}

impl MidiFileConverter {
    /// Validates `settings`; an unreadable file is never written.
    pub fn new(settings: MidiSettings) -> Result<Self, MidiError> {
        if settings.midi_file_type > 1 {
            return Err(MidiError::InvalidFileType(settings.midi_file_type));
        }
        if settings.available_midi_channels.is_empty() {
            return Err(MidiError::NoChannels);
        }
        let mut seen = HashSet::new();
        for &channel in &settings.available_midi_channels {
            if channel >= N_MIDI_CHANNELS {
                return Err(MidiError::InvalidChannel(channel));
            }
            if !seen.insert(channel) {
                return Err(MidiError::DuplicateChannel(channel));
            }
        }
        if let Some(&(_, bpm)) = settings
            .tempo_points
            .iter()
            .find(|(_, bpm)| !bpm.is_finite() || *bpm <= 0.0)
        {
            return Err(MidiError::InvalidTempo(bpm));
        }
        if settings.ticks_per_beat == 0 || settings.ticks_per_beat > 0x7FFF {
            return Err(MidiError::InvalidTicksPerBeat(settings.ticks_per_beat));
        }
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &MidiSettings {
        &self.settings
    }

    /// Renders `event` and writes the file to `path`.
    pub fn convert(&self, event: &Event, path: &Path) -> Result<(), MidiError> {
        let smf = self.to_smf(event);
        smf.save(path).map_err(|source| MidiError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), tracks = smf.tracks.len(), "wrote midi file");
        Ok(())
    }

    /// Builds the midi file in memory.
    pub fn to_smf(&self, event: &Event) -> Smf<'_> {
        let sequences: Vec<&Event> = match event {
            Event::Simultaneous(e) => e.iter().collect(),
            _ => vec![event],
        };
        let channels = self.channels_per_track(sequences.len());
        let mut data: Vec<Vec<TimedEvent<'_>>> = sequences
            .iter()
            .zip(&channels)
            .map(|(sequence, channels)| self.track_data(sequence, channels))
            .collect();
        if data.is_empty() {
            // the tempo track is written even for an empty event
            data.push(Vec::new());
        }

        let duration = beats_to_ticks(event.duration(), self.settings.ticks_per_beat);
        let (format, tracks) = if self.settings.midi_file_type == 0 {
            let merged = data.drain(..).flatten().collect();
            (Format::SingleTrack, vec![self.track(merged, duration, true)])
        } else {
            let tracks = data
                .into_iter()
                .enumerate()
                .map(|(index, track_data)| self.track(track_data, duration, index == 0))
                .collect();
            (Format::Parallel, tracks)
        };

        let timing = Timing::Metrical(u15::new(self.settings.ticks_per_beat));
        Smf {
            header: Header::new(format, timing),
            tracks,
        }
    }

    fn channels_per_track(&self, n_tracks: usize) -> Vec<Vec<u8>> {
        let available = &self.settings.available_midi_channels;
        if self.settings.distribute_midi_channels {
            let n_per_track = self.settings.n_midi_channels_per_track.max(1);
            let mut cycle = available.iter().copied().cycle();
            (0..n_tracks)
                .map(|_| cycle.by_ref().take(n_per_track).collect())
                .collect()
        } else {
            vec![available.clone(); n_tracks]
        }
    }

    fn track_data(&self, sequence: &Event, channels: &[u8]) -> Vec<TimedEvent<'static>> {
        let mut channel_cycle = channels.iter().copied().cycle();
        let mut data = Vec::new();
        for (leaf, start) in sequence.leaves() {
            self.leaf_data(leaf, start, &mut channel_cycle, &mut data);
        }
        data
    }

    /// Pitch bend, note-on and note-off for every pitch of a leaf.
    /// Leaves without pitches or volume are rests.
    fn leaf_data(
        &self,
        leaf: &SimpleEvent,
        start: Duration,
        channels: &mut impl Iterator<Item = u8>,
        data: &mut Vec<TimedEvent<'static>>,
    ) {
        let (Some(pitches), Some(volume)) = (leaf.pitches(), leaf.volume()) else {
            return;
        };
        let tpb = self.settings.ticks_per_beat;
        let tick_start = beats_to_ticks(start, tpb);
        let tick_end = tick_start + beats_to_ticks(leaf.duration, tpb);
        let velocity = u7::new(volume.midi_velocity());

        for pitch in pitches {
            let Some(channel) = channels.next() else {
                return;
            };
            let (key, bend) = self.tune(pitch);
            // one tick early if possible, so the bend is settled when the note starts
            let bend_tick = tick_start.saturating_sub(1);
            data.push(TimedEvent::midi(
                bend_tick,
                channel,
                MidiMessage::PitchBend {
                    bend: PitchBend(u14::new(bend)),
                },
                4,
            ));
            data.push(TimedEvent::midi(
                tick_start,
                channel,
                MidiMessage::NoteOn { key, vel: velocity },
                5,
            ));
            data.push(TimedEvent::midi(
                tick_end,
                channel,
                MidiMessage::NoteOff { key, vel: velocity },
                3,
            ));
        }
    }

    /// Nearest MIDI key and the raw pitch-bend value for the remaining cents.
    fn tune(&self, pitch: &Pitch) -> (u7, u16) {
        let frequency = pitch.frequency();
        let key = (0..N_MIDI_KEYS)
            .min_by(|a, b| {
                let da = (midi_pitch_number_to_hertz(*a as f64) - frequency).abs();
                let db = (midi_pitch_number_to_hertz(*b as f64) - frequency).abs();
                da.total_cmp(&db)
            })
            .unwrap_or(0);
        let cents = hertz_to_cents(midi_pitch_number_to_hertz(key as f64), frequency);
        (u7::new(key), self.pitch_bend(cents))
    }

    fn pitch_bend(&self, cents: f64) -> u16 {
        let maximum = self.settings.maximum_pitch_bend_deviation;
        let mut percent = (cents + maximum) / (maximum * 2.0);
        if !(0.0..=1.0).contains(&percent) {
            warn!(cents, maximum, "pitch bend out of range, clamping");
            percent = percent.clamp(0.0, 1.0);
        }
        (MAXIMUM_PITCH_BEND * percent).round() as u16
    }

    fn tempo_data(&self) -> Vec<TimedEvent<'static>> {
        self.settings
            .tempo_points
            .iter()
            .map(|&(position, bpm)| {
                let tick = beats_to_ticks(position, self.settings.ticks_per_beat);
                let mut microseconds = (60.0 / bpm * 1_000_000.0) as u64;
                if microseconds >= MAXIMUM_MICROSECONDS_PER_BEAT as u64 {
                    warn!(bpm, "tempo too slow for a midi file, using the slowest possible tempo");
                    microseconds = MAXIMUM_MICROSECONDS_PER_BEAT as u64;
                }
                TimedEvent::new(
                    tick,
                    TrackEventKind::Meta(MetaMessage::Tempo(u24::new(microseconds as u32))),
                    2,
                )
            })
            .collect()
    }

    fn track<'a>(&'a self, mut data: Vec<TimedEvent<'a>>, duration: u32, is_first_track: bool) -> Track<'a> {
        data.push(TimedEvent::new(
            0,
            TrackEventKind::Meta(MetaMessage::InstrumentName(self.settings.instrument_name.as_bytes())),
            0,
        ));
        if is_first_track {
            data.push(TimedEvent::new(
                0,
                TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
                1,
            ));
            data.extend(self.tempo_data());
        }
        let last_tick = data.iter().map(|e| e.tick).max().unwrap_or(0);
        data.push(TimedEvent::new(
            duration.max(last_tick),
            TrackEventKind::Meta(MetaMessage::EndOfTrack),
            255,
        ));
        build_track(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::{beats, duration};
    use crate::events::{SequentialEvent, SimultaneousEvent};
    use crate::parameters::{DirectPitch, Volume};

    fn converter(settings: MidiSettings) -> MidiFileConverter {
        MidiFileConverter::new(settings).unwrap()
    }

    /// Track events with absolute ticks.
    fn absolute<'a>(track: &[TrackEvent<'a>]) -> Vec<(u32, TrackEventKind<'a>)> {
        let mut tick = 0;
        track
            .iter()
            .map(|event| {
                tick += event.delta.as_int();
                (tick, event.kind)
            })
            .collect()
    }

    fn notes(track: &[TrackEvent<'_>]) -> Vec<(u32, u8, u8)> {
        absolute(track)
            .into_iter()
            .filter_map(|(tick, kind)| match kind {
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn { key, .. },
                } => Some((tick, channel.as_int(), key.as_int())),
                _ => None,
            })
            .collect()
    }

    fn bends(track: &[TrackEvent<'_>]) -> Vec<(u32, u16)> {
        absolute(track)
            .into_iter()
            .filter_map(|(tick, kind)| match kind {
                TrackEventKind::Midi {
                    message: MidiMessage::PitchBend { bend },
                    ..
                } => Some((tick, bend.0.as_int())),
                _ => None,
            })
            .collect()
    }

    fn melody() -> Event {
        SequentialEvent::new(vec![
            SimpleEvent::note_like("a4", beats(1), "mf").unwrap().into(),
            SimpleEvent::new(duration(1, 2)).into(),
            SimpleEvent::note_like("c5", duration(1, 2), "ff").unwrap().into(),
        ])
        .into()
    }

    #[test]
    fn test_single_track() {
        let converter = converter(MidiSettings::default());
        let smf = converter.to_smf(&melody());
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.tracks.len(), 1);

        let track = &smf.tracks[0];
        // the rest produces no note
        assert_eq!(notes(track), vec![(0, 0, 69), (720, 1, 72)]);
        assert_eq!(bends(track), vec![(0, 8192), (719, 8192)]);

        let events = absolute(track);
        assert!(events.contains(&(0, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000))))));
        assert!(events.contains(&(0, TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)))));
        assert_eq!(events.last(), Some(&(960, TrackEventKind::Meta(MetaMessage::EndOfTrack))));
    }

    #[test]
    fn test_velocity_and_note_off() {
        let converter = converter(MidiSettings::default());
        let smf = converter.to_smf(&SimpleEvent::note_like("a4", beats(2), "ff").unwrap().into());
        let velocity = Volume::from_dynamic("ff").unwrap().midi_velocity();
        let events = absolute(&smf.tracks[0]);
        assert!(events.contains(&(
            960,
            TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOff {
                    key: u7::new(69),
                    vel: u7::new(velocity),
                },
            }
        )));
    }

    #[test]
    fn test_microtonal_pitch_bend() {
        let quarter_tone_above_a4 = 440.0 * 2f64.powf(50.0 / 1200.0);
        let leaf = SimpleEvent::note(
            vec![DirectPitch::new(quarter_tone_above_a4).into()],
            beats(1),
            Volume::default(),
        );
        let converter = converter(MidiSettings::default());
        let smf = converter.to_smf(&leaf.into());
        assert_eq!(notes(&smf.tracks[0]), vec![(0, 0, 69)]);
        assert_eq!(bends(&smf.tracks[0]), vec![(0, 10239)]);
    }

    #[test]
    fn test_pitch_bend_is_clamped() {
        let converter = converter(MidiSettings {
            maximum_pitch_bend_deviation: 20.0,
            ..MidiSettings::default()
        });
        assert_eq!(converter.pitch_bend(45.0), 16383);
        assert_eq!(converter.pitch_bend(-45.0), 0);
        assert_eq!(converter.pitch_bend(0.0), 8192);
    }

    #[test]
    fn test_chord_cycles_channels() {
        let chord = SimpleEvent::note_like("c4 e4 g4", beats(1), "p").unwrap();
        let converter = converter(MidiSettings {
            available_midi_channels: vec![3, 5],
            ..MidiSettings::default()
        });
        let smf = converter.to_smf(&chord.into());
        assert_eq!(notes(&smf.tracks[0]), vec![(0, 3, 60), (0, 5, 64), (0, 3, 67)]);
    }

    #[test]
    fn test_simultaneous_tracks() {
        let event: Event = SimultaneousEvent::new(vec![melody(), melody()]).into();
        let settings = MidiSettings {
            distribute_midi_channels: true,
            n_midi_channels_per_track: 1,
            available_midi_channels: vec![0, 1, 2],
            ..MidiSettings::default()
        };
        let parallel = converter(settings.clone());
        let smf = parallel.to_smf(&event);
        assert_eq!(smf.tracks.len(), 2);
        assert_eq!(notes(&smf.tracks[0]), vec![(0, 0, 69), (720, 0, 72)]);
        assert_eq!(notes(&smf.tracks[1]), vec![(0, 1, 69), (720, 1, 72)]);

        let has_tempo = |track: &Track<'_>| {
            track
                .iter()
                .any(|e| matches!(e.kind, TrackEventKind::Meta(MetaMessage::Tempo(_))))
        };
        assert!(has_tempo(&smf.tracks[0]));
        assert!(!has_tempo(&smf.tracks[1]));

        let merged = converter(MidiSettings {
            midi_file_type: 0,
            ..settings
        });
        let single = merged.to_smf(&event);
        assert_eq!(single.header.format, Format::SingleTrack);
        assert_eq!(single.tracks.len(), 1);
        assert_eq!(notes(&single.tracks[0]).len(), 4);
    }

    #[test]
    fn test_empty_event_keeps_tempo_track() {
        let converter = converter(MidiSettings::default());
        let smf = converter.to_smf(&SimultaneousEvent::default().into());
        assert_eq!(smf.tracks.len(), 1);
        assert!(notes(&smf.tracks[0]).is_empty());
    }

    #[test]
    fn test_slow_tempo_is_clamped() {
        let converter = converter(MidiSettings {
            tempo_points: vec![(beats(0), 120.0), (beats(1), 1.0)],
            ..MidiSettings::default()
        });
        let smf = converter.to_smf(&melody());
        let events = absolute(&smf.tracks[0]);
        assert!(events.contains(&(
            480,
            TrackEventKind::Meta(MetaMessage::Tempo(u24::new(MAXIMUM_MICROSECONDS_PER_BEAT)))
        )));
    }

    #[test]
    fn test_invalid_settings() {
        let invalid = |settings| MidiFileConverter::new(settings).unwrap_err();
        assert!(matches!(
            invalid(MidiSettings { midi_file_type: 2, ..MidiSettings::default() }),
            MidiError::InvalidFileType(2)
        ));
        assert!(matches!(
            invalid(MidiSettings { available_midi_channels: vec![0, 16], ..MidiSettings::default() }),
            MidiError::InvalidChannel(16)
        ));
        assert!(matches!(
            invalid(MidiSettings { available_midi_channels: vec![1, 2, 1], ..MidiSettings::default() }),
            MidiError::DuplicateChannel(1)
        ));
        assert!(matches!(
            invalid(MidiSettings { available_midi_channels: vec![], ..MidiSettings::default() }),
            MidiError::NoChannels
        ));
        assert!(matches!(
            invalid(MidiSettings { tempo_points: vec![(beats(0), 0.0)], ..MidiSettings::default() }),
            MidiError::InvalidTempo(_)
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("melody.mid");
        converter(MidiSettings::default()).convert(&melody(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.timing, Timing::Metrical(u15::new(480)));
        assert_eq!(notes(&smf.tracks[0]), vec![(0, 0, 69), (720, 1, 72)]);
    }
}
