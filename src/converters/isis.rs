//! Score files for the ISiS singing synthesizer.
//!
//! ISiS reads a text score with a `[lyrics]` section (X-SAMPA phonemes) and a
//! `[score]` section (MIDI pitches, rhythm, accents and tempo). Every key is
//! written as one comma separated block, wrapped after a fixed number of
//! events. ISiS sings a single voice, so simultaneous events are rejected.

use super::renderer::{self, RenderError};
use super::EventConverter;
use crate::duration::{format_decimal, Duration};
use crate::events::{Event, SimpleEvent, SimultaneousEvent};
use crate::parameters::{DirectVolume, Pitch, Volume, WesternPitch};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Name of the ISiS launcher script installed by the ISiS command line package.
pub const ISIS_PATH: &str = "isis.sh";

/// Keeps ISiS from printing progress information.
pub const SILENT_FLAG: &str = "--quiet";

/// Vowel ISiS reads as silence.
const REST_VOWEL: &str = "_";

/// Errors of the ISiS frontend.
#[derive(Debug, Error)]
pub enum IsisError {
    #[error("can't convert a simultaneous event: ISiS only sings one voice")]
    UnsupportedSimultaneousEvent,
    #[error("failed to write ISiS score '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Everything ISiS needs to know about one leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedData {
    pub duration: Duration,
    pub consonants: Vec<String>,
    pub vowel: String,
    pub pitch: Pitch,
    pub volume: Volume,
}

impl ExtractedData {
    /// Silent record used for leaves that lack any of the sung attributes.
    pub fn rest(duration: Duration) -> Self {
        Self {
            duration,
            consonants: Vec::new(),
            vowel: REST_VOWEL.to_string(),
            pitch: WesternPitch::from_pitch_class(0.0, -1).into(),
            volume: DirectVolume::new(0.0).into(),
        }
    }
}

type Extractor<T> = Box<dyn Fn(&SimpleEvent) -> Option<T> + Send + Sync>;

/// Functions reading the sung attributes from a leaf. `None` marks the
/// attribute as missing.
pub struct IsisExtractors {
    pub consonants: Extractor<Vec<String>>,
    pub vowel: Extractor<String>,
    pub pitch: Extractor<Pitch>,
    pub volume: Extractor<Volume>,
}

/// Consonants of the leaf, sung before its vowel.
pub fn default_consonants(event: &SimpleEvent) -> Option<Vec<String>> {
    event.consonants().map(<[String]>::to_vec)
}

/// The leaf's vowel as an X-SAMPA symbol.
pub fn default_vowel(event: &SimpleEvent) -> Option<String> {
    event.vowel().map(str::to_string)
}

/// First pitch of the leaf; chords are reduced to their first tone.
pub fn default_pitch(event: &SimpleEvent) -> Option<Pitch> {
    event.pitches()?.first().cloned()
}

/// Written to `loud_accents` as amplitude.
pub fn default_volume(event: &SimpleEvent) -> Option<Volume> {
    event.volume().cloned()
}

impl Default for IsisExtractors {
    fn default() -> Self {
        Self {
            consonants: Box::new(default_consonants),
            vowel: Box::new(default_vowel),
            pitch: Box::new(default_pitch),
            volume: Box::new(default_volume),
        }
    }
}

impl std::fmt::Debug for IsisExtractors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsisExtractors").finish_non_exhaustive()
    }
}

/// Global values written to every ISiS score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsisSettings {
    /// Beats per minute. Durations are counted in beats.
    pub tempo: f64,
    /// Transposition in semitones applied by ISiS.
    pub global_transposition: i32,
    /// Written as `sentence_loudness` when set.
    pub default_sentence_loudness: Option<f64>,
    /// Events per line in every key block. Zero is treated as one.
    pub n_events_per_line: usize,
}

impl Default for IsisSettings {
    fn default() -> Self {
        Self {
            tempo: 60.0,
            global_transposition: 0,
            default_sentence_loudness: None,
            n_events_per_line: 5,
        }
    }
}

/// Writes ISiS score files.
#[derive(Debug, Default)]
pub struct IsisScoreConverter {
    settings: IsisSettings,
    extractors: IsisExtractors,
}

impl IsisScoreConverter {
    /// Converter reading the leaves' own phonemes, pitch and volume.
    pub fn new(settings: IsisSettings) -> Self {
        Self {
            settings,
            extractors: IsisExtractors::default(),
        }
    }

    pub fn with_extractors(settings: IsisSettings, extractors: IsisExtractors) -> Self {
        Self {
            settings,
            extractors,
        }
    }

    pub fn settings(&self) -> &IsisSettings {
        &self.settings
    }

    /// Reads the sung attributes of a leaf. If any of them is missing the
    /// whole leaf becomes a rest.
    pub fn extract(&self, event: &SimpleEvent) -> ExtractedData {
        self.try_extract(event).unwrap_or_else(|| {
            debug!(duration = %event.duration, "leaf lacks a sung attribute, writing a rest");
            ExtractedData::rest(event.duration)
        })
    }

    fn try_extract(&self, event: &SimpleEvent) -> Option<ExtractedData> {
        Some(ExtractedData {
            duration: event.duration,
            consonants: (self.extractors.consonants)(event)?,
            vowel: (self.extractors.vowel)(event)?,
            pitch: (self.extractors.pitch)(event)?,
            volume: (self.extractors.volume)(event)?,
        })
    }

    /// Renders the score text for a single leaf or a sequence.
    pub fn render(&self, event: &Event) -> Result<String, IsisError> {
        let data = self.convert_event(event, Duration::zero())?;

        // one consonant cluster (possibly empty) and one vowel per event
        let xsampa = self.make_key("xsampa", &data, |d| {
            vec![d.consonants.concat(), d.vowel.clone()]
        });
        let midi_notes = self.make_key("midiNotes", &data, |d| {
            vec![d.pitch.midi_pitch_number().to_string()]
        });
        let rhythm = self.make_key("rhythm", &data, |d| vec![format_decimal(d.duration)]);
        let loud_accents = self.make_key("loud_accents", &data, |d| {
            vec![d.volume.amplitude().to_string()]
        });

        let mut score = vec![
            "[score]".to_string(),
            midi_notes,
            format!("globalTransposition: {}", self.settings.global_transposition),
            rhythm,
            loud_accents,
        ];
        if let Some(loudness) = self.settings.default_sentence_loudness {
            score.push(format!("sentence_loudness: {}", loudness));
        }
        score.push(format!("tempo: {}", self.settings.tempo));

        Ok(format!("[lyrics]\n{}\n\n{}", xsampa, score.join("\n")))
    }

    /// Renders the score and writes it to `path`. Nothing is written when
    /// rendering fails.
    pub fn convert(&self, event: &Event, path: &Path) -> Result<(), IsisError> {
        let score = self.render(event)?;
        fs::write(path, score).map_err(|source| IsisError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "wrote ISiS score");
        Ok(())
    }

    /// `key: a, b,\n     c, d` with `n_events_per_line` events per line.
    fn make_key<F>(&self, key: &str, data: &[ExtractedData], items: F) -> String
    where
        F: Fn(&ExtractedData) -> Vec<String>,
    {
        let separator = format!(",\n{}", " ".repeat(key.len() + 2));
        let lines: Vec<String> = data
            .chunks(self.settings.n_events_per_line.max(1))
            .map(|chunk| chunk.iter().flat_map(&items).collect::<Vec<_>>().join(", "))
            .collect();
        format!("{}: {}", key, lines.join(&separator))
    }
}

impl EventConverter for IsisScoreConverter {
    type Output = ExtractedData;
    type Error = IsisError;

    fn convert_simple_event(
        &self,
        event: &SimpleEvent,
        _absolute_entry_delay: Duration,
    ) -> Result<Vec<ExtractedData>, IsisError> {
        Ok(vec![self.extract(event)])
    }

    fn convert_simultaneous_event(
        &self,
        _event: &SimultaneousEvent,
        _absolute_entry_delay: Duration,
    ) -> Result<Vec<ExtractedData>, IsisError> {
        Err(IsisError::UnsupportedSimultaneousEvent)
    }
}

/// Renders sound files by running ISiS on a generated score.
#[derive(Debug)]
pub struct IsisConverter {
    score_converter: IsisScoreConverter,
    isis_path: String,
    flags: Vec<String>,
    remove_score_file: bool,
}

impl IsisConverter {
    pub fn new(score_converter: IsisScoreConverter) -> Self {
        Self {
            score_converter,
            isis_path: ISIS_PATH.to_string(),
            flags: Vec::new(),
            remove_score_file: false,
        }
    }

    pub fn with_isis_path(mut self, isis_path: impl Into<String>) -> Self {
        self.isis_path = isis_path.into();
        self
    }

    /// Adds a command line flag, e.g. [`SILENT_FLAG`].
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn remove_score_file(mut self, remove: bool) -> Self {
        self.remove_score_file = remove;
        self
    }

    /// Writes the score to `score_path` and lets ISiS render `output_path`.
    pub fn convert(&self, event: &Event, score_path: &Path, output_path: &Path) -> Result<(), IsisError> {
        self.score_converter.convert(event, score_path)?;

        let mut args = vec![
            "-m".to_string(),
            score_path.display().to_string(),
            "-o".to_string(),
            output_path.display().to_string(),
        ];
        args.extend(self.flags.iter().cloned());

        renderer::run_and_clean_up(&self.isis_path, &args, score_path, self.remove_score_file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::{beats, duration};
    use crate::events::SequentialEvent;

    fn sung_notes() -> Event {
        let phonemes: [(&[&str], &str); 4] = [(&[], "a"), (&[], "o"), (&["t"], "e"), (&[], "a")];
        let notes = ["c", "f", "d", "g"]
            .iter()
            .zip(phonemes)
            .map(|(pitch, (consonants, vowel))| {
                Event::from(
                    SimpleEvent::note_like(pitch, duration(1, 2), "0.5")
                        .unwrap()
                        .with_vowel(vowel)
                        .with_consonants(consonants),
                )
            })
            .collect::<SequentialEvent>();
        notes.into()
    }

    #[test]
    fn test_render_four_notes() {
        let score = IsisScoreConverter::default().render(&sung_notes()).unwrap();
        assert_eq!(
            score,
            "[lyrics]\n\
             xsampa: , a, , o, t, e, , a\n\
             \n\
             [score]\n\
             midiNotes: 60, 65, 62, 67\n\
             globalTransposition: 0\n\
             rhythm: 0.5, 0.5, 0.5, 0.5\n\
             loud_accents: 0.5, 0.5, 0.5, 0.5\n\
             tempo: 60"
        );
    }

    #[test]
    fn test_one_event_per_line() {
        let settings = IsisSettings {
            n_events_per_line: 1,
            ..IsisSettings::default()
        };
        let score = IsisScoreConverter::new(settings).render(&sung_notes()).unwrap();
        let indent = " ".repeat("xsampa".len() + 2);
        let expected = format!("[lyrics]\nxsampa: , a,\n{0}, o,\n{0}t, e,\n{0}, a\n\n[score]", indent);
        assert!(score.starts_with(&expected), "{}", score);
    }

    #[test]
    fn test_consonant_cluster_is_one_item() {
        let cluster = SimpleEvent::note_like("c4", beats(1), "0.5")
            .unwrap()
            .with_vowel("a")
            .with_consonants(&["s", "t"]);
        let score = IsisScoreConverter::default().render(&cluster.into()).unwrap();
        assert!(score.starts_with("[lyrics]\nxsampa: st, a\n"), "{}", score);
    }

    #[test]
    fn test_line_wrapping() {
        let settings = IsisSettings {
            n_events_per_line: 2,
            ..IsisSettings::default()
        };
        let notes: SequentialEvent = (0..5)
            .map(|_| {
                Event::from(
                    SimpleEvent::note_like("c4", beats(1), "1")
                        .unwrap()
                        .with_vowel("a")
                        .with_consonants(&[]),
                )
            })
            .collect();
        let score = IsisScoreConverter::new(settings).render(&notes.into()).unwrap();

        let indent = " ".repeat("midiNotes".len() + 2);
        let expected = format!("midiNotes: 60, 60,\n{0}60, 60,\n{0}60\n", indent);
        assert!(score.contains(&expected), "{}", score);

        // ceil(5 / 2) groups per key
        let rhythm_block: Vec<&str> = score
            .split("rhythm: ")
            .nth(1)
            .unwrap()
            .split("\nloud_accents")
            .next()
            .unwrap()
            .split(",\n")
            .collect();
        assert_eq!(rhythm_block.len(), 3);
        let items: usize = rhythm_block.iter().map(|g| g.split(", ").count()).sum();
        assert_eq!(items, 5);
    }

    #[test]
    fn test_missing_attribute_gives_rest() {
        let converter = IsisScoreConverter::default();
        let no_vowel = SimpleEvent::note_like("c4", beats(2), "0.5")
            .unwrap()
            .with_consonants(&["t"]);
        let data = converter.extract(&no_vowel);
        assert_eq!(data.duration, beats(2));
        assert!(data.consonants.is_empty());
        assert_eq!(data.vowel, "_");
        assert_eq!(data.pitch.midi_pitch_number(), 0.0);
        assert_eq!(data.volume.amplitude(), 0.0);
    }

    #[test]
    fn test_custom_extractors() {
        let extractors = IsisExtractors {
            vowel: Box::new(|_| Some("u".to_string())),
            consonants: Box::new(|_| Some(Vec::new())),
            ..IsisExtractors::default()
        };
        let converter = IsisScoreConverter::with_extractors(IsisSettings::default(), extractors);
        let event = SimpleEvent::note_like("a4", beats(1), "mf").unwrap();
        let data = converter.extract(&event);
        assert_eq!(data.vowel, "u");
        assert_eq!(data.pitch.midi_pitch_number(), 69.0);
    }

    #[test]
    fn test_sentence_loudness() {
        let settings = IsisSettings {
            default_sentence_loudness: Some(0.8),
            ..IsisSettings::default()
        };
        let score = IsisScoreConverter::new(settings).render(&sung_notes()).unwrap();
        assert!(score.contains("\nsentence_loudness: 0.8\ntempo: 60"));
    }

    #[test]
    fn test_simultaneous_event_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score.txt");
        let nested = SequentialEvent::new(vec![
            sung_notes(),
            SimultaneousEvent::new(vec![sung_notes()]).into(),
        ]);

        let result = IsisScoreConverter::default().convert(&nested.into(), &path);
        assert!(matches!(result, Err(IsisError::UnsupportedSimultaneousEvent)));
        assert!(!path.exists());
    }

    #[test]
    fn test_top_level_simultaneous_event_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score.txt");
        let chord = SimultaneousEvent::new(vec![sung_notes(), sung_notes()]);

        let converter = IsisScoreConverter::default();
        assert!(matches!(
            converter.render(&chord.clone().into()),
            Err(IsisError::UnsupportedSimultaneousEvent)
        ));
        let result = converter.convert(&chord.into(), &path);
        assert!(matches!(result, Err(IsisError::UnsupportedSimultaneousEvent)));
        assert!(!path.exists());
    }

    #[test]
    fn test_convert_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score.txt");
        IsisScoreConverter::default().convert(&sung_notes(), &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("[lyrics]\nxsampa: , a, , o, t, e, , a"));
    }

    #[cfg(unix)]
    #[test]
    fn test_renderer_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let score = dir.path().join("score.txt");
        let output = dir.path().join("out.wav");

        let ok = IsisConverter::new(IsisScoreConverter::default())
            .with_isis_path("true")
            .with_flag(SILENT_FLAG)
            .remove_score_file(true);
        ok.convert(&sung_notes(), &score, &output).unwrap();
        assert!(!score.exists());

        let failing = IsisConverter::new(IsisScoreConverter::default()).with_isis_path("false");
        let result = failing.convert(&sung_notes(), &score, &output);
        assert!(matches!(
            result,
            Err(IsisError::Render(RenderError::RendererFailed { .. }))
        ));
        assert!(score.exists());
    }
}
