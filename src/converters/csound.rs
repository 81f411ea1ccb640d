//! Score files for Csound.
//!
//! Every leaf becomes one `i` statement whose p-fields are read from the
//! leaf. By default p1 is instrument 1, p2 the start time and p3 the
//! duration; further p-fields are added with [`CsoundScoreConverter::with_pfield`].

use super::renderer::{self, RenderError};
use super::EventConverter;
use crate::duration::{format_decimal, Duration};
use crate::events::{SequentialEvent, SimpleEvent, SimultaneousEvent, Event};
use num_traits::Zero;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const CSOUND_PATH: &str = "csound";

/// Comment written before the children of a sequential event.
pub const SEQUENTIAL_EVENT_ANNOTATION: &str = "; ---- sequential event ----";

/// Comment written before the children of a simultaneous event.
pub const SIMULTANEOUS_EVENT_ANNOTATION: &str = "; ---- simultaneous event ----";

const N_EMPTY_LINES_AFTER_COMPLEX_EVENT: usize = 1;

#[derive(Debug, Error)]
pub enum CsoundError {
    #[error("p-fields are numbered from 1, got p{0}")]
    InvalidPField(usize),
    #[error("failed to write Csound score '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Value of one p-field. Text is written in double quotes.
#[derive(Debug, Clone, PartialEq)]
pub enum PField {
    Number(f64),
    Text(String),
}

impl fmt::Display for PField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PField::Number(n) => write!(f, "{}", n),
            PField::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<f64> for PField {
    fn from(n: f64) -> Self {
        PField::Number(n)
    }
}

impl From<&str> for PField {
    fn from(s: &str) -> Self {
        PField::Text(s.to_string())
    }
}

/// Reads a p-field from a leaf; `None` turns the leaf into a rest.
pub type PFieldFunction = Box<dyn Fn(&SimpleEvent) -> Option<PField> + Send + Sync>;

enum Slot {
    Instrument(f64),
    StartTime,
    /// Omitted for leaves without a positive duration.
    Duration,
    Extract(PFieldFunction),
}

/// Writes Csound score files.
pub struct CsoundScoreConverter {
    pfields: BTreeMap<usize, Slot>,
}

impl Default for CsoundScoreConverter {
    fn default() -> Self {
        let mut pfields = BTreeMap::new();
        pfields.insert(1, Slot::Instrument(1.0));
        pfields.insert(2, Slot::StartTime);
        pfields.insert(3, Slot::Duration);
        Self { pfields }
    }
}

impl fmt::Debug for CsoundScoreConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsoundScoreConverter")
            .field("pfields", &self.pfields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CsoundScoreConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns p-field `index` (1-based), replacing a default or earlier assignment.
    pub fn with_pfield<F>(mut self, index: usize, function: F) -> Result<Self, CsoundError>
    where
        F: Fn(&SimpleEvent) -> Option<PField> + Send + Sync + 'static,
    {
        if index == 0 {
            return Err(CsoundError::InvalidPField(index));
        }
        self.pfields.insert(index, Slot::Extract(Box::new(function)));
        Ok(self)
    }

    /// Writes the absolute start time of each leaf into p-field `index`.
    pub fn with_start_time_pfield(mut self, index: usize) -> Result<Self, CsoundError> {
        if index == 0 {
            return Err(CsoundError::InvalidPField(index));
        }
        self.pfields.insert(index, Slot::StartTime);
        Ok(self)
    }

    /// P-fields in order; `None` marks gaps, which are written as `0`.
    fn ordered_slots(&self) -> Vec<Option<&Slot>> {
        let last = self.pfields.keys().next_back().copied().unwrap_or(0);
        (1..=last).map(|index| self.pfields.get(&index)).collect()
    }

    /// Renders the score text.
    pub fn render(&self, event: &Event) -> Result<String, CsoundError> {
        let gaps: Vec<usize> = (1..)
            .zip(self.ordered_slots())
            .filter(|(_, slot)| slot.is_none())
            .map(|(index, _)| index)
            .collect();
        if !gaps.is_empty() {
            warn!(?gaps, "no mapping for these p-fields, writing 0");
        }
        Ok(self.convert_event(event, Duration::zero())?.join("\n"))
    }

    /// Renders the score and writes it to `path`.
    pub fn convert(&self, event: &Event, path: &Path) -> Result<(), CsoundError> {
        let score = self.render(event)?;
        fs::write(path, score).map_err(|source| CsoundError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "wrote Csound score");
        Ok(())
    }

    fn annotate<'a>(
        &self,
        annotation: &str,
        children: impl Iterator<Item = (Duration, &'a Event)>,
    ) -> Result<Vec<String>, CsoundError> {
        let mut lines = vec![annotation.to_string()];
        for (start, child) in children {
            lines.extend(self.convert_event(child, start)?);
        }
        lines.extend(std::iter::repeat(String::new()).take(N_EMPTY_LINES_AFTER_COMPLEX_EVENT));
        Ok(lines)
    }
}

impl EventConverter for CsoundScoreConverter {
    type Output = String;
    type Error = CsoundError;

    fn convert_simple_event(
        &self,
        event: &SimpleEvent,
        absolute_entry_delay: Duration,
    ) -> Result<Vec<String>, CsoundError> {
        let mut line = String::from("i");
        for slot in self.ordered_slots() {
            let value = match slot {
                None => Some("0".to_string()),
                Some(Slot::Instrument(n)) => Some(n.to_string()),
                Some(Slot::StartTime) => Some(format_decimal(absolute_entry_delay)),
                Some(Slot::Duration) => {
                    (event.duration > Duration::zero()).then(|| format_decimal(event.duration))
                }
                Some(Slot::Extract(function)) => match function(event) {
                    Some(pfield) => Some(pfield.to_string()),
                    None => {
                        debug!(start = %absolute_entry_delay, "p-field missing, leaf is a rest");
                        return Ok(Vec::new());
                    }
                },
            };
            if let Some(value) = value {
                line.push(' ');
                line.push_str(&value);
            }
        }
        Ok(vec![line])
    }

    fn convert_sequential_event(
        &self,
        event: &SequentialEvent,
        absolute_entry_delay: Duration,
    ) -> Result<Vec<String>, CsoundError> {
        let starts = event.absolute_times();
        self.annotate(
            SEQUENTIAL_EVENT_ANNOTATION,
            starts
                .into_iter()
                .map(|start| absolute_entry_delay + start)
                .zip(event.iter()),
        )
    }

    fn convert_simultaneous_event(
        &self,
        event: &SimultaneousEvent,
        absolute_entry_delay: Duration,
    ) -> Result<Vec<String>, CsoundError> {
        self.annotate(
            SIMULTANEOUS_EVENT_ANNOTATION,
            event.iter().map(|child| (absolute_entry_delay, child)),
        )
    }
}

/// Renders sound files by running Csound on a generated score.
#[derive(Debug)]
pub struct CsoundConverter {
    score_converter: CsoundScoreConverter,
    orchestra_path: PathBuf,
    csound_path: String,
    flags: Vec<String>,
    remove_score_file: bool,
}

impl CsoundConverter {
    pub fn new(score_converter: CsoundScoreConverter, orchestra_path: impl Into<PathBuf>) -> Self {
        Self {
            score_converter,
            orchestra_path: orchestra_path.into(),
            csound_path: CSOUND_PATH.to_string(),
            flags: Vec::new(),
            remove_score_file: false,
        }
    }

    pub fn with_csound_path(mut self, csound_path: impl Into<String>) -> Self {
        self.csound_path = csound_path.into();
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn remove_score_file(mut self, remove: bool) -> Self {
        self.remove_score_file = remove;
        self
    }

    /// Writes the score to `score_path` and lets Csound render `output_path`.
    pub fn convert(&self, event: &Event, score_path: &Path, output_path: &Path) -> Result<(), CsoundError> {
        self.score_converter.convert(event, score_path)?;

        let mut args = vec!["-o".to_string(), output_path.display().to_string()];
        args.extend(self.flags.iter().cloned());
        args.push(self.orchestra_path.display().to_string());
        args.push(score_path.display().to_string());

        renderer::run_and_clean_up(&self.csound_path, &args, score_path, self.remove_score_file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::{beats, duration};
    use crate::parameters::names;

    fn frequency(event: &SimpleEvent) -> Option<PField> {
        Some(PField::Number(event.pitches()?.first()?.frequency()))
    }

    #[test]
    fn test_default_pfields() {
        let converter = CsoundScoreConverter::new().with_pfield(4, frequency).unwrap();
        let notes = SequentialEvent::new(vec![
            SimpleEvent::note_like("a4", duration(1, 2), "mf").unwrap().into(),
            SimpleEvent::note_like("a5", beats(1), "mf").unwrap().into(),
        ]);
        let score = converter.render(&notes.into()).unwrap();
        assert_eq!(
            score,
            format!("{}\ni 1 0 0.5 440\ni 1 0.5 1 880\n", SEQUENTIAL_EVENT_ANNOTATION)
        );
    }

    #[test]
    fn test_missing_pfield_is_rest() {
        let converter = CsoundScoreConverter::new().with_pfield(4, frequency).unwrap();
        let rest = Event::from(SimpleEvent::new(beats(1)));
        assert_eq!(converter.render(&rest).unwrap(), "");
    }

    #[test]
    fn test_text_and_gaps() {
        let converter = CsoundScoreConverter::new()
            .with_pfield(6, |e: &SimpleEvent| e.vowel().map(PField::from))
            .unwrap();
        let event = Event::from(SimpleEvent::new(beats(2)).with_parameter(names::VOWEL, "a"));
        assert_eq!(converter.render(&event).unwrap(), "i 1 0 2 0 0 \"a\"");
    }

    #[test]
    fn test_zero_duration_omits_p3() {
        let event = Event::from(SimpleEvent::new(beats(0)));
        assert_eq!(CsoundScoreConverter::new().render(&event).unwrap(), "i 1 0");
    }

    #[test]
    fn test_simultaneous_annotation() {
        let event = Event::from(SimultaneousEvent::new(vec![
            SimpleEvent::new(beats(1)).into(),
            SimpleEvent::new(beats(2)).into(),
        ]));
        let score = CsoundScoreConverter::new().render(&event).unwrap();
        let lines: Vec<&str> = score.split('\n').collect();
        assert_eq!(
            lines,
            vec![SIMULTANEOUS_EVENT_ANNOTATION, "i 1 0 1", "i 1 0 2", ""]
        );
    }

    #[test]
    fn test_pfield_zero_is_invalid() {
        assert!(matches!(
            CsoundScoreConverter::new().with_pfield(0, frequency),
            Err(CsoundError::InvalidPField(0))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_csound_command() {
        let dir = tempfile::tempdir().unwrap();
        let score = dir.path().join("score.sco");
        let converter = CsoundConverter::new(CsoundScoreConverter::new(), dir.path().join("synth.orc"))
            .with_csound_path("true")
            .remove_score_file(true);
        converter
            .convert(&SimpleEvent::new(beats(1)).into(), &score, &dir.path().join("out.wav"))
            .unwrap();
        assert!(!score.exists());
    }
}
