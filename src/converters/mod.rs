//! Converters from events to other representations.
//!
//! Score frontends walk the event tree with [`EventConverter`], collect one
//! record per leaf and serialize the records. Renderers hand the written
//! score to an external program.

pub mod csound;
pub mod envelope;
pub mod isis;
pub mod iso226;
pub mod loudness;
pub mod midi;
pub mod renderer;

pub use csound::{CsoundConverter, CsoundError, CsoundScoreConverter, PField};
pub use envelope::Envelope;
pub use isis::{ExtractedData, IsisConverter, IsisError, IsisExtractors, IsisScoreConverter, IsisSettings};
pub use iso226::Interpolation;
pub use loudness::{sone_to_phon, LoudnessError, LoudnessSettings, LoudnessToAmplitudeConverter};
pub use midi::{MidiError, MidiFileConverter, MidiSettings};
pub use renderer::RenderError;

use crate::duration::Duration;
use crate::events::{Event, SequentialEvent, SimpleEvent, SimultaneousEvent};

/// Depth-first traversal producing data for every leaf.
///
/// Implementors only need to convert a single leaf. Sequential children are
/// shifted by their start time; simultaneous children share the container's
/// start. Each method returns the records of every leaf below the event, in
/// tree order.
pub trait EventConverter {
    type Output;
    type Error;

    fn convert_simple_event(
        &self,
        event: &SimpleEvent,
        absolute_entry_delay: Duration,
    ) -> Result<Vec<Self::Output>, Self::Error>;

    fn convert_sequential_event(
        &self,
        event: &SequentialEvent,
        absolute_entry_delay: Duration,
    ) -> Result<Vec<Self::Output>, Self::Error> {
        let mut data = Vec::new();
        for (child, start) in event.iter().zip(event.absolute_times()) {
            data.extend(self.convert_event(child, absolute_entry_delay + start)?);
        }
        Ok(data)
    }

    fn convert_simultaneous_event(
        &self,
        event: &SimultaneousEvent,
        absolute_entry_delay: Duration,
    ) -> Result<Vec<Self::Output>, Self::Error> {
        let mut data = Vec::new();
        for child in event.iter() {
            data.extend(self.convert_event(child, absolute_entry_delay)?);
        }
        Ok(data)
    }

    fn convert_event(
        &self,
        event: &Event,
        absolute_entry_delay: Duration,
    ) -> Result<Vec<Self::Output>, Self::Error> {
        match event {
            Event::Simple(e) => self.convert_simple_event(e, absolute_entry_delay),
            Event::Sequential(e) => self.convert_sequential_event(e, absolute_entry_delay),
            Event::Simultaneous(e) => self.convert_simultaneous_event(e, absolute_entry_delay),
        }
    }
}
