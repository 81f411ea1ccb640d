//! motet - event-based computer-aided composition.
//!
//! Music is modelled as a tree of events: leaves carry a duration and named
//! parameters (pitches, volume, vowels), sequential containers play their
//! children one after another and simultaneous containers play them together.
//! Converters turn trees into ISiS singing-synthesis scores, Csound scores and
//! standard MIDI files, and compute amplitudes for a perceived loudness.

pub mod composition;
pub mod converters;
pub mod duration;
pub mod events;
pub mod parameters;

// Re-export commonly used types
pub use composition::{Composition, CompositionError};
pub use converters::EventConverter;
pub use duration::{Duration, TICKS_PER_BEAT};
pub use events::{Event, EventError, SequentialEvent, SimpleEvent, SimultaneousEvent};
pub use parameters::{ParameterValue, Pitch, Volume};
