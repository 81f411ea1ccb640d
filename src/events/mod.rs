//! Nested musical events.
//!
//! An [`Event`] is either a leaf ([`SimpleEvent`]) or a container whose
//! children play one after another ([`SequentialEvent`]) or at the same time
//! ([`SimultaneousEvent`]). Containers may nest arbitrarily deep.
//!
//! All time arguments are relative to the start of the event the method is
//! called on.

mod sequential;
mod simple;
mod simultaneous;

pub use sequential::SequentialEvent;
pub use simple::SimpleEvent;
pub use simultaneous::SimultaneousEvent;

use crate::duration::Duration;
use crate::parameters::ParameterValue;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by event tree operations.
#[derive(Debug, Error, PartialEq)]
pub enum EventError {
    #[error("invalid range: end ({end}) must not be smaller than start ({start})")]
    InvalidRange { start: Duration, end: Duration },
    #[error("can't cut out {start}..{end} from a leaf with duration {duration}: nothing would remain")]
    EmptyCut {
        start: Duration,
        end: Duration,
        duration: Duration,
    },
    #[error("start {start} is outside of the event (duration {duration})")]
    StartOutOfRange { start: Duration, duration: Duration },
    #[error("no child event is active at {0}")]
    NoChildAt(Duration),
    #[error("can't squash an event into a leaf; simultaneous containers must only hold containers")]
    SquashIntoLeaf,
    #[error("'{0}' is not available on simple events")]
    UnsupportedOnLeaf(&'static str),
}

pub(crate) fn check_range(start: Duration, end: Duration) -> Result<(), EventError> {
    if end < start {
        Err(EventError::InvalidRange { start, end })
    } else {
        Ok(())
    }
}

pub(crate) fn check_start(start: Duration, duration: Duration) -> Result<(), EventError> {
    if start < Duration::zero() || start > duration {
        Err(EventError::StartOutOfRange { start, duration })
    } else {
        Ok(())
    }
}

/// A musical event of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Simple(SimpleEvent),
    Sequential(SequentialEvent),
    Simultaneous(SimultaneousEvent),
}

impl Event {
    pub fn duration(&self) -> Duration {
        match self {
            Event::Simple(e) => e.duration,
            Event::Sequential(e) => e.duration(),
            Event::Simultaneous(e) => e.duration(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Event::Simple(e) => e.tag.as_deref(),
            Event::Sequential(e) => e.tag.as_deref(),
            Event::Simultaneous(e) => e.tag.as_deref(),
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, Event::Simple(_))
    }

    pub fn as_simple(&self) -> Option<&SimpleEvent> {
        match self {
            Event::Simple(e) => Some(e),
            _ => None,
        }
    }

    /// Children of a container, `None` for leaves.
    pub fn children(&self) -> Option<&[Event]> {
        match self {
            Event::Simple(_) => None,
            Event::Sequential(e) => Some(e.events()),
            Event::Simultaneous(e) => Some(e.events()),
        }
    }

    /// Whether this event or any of its descendants is a simultaneous container.
    pub fn contains_simultaneous(&self) -> bool {
        match self {
            Event::Simple(_) => false,
            Event::Sequential(e) => e.iter().any(Event::contains_simultaneous),
            Event::Simultaneous(_) => true,
        }
    }

    /// Walks down the tree following `indices`.
    pub fn get_event_from_indices(&self, indices: &[usize]) -> Option<&Event> {
        match indices.split_first() {
            None => Some(self),
            Some((first, rest)) => self.children()?.get(*first)?.get_event_from_indices(rest),
        }
    }

    /// Value of the parameter `name` for every leaf in tree order.
    ///
    /// A leaf without the parameter contributes `None`, so a single leaf
    /// always yields exactly one entry.
    pub fn get_parameter(&self, name: &str) -> Vec<Option<&ParameterValue>> {
        let mut values = Vec::new();
        self.collect_parameter(name, &mut values);
        values
    }

    fn collect_parameter<'a>(&'a self, name: &str, values: &mut Vec<Option<&'a ParameterValue>>) {
        match self {
            Event::Simple(e) => values.push(e.get_parameter(name)),
            Event::Sequential(e) => e.iter().for_each(|c| c.collect_parameter(name, values)),
            Event::Simultaneous(e) => e.iter().for_each(|c| c.collect_parameter(name, values)),
        }
    }

    /// Assigns `value` to every leaf. With `set_unassigned == false` only
    /// leaves that already carry the parameter are touched.
    pub fn set_parameter(&mut self, name: &str, value: ParameterValue, set_unassigned: bool) {
        self.set_parameter_with(name, |_| value.clone(), set_unassigned);
    }

    /// Like [`set_parameter`](Self::set_parameter) but computes the new value
    /// from the previous one.
    pub fn set_parameter_with<F>(&mut self, name: &str, mut f: F, set_unassigned: bool)
    where
        F: FnMut(Option<&ParameterValue>) -> ParameterValue,
    {
        self.for_each_leaf_mut(&mut |leaf| {
            if set_unassigned || leaf.has_parameter(name) {
                let value = f(leaf.get_parameter(name));
                leaf.set_parameter(name, value);
            }
        });
    }

    /// Mutates the parameter in place on every leaf that carries it.
    pub fn mutate_parameter<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(&mut ParameterValue),
    {
        self.for_each_leaf_mut(&mut |leaf| {
            if let Some(value) = leaf.get_parameter_mut(name) {
                f(value);
            }
        });
    }

    pub(crate) fn for_each_leaf_mut(&mut self, f: &mut dyn FnMut(&mut SimpleEvent)) {
        match self {
            Event::Simple(e) => f(e),
            Event::Sequential(e) => e.iter_mut().for_each(|c| c.for_each_leaf_mut(f)),
            Event::Simultaneous(e) => e.iter_mut().for_each(|c| c.for_each_leaf_mut(f)),
        }
    }

    /// Every leaf paired with its absolute start time, sorted by start time.
    ///
    /// Leaves starting at the same time keep their tree order.
    pub fn leaves(&self) -> Vec<(&SimpleEvent, Duration)> {
        let mut leaves = Vec::new();
        self.collect_leaves(Duration::zero(), &mut leaves);
        leaves.sort_by(|a, b| a.1.cmp(&b.1));
        leaves
    }

    pub(crate) fn collect_leaves<'a>(
        &'a self,
        offset: Duration,
        leaves: &mut Vec<(&'a SimpleEvent, Duration)>,
    ) {
        match self {
            Event::Simple(e) => leaves.push((e, offset)),
            Event::Sequential(e) => {
                for (child, start) in e.iter().zip(e.absolute_times()) {
                    child.collect_leaves(offset + start, leaves);
                }
            }
            Event::Simultaneous(e) => e.iter().for_each(|c| c.collect_leaves(offset, leaves)),
        }
    }

    /// Keeps only the time window `start..end`.
    pub fn cut_out(&mut self, start: Duration, end: Duration) -> Result<(), EventError> {
        match self {
            Event::Simple(e) => e.cut_out(start, end),
            Event::Sequential(e) => e.cut_out(start, end),
            Event::Simultaneous(e) => e.cut_out(start, end),
        }
    }

    /// Removes the time window `start..end`.
    pub fn cut_off(&mut self, start: Duration, end: Duration) -> Result<(), EventError> {
        match self {
            Event::Simple(e) => e.cut_off(start, end),
            Event::Sequential(e) => e.cut_off(start, end),
            Event::Simultaneous(e) => e.cut_off(start, end),
        }
    }

    /// Splits the event into the parts before and after `time`.
    pub fn split_at(&self, time: Duration) -> Result<(Event, Event), EventError> {
        let mut before = self.clone();
        before.cut_out(Duration::zero(), time)?;
        let mut after = self.clone();
        after.cut_out(time, self.duration())?;
        Ok((before, after))
    }

    /// Inserts `event` at `start`, overwriting whatever plays there.
    pub fn squash_in(&mut self, start: Duration, event: Event) -> Result<(), EventError> {
        match self {
            Event::Simple(_) => Err(EventError::UnsupportedOnLeaf("squash_in")),
            Event::Sequential(e) => e.squash_in(start, event),
            Event::Simultaneous(e) => e.squash_in(start, event),
        }
    }

    /// Splits the child active at `time` into two children.
    pub fn split_child_at(&mut self, time: Duration) -> Result<(), EventError> {
        match self {
            Event::Simple(_) => Err(EventError::UnsupportedOnLeaf("split_child_at")),
            Event::Sequential(e) => e.split_child_at(time),
            Event::Simultaneous(e) => e.split_child_at(time),
        }
    }
}

impl From<SimpleEvent> for Event {
    fn from(e: SimpleEvent) -> Self {
        Event::Simple(e)
    }
}

impl From<SequentialEvent> for Event {
    fn from(e: SequentialEvent) -> Self {
        Event::Sequential(e)
    }
}

impl From<SimultaneousEvent> for Event {
    fn from(e: SimultaneousEvent) -> Self {
        Event::Simultaneous(e)
    }
}
