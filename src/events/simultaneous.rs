//! Events that sound at the same time.

use super::sequential::tie_nested;
use super::{check_range, check_start, Event, EventError, SequentialEvent, SimpleEvent};
use crate::duration::Duration;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Container whose children all start at its own start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimultaneousEvent {
    /// Optional label, used by converters to annotate their output.
    pub tag: Option<String>,

    events: Vec<Event>,
}

impl SimultaneousEvent {
    pub fn new(events: Vec<Event>) -> Self {
        Self { tag: None, events }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut Vec<Event> {
        &mut self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Event> {
        self.events.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn push(&mut self, event: impl Into<Event>) {
        self.events.push(event.into());
    }

    /// Duration of the longest child, zero when empty.
    pub fn duration(&self) -> Duration {
        self.events
            .iter()
            .map(Event::duration)
            .max()
            .unwrap_or_else(Duration::zero)
    }

    pub fn cut_out(&mut self, start: Duration, end: Duration) -> Result<(), EventError> {
        check_range(start, end)?;
        self.events
            .iter_mut()
            .try_for_each(|event| event.cut_out(start, end))
    }

    pub fn cut_off(&mut self, start: Duration, end: Duration) -> Result<(), EventError> {
        check_range(start, end)?;
        self.events
            .iter_mut()
            .try_for_each(|event| event.cut_off(start, end))
    }

    /// Squashes `event` into every child. All children must be containers.
    pub fn squash_in(&mut self, start: Duration, event: Event) -> Result<(), EventError> {
        check_start(start, self.duration())?;
        if self.events.iter().any(Event::is_simple) {
            return Err(EventError::SquashIntoLeaf);
        }
        self.events
            .iter_mut()
            .try_for_each(|child| child.squash_in(start, event.clone()))
    }

    /// Splits every child that sounds at `time`. Leaves are replaced by a
    /// sequential pair; children that end before `time` stay untouched.
    pub fn split_child_at(&mut self, time: Duration) -> Result<(), EventError> {
        for child in self.events.iter_mut() {
            if time >= child.duration() {
                continue;
            }
            match child {
                Event::Simple(leaf) => {
                    if time > Duration::zero() {
                        let (before, after) = leaf.split_at(time)?;
                        *child = SequentialEvent::new(vec![before.into(), after.into()]).into();
                    }
                }
                _ => child.split_child_at(time)?,
            }
        }
        Ok(())
    }

    /// Ties leaves inside the nested containers; see [`SequentialEvent::tie_by`].
    ///
    /// Direct leaf children are never merged since they don't follow each other.
    pub fn tie_by<F>(&mut self, mut condition: F)
    where
        F: FnMut(&SimpleEvent, &SimpleEvent) -> bool,
    {
        self.tie_by_dyn(&mut condition);
    }

    pub(crate) fn tie_by_dyn(&mut self, condition: &mut dyn FnMut(&SimpleEvent, &SimpleEvent) -> bool) {
        for child in self.events.iter_mut() {
            tie_nested(child, condition);
        }
    }

    /// Removes every child for which `condition` returns `false`.
    pub fn filter<F>(&mut self, condition: F)
    where
        F: FnMut(&Event) -> bool,
    {
        self.events.retain(condition);
    }
}

impl From<Vec<Event>> for SimultaneousEvent {
    fn from(events: Vec<Event>) -> Self {
        Self::new(events)
    }
}

impl FromIterator<Event> for SimultaneousEvent {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SimultaneousEvent {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
