//! Events that follow one another.

use super::{check_range, check_start, Event, EventError, SimpleEvent};
use crate::duration::Duration;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Container whose children play one after another.
///
/// The start of each child is the sum of the durations before it, so
/// editing one child shifts everything after it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequentialEvent {
    /// Optional label, used by converters to annotate their output.
    pub tag: Option<String>,

    events: Vec<Event>,
}

impl SequentialEvent {
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

    pub fn insert(&mut self, index: usize, event: impl Into<Event>) {
        self.events.insert(index, event.into());
    }

    pub fn remove(&mut self, index: usize) -> Event {
        self.events.remove(index)
    }

    /// Sum of the children's durations.
    pub fn duration(&self) -> Duration {
        self.events.iter().map(Event::duration).sum()
    }

    /// Start time of every child.
    pub fn absolute_times(&self) -> Vec<Duration> {
        let mut time = Duration::zero();
        self.events
            .iter()
            .map(|event| {
                let start = time;
                time += event.duration();
                start
            })
            .collect()
    }

    /// `(start, end)` of every child.
    pub fn start_and_end_time_per_event(&self) -> Vec<(Duration, Duration)> {
        self.events
            .iter()
            .zip(self.absolute_times())
            .map(|(event, start)| (start, start + event.duration()))
            .collect()
    }

    /// Index of the child sounding at `time`, `None` outside `0..duration`.
    pub fn get_event_index_at(&self, time: Duration) -> Option<usize> {
        Self::index_at(time, &self.absolute_times(), self.duration())
    }

    fn index_at(time: Duration, absolute_times: &[Duration], duration: Duration) -> Option<usize> {
        if time < Duration::zero() || time >= duration {
            return None;
        }
        // last child starting at or before `time`
        let position = absolute_times.partition_point(|start| *start <= time);
        position.checked_sub(1)
    }

    pub fn get_event_at(&self, time: Duration) -> Option<&Event> {
        self.get_event_index_at(time).map(|index| &self.events[index])
    }

    /// Keeps only the window `start..end`; children outside of it are removed.
    pub fn cut_out(&mut self, start: Duration, end: Duration) -> Result<(), EventError> {
        check_range(start, end)?;
        let starts = self.absolute_times();
        let mut keep = Vec::with_capacity(self.events.len());

        for (event, event_start) in self.events.iter_mut().zip(starts) {
            let event_duration = event.duration();
            let event_end = event_start + event_duration;

            let mut local_start = Duration::zero();
            let mut local_end = event_duration;
            if event_start < start {
                local_start += start - event_start;
            }
            if event_end > end {
                local_end -= event_end - end;
            }

            if local_start < local_end {
                event.cut_out(local_start, local_end)?;
                keep.push(true);
            } else {
                keep.push(false);
            }
        }

        let mut keep = keep.into_iter();
        self.events.retain(|_| keep.next().unwrap_or(false));
        Ok(())
    }

    /// Removes the window `start..end` and closes the gap.
    pub fn cut_off(&mut self, start: Duration, end: Duration) -> Result<(), EventError> {
        check_range(start, end)?;
        let cut_duration = end - start;
        if cut_duration <= Duration::zero() {
            return Ok(());
        }

        let starts = self.absolute_times();
        let mut keep = Vec::with_capacity(self.events.len());
        for (event, event_start) in self.events.iter_mut().zip(starts) {
            let event_end = event_start + event.duration();
            if event_start >= start && event_end <= end {
                keep.push(false);
                continue;
            }
            if event_start <= start && event_end >= start {
                let local_start = start - event_start;
                event.cut_off(local_start, local_start + cut_duration)?;
            } else if event_start < end && event_end > end {
                event.cut_off(Duration::zero(), end - event_start)?;
            }
            keep.push(true);
        }

        let mut keep = keep.into_iter();
        self.events.retain(|_| keep.next().unwrap_or(true));
        Ok(())
    }

    /// Inserts `event` at `start`, removing what played during its duration.
    ///
    /// A child sounding at `start` is split so that its first part stays.
    pub fn squash_in(&mut self, start: Duration, event: Event) -> Result<(), EventError> {
        check_start(start, self.duration())?;
        self.cut_off(start, start + event.duration())?;

        if start == self.duration() {
            self.events.push(event);
            return Ok(());
        }

        let starts = self.absolute_times();
        let mut index = Self::index_at(start, &starts, self.duration())
            .ok_or(EventError::NoChildAt(start))?;
        let split_position = start - starts[index];
        if split_position > Duration::zero() {
            let (before, after) = self.events[index].split_at(split_position)?;
            self.events[index] = after;
            self.events.insert(index, before);
            index += 1;
        }
        self.events.insert(index, event);
        Ok(())
    }

    /// Splits the child sounding at `time` so that a new child starts there.
    ///
    /// Nothing changes when a child already starts at `time`.
    pub fn split_child_at(&mut self, time: Duration) -> Result<(), EventError> {
        let starts = self.absolute_times();
        let index =
            Self::index_at(time, &starts, self.duration()).ok_or(EventError::NoChildAt(time))?;
        if time != starts[index] {
            let (before, after) = self.events[index].split_at(time - starts[index])?;
            self.events[index] = before;
            self.events.insert(index + 1, after);
        }
        Ok(())
    }

    /// Merges neighbouring leaves for which `condition` holds; the left leaf
    /// survives and absorbs the right leaf's duration. Nested containers are
    /// processed recursively.
    pub fn tie_by<F>(&mut self, mut condition: F)
    where
        F: FnMut(&SimpleEvent, &SimpleEvent) -> bool,
    {
        self.tie_by_dyn(&mut condition);
    }

    pub(crate) fn tie_by_dyn(&mut self, condition: &mut dyn FnMut(&SimpleEvent, &SimpleEvent) -> bool) {
        let mut pointer = 0;
        while pointer + 1 < self.events.len() {
            let tie = match (&self.events[pointer], &self.events[pointer + 1]) {
                (Event::Simple(a), Event::Simple(b)) => condition(a, b),
                _ => false,
            };
            if tie {
                let absorbed = self.events.remove(pointer + 1).duration();
                if let Event::Simple(survivor) = &mut self.events[pointer] {
                    survivor.duration += absorbed;
                }
            } else {
                tie_nested(&mut self.events[pointer], condition);
                pointer += 1;
            }
        }
        if let Some(last) = self.events.last_mut() {
            tie_nested(last, condition);
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

pub(crate) fn tie_nested(
    event: &mut Event,
    condition: &mut dyn FnMut(&SimpleEvent, &SimpleEvent) -> bool,
) {
    match event {
        Event::Simple(_) => {}
        Event::Sequential(e) => e.tie_by_dyn(condition),
        Event::Simultaneous(e) => e.tie_by_dyn(condition),
    }
}

impl From<Vec<Event>> for SequentialEvent {
    fn from(events: Vec<Event>) -> Self {
        Self::new(events)
    }
}

impl FromIterator<Event> for SequentialEvent {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SequentialEvent {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::{beats, duration};
    use crate::parameters::names;

    fn leaf(d: i64) -> Event {
        SimpleEvent::new(beats(d)).into()
    }

    fn durations(seq: &SequentialEvent) -> Vec<Duration> {
        seq.iter().map(Event::duration).collect()
    }

    #[test]
    fn test_absolute_times() {
        let seq = SequentialEvent::new(vec![leaf(1), leaf(2), leaf(3)]);
        assert_eq!(seq.absolute_times(), vec![beats(0), beats(1), beats(3)]);
        assert_eq!(
            seq.start_and_end_time_per_event(),
            vec![(beats(0), beats(1)), (beats(1), beats(3)), (beats(3), beats(6))]
        );
        assert_eq!(seq.duration(), beats(6));
    }

    #[test]
    fn test_get_event_index_at() {
        let seq = SequentialEvent::new(vec![leaf(2), leaf(3)]);
        assert_eq!(seq.get_event_index_at(beats(1)), Some(0));
        assert_eq!(seq.get_event_index_at(beats(2)), Some(1));
        assert_eq!(seq.get_event_index_at(beats(3)), Some(1));
        assert_eq!(seq.get_event_index_at(beats(5)), None);
        assert_eq!(seq.get_event_index_at(beats(-1)), None);
        assert_eq!(seq.get_event_at(beats(4)).map(Event::duration), Some(beats(3)));
    }

    #[test]
    fn test_zero_length_children_are_skipped() {
        let seq = SequentialEvent::new(vec![leaf(1), leaf(0), leaf(1)]);
        assert_eq!(seq.get_event_index_at(beats(1)), Some(2));
    }

    #[test]
    fn test_cut_out() {
        let mut seq = SequentialEvent::new(vec![leaf(2), leaf(2), leaf(2)]);
        seq.cut_out(beats(1), beats(3)).unwrap();
        assert_eq!(durations(&seq), vec![beats(1), beats(1)]);

        let mut seq = SequentialEvent::new(vec![leaf(2), leaf(2), leaf(2)]);
        seq.cut_out(beats(2), beats(4)).unwrap();
        assert_eq!(durations(&seq), vec![beats(2)]);

        assert!(seq.cut_out(beats(2), beats(1)).is_err());
    }

    #[test]
    fn test_cut_off() {
        let mut seq = SequentialEvent::new(vec![leaf(2), leaf(2), leaf(2)]);
        seq.cut_off(beats(1), beats(3)).unwrap();
        assert_eq!(durations(&seq), vec![beats(1), beats(1), beats(2)]);

        let mut seq = SequentialEvent::new(vec![leaf(2), leaf(2), leaf(2)]);
        seq.cut_off(beats(2), beats(4)).unwrap();
        assert_eq!(durations(&seq), vec![beats(2), beats(2)]);

        let mut seq = SequentialEvent::new(vec![leaf(2), leaf(2)]);
        seq.cut_off(beats(3), beats(10)).unwrap();
        assert_eq!(durations(&seq), vec![beats(2), beats(1)]);
    }

    #[test]
    fn test_squash_in() {
        let mut seq = SequentialEvent::new(vec![leaf(2), leaf(2)]);
        let marker = SimpleEvent::new(beats(1)).with_vowel("x");
        seq.squash_in(beats(1), marker.into()).unwrap();
        assert_eq!(durations(&seq), vec![beats(1), beats(1), beats(2)]);
        assert_eq!(seq.events()[1].as_simple().and_then(|e| e.vowel()), Some("x"));

        // appending at the very end
        seq.squash_in(beats(4), leaf(3)).unwrap();
        assert_eq!(seq.duration(), beats(7));

        assert!(matches!(
            seq.squash_in(beats(8), leaf(1)),
            Err(EventError::StartOutOfRange { .. })
        ));
    }

    #[test]
    fn test_split_child_at() {
        let mut seq = SequentialEvent::new(vec![
            SimpleEvent::new(beats(2)).with_vowel("a").into(),
            leaf(2),
        ]);
        seq.split_child_at(duration(1, 2)).unwrap();
        assert_eq!(durations(&seq), vec![duration(1, 2), duration(3, 2), beats(2)]);
        assert_eq!(seq.events()[1].as_simple().and_then(|e| e.vowel()), Some("a"));

        // already split there
        seq.split_child_at(beats(2)).unwrap();
        assert_eq!(seq.len(), 3);

        assert_eq!(seq.split_child_at(beats(9)), Err(EventError::NoChildAt(beats(9))));
    }

    #[test]
    fn test_tie_by() {
        let rest = || Event::from(SimpleEvent::new(beats(1)));
        let note = || Event::from(SimpleEvent::note_like("c4", beats(1), "mf").unwrap());
        let mut seq = SequentialEvent::new(vec![
            note(),
            rest(),
            rest(),
            SequentialEvent::new(vec![rest(), rest()]).into(),
            rest(),
        ]);
        let is_rest = |e: &SimpleEvent| !e.has_parameter(names::PITCH_OR_PITCHES);
        seq.tie_by(|a, b| is_rest(a) && is_rest(b));

        assert_eq!(durations(&seq), vec![beats(1), beats(2), beats(2), beats(1)]);
        assert_eq!(seq.events()[2].children().map(|c| c.len()), Some(1));
    }

    #[test]
    fn test_filter() {
        let mut seq = SequentialEvent::new(vec![leaf(1), leaf(3), leaf(2)]);
        seq.filter(|e| e.duration() > beats(1));
        assert_eq!(durations(&seq), vec![beats(3), beats(2)]);
    }
}
