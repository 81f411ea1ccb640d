//! Exact durations for musical events.
//!
//! Durations are rationals so that long sequences of triplets, quintuplets and
//! other tuplets add up without drift. The unit is up to the converter that
//! reads the event: ISiS and MIDI read beats, Csound reads seconds.

use num_rational::Ratio;
use num_traits::{ToPrimitive, Zero};

/// Exact duration (or absolute time point) in beats.
pub type Duration = Ratio<i64>;

/// Ticks per beat (quarter note) used when durations are written to MIDI.
pub const TICKS_PER_BEAT: u16 = 480;

/// Default tempo in beats per minute.
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Creates a duration from a fraction `numer / denom`.
///
/// # Panics
///
/// Panics if `denom` is zero (same contract as [`Ratio::new`]).
#[inline]
pub fn duration(numer: i64, denom: i64) -> Duration {
    Ratio::new(numer, denom)
}

/// Creates a duration from whole beats.
#[inline]
pub fn beats(n: i64) -> Duration {
    Ratio::from_integer(n)
}

/// Converts a duration to `f64` for numeric output.
#[inline]
pub fn to_f64(d: Duration) -> f64 {
    d.to_f64().unwrap_or(*d.numer() as f64 / *d.denom() as f64)
}

/// Converts an `f64` to the closest duration on a fine musical grid.
///
/// Uses a denominator of 9600 (divisible by 2, 3, 5, 8, 16, 32, 64 and 128)
/// which keeps the usual tuplet subdivisions exact.
pub fn from_f64(value: f64) -> Duration {
    let denom = 9600i64;
    let numer = (value * denom as f64).round() as i64;
    Ratio::new(numer, denom)
}

/// Renders a duration as a plain decimal number.
///
/// Whole durations print without a fractional part (`2`), others print their
/// shortest decimal representation (`0.5`, `0.3333333333333333`).
///
/// # Examples
///
/// ```
/// use motet::duration::{duration, format_decimal};
///
/// assert_eq!(format_decimal(duration(1, 2)), "0.5");
/// assert_eq!(format_decimal(duration(4, 2)), "2");
/// ```
pub fn format_decimal(d: Duration) -> String {
    if d.is_integer() {
        d.to_integer().to_string()
    } else {
        to_f64(d).to_string()
    }
}

/// Converts a time in beats to MIDI ticks, truncating towards zero.
pub fn beats_to_ticks(d: Duration, ticks_per_beat: u16) -> u32 {
    if d <= Duration::zero() {
        return 0;
    }
    (d * Ratio::from_integer(ticks_per_beat as i64))
        .to_integer()
        .clamp(0, u32::MAX as i64) as u32
}

/// Converts a time in beats to seconds based on tempo.
pub fn beats_to_seconds(d: Duration, tempo: f64) -> f64 {
    to_f64(d) * 60.0 / tempo
}
