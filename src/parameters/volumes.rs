//! Volume representations and decibel helpers.

use super::ParameterError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Highest MIDI velocity.
const MAXIMUM_VELOCITY: u8 = 127;

/// Decibel assigned to the softest dynamic indicator.
const MINIMUM_DYNAMIC_DECIBEL: f64 = -60.0;

/// Decibel assigned to the loudest dynamic indicator.
const MAXIMUM_DYNAMIC_DECIBEL: f64 = 0.0;

/// Western dynamic indicators from softest to loudest.
pub const DYNAMIC_INDICATORS: [&str; 12] = [
    "ppppp", "pppp", "ppp", "pp", "p", "mp", "mf", "f", "ff", "fff", "ffff", "fffff",
];

/// Converts decibel to an amplitude ratio relative to `reference_amplitude`.
///
/// # Examples
///
/// ```
/// use motet::parameters::decibel_to_amplitude_ratio;
///
/// assert_eq!(decibel_to_amplitude_ratio(0.0, 1.0), 1.0);
/// assert_eq!(decibel_to_amplitude_ratio(0.0, 0.25), 0.25);
/// ```
pub fn decibel_to_amplitude_ratio(decibel: f64, reference_amplitude: f64) -> f64 {
    reference_amplitude * 10f64.powf(decibel / 20.0)
}

/// Converts decibel to a power ratio relative to `reference_amplitude`.
pub fn decibel_to_power_ratio(decibel: f64, reference_amplitude: f64) -> f64 {
    reference_amplitude * 10f64.powf(decibel / 10.0)
}

/// Converts an amplitude ratio to decibel. Zero amplitude is `-inf` dB.
pub fn amplitude_ratio_to_decibel(amplitude: f64, reference_amplitude: f64) -> f64 {
    if amplitude == 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * (amplitude / reference_amplitude).log10()
    }
}

/// Converts a power ratio to decibel. Zero power is `-inf` dB.
pub fn power_ratio_to_decibel(power: f64, reference_power: f64) -> f64 {
    if power == 0.0 {
        f64::NEG_INFINITY
    } else {
        10.0 * (power / reference_power).log10()
    }
}

/// Maps an amplitude (0 to 1) to MIDI velocity, clamping values outside the range.
pub fn amplitude_to_midi_velocity(amplitude: f64) -> u8 {
    let velocity = (amplitude * MAXIMUM_VELOCITY as f64).round();
    velocity.clamp(0.0, MAXIMUM_VELOCITY as f64) as u8
}

/// Loudness of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volume {
    Direct(DirectVolume),
    Decibel(DecibelVolume),
    Western(WesternVolume),
}

impl Volume {
    /// Builds a volume from a bare number: non-negative numbers are
    /// amplitudes, negative numbers are decibels.
    pub fn from_number(value: f64) -> Result<Self, ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::InvalidVolume(value));
        }
        if value >= 0.0 {
            Ok(Volume::Direct(DirectVolume::new(value)))
        } else {
            Ok(Volume::Decibel(DecibelVolume::new(value)))
        }
    }

    /// Builds a volume from a dynamic indicator such as `"mf"`.
    pub fn from_dynamic(name: &str) -> Result<Self, ParameterError> {
        WesternVolume::new(name).map(Volume::Western)
    }

    /// Amplitude from 0 to 1.
    pub fn amplitude(&self) -> f64 {
        match self {
            Volume::Direct(v) => v.amplitude(),
            Volume::Decibel(v) => decibel_to_amplitude_ratio(v.decibel(), 1.0),
            Volume::Western(v) => decibel_to_amplitude_ratio(v.decibel(), 1.0),
        }
    }

    pub fn decibel(&self) -> f64 {
        match self {
            Volume::Direct(v) => amplitude_ratio_to_decibel(v.amplitude(), 1.0),
            Volume::Decibel(v) => v.decibel(),
            Volume::Western(v) => v.decibel(),
        }
    }

    pub fn midi_velocity(&self) -> u8 {
        amplitude_to_midi_velocity(self.amplitude())
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume::Western(WesternVolume::default())
    }
}

impl PartialEq for Volume {
    fn eq(&self, other: &Self) -> bool {
        self.amplitude() == other.amplitude()
    }
}

impl PartialOrd for Volume {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.amplitude().partial_cmp(&other.amplitude())
    }
}

/// Parses a volume indication: a number (amplitude or decibel, see
/// [`Volume::from_number`]) or a dynamic indicator.
impl FromStr for Volume {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.parse::<f64>() {
            Ok(value) => Volume::from_number(value),
            Err(_) => Volume::from_dynamic(s),
        }
    }
}

impl From<DirectVolume> for Volume {
    fn from(v: DirectVolume) -> Self {
        Volume::Direct(v)
    }
}

impl From<DecibelVolume> for Volume {
    fn from(v: DecibelVolume) -> Self {
        Volume::Decibel(v)
    }
}

impl From<WesternVolume> for Volume {
    fn from(v: WesternVolume) -> Self {
        Volume::Western(v)
    }
}

/// Volume given directly as amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectVolume {
    amplitude: f64,
}

impl DirectVolume {
    pub fn new(amplitude: f64) -> Self {
        Self { amplitude }
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }
}

/// Volume given in decibel (0 dB = amplitude 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecibelVolume {
    decibel: f64,
}

impl DecibelVolume {
    pub fn new(decibel: f64) -> Self {
        Self { decibel }
    }

    pub fn decibel(&self) -> f64 {
        self.decibel
    }
}

/// Volume given as a Western dynamic indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WesternVolume {
    name: String,
}

impl WesternVolume {
    pub fn new(name: &str) -> Result<Self, ParameterError> {
        if DYNAMIC_INDICATORS.contains(&name) {
            Ok(Self {
                name: name.to_string(),
            })
        } else {
            Err(ParameterError::UnknownDynamic(name.to_string()))
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dynamics are spread evenly between -60 dB and 0 dB.
    pub fn decibel(&self) -> f64 {
        let index = DYNAMIC_INDICATORS
            .iter()
            .position(|d| *d == self.name)
            .unwrap_or(0);
        // scale before dividing so both ends come out exact
        let range = MAXIMUM_DYNAMIC_DECIBEL - MINIMUM_DYNAMIC_DECIBEL;
        MINIMUM_DYNAMIC_DECIBEL + range * index as f64 / (DYNAMIC_INDICATORS.len() - 1) as f64
    }
}

impl Default for WesternVolume {
    fn default() -> Self {
        Self {
            name: "mf".to_string(),
        }
    }
}
