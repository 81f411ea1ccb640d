//! Perceived loudness to amplitude.
//!
//! Loudness in sone is turned into a loudness level in phon, the phon level
//! into the sound pressure level the ear needs at a given frequency (ISO 226
//! equal-loudness contour) and that level into a linear amplitude. The result
//! works best for pure sine tones.

use super::envelope::Envelope;
use super::iso226::{self, Curve, Interpolation};
use crate::parameters::decibel_to_amplitude_ratio;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Sound pressure at the threshold of hearing at 1 kHz, in pascal.
/// 94 dB SPL (1 Pa) maps to amplitude 1.
const AUDITORY_THRESHOLD_AT_1KHZ: f64 = 0.00002;

#[derive(Debug, Error, PartialEq)]
pub enum LoudnessError {
    #[error("loudness must be a finite, non-negative number of sone, got {0}")]
    InvalidLoudness(f64),
    #[error("frequency {frequency} Hz is outside of the supported range {minimum}..={maximum} Hz")]
    FrequencyOutOfRange {
        frequency: f64,
        minimum: f64,
        maximum: f64,
    },
}

/// Loudness level in phon for a loudness in sone.
///
/// Above one sone loudness doubles every 10 phon; below it a power law
/// approximates the behaviour near the threshold of hearing.
pub fn sone_to_phon(loudness_in_sone: f64) -> f64 {
    if loudness_in_sone >= 1.0 {
        40.0 + 10.0 * loudness_in_sone.log2()
    } else {
        40.0 * (loudness_in_sone + 0.0005).powf(0.35)
    }
}

/// Serializable configuration of a [`LoudnessToAmplitudeConverter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessSettings {
    pub loudspeaker_frequency_response: Envelope,
    pub interpolation: Interpolation,
}

/// Amplitude needed for a sine tone to reach a fixed perceived loudness.
#[derive(Debug, Clone)]
pub struct LoudnessToAmplitudeConverter {
    loudness_in_sone: f64,
    loudness_in_phon: f64,
    contour: Curve,
    loudspeaker_frequency_response: Envelope,
    loudspeaker_average_level: f64,
}

impl LoudnessToAmplitudeConverter {
    pub fn new(loudness_in_sone: f64) -> Result<Self, LoudnessError> {
        Self::with_settings(loudness_in_sone, &LoudnessSettings::default())
    }

    pub fn with_settings(
        loudness_in_sone: f64,
        settings: &LoudnessSettings,
    ) -> Result<Self, LoudnessError> {
        if !loudness_in_sone.is_finite() || loudness_in_sone < 0.0 {
            return Err(LoudnessError::InvalidLoudness(loudness_in_sone));
        }
        let loudness_in_phon = sone_to_phon(loudness_in_sone);
        let spl = iso226::equal_loudness_contour(loudness_in_phon);
        debug!(loudness_in_sone, loudness_in_phon, "built equal-loudness contour");

        let response = settings.loudspeaker_frequency_response.clone();
        Ok(Self {
            loudness_in_sone,
            loudness_in_phon,
            contour: Curve::new(&iso226::FREQUENCIES, &spl, settings.interpolation),
            loudspeaker_average_level: response.average_level(),
            loudspeaker_frequency_response: response,
        })
    }

    pub fn loudness_in_sone(&self) -> f64 {
        self.loudness_in_sone
    }

    pub fn loudness_in_phon(&self) -> f64 {
        self.loudness_in_phon
    }

    /// Amplitude for a sine tone at `frequency` Hz.
    pub fn convert(&self, frequency: f64) -> Result<f64, LoudnessError> {
        if !(iso226::MINIMUM_FREQUENCY..=iso226::MAXIMUM_FREQUENCY).contains(&frequency) {
            return Err(LoudnessError::FrequencyOutOfRange {
                frequency,
                minimum: iso226::MINIMUM_FREQUENCY,
                maximum: iso226::MAXIMUM_FREQUENCY,
            });
        }
        let spl = self.contour.value_at(frequency);
        let correction =
            self.loudspeaker_average_level - self.loudspeaker_frequency_response.value_at(frequency);
        Ok(decibel_to_amplitude_ratio(
            spl + correction,
            AUDITORY_THRESHOLD_AT_1KHZ,
        ))
    }
}
