//! 3-band equalizer
//!
//! Three biquad sections in series: low shelf -> peaking -> high shelf.
//! Coefficients are shared by both channels (stereo-linked), history is not.

use super::biquad::{BiquadCoeffs, BiquadState, FilterShape};
use super::StereoProcessor;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Band selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqBand {
    Low,
    Mid,
    High,
}

impl EqBand {
    pub const ALL: [EqBand; 3] = [EqBand::Low, EqBand::Mid, EqBand::High];

    #[inline]
    fn index(self) -> usize {
        match self {
            EqBand::Low => 0,
            EqBand::Mid => 1,
            EqBand::High => 2,
        }
    }
}

/// Settings of a single band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSettings {
    pub frequency: f32,
    pub gain_db: f32,
    pub q: f32,
    pub shape: FilterShape,
}

/// 3-band equalizer
///
/// Three independent bands:
/// - Low shelf: frequencies below the low corner (default 80 Hz)
/// - Mid peaking: around the mid center (default 1 kHz, Q 0.707)
/// - High shelf: frequencies above the high corner (default 10 kHz)
///
/// Always active in the chain; 0 dB on every band is numerically identity.
#[derive(Debug, Clone)]
pub struct Equalizer {
    sample_rate: f32,
    bands: [BandSettings; 3],
    coeffs: [BiquadCoeffs; 3],
    // [band] history, one array per channel
    left: [BiquadState; 3],
    right: [BiquadState; 3],
}

impl Equalizer {
    /// Default frequency for the low shelf
    pub const DEFAULT_LOW_FREQ: f32 = 80.0;
    /// Default center frequency for mid band
    pub const DEFAULT_MID_FREQ: f32 = 1000.0;
    /// Default frequency for the high shelf
    pub const DEFAULT_HIGH_FREQ: f32 = 10000.0;
    /// Default mid band Q
    pub const DEFAULT_MID_Q: f32 = 0.707;

    /// Create a flat equalizer at the default band frequencies
    pub fn new(sample_rate: f32) -> Self {
        Self::with_params(sample_rate, EqualizerParams::default())
    }

    /// Create an equalizer from a full parameter set
    pub fn with_params(sample_rate: f32, params: EqualizerParams) -> Self {
        let mut eq = Self {
            sample_rate,
            bands: params.band_settings(),
            coeffs: [BiquadCoeffs::default(); 3],
            left: [BiquadState::default(); 3],
            right: [BiquadState::default(); 3],
        };
        for band in EqBand::ALL {
            eq.update_band(band);
        }
        eq
    }

    /// Change one band; absent fields keep their current value
    ///
    /// Only that band's coefficients are recomputed. Filter history is kept,
    /// so a change never resets the signal path.
    pub fn set_band(
        &mut self,
        band: EqBand,
        frequency: Option<f32>,
        gain_db: Option<f32>,
        q: Option<f32>,
    ) {
        let settings = &mut self.bands[band.index()];
        if let Some(frequency) = frequency {
            settings.frequency = frequency;
        }
        if let Some(gain_db) = gain_db {
            settings.gain_db = gain_db;
        }
        if let Some(q) = q {
            settings.q = q;
        }
        self.update_band(band);
    }

    /// Set the three band gains at once
    pub fn set_gains(&mut self, low_db: f32, mid_db: f32, high_db: f32) {
        self.set_band(EqBand::Low, None, Some(low_db), None);
        self.set_band(EqBand::Mid, None, Some(mid_db), None);
        self.set_band(EqBand::High, None, Some(high_db), None);
    }

    /// Set the three band frequencies and the mid Q at once
    pub fn set_frequencies(&mut self, low_hz: f32, mid_hz: f32, high_hz: f32, mid_q: f32) {
        self.set_band(EqBand::Low, Some(low_hz), None, None);
        self.set_band(EqBand::Mid, Some(mid_hz), None, Some(mid_q));
        self.set_band(EqBand::High, Some(high_hz), None, None);
    }

    fn update_band(&mut self, band: EqBand) {
        let settings = self.bands[band.index()];
        self.coeffs[band.index()] = BiquadCoeffs::design(
            settings.shape,
            self.sample_rate,
            settings.frequency,
            settings.gain_db,
            settings.q,
        );
        trace!(
            ?band,
            freq = settings.frequency,
            gain_db = settings.gain_db,
            q = settings.q,
            "EQ band updated"
        );
    }

    /// Settings of one band
    pub fn band(&self, band: EqBand) -> &BandSettings {
        &self.bands[band.index()]
    }

    /// Current coefficients of one band
    pub fn coeffs(&self, band: EqBand) -> &BiquadCoeffs {
        &self.coeffs[band.index()]
    }

    /// Combined magnitude response of all three bands in dB
    pub fn magnitude_db(&self, freq: f32) -> f64 {
        self.coeffs
            .iter()
            .map(|c| c.magnitude_db(freq, self.sample_rate))
            .sum()
    }

    /// Get current parameter values
    pub fn params(&self) -> EqualizerParams {
        let [low, mid, high] = self.bands;
        EqualizerParams {
            low_freq: low.frequency,
            low_gain_db: low.gain_db,
            mid_freq: mid.frequency,
            mid_gain_db: mid.gain_db,
            mid_q: mid.q,
            high_freq: high.frequency,
            high_gain_db: high.gain_db,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl StereoProcessor for Equalizer {
    #[inline]
    fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut l = f64::from(left);
        let mut r = f64::from(right);
        for i in 0..3 {
            l = self.left[i].process(&self.coeffs[i], l);
            r = self.right[i].process(&self.coeffs[i], r);
        }
        (l as f32, r as f32)
    }

    fn reset(&mut self) {
        for state in self.left.iter_mut().chain(self.right.iter_mut()) {
            state.reset();
        }
    }

    fn name(&self) -> &str {
        "Equalizer"
    }
}

/// Equalizer parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizerParams {
    pub low_freq: f32,
    pub low_gain_db: f32,
    pub mid_freq: f32,
    pub mid_gain_db: f32,
    pub mid_q: f32,
    pub high_freq: f32,
    pub high_gain_db: f32,
}

impl Default for EqualizerParams {
    fn default() -> Self {
        Self {
            low_freq: Equalizer::DEFAULT_LOW_FREQ,
            low_gain_db: 0.0,
            mid_freq: Equalizer::DEFAULT_MID_FREQ,
            mid_gain_db: 0.0,
            mid_q: Equalizer::DEFAULT_MID_Q,
            high_freq: Equalizer::DEFAULT_HIGH_FREQ,
            high_gain_db: 0.0,
        }
    }
}

impl EqualizerParams {
    /// Bring every field into its allowed range
    pub fn clamped(self, sample_rate: Option<f32>) -> Self {
        use super::params::*;
        Self {
            low_freq: clamp_frequency(self.low_freq, LOW_FREQ_MIN, LOW_FREQ_MAX, sample_rate),
            low_gain_db: self.low_gain_db.clamp(EQ_GAIN_MIN, EQ_GAIN_MAX),
            mid_freq: clamp_frequency(self.mid_freq, MID_FREQ_MIN, MID_FREQ_MAX, sample_rate),
            mid_gain_db: self.mid_gain_db.clamp(EQ_GAIN_MIN, EQ_GAIN_MAX),
            mid_q: self.mid_q.clamp(Q_MIN, Q_MAX),
            high_freq: clamp_frequency(self.high_freq, HIGH_FREQ_MIN, HIGH_FREQ_MAX, sample_rate),
            high_gain_db: self.high_gain_db.clamp(EQ_GAIN_MIN, EQ_GAIN_MAX),
        }
    }

    fn band_settings(&self) -> [BandSettings; 3] {
        [
            BandSettings {
                frequency: self.low_freq,
                gain_db: self.low_gain_db,
                q: std::f32::consts::FRAC_1_SQRT_2,
                shape: FilterShape::LowShelf,
            },
            BandSettings {
                frequency: self.mid_freq,
                gain_db: self.mid_gain_db,
                q: self.mid_q,
                shape: FilterShape::Peaking,
            },
            BandSettings {
                frequency: self.high_freq,
                gain_db: self.high_gain_db,
                q: std::f32::consts::FRAC_1_SQRT_2,
                shape: FilterShape::HighShelf,
            },
        ]
    }
}
