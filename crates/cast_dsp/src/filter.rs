//! Biquad Filter Design
//!
//! Second-order IIR sections designed from the RBJ (Robert Bristow-Johnson)
//! Audio EQ Cookbook. Coefficients are kept in raw `{a0..b2}` form for
//! introspection and normalized by `a0` before they reach the filter state.
//!
//! # Architecture
//!
//! `Coefficients::design` is pure math. `Filter` pairs one design with one
//! `biquad::DirectForm1` state, so every channel of every band owns its
//! own history:
//!
//! ```text
//! y = (b0/a0)x + (b1/a0)x[-1] + (b2/a0)x[-2] - (a1/a0)y[-1] - (a2/a0)y[-2]
//! ```

use std::f64::consts::{FRAC_1_SQRT_2, LN_2, PI};
use std::fmt;
use std::str::FromStr;

use biquad::{Biquad, DirectForm1};
use serde::{Deserialize, Serialize};

use crate::error::{DspError, DspResult};

/// Lowest frequency accepted by equalizer bands (Hz)
pub const MIN_BAND_FREQUENCY: f64 = 20.0;
/// Highest frequency accepted by equalizer bands (Hz)
pub const MAX_BAND_FREQUENCY: f64 = 20000.0;

/// Bandwidth (octaves) used when a caller asks for a peaking band by width
pub const DEFAULT_BANDWIDTH: f64 = 0.5;

/// True if `frequency` is inside the audible band an equalizer may edit
pub fn is_band_frequency_valid(frequency: f64) -> bool {
    (MIN_BAND_FREQUENCY..=MAX_BAND_FREQUENCY).contains(&frequency)
}

/// Filter kind, numbered from 1 so that 0 stays "unset" in wire payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FilterType {
    LowPass = 1,
    HighPass = 2,
    Peaking = 3,
    Notch = 4,
    LowShelf = 5,
    HighShelf = 6,
}

impl FilterType {
    pub const ALL: [FilterType; 6] = [
        FilterType::LowPass,
        FilterType::HighPass,
        FilterType::Peaking,
        FilterType::Notch,
        FilterType::LowShelf,
        FilterType::HighShelf,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Whether the gain parameter changes this kind's response
    pub fn uses_gain(self) -> bool {
        matches!(
            self,
            FilterType::Peaking | FilterType::LowShelf | FilterType::HighShelf
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterType::LowPass => "lowpass",
            FilterType::HighPass => "highpass",
            FilterType::Peaking => "peaking",
            FilterType::Notch => "notch",
            FilterType::LowShelf => "lowshelf",
            FilterType::HighShelf => "highshelf",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown filter type: {s}"))
    }
}

/// How steep a section is: quality factor or bandwidth in octaves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slope {
    Q(f64),
    Bandwidth(f64),
}

impl Default for Slope {
    fn default() -> Self {
        Slope::Q(FRAC_1_SQRT_2)
    }
}

impl Slope {
    fn value(self) -> f64 {
        match self {
            Slope::Q(v) | Slope::Bandwidth(v) => v,
        }
    }

    /// Cookbook alpha for normalized angular frequency `w0`
    fn alpha(self, w0: f64) -> f64 {
        let sin = w0.sin();
        match self {
            Slope::Q(q) => sin / (2.0 * q),
            Slope::Bandwidth(bw) => sin * (LN_2 / 2.0 * bw * w0 / sin).sinh(),
        }
    }
}

/// One filter section as the user describes it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub kind: FilterType,
    pub frequency: f64,
    pub gain_db: f64,
    pub slope: Slope,
}

impl FilterParams {
    pub fn new(kind: FilterType, frequency: f64, gain_db: f64, q: f64) -> Self {
        Self {
            kind,
            frequency,
            gain_db,
            slope: Slope::Q(q),
        }
    }

    pub fn with_slope(mut self, slope: Slope) -> Self {
        self.slope = slope;
        self
    }

    pub fn validate(&self, sample_rate: f64) -> DspResult<()> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        let nyquist = sample_rate / 2.0;
        if !(self.frequency > 0.0 && self.frequency < nyquist) {
            return Err(DspError::InvalidFrequency {
                frequency: self.frequency,
                nyquist,
            });
        }
        let slope = self.slope.value();
        if !(slope.is_finite() && slope > 0.0) {
            return Err(DspError::InvalidSlope(slope));
        }
        Ok(())
    }
}

/// Raw (un-normalized) cookbook coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
}

impl Coefficients {
    /// Pass-through section
    pub const IDENTITY: Coefficients = Coefficients {
        a0: 1.0,
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    };

    pub fn design(params: &FilterParams, sample_rate: f64) -> DspResult<Self> {
        params.validate(sample_rate)?;

        let w0 = 2.0 * PI * params.frequency / sample_rate;
        let cos = w0.cos();
        let alpha = params.slope.alpha(w0);
        let a = 10.0_f64.powf(params.gain_db / 40.0);

        let c = match params.kind {
            FilterType::LowPass => Coefficients {
                a0: 1.0 + alpha,
                a1: -2.0 * cos,
                a2: 1.0 - alpha,
                b0: (1.0 - cos) / 2.0,
                b1: 1.0 - cos,
                b2: (1.0 - cos) / 2.0,
            },
            FilterType::HighPass => Coefficients {
                a0: 1.0 + alpha,
                a1: -2.0 * cos,
                a2: 1.0 - alpha,
                b0: (1.0 + cos) / 2.0,
                b1: -(1.0 + cos),
                b2: (1.0 + cos) / 2.0,
            },
            FilterType::Peaking => Coefficients {
                a0: 1.0 + alpha / a,
                a1: -2.0 * cos,
                a2: 1.0 - alpha / a,
                b0: 1.0 + alpha * a,
                b1: -2.0 * cos,
                b2: 1.0 - alpha * a,
            },
            FilterType::Notch => Coefficients {
                a0: 1.0 + alpha,
                a1: -2.0 * cos,
                a2: 1.0 - alpha,
                b0: 1.0,
                b1: -2.0 * cos,
                b2: 1.0,
            },
            FilterType::LowShelf => {
                let k = 2.0 * a.sqrt() * alpha;
                Coefficients {
                    a0: (a + 1.0) + (a - 1.0) * cos + k,
                    a1: -2.0 * ((a - 1.0) + (a + 1.0) * cos),
                    a2: (a + 1.0) + (a - 1.0) * cos - k,
                    b0: a * ((a + 1.0) - (a - 1.0) * cos + k),
                    b1: 2.0 * a * ((a - 1.0) - (a + 1.0) * cos),
                    b2: a * ((a + 1.0) - (a - 1.0) * cos - k),
                }
            }
            FilterType::HighShelf => {
                let k = 2.0 * a.sqrt() * alpha;
                Coefficients {
                    a0: (a + 1.0) - (a - 1.0) * cos + k,
                    a1: 2.0 * ((a - 1.0) - (a + 1.0) * cos),
                    a2: (a + 1.0) - (a - 1.0) * cos - k,
                    b0: a * ((a + 1.0) + (a - 1.0) * cos + k),
                    b1: -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
                    b2: a * ((a + 1.0) + (a - 1.0) * cos - k),
                }
            }
        };
        Ok(c)
    }

    /// Divide through by `a0` into the form the filter state runs
    pub fn normalized(&self) -> biquad::Coefficients<f64> {
        biquad::Coefficients {
            a1: self.a1 / self.a0,
            a2: self.a2 / self.a0,
            b0: self.b0 / self.a0,
            b1: self.b1 / self.a0,
            b2: self.b2 / self.a0,
        }
    }
}

/// A designed section plus its two-sample input/output history
pub struct Filter {
    params: FilterParams,
    coefficients: Coefficients,
    state: DirectForm1<f64>,
}

impl Filter {
    pub fn new(params: FilterParams, sample_rate: f64) -> DspResult<Self> {
        let coefficients = Coefficients::design(&params, sample_rate)?;
        Ok(Self {
            params,
            coefficients,
            state: DirectForm1::<f64>::new(coefficients.normalized()),
        })
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.state.run(input)
    }

    /// Filter a run of samples in place
    pub fn process_slice(&mut self, samples: &mut [f64]) {
        for s in samples.iter_mut() {
            *s = self.state.run(*s);
        }
    }

    /// Forget the history, keep the design
    pub fn reset(&mut self) {
        self.state.reset_state();
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("params", &self.params)
            .field("coefficients", &self.coefficients)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biquad::ToHertz;

    const FS: f64 = 48000.0;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    fn assert_matches_reference(ours: biquad::Coefficients<f64>, reference: biquad::Coefficients<f64>) {
        assert_close(ours.a1, reference.a1);
        assert_close(ours.a2, reference.a2);
        assert_close(ours.b0, reference.b0);
        assert_close(ours.b1, reference.b1);
        assert_close(ours.b2, reference.b2);
    }

    #[test]
    fn test_lowpass_matches_reference_design() {
        let params = FilterParams::new(FilterType::LowPass, 1000.0, 0.0, FRAC_1_SQRT_2);
        let ours = Coefficients::design(&params, FS).unwrap().normalized();
        let reference = biquad::Coefficients::<f64>::from_params(
            biquad::Type::LowPass,
            FS.hz(),
            1000.0_f64.hz(),
            FRAC_1_SQRT_2,
        )
        .unwrap();
        assert_matches_reference(ours, reference);
    }

    #[test]
    fn test_highpass_matches_reference_design() {
        let params = FilterParams::new(FilterType::HighPass, 250.0, 0.0, 1.2);
        let ours = Coefficients::design(&params, FS).unwrap().normalized();
        let reference = biquad::Coefficients::<f64>::from_params(
            biquad::Type::HighPass,
            FS.hz(),
            250.0_f64.hz(),
            1.2,
        )
        .unwrap();
        assert_matches_reference(ours, reference);
    }

    #[test]
    fn test_flat_peaking_passes_through() {
        let params = FilterParams::new(FilterType::Peaking, 1000.0, 0.0, 1.0);
        let mut filter = Filter::new(params, FS).unwrap();
        for i in 0..256 {
            let x = (i as f64 * 0.05).sin();
            assert!((filter.process(x) - x).abs() < 1e-12);
        }
    }

    #[test]
    fn test_lowpass_settles_to_dc() {
        let params = FilterParams::new(FilterType::LowPass, 500.0, 0.0, FRAC_1_SQRT_2);
        let mut filter = Filter::new(params, FS).unwrap();
        let mut out = 0.0;
        for _ in 0..48000 {
            out = filter.process(1.0);
        }
        assert!((out - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let params = FilterParams::new(FilterType::HighPass, 500.0, 0.0, FRAC_1_SQRT_2);
        let mut filter = Filter::new(params, FS).unwrap();
        let mut out = 1.0;
        for _ in 0..48000 {
            out = filter.process(1.0);
        }
        assert!(out.abs() < 1e-6);
    }

    #[test]
    fn test_peaking_bandwidth_boosts() {
        let params = FilterParams::new(FilterType::Peaking, 1000.0, 6.0, 1.0)
            .with_slope(Slope::Bandwidth(DEFAULT_BANDWIDTH));
        let c = Coefficients::design(&params, FS).unwrap();
        // Boost: numerator alpha term outweighs the denominator one
        assert!(c.b0 > c.a0);
    }

    #[test]
    fn test_shelves_have_unity_gain_at_zero_db() {
        for kind in [FilterType::LowShelf, FilterType::HighShelf] {
            let params = FilterParams::new(kind, 2000.0, 0.0, FRAC_1_SQRT_2);
            let n = Coefficients::design(&params, FS).unwrap().normalized();
            // DC gain = (b0+b1+b2)/(1+a1+a2)
            let dc = (n.b0 + n.b1 + n.b2) / (1.0 + n.a1 + n.a2);
            assert_close(dc, 1.0);
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let params = FilterParams::new(FilterType::LowPass, 1000.0, 0.0, FRAC_1_SQRT_2);
        let mut filter = Filter::new(params, FS).unwrap();
        let first = filter.process(1.0);
        filter.process(0.5);
        filter.reset();
        assert_close(filter.process(1.0), first);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let above_nyquist = FilterParams::new(FilterType::LowPass, 30000.0, 0.0, 1.0);
        assert!(matches!(
            Filter::new(above_nyquist, FS),
            Err(DspError::InvalidFrequency { .. })
        ));

        let zero_q = FilterParams::new(FilterType::Peaking, 1000.0, 3.0, 0.0);
        assert_eq!(
            Filter::new(zero_q, FS).unwrap_err(),
            DspError::InvalidSlope(0.0)
        );

        let ok = FilterParams::new(FilterType::Notch, 1000.0, 0.0, 1.0);
        assert!(matches!(
            Filter::new(ok, 0.0),
            Err(DspError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn test_filter_type_codes_and_names() {
        for t in FilterType::ALL {
            assert_eq!(FilterType::from_code(t.code()), Some(t));
            assert_eq!(t.to_string().parse::<FilterType>(), Ok(t));
        }
        assert_eq!(FilterType::from_code(0), None);
        assert_eq!("Low-Shelf".parse::<FilterType>(), Ok(FilterType::LowShelf));
    }

    #[test]
    fn test_band_frequency_range() {
        assert!(is_band_frequency_valid(20.0));
        assert!(is_band_frequency_valid(20000.0));
        assert!(!is_band_frequency_valid(19.9));
        assert!(!is_band_frequency_valid(20001.0));
    }
}
