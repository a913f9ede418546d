//! Built-in Equalizer Presets

use std::f64::consts::FRAC_1_SQRT_2;

use crate::filter::{FilterParams, FilterType};

/// ISO octave band centers (Hz)
pub const OCTAVE_BANDS: [f64; 10] = [
    31.0, 62.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Named gain curve over [`OCTAVE_BANDS`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub gains_db: [f64; 10],
}

impl Preset {
    /// Shelves at both ends, peaking sections in between
    pub fn bands(&self) -> Vec<FilterParams> {
        OCTAVE_BANDS
            .iter()
            .zip(self.gains_db)
            .enumerate()
            .map(|(i, (&frequency, gain))| {
                let kind = match i {
                    0 => FilterType::LowShelf,
                    9 => FilterType::HighShelf,
                    _ => FilterType::Peaking,
                };
                FilterParams::new(kind, frequency, gain, FRAC_1_SQRT_2)
            })
            .collect()
    }
}

pub const PRESETS: &[Preset] = &[
    Preset { name: "Flat", gains_db: [0.0; 10] },
    Preset { name: "Bass Boost", gains_db: [6.0, 5.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0] },
    Preset { name: "Treble Boost", gains_db: [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 3.0, 5.0, 6.0, 6.0] },
    Preset { name: "Voice", gains_db: [-2.0, -1.0, 0.0, 2.0, 4.0, 4.0, 3.0, 2.0, 1.0, 0.0] },
    Preset { name: "Loudness", gains_db: [4.0, 3.0, 0.0, -1.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.0] },
    Preset { name: "Night", gains_db: [-6.0, -4.0, -2.0, 0.0, 0.0, 0.0, 0.0, -1.0, -2.0, -3.0] },
];

/// Look a preset up by case-insensitive name
pub fn preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(preset("bass boost").map(|p| p.name), Some("Bass Boost"));
        assert!(preset("nope").is_none());
    }

    #[test]
    fn test_bands_layout() {
        let bands = preset("Loudness").unwrap().bands();
        assert_eq!(bands.len(), 10);
        assert_eq!(bands[0].kind, FilterType::LowShelf);
        assert_eq!(bands[9].kind, FilterType::HighShelf);
        assert_eq!(bands[5].frequency, 1000.0);
        assert_eq!(bands[1].gain_db, 3.0);
    }
}
