//! Analysis windows applied before a forward transform.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Window function selected for spectral analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    /// Rectangular window (samples pass unchanged)
    #[default]
    None,
    Hann,
    Hamming,
    Blackman,
}

impl Window {
    /// Weight of sample `index` in a window of `len` samples.
    ///
    /// Windows shorter than two samples are flat.
    pub fn coefficient(self, index: usize, len: usize) -> f64 {
        if len < 2 {
            return 1.0;
        }

        let x = 2.0 * PI * index as f64 / (len - 1) as f64;
        match self {
            Self::None => 1.0,
            Self::Hann => 0.5 * (1.0 - x.cos()),
            Self::Hamming => 0.53836 - 0.46164 * x.cos(),
            Self::Blackman => 0.42659 - 0.49656 * x.cos() + 0.076849 * (2.0 * x).cos(),
        }
    }

    /// Multiply every sample by its window weight
    pub fn apply(self, buffer: &mut [Complex64]) {
        if self == Self::None {
            return;
        }

        let len = buffer.len();
        for (i, sample) in buffer.iter_mut().enumerate() {
            *sample *= self.coefficient(i, len);
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Hann => "hann",
            Self::Hamming => "hamming",
            Self::Blackman => "blackman",
        };
        f.write_str(name)
    }
}

impl FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "rect" | "rectangular" => Ok(Self::None),
            "hann" | "hanning" => Ok(Self::Hann),
            "hamming" => Ok(Self::Hamming),
            "blackman" => Ok(Self::Blackman),
            other => Err(format!("unknown window: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_is_zero_at_both_ends() {
        let mut buffer = vec![Complex64::new(1.0, 1.0); 16];
        Window::Hann.apply(&mut buffer);

        assert!(buffer[0].norm() < 1e-12);
        assert!(buffer[15].norm() < 1e-12);
        assert!(buffer[7].re > 0.9);
    }

    #[test]
    fn test_windows_are_symmetric() {
        for window in [Window::Hann, Window::Hamming, Window::Blackman] {
            for i in 0..8 {
                let left = window.coefficient(i, 16);
                let right = window.coefficient(15 - i, 16);
                assert!((left - right).abs() < 1e-12, "{window} not symmetric at {i}");
            }
        }
    }

    #[test]
    fn test_window_edges() {
        assert!((Window::Hamming.coefficient(0, 32) - 0.07672).abs() < 1e-9);
        assert!((Window::Blackman.coefficient(0, 32) - 0.006879).abs() < 1e-9);
    }

    #[test]
    fn test_none_leaves_buffer_untouched() {
        let original = vec![Complex64::new(0.3, -0.7); 8];
        let mut buffer = original.clone();
        Window::None.apply(&mut buffer);
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_short_windows_are_flat() {
        assert_eq!(Window::Hann.coefficient(0, 1), 1.0);
        assert_eq!(Window::Blackman.coefficient(0, 0), 1.0);
    }

    #[test]
    fn test_parse_window_names() {
        assert_eq!("Hann".parse::<Window>(), Ok(Window::Hann));
        assert_eq!("blackman".parse::<Window>(), Ok(Window::Blackman));
        assert_eq!("rect".parse::<Window>(), Ok(Window::None));
        assert!("kaiser".parse::<Window>().is_err());
    }
}
