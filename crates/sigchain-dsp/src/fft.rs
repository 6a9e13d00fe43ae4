//! Windowed fast Fourier transform.
//!
//! Radix-2 decimation-in-frequency Cooley-Tukey, computed in place. Both
//! directions are scaled by `1/sqrt(N)`, which makes the pair unitary:
//! `inverse(forward(x)) == x` and signal energy is preserved.

use crate::window::Window;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Stateless spectral transform over power-of-two sized buffers
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralTransform;

impl SpectralTransform {
    /// Transform `buffer` into the frequency domain in place.
    ///
    /// The buffer length must be a power of two. `window` is applied to the
    /// time-domain samples first.
    pub fn forward(buffer: &mut [Complex64], window: Window) {
        let n = buffer.len();
        debug_assert!(
            n == 0 || n.is_power_of_two(),
            "FFT length must be a power of two, got {n}"
        );
        if n < 2 {
            return;
        }

        window.apply(buffer);
        butterflies(buffer);
        bit_reverse_permute(buffer);

        let scale = 1.0 / (n as f64).sqrt();
        for x in buffer.iter_mut() {
            *x *= scale;
        }
    }

    /// Transform a spectrum produced by `forward` back into the time domain
    pub fn inverse(buffer: &mut [Complex64]) {
        for x in buffer.iter_mut() {
            *x = x.conj();
        }

        Self::forward(buffer, Window::None);

        for x in buffer.iter_mut() {
            *x = x.conj();
        }
    }

    /// Magnitude of every bin
    pub fn magnitudes(spectrum: &[Complex64]) -> Vec<f64> {
        spectrum.iter().map(|x| x.norm()).collect()
    }
}

/// Decimation-in-frequency stages.
///
/// Twiddle factors come from repeatedly squaring the half-angle rotation
/// `e^(-i*pi/N)`, so each stage needs one complex multiply per twiddle
/// instead of a sin/cos pair.
fn butterflies(x: &mut [Complex64]) {
    let n = x.len();
    let theta = PI / n as f64;
    let mut phi = Complex64::new(theta.cos(), -theta.sin());

    let mut k = n;
    while k > 1 {
        let span = k;
        k >>= 1;
        phi = phi * phi;

        let mut twiddle = Complex64::new(1.0, 0.0);
        for l in 0..k {
            let mut a = l;
            while a < n {
                let b = a + k;
                let t = x[a] - x[b];
                x[a] += x[b];
                x[b] = t * twiddle;
                a += span;
            }
            twiddle *= phi;
        }
    }
}

/// Restore natural bin order after the butterflies
fn bit_reverse_permute(x: &mut [Complex64]) {
    let n = x.len();
    let shift = usize::BITS - n.trailing_zeros();
    for a in 0..n {
        let b = a.reverse_bits() >> shift;
        if b > a {
            x.swap(a, b);
        }
    }
}
