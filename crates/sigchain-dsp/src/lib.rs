//! Signal processing utilities shared by frequency-domain units.

pub mod fft;
pub mod window;

pub use fft::SpectralTransform;
pub use num_complex::Complex64;
pub use window::Window;
