use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::config::WindowFunction;

/// Windowed forward FFT producing single-sided magnitudes.
///
/// Plans and window coefficients are cached and rebuilt only when the size
/// or window function changes.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window_function: WindowFunction,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize, window_function: WindowFunction) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            planner,
            fft,
            fft_size,
            window_function,
            window: window_coefficients(window_function, fft_size),
            buffer: Vec::with_capacity(fft_size),
            scratch,
            magnitudes: Vec::with_capacity(fft_size / 2),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn configure(&mut self, fft_size: usize, window_function: WindowFunction) {
        let fft_size = fft_size.max(2);
        if fft_size != self.fft_size {
            self.fft = self.planner.plan_fft_forward(fft_size);
            self.scratch
                .resize(self.fft.get_inplace_scratch_len(), Complex::new(0.0, 0.0));
            self.fft_size = fft_size;
            self.window = window_coefficients(window_function, fft_size);
            self.window_function = window_function;
        } else if window_function != self.window_function {
            self.window = window_coefficients(window_function, fft_size);
            self.window_function = window_function;
        }
    }

    /// Magnitudes of bins `0..fft_size/2`, scaled by `2 / fft_size`. Input
    /// longer than the FFT is truncated, shorter input is zero padded.
    pub fn analyze(&mut self, samples: &[f32]) -> &[f32] {
        let len = self.fft_size.min(samples.len());
        self.buffer.clear();
        self.buffer.extend(
            samples[..len]
                .iter()
                .zip(self.window.iter())
                .map(|(&x, &w)| Complex::new(x * w, 0.0)),
        );
        self.buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let norm = 2.0 / self.fft_size as f32;
        self.magnitudes.clear();
        self.magnitudes
            .extend(self.buffer[..self.fft_size / 2].iter().map(|c| c.norm() * norm));
        &self.magnitudes
    }
}

fn window_coefficients(function: WindowFunction, size: usize) -> Vec<f32> {
    let denom = (size.max(2) - 1) as f32;
    (0..size)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / denom;
            match function {
                WindowFunction::None => 1.0,
                WindowFunction::Hanning => 0.5 * (1.0 - phase.cos()),
                WindowFunction::Hamming => 0.54 - 0.46 * phase.cos(),
                WindowFunction::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let mut analyzer = SpectrumAnalyzer::new(1024, WindowFunction::Hanning);
        // bin 64 of a 1024 point FFT at 1024 Hz sample rate
        let magnitudes = analyzer.analyze(&sine(64.0, 1024.0, 1024));
        assert_eq!(magnitudes.len(), 512);

        let peak = magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 64);
    }

    #[test]
    fn rectangular_window_recovers_amplitude() {
        let mut analyzer = SpectrumAnalyzer::new(256, WindowFunction::None);
        let magnitudes = analyzer.analyze(&sine(16.0, 256.0, 256));
        assert!((magnitudes[16] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn short_input_is_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(512, WindowFunction::Blackman);
        let magnitudes = analyzer.analyze(&[0.0; 100]);
        assert_eq!(magnitudes.len(), 256);
        assert!(magnitudes.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn reconfigure_changes_bin_count() {
        let mut analyzer = SpectrumAnalyzer::new(512, WindowFunction::Hanning);
        analyzer.configure(2048, WindowFunction::Hamming);
        assert_eq!(analyzer.fft_size(), 2048);
        assert_eq!(analyzer.analyze(&[0.0; 10]).len(), 1024);
    }

    #[test]
    fn window_shapes() {
        let hann = window_coefficients(WindowFunction::Hanning, 9);
        assert!(hann[0].abs() < 1e-6);
        assert!((hann[4] - 1.0).abs() < 1e-6);
        let hamming = window_coefficients(WindowFunction::Hamming, 9);
        assert!((hamming[0] - 0.08).abs() < 1e-6);
        let blackman = window_coefficients(WindowFunction::Blackman, 9);
        assert!(blackman[0].abs() < 1e-6);
    }
}
