//! High-frequency content of a component's power spectrum.

use nalgebra::DMatrix;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use std::cell::RefCell;

// Thread-local FFT planner so parallel workers reuse their plans
thread_local! {
    static FFT_PLANNER: RefCell<FftPlanner<f64>> = RefCell::new(FftPlanner::new());
}

/// Absolute frequency of each spectrum bin.
///
/// Bins run from Nyquist/N up to Nyquist (`f_k = Ny * (k + 1) / N`); the DC
/// term is not part of the spectrum.
pub fn bin_frequencies(n_bins: usize, tr_seconds: f64) -> Vec<f64> {
    let nyquist = 0.5 / tr_seconds;
    (0..n_bins)
        .map(|k| nyquist * (k + 1) as f64 / n_bins as f64)
        .collect()
}

/// `HFC`: fraction of spectral power strictly above `cutoff_hz`.
///
/// `spectrum` holds magnitudes; power is their square. A spectrum with no
/// power reports 0.
pub fn high_frequency_content(spectrum: &[f64], tr_seconds: f64, cutoff_hz: f64) -> f64 {
    let frequencies = bin_frequencies(spectrum.len(), tr_seconds);

    let mut total = 0.0;
    let mut above = 0.0;
    for (&magnitude, &f) in spectrum.iter().zip(frequencies.iter()) {
        if !magnitude.is_finite() {
            continue;
        }
        let power = magnitude * magnitude;
        total += power;
        if f > cutoff_hz {
            above += power;
        }
    }

    if total <= 0.0 {
        return 0.0;
    }
    (above / total).clamp(0.0, 1.0)
}

/// Amplitude spectrum of one time course: bins 1..=T/2 of the FFT of the
/// demeaned signal.
///
/// `T/2` rounds down, so an odd-length series yields (T-1)/2 bins and its
/// last bin sits at (T-1)/(2T) cycles per sample, just below Nyquist.
/// `bin_frequencies` still labels that bin as Nyquist, which scales every
/// label by T/(T-1) against the exact FFT frequency.
pub fn amplitude_spectrum(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    let n_bins = n / 2;
    if n_bins == 0 {
        return Vec::new();
    }

    let mean = signal.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex<f64>> = signal
        .iter()
        .map(|&x| Complex::new(x - mean, 0.0))
        .collect();

    FFT_PLANNER.with(|planner| {
        let fft = planner.borrow_mut().plan_fft_forward(n);
        fft.process(&mut buffer);
    });

    buffer[1..=n_bins].iter().map(|c| c.norm()).collect()
}

/// Frequency mixing matrix ((T/2) × K) derived from a T × K mixing matrix
pub fn amplitude_spectra(mixing: &DMatrix<f64>) -> DMatrix<f64> {
    let n_bins = mixing.nrows() / 2;
    let columns: Vec<Vec<f64>> = (0..mixing.ncols())
        .into_par_iter()
        .map(|k| {
            let signal: Vec<f64> = mixing.column(k).iter().copied().collect();
            amplitude_spectrum(&signal)
        })
        .collect();

    DMatrix::from_fn(n_bins, mixing.ncols(), |i, k| columns[k][i])
}
