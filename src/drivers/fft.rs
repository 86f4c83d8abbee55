use rustfft::{num_complex::Complex64, FftPlanner};
use crate::drivers::CorrectedChannel;
/// Summed squared magnitude per standard EEG band.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}
impl BandPowers {
    pub fn total(&self) -> f64 {
        self.delta + self.theta + self.alpha + self.beta + self.gamma
    }
}
/// Magnitude spectrum of one channel, truncated to the display band.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpectralProfile {
    pub channel: String,
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<f64>,
    /// Frequency of the strongest non-DC bin.
    pub peak_hz: Option<f64>,
    pub bands: BandPowers,
}
impl SpectralProfile {
    fn empty(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            ..Self::default()
        }
    }
    pub fn is_empty(&self) -> bool {
        self.frequencies_hz.is_empty()
    }
}
/// Per-channel DFT magnitude spectra. Channels are independent of each other.
pub struct SpectralAnalyzer {
    freq_limit: f64,
    planner: FftPlanner<f64>,
}
impl SpectralAnalyzer {
    pub fn new(freq_limit: f64) -> Self {
        Self {
            freq_limit,
            planner: FftPlanner::new(),
        }
    }
    pub fn set_freq_limit(&mut self, freq_limit: f64) {
        self.freq_limit = freq_limit;
    }
    /// Spectrum of `samples` laid out on `timestamps`. Fewer than two samples, or a
    /// timestamp axis with no extent, yields an empty profile.
    pub fn compute(
        &mut self,
        channel: &str,
        samples: &[f64],
        timestamps: &[f64],
    ) -> SpectralProfile {
        let n = samples.len();
        if n < 2 || timestamps.len() < 2 {
            return SpectralProfile::empty(channel);
        }
        let duration = timestamps[timestamps.len() - 1] - timestamps[0];
        if !(duration > 0.0) || !duration.is_finite() {
            return SpectralProfile::empty(channel);
        }
        let sample_rate_hz = n as f64 / duration;
        let mean = samples.iter().sum::<f64>() / n as f64;
        let mut buffer: Vec<Complex64> = samples
            .iter()
            .map(|v| Complex64::new(v - mean, 0.0))
            .collect();
        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);
        let bin_hz = sample_rate_hz / n as f64;
        let (frequencies_hz, magnitudes): (Vec<f64>, Vec<f64>) = buffer
            .iter()
            .take(n / 2)
            .enumerate()
            .map(|(k, c)| (k as f64 * bin_hz, (c.re * c.re + c.im * c.im).sqrt()))
            .take_while(|(freq, _)| *freq <= self.freq_limit)
            .unzip();
        let peak_hz = frequencies_hz
            .iter()
            .zip(&magnitudes)
            .skip(1)
            .fold(None::<(f64, f64)>, |best, (&freq, &mag)| match best {
                Some((_, best_mag)) if best_mag >= mag => best,
                _ => Some((freq, mag)),
            })
            .map(|(freq, _)| freq);
        let bands = band_powers(&frequencies_hz, &magnitudes, self.freq_limit);
        SpectralProfile {
            channel: channel.to_string(),
            sample_rate_hz,
            frequencies_hz,
            magnitudes,
            peak_hz,
            bands,
        }
    }
    pub fn compute_all(
        &mut self,
        channels: &[CorrectedChannel],
        timestamps: &[f64],
    ) -> Vec<SpectralProfile> {
        channels
            .iter()
            .map(|channel| self.compute(&channel.name, &channel.samples, timestamps))
            .collect()
    }
}
fn band_powers(frequencies_hz: &[f64], magnitudes: &[f64], freq_limit: f64) -> BandPowers {
    let mut bands = BandPowers::default();
    for (&freq, &mag) in frequencies_hz.iter().zip(magnitudes) {
        let power = mag * mag;
        let slot = if (0.5..4.0).contains(&freq) {
            &mut bands.delta
        } else if (4.0..8.0).contains(&freq) {
            &mut bands.theta
        } else if (8.0..13.0).contains(&freq) {
            &mut bands.alpha
        } else if (13.0..30.0).contains(&freq) {
            &mut bands.beta
        } else if freq >= 30.0 && freq <= freq_limit {
            &mut bands.gamma
        } else {
            continue;
        };
        *slot += power;
    }
    bands
}
