use crate::drivers::config::{NormalizationPolicy, ScopeConfig, StackingOrder};
use crate::drivers::CorrectedChannel;
/// A display-ready channel: normalized values already shifted by its stacking offset.
#[derive(Clone, Debug, PartialEq)]
pub struct StackedChannel {
    pub name: String,
    pub values: Vec<f64>,
    /// Baseline this channel was shifted to.
    pub offset: f64,
}
/// Amplitude mapping plus vertical stacking. One instance is shared by every panel so the
/// offsets and ordering stay consistent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizationStage {
    pub policy: NormalizationPolicy,
    pub stacking: StackingOrder,
    pub signal_scale: f64,
    pub vertical_spacing: f64,
}
impl NormalizationStage {
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self {
            policy: config.normalization,
            stacking: config.stacking,
            signal_scale: config.signal_scale,
            vertical_spacing: config.vertical_spacing,
        }
    }
    pub fn offset(&self, index: usize, total: usize) -> f64 {
        self.stacking.offset(index, total, self.vertical_spacing)
    }
    pub fn apply(&self, channels: &[CorrectedChannel]) -> Vec<StackedChannel> {
        let total = channels.len();
        channels
            .iter()
            .enumerate()
            .map(|(index, channel)| {
                let offset = self.offset(index, total);
                let values = match self.policy {
                    NormalizationPolicy::Amplitude => {
                        amplitude_scaled(&channel.samples, self.signal_scale, offset)
                    }
                    NormalizationPolicy::MinMax => min_max(&channel.samples)
                        .into_iter()
                        .map(|v| v + offset)
                        .collect(),
                };
                StackedChannel {
                    name: channel.name.clone(),
                    values,
                    offset,
                }
            })
            .collect()
    }
}
pub fn amplitude_scaled(samples: &[f64], scale: f64, offset: f64) -> Vec<f64> {
    samples.iter().map(|v| v * scale + offset).collect()
}
/// Maps samples into `[-1, 1]`. A constant signal has zero range, which is treated as a
/// range of one, so every sample lands on `-1`.
pub fn min_max(samples: &[f64]) -> Vec<f64> {
    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let mut range = max - min;
    if range == 0.0 {
        range = 1.0;
    }
    samples
        .iter()
        .map(|v| ((v - min) / range) * 2.0 - 1.0)
        .collect()
}
#[cfg(test)]
mod tests {
    use super::*;
    fn corrected(name: &str, samples: &[f64]) -> CorrectedChannel {
        CorrectedChannel {
            name: name.into(),
            samples: samples.to_vec(),
        }
    }
    #[test]
    fn constant_signal_maps_to_minus_one() {
        assert_eq!(min_max(&[4.2; 5]), vec![-1.0; 5]);
        assert!(min_max(&[]).is_empty());
    }
    #[test]
    fn min_max_spans_unit_interval() {
        assert_eq!(min_max(&[0.0, 5.0, 10.0]), vec![-1.0, 0.0, 1.0]);
    }
    #[test]
    fn top_down_amplitude_stacking() {
        let stage = NormalizationStage {
            policy: NormalizationPolicy::Amplitude,
            stacking: StackingOrder::TopDown,
            signal_scale: 2.0,
            vertical_spacing: 10.0,
        };
        let stacked = stage.apply(&[
            corrected("a", &[1.0]),
            corrected("b", &[1.0]),
            corrected("c", &[1.0]),
        ]);
        let offsets: Vec<f64> = stacked.iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![20.0, 10.0, 0.0]);
        assert_eq!(stacked[1].values, vec![12.0]);
    }
    #[test]
    fn bottom_up_min_max_stacking() {
        let stage = NormalizationStage {
            policy: NormalizationPolicy::MinMax,
            stacking: StackingOrder::BottomUp,
            signal_scale: 1.0,
            vertical_spacing: 3.0,
        };
        let stacked = stage.apply(&[corrected("a", &[0.0, 2.0]), corrected("b", &[7.0, 7.0])]);
        assert_eq!(stacked[0].values, vec![-1.0, 1.0]);
        assert_eq!(stacked[1].values, vec![2.0, 2.0]);
    }
}
