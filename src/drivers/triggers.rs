use log::debug;
use crate::drivers::config::{AlignmentMode, ScopeConfig};
use crate::drivers::TriggerEvent;
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerMatch {
    pub label: String,
    pub timestamp: f64,
    pub sample_index: usize,
}
/// Result of matching the trigger log against one frame's timestamp axis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Alignment {
    /// One entry per sample; `true` where at least one trigger coincides.
    pub flags: Vec<bool>,
    pub matched: Vec<TriggerMatch>,
    /// Triggers with no sample within tolerance. Kept for diagnostics only.
    pub unmatched: Vec<TriggerEvent>,
}
impl Alignment {
    pub fn labels_at(&self, sample_index: usize) -> impl Iterator<Item = &str> {
        self.matched
            .iter()
            .filter(move |m| m.sample_index == sample_index)
            .map(|m| m.label.as_str())
    }
}
/// Vertical marker for a continuous multi-channel panel.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerLine {
    pub label: String,
    pub sample_index: usize,
    /// Timestamp of the nearest sample, i.e. the x-position to draw at.
    pub x: f64,
}
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerAligner {
    pub epsilon: f64,
    pub mode: AlignmentMode,
}
impl Default for TriggerAligner {
    fn default() -> Self {
        Self::from_config(&ScopeConfig::default())
    }
}
impl TriggerAligner {
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self {
            epsilon: config.epsilon,
            mode: config.alignment,
        }
    }
    /// Trigger time expressed on the sample clock.
    fn sample_clock_time(&self, event: &TriggerEvent, timestamps: &[f64]) -> Option<f64> {
        match self.mode {
            AlignmentMode::Absolute => Some(event.timestamp),
            AlignmentMode::RelativeToFirstSample => {
                timestamps.first().map(|first| first + event.timestamp)
            }
        }
    }
    pub fn align<'a>(
        &self,
        events: impl IntoIterator<Item = &'a TriggerEvent>,
        timestamps: &[f64],
    ) -> Alignment {
        let mut alignment = Alignment {
            flags: vec![false; timestamps.len()],
            ..Alignment::default()
        };
        for event in events {
            let hit = self.sample_clock_time(event, timestamps).and_then(|t| {
                let idx = nearest_sample(timestamps, t)?;
                ((t - timestamps[idx]).abs() <= self.epsilon).then_some(idx)
            });
            match hit {
                Some(sample_index) => {
                    alignment.flags[sample_index] = true;
                    alignment.matched.push(TriggerMatch {
                        label: event.label.clone(),
                        timestamp: event.timestamp,
                        sample_index,
                    });
                }
                None => {
                    debug!(
                        "trigger {} at {:.4} matched no sample within {}s",
                        event.label, event.timestamp, self.epsilon
                    );
                    alignment.unmatched.push(event.clone());
                }
            }
        }
        alignment
    }
    /// Projects triggers to vertical lines at the nearest sample. Triggers outside
    /// `visible` (inclusive, on the sample clock) are clipped.
    pub fn project_markers<'a>(
        &self,
        events: impl IntoIterator<Item = &'a TriggerEvent>,
        timestamps: &[f64],
        visible: (f64, f64),
    ) -> Vec<MarkerLine> {
        let (start, end) = visible;
        events
            .into_iter()
            .filter_map(|event| {
                let t = self.sample_clock_time(event, timestamps)?;
                if t < start || t > end {
                    return None;
                }
                let sample_index = nearest_sample(timestamps, t)?;
                Some(MarkerLine {
                    label: event.label.clone(),
                    sample_index,
                    x: timestamps[sample_index],
                })
            })
            .collect()
    }
}
/// Index of the timestamp closest to `t`; ties go to the earlier sample.
/// `timestamps` must be sorted ascending.
pub fn nearest_sample(timestamps: &[f64], t: f64) -> Option<usize> {
    if timestamps.is_empty() || t.is_nan() {
        return None;
    }
    let upper = timestamps.partition_point(|&s| s < t);
    if upper == 0 {
        return Some(0);
    }
    if upper == timestamps.len() {
        return Some(timestamps.len() - 1);
    }
    let lower = upper - 1;
    if (t - timestamps[lower]) <= (timestamps[upper] - t) {
        Some(lower)
    } else {
        Some(upper)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn event(label: &str, timestamp: f64) -> TriggerEvent {
        TriggerEvent {
            label: label.into(),
            timestamp,
        }
    }
    const AXIS: [f64; 5] = [10.0, 10.25, 10.5, 10.75, 11.0];
    #[test]
    fn nearest_sample_handles_edges() {
        assert_eq!(nearest_sample(&AXIS, 0.0), Some(0));
        assert_eq!(nearest_sample(&AXIS, 10.3), Some(1));
        assert_eq!(nearest_sample(&AXIS, 10.45), Some(2));
        assert_eq!(nearest_sample(&AXIS, 99.0), Some(4));
        assert_eq!(nearest_sample(&[], 1.0), None);
    }
    #[test]
    fn matches_within_epsilon_only() {
        let aligner = TriggerAligner::default();
        let events = vec![event("stim", 10.5005), event("late", 10.6), event("edge", 11.0)];
        let alignment = aligner.align(&events, &AXIS);
        assert_eq!(alignment.flags, vec![false, false, true, false, true]);
        assert_eq!(alignment.matched.len(), 2);
        assert_eq!(alignment.matched[0].sample_index, 2);
        assert_eq!(alignment.unmatched, vec![event("late", 10.6)]);
        assert_eq!(alignment.labels_at(4).collect::<Vec<_>>(), vec!["edge"]);
    }
    #[test]
    fn wider_epsilon_matches_argmin() {
        let aligner = TriggerAligner {
            epsilon: 0.2,
            mode: AlignmentMode::Absolute,
        };
        let alignment = aligner.align(&[event("x", 10.6)], &AXIS);
        assert_eq!(alignment.matched[0].sample_index, 2);
    }
    #[test]
    fn relative_mode_offsets_from_first_sample() {
        let aligner = TriggerAligner {
            epsilon: 0.001,
            mode: AlignmentMode::RelativeToFirstSample,
        };
        let alignment = aligner.align(&[event("rel", 0.25)], &AXIS);
        assert_eq!(alignment.matched[0].sample_index, 1);
    }
    #[test]
    fn projection_clips_outside_visible_range() {
        let aligner = TriggerAligner::default();
        let events = vec![event("before", 9.0), event("inside", 10.6), event("after", 12.0)];
        let lines = aligner.project_markers(&events, &AXIS, (10.0, 11.0));
        assert_eq!(
            lines,
            vec![MarkerLine {
                label: "inside".into(),
                sample_index: 2,
                x: 10.5,
            }]
        );
    }
}
