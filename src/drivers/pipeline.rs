use std::sync::{Arc, RwLock};
use std::time::Instant;
use log::{debug, trace};
use crate::drivers::config::ScopeConfig;
use crate::drivers::error::ScopeError;
use crate::drivers::fft::{SpectralAnalyzer, SpectralProfile};
use crate::drivers::normalize::NormalizationStage;
use crate::drivers::reference::ReferenceProcessor;
use crate::drivers::throttle::UpdateThrottle;
use crate::drivers::triggers::{Alignment, MarkerLine, TriggerAligner};
use crate::drivers::{Frame, FrameSlot, TriggerEvent, TriggerLog};
/// Display-ready channel with its per-sample trigger coincidence flags.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedSignal {
    pub channel: String,
    pub values: Vec<f64>,
    pub offset: f64,
    pub trigger_flags: Vec<bool>,
}
/// Immutable result of one recompute. Replaced as a whole, never edited.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub sequence: u64,
    pub timestamps: Vec<f64>,
    pub signals: Vec<DerivedSignal>,
    pub spectra: Vec<SpectralProfile>,
    pub alignment: Alignment,
    pub markers: Vec<MarkerLine>,
}
impl Snapshot {
    pub fn signal(&self, channel: &str) -> Option<&DerivedSignal> {
        self.signals.iter().find(|s| s.channel == channel)
    }
    pub fn spectrum(&self, channel: &str) -> Option<&SpectralProfile> {
        self.spectra.iter().find(|s| s.channel == channel)
    }
    pub fn visible_range(&self) -> Option<(f64, f64)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }
}
/// Single-slot publication point for snapshots. Readers see either the previous or the
/// next complete snapshot.
#[derive(Clone, Default)]
pub struct SnapshotCell {
    slot: Arc<RwLock<Option<Arc<Snapshot>>>>,
}
impl SnapshotCell {
    pub fn publish(&self, snapshot: Arc<Snapshot>) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(snapshot);
    }
    pub fn load(&self) -> Option<Arc<Snapshot>> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
    /// Like `load`, but an empty cell is the explicit "no data" state.
    pub fn latest(&self) -> Result<Arc<Snapshot>, ScopeError> {
        self.load().ok_or(ScopeError::NoData)
    }
}
#[derive(Clone, Debug)]
pub enum FrameOutcome {
    Recomputed(Arc<Snapshot>),
    /// Frame retained, outputs left as they were.
    Throttled,
    /// Frame had no samples; outputs left as they were.
    NothingToCompute,
}
/// Session state plus the conditioning/spectral pipeline that runs over it.
pub struct ScopePipeline {
    config: ScopeConfig,
    frames: FrameSlot,
    triggers: TriggerLog,
    reference: ReferenceProcessor,
    selection: Vec<String>,
    normalization: NormalizationStage,
    aligner: TriggerAligner,
    analyzer: SpectralAnalyzer,
    throttle: UpdateThrottle,
    output: SnapshotCell,
    sequence: u64,
}
impl ScopePipeline {
    pub fn new(config: ScopeConfig) -> Self {
        Self {
            frames: FrameSlot::default(),
            triggers: TriggerLog::with_capacity(config.trigger_capacity),
            reference: ReferenceProcessor::default(),
            selection: Vec::new(),
            normalization: NormalizationStage::from_config(&config),
            aligner: TriggerAligner::from_config(&config),
            analyzer: SpectralAnalyzer::new(config.freq_limit),
            throttle: UpdateThrottle::from_config(&config),
            output: SnapshotCell::default(),
            sequence: 0,
            config,
        }
    }
    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }
    pub fn output(&self) -> SnapshotCell {
        self.output.clone()
    }
    #[cfg(test)]
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.frames.latest()
    }
    pub fn reference(&self) -> &[String] {
        self.reference.reference()
    }
    /// A frame without samples leaves the previous frame in place, so later selection,
    /// reference or config changes still have something to recompute on.
    pub fn push_frame(&mut self, frame: Frame, now: Instant) -> FrameOutcome {
        if frame.is_empty() {
            debug!("frame after {} carries no samples", self.frames.generation());
            return FrameOutcome::NothingToCompute;
        }
        self.frames.replace(frame);
        if !self.throttle.admit(now) {
            trace!("frame {} throttled", self.frames.generation());
            return FrameOutcome::Throttled;
        }
        match self.recompute_latest() {
            Some(snapshot) => FrameOutcome::Recomputed(snapshot),
            None => FrameOutcome::NothingToCompute,
        }
    }
    pub fn push_trigger(&mut self, event: TriggerEvent) {
        if self.triggers.is_empty() {
            debug!("first trigger marker: {} @ {:.4}", event.label, event.timestamp);
        }
        self.triggers.push(event);
    }
    /// Empty selection shows every channel of the frame in frame order.
    pub fn set_selection(&mut self, selection: Vec<String>, now: Instant) -> Option<Arc<Snapshot>> {
        self.selection = selection;
        self.refresh(now)
    }
    pub fn set_reference(&mut self, reference: Vec<String>, now: Instant) -> Option<Arc<Snapshot>> {
        self.reference = ReferenceProcessor::new(reference);
        self.refresh(now)
    }
    pub fn set_config(
        &mut self,
        config: ScopeConfig,
        now: Instant,
    ) -> Result<Option<Arc<Snapshot>>, ScopeError> {
        config.validate()?;
        self.normalization = NormalizationStage::from_config(&config);
        self.aligner = TriggerAligner::from_config(&config);
        self.analyzer.set_freq_limit(config.freq_limit);
        self.throttle
            .reconfigure(config.refresh_interval(), config.throttle_enabled);
        self.triggers.set_capacity(config.trigger_capacity);
        self.config = config;
        Ok(self.refresh(now))
    }
    /// Brings outputs up to date with the latest frame, bypassing the throttle.
    pub fn flush(&mut self, now: Instant) -> Option<Arc<Snapshot>> {
        self.refresh(now)
    }
    /// Recompute on the latest frame regardless of the throttle, and restart its interval.
    fn refresh(&mut self, now: Instant) -> Option<Arc<Snapshot>> {
        let snapshot = self.recompute_latest()?;
        self.throttle.mark_emitted(now);
        Some(snapshot)
    }
    fn recompute_latest(&mut self) -> Option<Arc<Snapshot>> {
        let frame = self.frames.latest()?;
        let started = Instant::now();
        let previous = self.output.load();
        let snapshot = self.compute(&frame, previous.as_deref())?;
        let snapshot = Arc::new(snapshot);
        self.output.publish(Arc::clone(&snapshot));
        debug!(
            "snapshot {} computed in {:?} ({} channels, {}/{} triggers matched)",
            snapshot.sequence,
            started.elapsed(),
            snapshot.signals.len(),
            snapshot.alignment.matched.len(),
            self.triggers.len()
        );
        Some(snapshot)
    }
    fn compute(&mut self, frame: &Frame, previous: Option<&Snapshot>) -> Option<Snapshot> {
        if frame.is_empty() {
            return None;
        }
        let corrected = if self.selection.is_empty() {
            self.reference.correct_all(frame)
        } else {
            self.reference.correct(frame, &self.selection)
        };
        let timestamps = frame.timestamps();
        let alignment = self.aligner.align(self.triggers.iter(), timestamps);
        let markers = self.aligner.project_markers(
            self.triggers.iter(),
            timestamps,
            (timestamps[0], timestamps[timestamps.len() - 1]),
        );
        let signals = self
            .normalization
            .apply(&corrected)
            .into_iter()
            .map(|stacked| DerivedSignal {
                channel: stacked.name,
                values: stacked.values,
                offset: stacked.offset,
                trigger_flags: alignment.flags.clone(),
            })
            .collect();
        // Too short for a spectrum: keep showing the last one.
        let spectra = if frame.len() < 2 {
            previous.map(|p| p.spectra.clone()).unwrap_or_default()
        } else {
            self.analyzer.compute_all(&corrected, timestamps)
        };
        self.sequence += 1;
        Some(Snapshot {
            sequence: self.sequence,
            timestamps: timestamps.to_vec(),
            signals,
            spectra,
            alignment,
            markers,
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }
    fn three_channel_frame() -> Frame {
        Frame::new(
            vec![0.0, 0.1, 0.2],
            names(&["ch1", "ch2", "ch3"]),
            vec![vec![1.0, 2.0, 3.0], vec![2.0, 2.0, 2.0], vec![0.0, 1.0, 2.0]],
        )
        .unwrap()
    }
    fn unthrottled() -> ScopeConfig {
        ScopeConfig {
            throttle_enabled: false,
            vertical_spacing: 10.0,
            ..ScopeConfig::default()
        }
    }
    #[test]
    fn reference_and_stacking_scenario() {
        let mut pipeline = ScopePipeline::new(unthrottled());
        let now = Instant::now();
        pipeline.set_reference(names(&["ch2"]), now);
        let FrameOutcome::Recomputed(snapshot) = pipeline.push_frame(three_channel_frame(), now)
        else {
            panic!("expected recompute");
        };
        let ch1 = snapshot.signal("ch1").unwrap();
        // top-down stacking: (3 - 0 - 1) * 10
        assert_eq!(ch1.offset, 20.0);
        assert_eq!(ch1.values, vec![19.0, 20.0, 21.0]);
        assert_eq!(snapshot.signal("ch2").unwrap().offset, 10.0);
        assert_eq!(snapshot.spectra.len(), 3);
        assert_eq!(snapshot.spectrum("ch3").unwrap().frequencies_hz, vec![0.0]);
        assert!(pipeline.output().latest().is_ok());
    }
    #[test]
    fn no_frame_means_no_data() {
        let pipeline = ScopePipeline::new(ScopeConfig::default());
        assert!(matches!(pipeline.output().latest(), Err(ScopeError::NoData)));
    }
    #[test]
    fn throttled_frames_are_retained_but_not_computed() {
        let mut pipeline = ScopePipeline::new(ScopeConfig::default());
        let start = Instant::now();
        assert!(matches!(
            pipeline.push_frame(three_channel_frame(), start),
            FrameOutcome::Recomputed(_)
        ));
        let newer = Frame::new(vec![1.0, 1.1], names(&["ch1"]), vec![vec![5.0, 6.0]]).unwrap();
        assert!(matches!(
            pipeline.push_frame(newer, start + Duration::from_millis(200)),
            FrameOutcome::Throttled
        ));
        assert_eq!(pipeline.latest_frame().unwrap().channels(), &names(&["ch1"])[..]);
        assert_eq!(pipeline.output().latest().unwrap().signals.len(), 3);
        let latest = Frame::new(vec![2.0, 2.1], names(&["ch1"]), vec![vec![1.0, 1.0]]).unwrap();
        assert!(matches!(
            pipeline.push_frame(latest, start + Duration::from_millis(1100)),
            FrameOutcome::Recomputed(_)
        ));
        assert_eq!(pipeline.output().latest().unwrap().signals.len(), 1);
        let last = Frame::new(vec![3.0, 3.1], names(&["ch2"]), vec![vec![0.0, 1.0]]).unwrap();
        assert!(matches!(
            pipeline.push_frame(last, start + Duration::from_millis(1200)),
            FrameOutcome::Throttled
        ));
        let flushed = pipeline.flush(start + Duration::from_millis(1250)).unwrap();
        assert_eq!(flushed.signals[0].channel, "ch2");
    }
    #[test]
    fn empty_frame_keeps_previous_outputs() {
        let mut pipeline = ScopePipeline::new(unthrottled());
        let now = Instant::now();
        pipeline.push_frame(three_channel_frame(), now);
        let empty = Frame::new(Vec::new(), names(&["ch1"]), vec![Vec::new()]).unwrap();
        assert!(matches!(pipeline.push_frame(empty, now), FrameOutcome::NothingToCompute));
        assert_eq!(pipeline.output().latest().unwrap().sequence, 1);
        assert_eq!(pipeline.latest_frame().unwrap().len(), 3);
    }
    #[test]
    fn reference_change_after_unusable_frame_still_recomputes() {
        let mut pipeline = ScopePipeline::new(unthrottled());
        let now = Instant::now();
        let good = Frame::new(
            vec![0.0, 0.1, 0.2],
            names(&["a", "b"]),
            vec![vec![1.0, 2.0, 3.0], vec![2.0, 2.0, 2.0]],
        )
        .unwrap();
        pipeline.push_frame(good, now);
        assert!(Frame::new(vec![0.3, 0.4], Vec::new(), Vec::new()).is_err());
        let empty = Frame::new(Vec::new(), names(&["a", "b"]), vec![Vec::new(), Vec::new()]).unwrap();
        assert!(matches!(pipeline.push_frame(empty, now), FrameOutcome::NothingToCompute));
        let snapshot = pipeline.set_reference(names(&["b"]), now).unwrap();
        // a - b, stacked top-down at (2 - 0 - 1) * 10
        assert_eq!(snapshot.signal("a").unwrap().values, vec![9.0, 10.0, 11.0]);
        assert_eq!(pipeline.output().latest().unwrap().sequence, snapshot.sequence);
    }
    #[test]
    fn single_sample_frame_reuses_last_spectra() {
        let mut pipeline = ScopePipeline::new(unthrottled());
        let now = Instant::now();
        pipeline.push_frame(three_channel_frame(), now);
        let single = Frame::new(vec![0.3], names(&["ch1"]), vec![vec![4.0]]).unwrap();
        let FrameOutcome::Recomputed(snapshot) = pipeline.push_frame(single, now) else {
            panic!("expected recompute");
        };
        assert_eq!(snapshot.signals.len(), 1);
        assert_eq!(snapshot.spectra.len(), 3);
    }
    #[test]
    fn triggers_flag_coincident_samples() {
        let mut pipeline = ScopePipeline::new(unthrottled());
        let now = Instant::now();
        pipeline.push_trigger(TriggerEvent {
            label: "stim".into(),
            timestamp: 0.1,
        });
        pipeline.push_trigger(TriggerEvent {
            label: "far".into(),
            timestamp: 5.0,
        });
        let FrameOutcome::Recomputed(snapshot) = pipeline.push_frame(three_channel_frame(), now)
        else {
            panic!("expected recompute");
        };
        assert_eq!(snapshot.signal("ch3").unwrap().trigger_flags, vec![false, true, false]);
        assert_eq!(snapshot.alignment.unmatched.len(), 1);
        assert_eq!(snapshot.markers.len(), 1);
        assert_eq!(snapshot.markers[0].x, 0.1);
    }
    #[test]
    fn selection_change_recomputes_and_skips_unknown_channels() {
        let mut pipeline = ScopePipeline::new(ScopeConfig::default());
        let now = Instant::now();
        pipeline.push_frame(three_channel_frame(), now);
        let snapshot = pipeline
            .set_selection(names(&["ch3", "nope", "ch1"]), now + Duration::from_millis(10))
            .unwrap();
        let order: Vec<&str> = snapshot.signals.iter().map(|s| s.channel.as_str()).collect();
        assert_eq!(order, vec!["ch3", "ch1"]);
    }
    #[test]
    fn config_change_switches_policy() {
        let mut pipeline = ScopePipeline::new(unthrottled());
        let now = Instant::now();
        pipeline.push_frame(three_channel_frame(), now);
        let config = ScopeConfig {
            normalization: crate::drivers::config::NormalizationPolicy::MinMax,
            vertical_spacing: 0.0,
            ..unthrottled()
        };
        let snapshot = pipeline.set_config(config, now).unwrap().unwrap();
        assert_eq!(snapshot.signal("ch2").unwrap().values, vec![-1.0, -1.0, -1.0]);
        let bad = ScopeConfig {
            freq_limit: 0.0,
            ..ScopeConfig::default()
        };
        assert!(pipeline.set_config(bad, now).is_err());
    }
}
