use std::collections::VecDeque;
use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use crate::drivers::ScopeError;
/// Anything that can yield raw inbound messages (JSON text) on demand.
pub trait MessageSource {
    fn next_message(&mut self) -> Result<Option<String>, ScopeError>;
}
/// Replays a recorded session: one JSON message per line, blank lines skipped.
pub struct ReplaySource {
    lines: Lines<BufReader<File>>,
}
impl ReplaySource {
    pub fn open(path: &Path) -> Result<Self, ScopeError> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }
}
impl MessageSource for ReplaySource {
    fn next_message(&mut self) -> Result<Option<String>, ScopeError> {
        for line in self.lines.by_ref() {
            let line = line?;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }
}
/// Synthetic acquisition server: announces its streams and channels, then emits
/// one-second EEG windows (per-channel sine plus noise) and a trigger every few windows.
pub struct SimulatedSource {
    channels: Vec<String>,
    sample_rate_hz: f64,
    window_samples: usize,
    windows_left: usize,
    trigger_every: usize,
    clock: f64,
    emitted: usize,
    pending: VecDeque<String>,
    rng: StdRng,
}
impl SimulatedSource {
    pub fn new(channels: Vec<String>, sample_rate_hz: f64, windows: usize, seed: u64) -> Self {
        let mut pending = VecDeque::new();
        pending.push_back(
            json!({
                "type": "stream_list",
                "data_streams": [{"name": "SimEEG", "type": "EEG", "source_id": "sim-eeg"}],
                "marker_streams": [{"name": "SimMarkers", "type": "Markers", "source_id": "sim-markers"}],
            })
            .to_string(),
        );
        pending.push_back(json!({ "channels": channels }).to_string());
        Self {
            window_samples: sample_rate_hz.round().max(2.0) as usize,
            channels,
            sample_rate_hz,
            windows_left: windows,
            trigger_every: 3,
            clock: 0.0,
            emitted: 0,
            pending,
            rng: StdRng::seed_from_u64(seed),
        }
    }
    fn emit_window(&mut self) {
        let dt = 1.0 / self.sample_rate_hz;
        let timestamps: Vec<f64> = (0..self.window_samples)
            .map(|i| self.clock + i as f64 * dt)
            .collect();
        let data: Vec<Vec<f64>> = (0..self.channels.len())
            .map(|ch| {
                // 8..=20 Hz so different channels land in alpha and beta.
                let freq = 8.0 + (ch % 7) as f64 * 2.0;
                timestamps
                    .iter()
                    .map(|t| {
                        20.0 * (2.0 * PI * freq * t).sin() + self.rng.gen_range(-5.0..5.0)
                    })
                    .collect()
            })
            .collect();
        if self.emitted % self.trigger_every == 0 {
            let mid = timestamps[timestamps.len() / 2];
            self.pending.push_back(
                json!({
                    "type": "trigger",
                    "stream_name": "SimMarkers",
                    "trigger": format!("stim_{}", self.emitted),
                    "timestamp": mid,
                })
                .to_string(),
            );
        }
        self.pending.push_back(
            json!({
                "type": "eeg",
                "timestamps": timestamps,
                "data": data,
                "selected_channels": self.channels,
            })
            .to_string(),
        );
        self.clock += self.window_samples as f64 * dt;
        self.emitted += 1;
    }
}
impl MessageSource for SimulatedSource {
    fn next_message(&mut self) -> Result<Option<String>, ScopeError> {
        if self.pending.is_empty() && self.windows_left > 0 {
            self.windows_left -= 1;
            self.emit_window();
        }
        Ok(self.pending.pop_front())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::protocol::{parse_inbound, InboundMessage};
    use std::io::Write;
    #[test]
    fn simulated_session_shape() {
        let mut source = SimulatedSource::new(vec!["Fz".into(), "Cz".into()], 128.0, 2, 7);
        let mut kinds = Vec::new();
        while let Some(text) = source.next_message().unwrap() {
            kinds.push(match parse_inbound(&text).unwrap() {
                InboundMessage::StreamList { .. } => "list",
                InboundMessage::ChannelList(_) => "channels",
                InboundMessage::Trigger { .. } => "trigger",
                InboundMessage::DataFrame(body) => {
                    let frame = body.into_frame().unwrap();
                    assert_eq!(frame.len(), 128);
                    "frame"
                }
                InboundMessage::ServerError(_) => "error",
            });
        }
        assert_eq!(kinds, vec!["list", "channels", "trigger", "frame", "frame"]);
    }
    #[test]
    fn replay_skips_blank_lines_in_file_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"channels\":[\"Fz\"]}}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file, "{{\"type\":\"trigger\",\"trigger\":\"go\",\"timestamp\":1.5}}").unwrap();
        file.flush().unwrap();
        let mut source = ReplaySource::open(file.path()).unwrap();
        let first = source.next_message().unwrap().unwrap();
        assert!(matches!(parse_inbound(&first).unwrap(), InboundMessage::ChannelList(_)));
        let second = source.next_message().unwrap().unwrap();
        assert!(matches!(parse_inbound(&second).unwrap(), InboundMessage::Trigger { .. }));
        assert!(source.next_message().unwrap().is_none());
    }
    #[test]
    fn replay_reports_unreadable_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xff\xfe\n").unwrap();
        file.flush().unwrap();
        let mut source = ReplaySource::open(file.path()).unwrap();
        assert!(matches!(source.next_message(), Err(ScopeError::Io(_))));
        assert!(ReplaySource::open(&file.path().with_extension("missing")).is_err());
    }
}
