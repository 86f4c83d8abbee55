use std::collections::VecDeque;
use std::sync::Arc;
use crate::drivers::ScopeError;
/// One atomic snapshot of multi-channel samples over a shared timestamp axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    timestamps: Vec<f64>,
    channels: Vec<String>,
    samples: Vec<Vec<f64>>, // channels x samples
}
impl Frame {
    /// Builds a frame, rejecting shapes that would let a consumer see mismatched lengths.
    pub fn new(
        timestamps: Vec<f64>,
        channels: Vec<String>,
        samples: Vec<Vec<f64>>,
    ) -> Result<Self, ScopeError> {
        if channels.is_empty() {
            return Err(ScopeError::NoChannels);
        }
        if samples.len() != channels.len() {
            return Err(ScopeError::ChannelMismatch {
                expected: channels.len(),
                actual: samples.len(),
            });
        }
        for (channel, data) in channels.iter().zip(&samples) {
            if data.len() != timestamps.len() {
                return Err(ScopeError::SampleCountMismatch {
                    channel: channel.clone(),
                    expected: timestamps.len(),
                    actual: data.len(),
                });
            }
        }
        if let Some(index) = timestamps
            .windows(2)
            .position(|pair| !(pair[1] > pair[0]))
        {
            return Err(ScopeError::NonIncreasingTimestamps { index: index + 1 });
        }
        Ok(Self {
            timestamps,
            channels,
            samples,
        })
    }
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }
    pub fn channels(&self) -> &[String] {
        &self.channels
    }
    pub fn samples(&self) -> &[Vec<f64>] {
        &self.samples
    }
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
    pub fn channel_index(&self, channel: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == channel)
    }
    pub fn channel(&self, channel: &str) -> Option<&[f64]> {
        self.channel_index(channel).map(|idx| self.samples[idx].as_slice())
    }
}
/// Single-slot holder for the latest frame. Each update replaces the previous frame wholesale.
#[derive(Default)]
pub struct FrameSlot {
    latest: Option<Arc<Frame>>,
    replaced: u64,
}
impl FrameSlot {
    pub fn replace(&mut self, frame: Frame) -> Arc<Frame> {
        let frame = Arc::new(frame);
        self.latest = Some(Arc::clone(&frame));
        self.replaced += 1;
        frame
    }
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.latest.clone()
    }
    /// Number of frames accepted since creation.
    pub fn generation(&self) -> u64 {
        self.replaced
    }
}
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerEvent {
    pub label: String,
    pub timestamp: f64,
}
/// Bounded log of the most recent trigger markers; the oldest entry falls off when full.
#[derive(Clone, Debug)]
pub struct TriggerLog {
    events: VecDeque<TriggerEvent>,
    capacity: usize,
}
impl TriggerLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
    pub fn push(&mut self, event: TriggerEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }
    pub fn len(&self) -> usize {
        self.events.len()
    }
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &TriggerEvent> {
        self.events.iter()
    }
}
