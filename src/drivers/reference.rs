//! Common-average re-referencing.
//!
//! The correction is the per-sample mean of the reference channels present in the
//! frame. Reference names that the frame does not carry are ignored, so a stale
//! reference set never takes the pipeline down. When none of them are present the
//! correction is zero and every channel passes through unchanged.
use log::debug;
use ndarray::{Array1, ArrayView1};
use crate::drivers::Frame;
/// A channel after reference subtraction.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrectedChannel {
    pub name: String,
    pub samples: Vec<f64>,
}
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferenceProcessor {
    reference: Vec<String>,
}
impl ReferenceProcessor {
    pub fn new(reference: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for name in reference {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { reference: unique }
    }
    pub fn reference(&self) -> &[String] {
        &self.reference
    }
    /// Mean of the reference channels found in `frame`, or `None` when there are none.
    pub fn average_reference(&self, frame: &Frame) -> Option<Array1<f64>> {
        let indices: Vec<usize> = self
            .reference
            .iter()
            .filter_map(|name| {
                let idx = frame.channel_index(name);
                if idx.is_none() {
                    debug!("reference channel {name} not in frame, skipping");
                }
                idx
            })
            .collect();
        if indices.is_empty() {
            return None;
        }
        let mut sum = Array1::<f64>::zeros(frame.len());
        for idx in &indices {
            sum += &ArrayView1::from(frame.samples()[*idx].as_slice());
        }
        Some(sum / indices.len() as f64)
    }
    /// Corrected samples for each requested channel, in request order.
    /// Requested names missing from the frame are left out.
    pub fn correct(&self, frame: &Frame, requested: &[String]) -> Vec<CorrectedChannel> {
        let avg_ref = self.average_reference(frame);
        requested
            .iter()
            .filter_map(|name| {
                let Some(raw) = frame.channel(name) else {
                    debug!("selected channel {name} not in frame, skipping");
                    return None;
                };
                let samples = match &avg_ref {
                    Some(avg) => (&ArrayView1::from(raw) - avg).to_vec(),
                    None => raw.to_vec(),
                };
                Some(CorrectedChannel {
                    name: name.clone(),
                    samples,
                })
            })
            .collect()
    }
    /// Corrected samples for every channel of the frame, in frame order.
    pub fn correct_all(&self, frame: &Frame) -> Vec<CorrectedChannel> {
        self.correct(frame, frame.channels())
    }
}
