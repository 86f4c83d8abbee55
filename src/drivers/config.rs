use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::drivers::ScopeError;
/// How corrected samples are mapped to display amplitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationPolicy {
    /// `corrected * signal_scale + offset`
    Amplitude,
    /// Map each channel into `[-1, 1]` by its own min/max, then add the offset.
    MinMax,
}
/// Vertical ordering of channels in a composite panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackingOrder {
    /// First selected channel sits highest: offset `(total - index - 1) * spacing`.
    TopDown,
    /// First selected channel sits at the baseline: offset `index * spacing`.
    BottomUp,
}
impl StackingOrder {
    pub fn offset(self, index: usize, total: usize, spacing: f64) -> f64 {
        let slot = match self {
            StackingOrder::TopDown => total.saturating_sub(index + 1),
            StackingOrder::BottomUp => index,
        };
        slot as f64 * spacing
    }
}
/// Whether trigger timestamps share the sample clock or are offsets from the first sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    Absolute,
    RelativeToFirstSample,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Trigger match tolerance in seconds.
    pub epsilon: f64,
    /// Upper bound of the displayed spectrum in Hz.
    pub freq_limit: f64,
    pub vertical_spacing: f64,
    pub signal_scale: f64,
    pub refresh_interval_ms: u64,
    pub throttle_enabled: bool,
    pub normalization: NormalizationPolicy,
    pub stacking: StackingOrder,
    pub alignment: AlignmentMode,
    pub trigger_capacity: usize,
}
impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.001,
            freq_limit: 60.0,
            vertical_spacing: 100.0,
            signal_scale: 1.0,
            refresh_interval_ms: 1000,
            throttle_enabled: true,
            normalization: NormalizationPolicy::Amplitude,
            stacking: StackingOrder::TopDown,
            alignment: AlignmentMode::Absolute,
            trigger_capacity: 20,
        }
    }
}
impl ScopeConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
    pub fn validate(&self) -> Result<(), ScopeError> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ScopeError::InvalidConfig(format!(
                "epsilon must be a non-negative number, got {}",
                self.epsilon
            )));
        }
        if !self.freq_limit.is_finite() || self.freq_limit <= 0.0 {
            return Err(ScopeError::InvalidConfig(format!(
                "freq_limit must be positive, got {}",
                self.freq_limit
            )));
        }
        if !self.signal_scale.is_finite() || !self.vertical_spacing.is_finite() {
            return Err(ScopeError::InvalidConfig(
                "signal_scale and vertical_spacing must be finite".into(),
            ));
        }
        if self.trigger_capacity == 0 {
            return Err(ScopeError::InvalidConfig(
                "trigger_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
    pub fn from_json(text: &str) -> Result<Self, ScopeError> {
        let config: ScopeConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
    pub fn load(path: &Path) -> Result<Self, ScopeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn missing_keys_take_defaults() {
        let config = ScopeConfig::from_json(r#"{"freq_limit": 40.0, "stacking": "bottom_up"}"#)
            .unwrap();
        assert_eq!(config.freq_limit, 40.0);
        assert_eq!(config.stacking, StackingOrder::BottomUp);
        assert_eq!(config.epsilon, 0.001);
        assert_eq!(config.refresh_interval(), Duration::from_millis(1000));
        assert!(config.throttle_enabled);
    }
    #[test]
    fn rejects_negative_epsilon() {
        let err = ScopeConfig::from_json(r#"{"epsilon": -0.5}"#).unwrap_err();
        assert!(matches!(err, ScopeError::InvalidConfig(_)));
    }
    #[test]
    fn stacking_offsets() {
        assert_eq!(StackingOrder::TopDown.offset(1, 3, 10.0), 10.0);
        assert_eq!(StackingOrder::TopDown.offset(0, 3, 10.0), 20.0);
        assert_eq!(StackingOrder::BottomUp.offset(2, 3, 10.0), 20.0);
    }
}
