use thiserror::Error;
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("failed to parse inbound message: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unrecognised inbound message shape")]
    UnknownMessage,
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("channel {channel} has {actual} samples but the frame has {expected} timestamps")]
    SampleCountMismatch {
        channel: String,
        expected: usize,
        actual: usize,
    },
    #[error("frame carries no channels")]
    NoChannels,
    #[error("timestamps must be strictly increasing (violated at index {index})")]
    NonIncreasingTimestamps { index: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no frame received yet; feed at least one data frame first")]
    NoData,
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ScopeError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ScopeError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for ScopeError {
    fn from(value: image::ImageError) -> Self {
        ScopeError::Plot(value.to_string())
    }
}
