// src/drivers/mod.rs
// 信号调理与频谱分析管线
pub mod buffer;
pub mod config;
pub mod error;
pub mod fft;
pub mod normalize;
pub mod pipeline;
pub mod plot;
pub mod protocol;
pub mod reference;
pub mod source;
pub mod throttle;
pub mod triggers;
// 公开导出常用类型，方便外部调用
pub use buffer::{Frame, FrameSlot, TriggerEvent, TriggerLog};
pub use config::{AlignmentMode, NormalizationPolicy, ScopeConfig, StackingOrder};
pub use error::ScopeError;
pub use fft::{BandPowers, SpectralAnalyzer, SpectralProfile};
pub use normalize::{NormalizationStage, StackedChannel};
pub use pipeline::{DerivedSignal, FrameOutcome, ScopePipeline, Snapshot, SnapshotCell};
pub use plot::{render_spectrum_png, render_stacked_png, PlotStyle};
pub use protocol::{parse_inbound, ControlMessage, InboundMessage, StreamInfo};
pub use reference::{CorrectedChannel, ReferenceProcessor};
pub use source::{MessageSource, ReplaySource, SimulatedSource};
pub use throttle::{ThrottleState, UpdateThrottle};
pub use triggers::{Alignment, MarkerLine, TriggerAligner, TriggerMatch};
