// src/engine.rs
use crate::drivers::{parse_inbound, ControlMessage, FrameOutcome, InboundMessage, ScopeConfig, ScopePipeline, SnapshotCell, StreamInfo};
use crate::types::*;
use log::{debug, info, warn};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// 引擎句柄：发送命令、读取最新快照
pub struct ScopeHandle {
    tx_cmd: Sender<ScopeCommand>,
    output: SnapshotCell,
    worker: Option<JoinHandle<()>>,
}

impl ScopeHandle {
    pub fn send(&self, cmd: ScopeCommand) -> bool {
        self.tx_cmd.send(cmd).is_ok()
    }

    pub fn output(&self) -> SnapshotCell {
        self.output.clone()
    }

    /// 停止后台线程并等待其退出
    pub fn shutdown(mut self) {
        self.tx_cmd.send(ScopeCommand::Shutdown).ok();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("engine thread panicked");
            }
        }
    }
}

// 会话状态：唯一写入者，运行在后台线程
struct Session {
    pipeline: ScopePipeline,
    data_stream: Option<StreamInfo>,
    marker_stream: Option<StreamInfo>,
    tx: Sender<ScopeEvent>,
}

impl Session {
    fn emit(&self, event: ScopeEvent) {
        // 前端已关闭时忽略
        self.tx.send(event).ok();
    }

    fn control(&self) {
        self.emit(ScopeEvent::Control(ControlMessage {
            data_stream: self.data_stream.clone(),
            marker_stream: self.marker_stream.clone(),
            reference_channels: self.pipeline.reference().to_vec(),
        }));
    }

    fn handle_inbound(&mut self, text: &str) {
        let msg = match parse_inbound(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("discarding inbound message: {e}");
                return;
            }
        };
        match msg {
            InboundMessage::StreamList { data_streams, marker_streams } => {
                info!("📡 {} data stream(s), {} marker stream(s) available", data_streams.len(), marker_streams.len());
                self.emit(ScopeEvent::StreamsListed { data_streams, marker_streams });
            }
            InboundMessage::ChannelList(channels) => {
                info!("channels: {}", channels.join(", "));
                self.emit(ScopeEvent::ChannelsListed(channels));
            }
            InboundMessage::DataFrame(body) => {
                let frame = match body.into_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("discarding malformed frame: {e}");
                        return;
                    }
                };
                if let FrameOutcome::Recomputed(snapshot) = self.pipeline.push_frame(frame, Instant::now()) {
                    self.emit(ScopeEvent::Updated(snapshot));
                }
            }
            InboundMessage::Trigger { stream_name, event } => {
                debug!("trigger {} @ {:.4} from {}", event.label, event.timestamp, stream_name.as_deref().unwrap_or("?"));
                self.pipeline.push_trigger(event);
            }
            InboundMessage::ServerError(message) => {
                warn!("server reported: {message}");
                self.emit(ScopeEvent::ServerError(message));
            }
        }
    }

    // 返回 false 表示退出循环
    fn handle(&mut self, cmd: ScopeCommand) -> bool {
        let now = Instant::now();
        match cmd {
            ScopeCommand::Inbound(text) => self.handle_inbound(&text),
            ScopeCommand::SelectStreams { data, marker } => {
                if data != self.data_stream || marker != self.marker_stream {
                    // 新数据流的通道不同，清空旧的通道选择
                    let data_changed = data != self.data_stream;
                    self.data_stream = data;
                    self.marker_stream = marker;
                    self.control();
                    if data_changed {
                        if let Some(snapshot) = self.pipeline.set_selection(Vec::new(), now) {
                            self.emit(ScopeEvent::Updated(snapshot));
                        }
                    }
                }
            }
            ScopeCommand::SelectChannels(channels) => {
                if let Some(snapshot) = self.pipeline.set_selection(channels, now) {
                    self.emit(ScopeEvent::Updated(snapshot));
                }
            }
            ScopeCommand::SetReference(reference) => {
                let before = self.pipeline.reference().to_vec();
                let updated = self.pipeline.set_reference(reference, now);
                if self.pipeline.reference() != before.as_slice() {
                    self.control();
                }
                if let Some(snapshot) = updated {
                    self.emit(ScopeEvent::Updated(snapshot));
                }
            }
            ScopeCommand::UpdateConfig(config) => match self.pipeline.set_config(config, now) {
                Ok(updated) => {
                    self.emit(ScopeEvent::ConfigChanged(self.pipeline.config().clone()));
                    if let Some(snapshot) = updated {
                        self.emit(ScopeEvent::Updated(snapshot));
                    }
                }
                Err(e) => warn!("rejected configuration update: {e}"),
            },
            ScopeCommand::Flush => {
                if let Some(snapshot) = self.pipeline.flush(now) {
                    self.emit(ScopeEvent::Updated(snapshot));
                }
            }
            ScopeCommand::Shutdown => return false,
        }
        true
    }
}

/// 启动后台引擎线程。事件通过 `tx` 发给前端。
pub fn spawn(config: ScopeConfig, tx: Sender<ScopeEvent>) -> ScopeHandle {
    let (tx_cmd, rx_cmd) = channel();
    let pipeline = ScopePipeline::new(config);
    let output = pipeline.output();
    let session = Session { pipeline, data_stream: None, marker_stream: None, tx };
    let worker = thread::spawn(move || run(session, rx_cmd));
    ScopeHandle { tx_cmd, output, worker: Some(worker) }
}

fn run(mut session: Session, rx_cmd: Receiver<ScopeCommand>) {
    info!("⚙️ Scope engine ready.");
    // 所有发送端关闭后退出
    while let Ok(cmd) = rx_cmd.recv() {
        if !session.handle(cmd) {
            break;
        }
    }
    info!("🛑 Scope engine stopped.");
}
