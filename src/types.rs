// src/types.rs
use std::sync::Arc;
use crate::drivers::{ControlMessage, ScopeConfig, Snapshot, StreamInfo};

// 前端 / 数据源发给后台引擎的命令
#[derive(Clone, Debug)]
pub enum ScopeCommand {
    // 服务器推送的原始 JSON 消息
    Inbound(String),
    SelectStreams { data: Option<StreamInfo>, marker: Option<StreamInfo> },
    SelectChannels(Vec<String>),
    SetReference(Vec<String>),
    UpdateConfig(ScopeConfig),
    // 忽略节流，立即用最新帧重新计算
    Flush,
    Shutdown,
}

// 后台引擎发给前端的事件
#[derive(Clone, Debug)]
pub enum ScopeEvent {
    // 需要转发给采集端的控制消息
    Control(ControlMessage),
    StreamsListed { data_streams: Vec<StreamInfo>, marker_streams: Vec<StreamInfo> },
    ChannelsListed(Vec<String>),
    Updated(Arc<Snapshot>),
    ConfigChanged(ScopeConfig),
    ServerError(String),
}
