//! JSON messages exchanged with the acquisition server.
//!
//! Inbound messages are not uniformly tagged: stream listings and triggers carry a
//! `type`, data frames may or may not, and channel listings have none. They are told
//! apart by shape.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::drivers::{Frame, ScopeError, TriggerEvent};
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub source_id: String,
}
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DataFrameMessage {
    pub data: Vec<Vec<f64>>,
    pub timestamps: Vec<f64>,
    pub selected_channels: Vec<String>,
}
impl DataFrameMessage {
    pub fn into_frame(self) -> Result<Frame, ScopeError> {
        Frame::new(self.timestamps, self.selected_channels, self.data)
    }
}
#[derive(Clone, Debug, PartialEq)]
pub enum InboundMessage {
    StreamList {
        data_streams: Vec<StreamInfo>,
        marker_streams: Vec<StreamInfo>,
    },
    ChannelList(Vec<String>),
    DataFrame(DataFrameMessage),
    Trigger {
        stream_name: Option<String>,
        event: TriggerEvent,
    },
    ServerError(String),
}
#[derive(Deserialize)]
struct StreamListBody {
    #[serde(default)]
    data_streams: Vec<StreamInfo>,
    #[serde(default)]
    marker_streams: Vec<StreamInfo>,
}
#[derive(Deserialize)]
struct ChannelListBody {
    channels: Vec<String>,
}
#[derive(Deserialize)]
struct TriggerBody {
    trigger: Value,
    timestamp: f64,
    #[serde(default)]
    stream_name: Option<String>,
}
pub fn parse_inbound(text: &str) -> Result<InboundMessage, ScopeError> {
    let value: Value = serde_json::from_str(text)?;
    let Some(object) = value.as_object() else {
        return Err(ScopeError::UnknownMessage);
    };
    let kind = object.get("type").and_then(Value::as_str);
    if kind == Some("stream_list") {
        let body: StreamListBody = serde_json::from_value(value)?;
        return Ok(InboundMessage::StreamList {
            data_streams: body.data_streams,
            marker_streams: body.marker_streams,
        });
    }
    if kind == Some("trigger") {
        let body: TriggerBody = serde_json::from_value(value)?;
        // Marker streams may push numeric codes as well as strings.
        let label = match body.trigger {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Ok(InboundMessage::Trigger {
            stream_name: body.stream_name,
            event: TriggerEvent {
                label,
                timestamp: body.timestamp,
            },
        });
    }
    if let Some(error) = object.get("error") {
        let message = error
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string());
        return Ok(InboundMessage::ServerError(message));
    }
    if object.contains_key("channels") {
        let body: ChannelListBody = serde_json::from_value(value)?;
        return Ok(InboundMessage::ChannelList(body.channels));
    }
    if ["data", "timestamps", "selected_channels"]
        .iter()
        .all(|key| object.contains_key(*key))
    {
        let body: DataFrameMessage = serde_json::from_value(value)?;
        return Ok(InboundMessage::DataFrame(body));
    }
    Err(ScopeError::UnknownMessage)
}
/// Outbound selection sent whenever the chosen streams or reference channels change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub data_stream: Option<StreamInfo>,
    pub marker_stream: Option<StreamInfo>,
    pub reference_channels: Vec<String>,
}
impl ControlMessage {
    pub fn to_json(&self) -> Result<String, ScopeError> {
        Ok(serde_json::to_string(self)?)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn parses_stream_list() {
        let msg = parse_inbound(
            r#"{"type":"stream_list","data_streams":[{"name":"EEG","type":"EEG","source_id":"abc"}],"marker_streams":[]}"#,
        )
        .unwrap();
        match msg {
            InboundMessage::StreamList { data_streams, marker_streams } => {
                assert_eq!(data_streams[0].source_id, "abc");
                assert_eq!(data_streams[0].kind, "EEG");
                assert!(marker_streams.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    #[test]
    fn parses_untyped_data_frame() {
        let msg = parse_inbound(
            r#"{"data":[[1.0,2.0],[3.0,4.0]],"timestamps":[0.0,0.004],"selected_channels":["Fz","Cz"]}"#,
        )
        .unwrap();
        let InboundMessage::DataFrame(body) = msg else {
            panic!("expected data frame");
        };
        let frame = body.into_frame().unwrap();
        assert_eq!(frame.channel("Cz"), Some(&[3.0, 4.0][..]));
    }
    #[test]
    fn parses_channel_list_and_trigger() {
        assert_eq!(
            parse_inbound(r#"{"channels":["Fp1","Fp2"]}"#).unwrap(),
            InboundMessage::ChannelList(vec!["Fp1".into(), "Fp2".into()])
        );
        let trig = parse_inbound(
            r#"{"type":"trigger","stream_name":"Markers","trigger":7,"timestamp":12.5}"#,
        )
        .unwrap();
        assert_eq!(
            trig,
            InboundMessage::Trigger {
                stream_name: Some("Markers".into()),
                event: TriggerEvent {
                    label: "7".into(),
                    timestamp: 12.5
                },
            }
        );
    }
    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_inbound("{not json"), Err(ScopeError::Parse(_))));
        assert!(matches!(parse_inbound(r#"{"hello":1}"#), Err(ScopeError::UnknownMessage)));
        assert!(matches!(parse_inbound("[1,2]"), Err(ScopeError::UnknownMessage)));
    }
    #[test]
    fn control_message_shape() {
        let control = ControlMessage {
            data_stream: Some(StreamInfo {
                name: "EEG".into(),
                kind: "EEG".into(),
                source_id: "abc".into(),
            }),
            marker_stream: None,
            reference_channels: vec!["M1".into()],
        };
        let value: Value = serde_json::from_str(&control.to_json().unwrap()).unwrap();
        assert_eq!(value["data_stream"]["type"], "EEG");
        assert!(value["marker_stream"].is_null());
        assert_eq!(value["reference_channels"][0], "M1");
    }
}
