//! RoomGateway - Room Provider Bridge
//!
//! ## Responsibilities
//!
//! - Receive room occupancy and track events from the provider bridge
//! - Receive raw video frames for subscribed tracks
//! - Publish consultation messages over the reliable data channel
//!
//! ## Wire format
//!
//! Text messages carry control events as tagged JSON
//! (`{"event":"participant_connected", ...}`). Binary messages carry one
//! raw video frame each:
//!
//! ```text
//! [u8 sid_len][sid bytes][u16 width][u16 height][RGBA8 payload]
//! ```
//!
//! Integers are big-endian. Outbound text messages use
//! `{"event":"publish_data","payload":"..."}` for the reliable channel.
//!
//! All events flow into ONE bounded channel consumed by the session
//! controller's processing loop. Control events are never dropped; frame
//! messages use `try_send` and are dropped when the pipeline is busy, so
//! backpressure sheds frames instead of buffering them.

use crate::error::{Error, Result};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Capacity of the event channel feeding the processing loop
const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Minimum binary frame message: sid_len byte + width + height
const FRAME_HEADER_MIN: usize = 1 + 4;

/// Remote participant descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub identity: String,
}

/// Media track kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Control events delivered by the room provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomControlEvent {
    ParticipantConnected {
        participant: ParticipantInfo,
    },
    ParticipantDisconnected {
        participant: ParticipantInfo,
    },
    TrackSubscribed {
        track_sid: String,
        kind: TrackKind,
        participant: ParticipantInfo,
    },
}

/// Outbound messages to the room provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum OutboundEvent {
    PublishData { payload: String },
}

/// One raw video frame from a subscribed track
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub track_sid: String,
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixel data, `width * height * 4` bytes
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Parse a binary frame message
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < FRAME_HEADER_MIN {
            return Err(Error::Parse(format!(
                "frame message too short: {} bytes",
                buf.len()
            )));
        }

        let sid_len = buf[0] as usize;
        if buf.len() < 1 + sid_len + 4 {
            return Err(Error::Parse(format!(
                "frame header exceeds message: sid_len {}",
                sid_len
            )));
        }

        let track_sid = std::str::from_utf8(&buf[1..1 + sid_len])
            .map_err(|_| Error::Parse("track sid is not UTF-8".to_string()))?
            .to_string();

        let dims = 1 + sid_len;
        let width = u16::from_be_bytes([buf[dims], buf[dims + 1]]) as u32;
        let height = u16::from_be_bytes([buf[dims + 2], buf[dims + 3]]) as u32;
        let data = buf[dims + 4..].to_vec();

        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(Error::Parse(format!(
                "frame payload size mismatch: {} bytes for {}x{} RGBA",
                data.len(),
                width,
                height
            )));
        }

        Ok(Self {
            track_sid,
            width,
            height,
            data,
        })
    }

    /// Serialize into a binary frame message
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let sid = self.track_sid.as_bytes();
        if sid.len() > u8::MAX as usize {
            return Err(Error::Parse("track sid too long".to_string()));
        }
        if self.width > u16::MAX as u32 || self.height > u16::MAX as u32 {
            return Err(Error::Parse("frame dimensions exceed wire format".to_string()));
        }

        let mut buf = Vec::with_capacity(1 + sid.len() + 4 + self.data.len());
        buf.push(sid.len() as u8);
        buf.extend_from_slice(sid);
        buf.extend_from_slice(&(self.width as u16).to_be_bytes());
        buf.extend_from_slice(&(self.height as u16).to_be_bytes());
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }
}

/// Typed events consumed by the processing loop
#[derive(Debug)]
pub enum AgentEvent {
    Control(RoomControlEvent),
    Frame(VideoFrame),
}

/// Handle for publishing on the room's reliable data channel
#[derive(Clone)]
pub struct RoomPublisher {
    tx: mpsc::UnboundedSender<String>,
}

impl RoomPublisher {
    pub(crate) fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Publish a text payload over the reliable data channel
    pub fn publish(&self, payload: &str) -> Result<()> {
        let message = serde_json::to_string(&OutboundEvent::PublishData {
            payload: payload.to_string(),
        })?;
        self.tx
            .send(message)
            .map_err(|_| Error::Room("room connection closed".to_string()))
    }
}

/// Room provider bridge connection
pub struct RoomGateway;

impl RoomGateway {
    /// Connect to the provider bridge and start the relay loops
    ///
    /// Returns the data-channel publisher and the event stream for the
    /// processing loop. The event channel closes when the bridge
    /// connection ends.
    pub async fn connect(
        url: &str,
        token: Option<&str>,
    ) -> Result<(RoomPublisher, mpsc::Receiver<AgentEvent>)> {
        let request_url = match token {
            Some(token) => format!("{}?token={}", url, token),
            None => url.to_string(),
        };

        let (stream, _) = connect_async(request_url.as_str()).await?;
        tracing::info!(url = %url, "Room gateway connected");

        let (mut sink, mut source) = stream.split();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (publish_tx, mut publish_rx) = mpsc::unbounded_channel::<String>();

        // Outbound relay: data-channel payloads to the bridge
        tokio::spawn(async move {
            while let Some(message) = publish_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(message)).await {
                    tracing::error!(error = %e, "Room publish failed");
                    break;
                }
            }
        });

        // Inbound relay: bridge messages to typed agent events
        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<RoomControlEvent>(&text) {
                            Ok(event) => {
                                // Control events are never dropped
                                if event_tx.send(AgentEvent::Control(event)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Unrecognized room event ignored");
                            }
                        }
                    }
                    Ok(Message::Binary(data)) => match VideoFrame::parse(&data) {
                        Ok(frame) => match event_tx.try_send(AgentEvent::Frame(frame)) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                tracing::debug!("Frame dropped (pipeline busy)");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => break,
                        },
                        Err(e) => {
                            tracing::warn!(error = %e, "Malformed frame message ignored");
                        }
                    },
                    Ok(Message::Close(_)) => {
                        tracing::info!("Room connection closed by provider");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Room connection error");
                        break;
                    }
                }
            }
        });

        Ok((RoomPublisher::new(publish_tx), event_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_codec_roundtrip() {
        let frame = VideoFrame {
            track_sid: "TR_video01".to_string(),
            width: 2,
            height: 2,
            data: vec![0u8; 16],
        };

        let bytes = frame.to_bytes().unwrap();
        let parsed = VideoFrame::parse(&bytes).unwrap();
        assert_eq!(parsed.track_sid, "TR_video01");
        assert_eq!(parsed.width, 2);
        assert_eq!(parsed.height, 2);
        assert_eq!(parsed.data.len(), 16);
    }

    #[test]
    fn test_frame_parse_rejects_size_mismatch() {
        let mut bytes = VideoFrame {
            track_sid: "t".to_string(),
            width: 2,
            height: 2,
            data: vec![0u8; 16],
        }
        .to_bytes()
        .unwrap();
        bytes.pop();

        assert!(VideoFrame::parse(&bytes).is_err());
    }

    #[test]
    fn test_frame_parse_rejects_short_message() {
        assert!(VideoFrame::parse(&[3]).is_err());
    }

    #[test]
    fn test_control_event_wire_format() {
        let event: RoomControlEvent = serde_json::from_str(
            r#"{"event":"participant_connected","participant":{"identity":"client-1"}}"#,
        )
        .unwrap();
        match event {
            RoomControlEvent::ParticipantConnected { participant } => {
                assert_eq!(participant.identity, "client-1");
            }
            other => panic!("unexpected event {:?}", other),
        }

        let event: RoomControlEvent = serde_json::from_str(
            r#"{"event":"track_subscribed","track_sid":"TR1","kind":"video","participant":{"identity":"client-1"}}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            RoomControlEvent::TrackSubscribed {
                kind: TrackKind::Video,
                ..
            }
        ));
    }

    #[test]
    fn test_publisher_wraps_payload() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let publisher = RoomPublisher::new(tx);
        publisher.publish("hello").unwrap();

        let wire = rx.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(value["event"], "publish_data");
        assert_eq!(value["payload"], "hello");
    }

    #[test]
    fn test_publisher_errors_after_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let publisher = RoomPublisher::new(tx);
        assert!(publisher.publish("hello").is_err());
    }
}
