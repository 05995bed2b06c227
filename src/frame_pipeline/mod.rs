//! FramePipeline - Sampled Frame Processing
//!
//! ## Responsibilities
//!
//! - Encode sampled video frames as JPEG stills
//! - Run each still through the detection client
//! - Merge detections into the consultation inventory
//! - Throttle outbound progress messages
//! - Archive the latest still per detected room
//!
//! Frames reach this pipeline through a small lossy channel (see
//! `room_gateway`), so classifier latency paces sampling and excess
//! frames are shed instead of queued.

use crate::detection_client::DetectionClient;
use crate::models::DetectionRecord;
use crate::room_gateway::{RoomPublisher, VideoFrame};
use crate::state::ConsultationContext;
use crate::error::Result;
use image::codecs::jpeg::JpegEncoder;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// JPEG quality for classifier stills
const JPEG_QUALITY: u8 = 85;

/// Minimum spacing between outbound progress messages
///
/// Bounds outbound chatter to at most one message per window regardless
/// of frame rate or detection volume.
#[derive(Debug)]
pub struct EmitThrottle {
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl EmitThrottle {
    /// Create new throttle; the first emit always passes
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emit: None,
        }
    }

    /// Whether an emit is allowed at `now`
    pub fn should_emit(&self, now: Instant) -> bool {
        match self.last_emit {
            None => true,
            Some(last) => now.duration_since(last) > self.min_interval,
        }
    }

    /// Record an emit at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last_emit = Some(now);
    }

    /// Forget the last emit (fresh consultation)
    pub fn reset(&mut self) {
        self.last_emit = None;
    }
}

/// Frame processing pipeline
pub struct FramePipeline {
    detector: Arc<DetectionClient>,
    publisher: RoomPublisher,
    snapshot_dir: Option<PathBuf>,
}

impl FramePipeline {
    /// Create new frame pipeline
    pub fn new(
        detector: Arc<DetectionClient>,
        publisher: RoomPublisher,
        snapshot_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            detector,
            publisher,
            snapshot_dir,
        }
    }

    /// Process one sampled frame end to end
    pub async fn process_frame(&self, ctx: &mut ConsultationContext, frame: &VideoFrame) {
        let jpeg = match encode_jpeg(frame) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                tracing::warn!(
                    track_sid = %frame.track_sid,
                    error = %e,
                    "Frame encode failed, skipping"
                );
                return;
            }
        };

        let outcome = self.detector.detect(&jpeg).await;
        if outcome.is_degraded() {
            tracing::debug!(track_sid = %frame.track_sid, "Detection degraded to neutral record");
        }

        let record = outcome.into_record();
        ctx.inventory.merge(&record);
        tracing::debug!(
            room = %record.room_type,
            items = record.items.len(),
            "Detection merged"
        );

        self.archive_frame(&record, &jpeg).await;

        let now = Instant::now();
        if ctx.throttle.should_emit(now) {
            let message = progress_message(&record);
            if let Err(e) = self.publisher.publish(&message) {
                tracing::error!(error = %e, "Failed to send progress message");
            }
            ctx.throttle.mark(now);
        }
    }

    /// Keep the latest still per detected room for the report renderer
    async fn archive_frame(&self, record: &DetectionRecord, jpeg: &[u8]) {
        let Some(dir) = &self.snapshot_dir else {
            return;
        };
        if record.room_type == "unknown" {
            return;
        }

        let path = dir.join(format!("{}.jpg", file_stem(&record.room_type)));
        let write = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, jpeg).await
        };
        if let Err(e) = write.await {
            tracing::warn!(path = %path.display(), error = %e, "Frame archive failed");
        }
    }
}

/// Encode a raw RGBA frame as a JPEG still
pub fn encode_jpeg(frame: &VideoFrame) -> Result<Vec<u8>> {
    let rgba = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| {
            crate::error::Error::Parse(format!(
                "frame buffer does not match {}x{} RGBA",
                frame.width, frame.height
            ))
        })?;
    let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode(
        rgb.as_raw(),
        frame.width,
        frame.height,
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(buf.into_inner())
}

/// Compose the throttled progress message for one detection
fn progress_message(record: &DetectionRecord) -> String {
    if record.room_type == "unknown" {
        return "I'm having trouble seeing clearly. Please ensure good lighting and show items slowly."
            .to_string();
    }

    let mut message = format!("I can see this is a {}. ", record.room_type);
    if !record.items.is_empty() {
        message.push_str(&format!("I've detected {} items. ", record.items.len()));
    }
    message.push_str("Please continue showing me around for a complete inventory.");
    message
}

/// Room name reduced to a safe file stem
fn file_stem(room: &str) -> String {
    room.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
