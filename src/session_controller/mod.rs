//! SessionController - Avatar Session Lifecycle
//!
//! ## Responsibilities
//!
//! - Gate avatar start/stop against room occupancy (Idle/Active)
//! - Own the consultation context and its reset
//! - Deliver consultation messages over the data channel
//! - Emit and persist the final summary on session end
//!
//! All events flow through [`SessionController::run`], one sequential
//! loop. The Idle -> Active check-and-set therefore cannot interleave
//! with a second connect event.

use crate::avatar::{AgentSession, AvatarBackend, AvatarHandle, PersonaConfig};
use crate::error::Result;
use crate::frame_pipeline::FramePipeline;
use crate::report_emitter::ReportEmitter;
use crate::room_gateway::{AgentEvent, RoomControlEvent, RoomPublisher, TrackKind};
use crate::state::ConsultationContext;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Live avatar/session pair
struct ActiveSession {
    session: AgentSession,
    avatar: AvatarHandle,
}

/// Avatar session lifecycle controller
pub struct SessionController {
    avatar: Arc<dyn AvatarBackend>,
    persona: PersonaConfig,
    publisher: RoomPublisher,
    emitter: ReportEmitter,
    room_name: String,
    participants: HashSet<String>,
    active: Option<ActiveSession>,
}

impl SessionController {
    /// Create new session controller
    pub fn new(
        avatar: Arc<dyn AvatarBackend>,
        persona: PersonaConfig,
        publisher: RoomPublisher,
        emitter: ReportEmitter,
        room_name: String,
    ) -> Self {
        Self {
            avatar,
            persona,
            publisher,
            emitter,
            room_name,
            participants: HashSet::new(),
            active: None,
        }
    }

    /// Whether an avatar/session pair is currently live
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Remaining participant count
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Consume room events until the gateway closes
    pub async fn run(
        mut self,
        mut ctx: ConsultationContext,
        mut events: mpsc::Receiver<AgentEvent>,
        pipeline: FramePipeline,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                AgentEvent::Control(control) => {
                    if let Err(e) = self.handle_control(&mut ctx, control).await {
                        // Start failures leave the controller Idle so a
                        // later connect event can retry.
                        tracing::error!(error = %e, "Session start failed");
                    }
                }
                AgentEvent::Frame(frame) => {
                    if self.is_active() {
                        pipeline.process_frame(&mut ctx, &frame).await;
                    } else {
                        tracing::trace!(track_sid = %frame.track_sid, "Frame ignored while idle");
                    }
                }
            }
        }

        tracing::info!("Room event stream ended");
        if self.is_active() {
            self.finish_consultation(&mut ctx).await;
        }
    }

    /// Dispatch one control event
    pub async fn handle_control(
        &mut self,
        ctx: &mut ConsultationContext,
        event: RoomControlEvent,
    ) -> Result<()> {
        match event {
            RoomControlEvent::ParticipantConnected { participant } => {
                self.on_participant_connected(ctx, &participant.identity)
                    .await
            }
            RoomControlEvent::ParticipantDisconnected { participant } => {
                self.on_participant_disconnected(ctx, &participant.identity)
                    .await;
                Ok(())
            }
            RoomControlEvent::TrackSubscribed {
                track_sid,
                kind,
                participant,
            } => {
                if kind == TrackKind::Video {
                    tracing::info!(
                        track_sid = %track_sid,
                        identity = %participant.identity,
                        "Processing video track"
                    );
                }
                Ok(())
            }
        }
    }

    /// Handle a participant joining the room
    pub async fn on_participant_connected(
        &mut self,
        ctx: &mut ConsultationContext,
        identity: &str,
    ) -> Result<()> {
        self.participants.insert(identity.to_string());
        tracing::info!(identity = %identity, "Participant connected");

        if self.is_active() {
            return Ok(());
        }
        self.start_avatar(ctx).await
    }

    /// Handle a participant leaving the room
    pub async fn on_participant_disconnected(
        &mut self,
        ctx: &mut ConsultationContext,
        identity: &str,
    ) {
        self.participants.remove(identity);
        tracing::info!(
            identity = %identity,
            remaining = self.participants.len(),
            "Participant disconnected"
        );

        if self.participants.is_empty() && self.is_active() {
            self.finish_consultation(ctx).await;
        }
    }

    /// Idle -> Active: start the avatar/session pair
    async fn start_avatar(&mut self, ctx: &mut ConsultationContext) -> Result<()> {
        tracing::info!(room = %self.room_name, "Starting avatar session");

        ctx.reset();
        let session = AgentSession::new();
        let avatar = self
            .avatar
            .start(&session, &self.room_name, &self.persona)
            .await?;
        self.active = Some(ActiveSession { session, avatar });

        let welcome = format!(
            "Hello! I'm {}, your moving consultant. I'll help you inventory your items. \
             Please show me around the room slowly so I can see everything clearly.",
            self.persona.name
        );
        self.send_consultation_message(&welcome).await;
        Ok(())
    }

    /// Active -> Idle: final summary, snapshot, teardown
    async fn finish_consultation(&mut self, ctx: &mut ConsultationContext) {
        let summary = ctx.inventory.summarize();
        self.send_consultation_message(&format!("Final inventory summary:\n{}", summary))
            .await;

        if let Err(e) = self.emitter.persist(&ctx.inventory).await {
            tracing::error!(error = %e, "Failed to persist inventory snapshot");
        }

        self.stop_avatar().await;
    }

    /// Best-effort teardown of the avatar/session pair
    async fn stop_avatar(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        tracing::info!(session_id = %active.session.id, "Stopping avatar session");
        if let Err(e) = self.avatar.stop(&active.avatar).await {
            // A failed stop must not keep the controller out of Idle.
            tracing::error!(error = %e, "Error stopping avatar");
        }
    }

    /// Publish a consultation message over the reliable data channel
    ///
    /// Informational channel: failures are logged, never raised.
    pub async fn send_consultation_message(&self, message: &str) {
        match self.publisher.publish(message) {
            Ok(()) => tracing::info!(text = %message, "Sent consultation message"),
            Err(e) => tracing::error!(error = %e, "Error sending consultation message"),
        }
    }
}
