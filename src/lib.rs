//! Consultation Avatar Agent
//!
//! Hosts a conversational moving-consultant avatar in a real-time video
//! room and builds a room-by-room inventory while the client shows their
//! living space to the camera.
//!
//! ## Architecture (7 Components)
//!
//! 1. RoomGateway - room provider bridge (events, frames, data channel)
//! 2. SessionController - avatar lifecycle gated on room occupancy
//! 3. FramePipeline - frame sampling, JPEG encode, throttled updates
//! 4. DetectionClient - vision classifier adapter
//! 5. InventoryStore - running inventory with deterministic merges
//! 6. ReportEmitter - durable snapshot for the report renderer
//! 7. Avatar - rendering service adapter and persona configuration
//!
//! ## Design Principles
//!
//! - One processing loop owns all consultation state; room events and
//!   sampled frames reach it as typed messages over bounded channels
//! - External failures degrade to neutral data at the boundary; only
//!   session establishment errors surface to the caller
//! - Inventory merges are write-once-grow-only within a consultation

pub mod avatar;
pub mod detection_client;
pub mod error;
pub mod frame_pipeline;
pub mod inventory_store;
pub mod models;
pub mod report_emitter;
pub mod room_gateway;
pub mod session_controller;
pub mod state;

pub use error::{Error, Result};
pub use state::{AgentConfig, ConsultationContext};
