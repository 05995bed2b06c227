//! Agent configuration and consultation context
//!
//! Configuration is read from the environment once at process start. The
//! consultation context is the single owner of all per-consultation
//! mutable state; it is owned by the session controller's processing
//! loop and reset on every Idle -> Active transition.

use crate::avatar::{PersonaConfig, DEFAULT_SYSTEM_PROMPT};
use crate::frame_pipeline::EmitThrottle;
use crate::inventory_store::InventoryStore;
use std::path::PathBuf;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Room provider bridge WebSocket URL
    pub room_ws_url: String,
    /// Room provider access token
    pub room_token: Option<String>,
    /// Room name the avatar joins
    pub room_name: String,
    /// Avatar rendering service URL
    pub avatar_api_url: String,
    /// Avatar rendering credential
    pub avatar_api_key: Option<String>,
    /// Avatar identity on the rendering service
    pub avatar_id: String,
    /// Consultant display name
    pub avatar_name: String,
    /// Optional voice identity
    pub voice_id: Option<String>,
    /// Optional language-model identity for the avatar's brain
    pub llm_id: Option<String>,
    /// Maximum avatar session length in seconds
    pub max_session_length_seconds: u32,
    /// Vision classifier base URL
    pub vision_api_url: String,
    /// Vision classifier credential (detection degrades when absent)
    pub vision_api_key: Option<String>,
    /// Vision classifier model
    pub vision_model: String,
    /// Inventory snapshot destination
    pub inventory_path: PathBuf,
    /// Directory for per-room frame stills (disabled when unset)
    pub snapshot_dir: Option<PathBuf>,
    /// Minimum spacing between progress messages in seconds
    pub emit_interval_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            room_ws_url: std::env::var("ROOM_WS_URL")
                .unwrap_or_else(|_| "ws://localhost:7880/agent".to_string()),
            room_token: std::env::var("ROOM_TOKEN").ok(),
            room_name: std::env::var("ROOM_NAME")
                .unwrap_or_else(|_| "consultation".to_string()),
            avatar_api_url: std::env::var("ANAM_API_URL")
                .unwrap_or_else(|_| "https://api.anam.ai".to_string()),
            avatar_api_key: std::env::var("ANAM_API_KEY").ok(),
            avatar_id: std::env::var("ANAM_AVATAR_ID")
                .unwrap_or_else(|_| "aea2cf13-5e40-4c0f-bd4e-b597b1c0acb4".to_string()),
            avatar_name: std::env::var("ANAM_AVATAR_NAME")
                .unwrap_or_else(|_| "Dave".to_string()),
            voice_id: std::env::var("ANAM_VOICE_ID").ok(),
            llm_id: std::env::var("ANAM_LLM_ID").ok(),
            max_session_length_seconds: std::env::var("MAX_SESSION_LENGTH_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1800),
            vision_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            vision_api_key: std::env::var("OPENAI_API_KEY").ok(),
            vision_model: std::env::var("VISION_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            inventory_path: std::env::var("INVENTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("inventory.json")),
            snapshot_dir: std::env::var("SNAPSHOT_DIR").map(PathBuf::from).ok(),
            emit_interval_secs: std::env::var("EMIT_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
        }
    }
}

impl AgentConfig {
    /// Persona descriptor for the rendering service
    pub fn persona(&self) -> PersonaConfig {
        PersonaConfig {
            name: self.avatar_name.clone(),
            avatar_id: self.avatar_id.clone(),
            voice_id: self.voice_id.clone(),
            llm_id: self.llm_id.clone(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            max_session_length_seconds: Some(self.max_session_length_seconds),
        }
    }
}

/// Per-consultation mutable state
///
/// Owned by the processing loop; no other task mutates it.
pub struct ConsultationContext {
    pub inventory: InventoryStore,
    pub throttle: EmitThrottle,
    emit_interval: Duration,
}

impl ConsultationContext {
    /// Create new context
    pub fn new(emit_interval: Duration) -> Self {
        Self {
            inventory: InventoryStore::new(),
            throttle: EmitThrottle::new(emit_interval),
            emit_interval,
        }
    }

    /// Reset for a fresh consultation
    pub fn reset(&mut self) {
        self.inventory.clear();
        self.throttle = EmitThrottle::new(self.emit_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectionRecord;
    use std::time::Instant;

    #[test]
    fn test_context_reset_clears_inventory_and_throttle() {
        let mut ctx = ConsultationContext::new(Duration::from_secs(15));
        ctx.inventory.merge(&DetectionRecord {
            room_type: "bedroom".to_string(),
            items: vec![],
            notes: "note".to_string(),
        });
        let now = Instant::now();
        ctx.throttle.mark(now);

        ctx.reset();
        assert!(ctx.inventory.is_empty());
        assert_eq!(ctx.inventory.current_room(), "unknown");
        assert!(ctx.throttle.should_emit(now));
    }
}
