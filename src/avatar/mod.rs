//! Avatar Rendering Adapter
//!
//! ## Responsibilities
//!
//! - Persona configuration for the rendered consultant
//! - Start/stop avatar sessions against the rendering service
//!
//! The rendering service draws and voices the avatar; it carries no
//! inventory logic. This module only covers the session lifecycle calls
//! the controller needs.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Default consultant persona instructions sent to the rendering service
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a professional moving consultant with 15 years of experience in the \
moving industry. You help clients understand their moving needs, assess their \
inventory, and provide expert advice on packing, logistics, and moving \
strategies. Your responses are converted to speech: answer in plain, \
unformatted text, keep responses concise, ask one discovery question at a \
time, and guide the client through a room-by-room inventory. Identify fragile \
items that need special care and heavy items that need professional moving, \
and always be encouraging about the moving process.";

/// Persona descriptor consumed by the rendering service (camelCase wire form)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaConfig {
    pub name: String,
    pub avatar_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_session_length_seconds: Option<u32>,
}

/// Local handle for one conversational session
#[derive(Debug, Clone)]
pub struct AgentSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl AgentSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

impl Default for AgentSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for a live avatar session on the rendering service
#[derive(Debug, Clone)]
pub struct AvatarHandle {
    pub session_id: String,
}

/// Avatar session lifecycle as the controller consumes it
#[async_trait]
pub trait AvatarBackend: Send + Sync {
    /// Start rendering the persona into the given room
    async fn start(
        &self,
        session: &AgentSession,
        room: &str,
        persona: &PersonaConfig,
    ) -> Result<AvatarHandle>;

    /// Stop a live avatar session
    async fn stop(&self, handle: &AvatarHandle) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct StartSessionResponse {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// REST client for the avatar rendering service
pub struct AvatarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AvatarClient {
    /// Create new avatar client
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl AvatarBackend for AvatarClient {
    async fn start(
        &self,
        session: &AgentSession,
        room: &str,
        persona: &PersonaConfig,
    ) -> Result<AvatarHandle> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("avatar API key not configured".to_string()))?;

        let url = format!("{}/v1/sessions", self.base_url);
        let body = serde_json::json!({
            "sessionId": session.id.to_string(),
            "roomName": room,
            "persona": persona,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Avatar(format!(
                "session start failed: {} - {}",
                status, body
            )));
        }

        let started: StartSessionResponse = resp.json().await?;
        tracing::info!(
            avatar_session_id = %started.session_id,
            room = %room,
            persona = %persona.name,
            "Avatar session started"
        );

        Ok(AvatarHandle {
            session_id: started.session_id,
        })
    }

    async fn stop(&self, handle: &AvatarHandle) -> Result<()> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("avatar API key not configured".to_string()))?;

        let url = format!("{}/v1/sessions/{}", self.base_url, handle.session_id);
        let resp = self.client.delete(&url).bearer_auth(api_key).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Avatar(format!(
                "session stop failed: {}",
                resp.status()
            )));
        }

        tracing::info!(avatar_session_id = %handle.session_id, "Avatar session stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_serializes_camel_case() {
        let persona = PersonaConfig {
            name: "Dave".to_string(),
            avatar_id: "aea2cf13".to_string(),
            voice_id: Some("95c6316e".to_string()),
            llm_id: None,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            max_session_length_seconds: Some(1800),
        };

        let json = serde_json::to_value(&persona).unwrap();
        assert_eq!(json["avatarId"], "aea2cf13");
        assert_eq!(json["voiceId"], "95c6316e");
        assert_eq!(json["maxSessionLengthSeconds"], 1800);
        assert!(json.get("llmId").is_none());
    }

    #[test]
    fn test_agent_sessions_have_distinct_ids() {
        let a = AgentSession::new();
        let b = AgentSession::new();
        assert_ne!(a.id, b.id);
    }
}
