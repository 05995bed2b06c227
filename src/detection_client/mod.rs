//! DetectionClient - Vision Classifier Adapter
//!
//! ## Responsibilities
//!
//! - Send sampled frames to the vision classifier
//! - Parse the structured JSON response into a detection record
//! - Degrade to a neutral record on any failure
//!
//! The client never returns an error past its boundary: the frame
//! pipeline must always be able to proceed to the next frame regardless
//! of classifier health. Callers that care can still distinguish a real
//! detection from a degraded one through [`DetectionOutcome`].

use crate::error::Result;
use crate::models::DetectionRecord;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Why a detection degraded to a neutral record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    /// No classifier credential configured; no network call was made
    Unavailable,
    /// Classifier answered, but not with parseable JSON (raw text kept)
    Unstructured(String),
    /// Transport, authentication or classifier error
    Failed(String),
}

/// Result of one classifier invocation
#[derive(Debug, Clone)]
pub enum DetectionOutcome {
    Detected(DetectionRecord),
    Degraded(DegradeReason),
}

impl DetectionOutcome {
    /// Collapse to a record; degraded outcomes keep their cause as notes
    /// so no information is discarded.
    pub fn into_record(self) -> DetectionRecord {
        match self {
            DetectionOutcome::Detected(record) => record,
            DetectionOutcome::Degraded(DegradeReason::Unavailable) => {
                DetectionRecord::neutral("Vision analysis not available")
            }
            DetectionOutcome::Degraded(DegradeReason::Unstructured(text)) => {
                DetectionRecord::neutral(text)
            }
            DetectionOutcome::Degraded(DegradeReason::Failed(cause)) => {
                DetectionRecord::neutral(format!("Analysis error: {}", cause))
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, DetectionOutcome::Degraded(_))
    }
}

/// Chat-completions response (only the fields we read)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Vision classifier client
pub struct DetectionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    system_prompt: String,
}

impl DetectionClient {
    /// Create new detection client
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        consultant_name: &str,
    ) -> Self {
        Self::with_timeout(
            base_url,
            api_key,
            model,
            consultant_name,
            Duration::from_secs(30),
        )
    }

    /// Create new detection client with custom timeout
    pub fn with_timeout(
        base_url: String,
        api_key: Option<String>,
        model: String,
        consultant_name: &str,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        let system_prompt = format!(
            "You are {}, a professional moving consultant. Analyze the room and provide \
             a detailed inventory. Respond with JSON only in this format: \
             {{\"room_type\": \"bedroom/kitchen/living_room/etc\", \
             \"items\":[{{\"name\":\"item_name\", \"qty\":1, \"size\":\"small/medium/large\", \
             \"fragile\":true/false}}], \"notes\":\"additional_observations\"}}",
            consultant_name
        );

        Self {
            client,
            base_url,
            api_key,
            model,
            system_prompt,
        }
    }

    /// Analyze one JPEG still for room inventory
    pub async fn detect(&self, image: &[u8]) -> DetectionOutcome {
        let Some(api_key) = self.api_key.clone() else {
            return DetectionOutcome::Degraded(DegradeReason::Unavailable);
        };

        match self.request_analysis(&api_key, image).await {
            Ok(content) => parse_content(content),
            Err(e) => DetectionOutcome::Degraded(DegradeReason::Failed(e.to_string())),
        }
    }

    /// Raw classifier round trip; returns the response text
    async fn request_analysis(&self, api_key: &str, image: &[u8]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": [
                    { "type": "text", "text": "Analyze this room for moving inventory." },
                    { "type": "image_url", "image_url": {
                        "url": format!("data:image/jpeg;base64,{}", encoded)
                    }}
                ]}
            ],
            "temperature": 0.2,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(content)
    }
}

/// Interpret the classifier's text: structured JSON or raw commentary
fn parse_content(content: String) -> DetectionOutcome {
    match serde_json::from_str::<DetectionRecord>(content.trim()) {
        Ok(record) => DetectionOutcome::Detected(record),
        Err(_) => DetectionOutcome::Degraded(DegradeReason::Unstructured(content)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let client = DetectionClient::new(
            "http://localhost:9".to_string(),
            None,
            "gpt-4o-mini".to_string(),
            "Dave",
        );
        let outcome = client.detect(&[0xFF, 0xD8]).await;
        assert!(matches!(
            outcome,
            DetectionOutcome::Degraded(DegradeReason::Unavailable)
        ));
        assert_eq!(
            outcome.into_record().notes,
            "Vision analysis not available"
        );
    }

    #[test]
    fn test_structured_response_parses() {
        let content = r#"{"room_type":"kitchen","items":[{"name":"plates","qty":6,"size":"small","fragile":true}],"notes":"glassware on open shelves"}"#;
        let outcome = parse_content(content.to_string());
        match outcome {
            DetectionOutcome::Detected(record) => {
                assert_eq!(record.room_type, "kitchen");
                assert_eq!(record.items.len(), 1);
                assert_eq!(record.notes, "glassware on open shelves");
            }
            other => panic!("expected detected, got {:?}", other),
        }
    }

    #[test]
    fn test_unstructured_response_keeps_full_text() {
        let text = "looks like a kitchen with plates";
        let outcome = parse_content(text.to_string());
        assert!(outcome.is_degraded());

        let record = outcome.into_record();
        assert_eq!(record.room_type, "unknown");
        assert!(record.items.is_empty());
        assert_eq!(record.notes, text);
    }

    #[test]
    fn test_failed_outcome_formats_cause() {
        let outcome = DetectionOutcome::Degraded(DegradeReason::Failed("timeout".to_string()));
        assert_eq!(outcome.into_record().notes, "Analysis error: timeout");
    }
}
