//! Consultation Avatar Agent
//!
//! Main entry point for the consultation agent.

use consult_agent::{
    avatar::AvatarClient,
    detection_client::DetectionClient,
    frame_pipeline::FramePipeline,
    report_emitter::ReportEmitter,
    room_gateway::RoomGateway,
    session_controller::SessionController,
    state::{AgentConfig, ConsultationContext},
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "consult_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting consultation agent v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AgentConfig::default();
    tracing::info!(
        room_ws_url = %config.room_ws_url,
        room_name = %config.room_name,
        avatar_api_url = %config.avatar_api_url,
        avatar_name = %config.avatar_name,
        vision_model = %config.vision_model,
        inventory_path = %config.inventory_path.display(),
        "Configuration loaded"
    );

    if config.vision_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set - vision analysis will be limited");
    }
    if config.avatar_api_key.is_none() {
        tracing::warn!("ANAM_API_KEY not set - avatar start will fail until configured");
    }

    // Initialize components
    let detector = Arc::new(DetectionClient::new(
        config.vision_api_url.clone(),
        config.vision_api_key.clone(),
        config.vision_model.clone(),
        &config.avatar_name,
    ));
    let avatar = Arc::new(AvatarClient::new(
        config.avatar_api_url.clone(),
        config.avatar_api_key.clone(),
    ));
    let emitter = ReportEmitter::new(config.inventory_path.clone());
    tracing::info!("Components initialized");

    // Connect to the room provider bridge
    let (publisher, events) =
        RoomGateway::connect(&config.room_ws_url, config.room_token.as_deref()).await?;

    let pipeline = FramePipeline::new(detector, publisher.clone(), config.snapshot_dir.clone());
    let controller = SessionController::new(
        avatar,
        config.persona(),
        publisher,
        emitter,
        config.room_name.clone(),
    );
    let ctx = ConsultationContext::new(Duration::from_secs(config.emit_interval_secs));

    // Run the processing loop until the room connection ends
    let agent = tokio::spawn(controller.run(ctx, events, pipeline));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        result = agent => {
            result?;
            tracing::info!("Room connection closed");
        }
    }

    Ok(())
}
