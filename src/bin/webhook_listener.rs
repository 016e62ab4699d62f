use engine::{JoinRequest, JoinSigner};
use log::{error, info, warn};
use service::{config::Config, logging::Logger};
use webhook::{WebhookConfig, WebhookHandler, WebhookIngestServer};

/// Receives stream notifications and logs the join each one would trigger.
#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    let signer = JoinSigner::new(config.credential_defaults(), config.signature_format);
    let server = WebhookIngestServer::new(WebhookConfig::from(&config));

    let started = server.start(WebhookHandler::simple(move |payload| {
        let event = payload["event"].as_str().unwrap_or("unknown");
        if event != "meeting.rtms_started" {
            return Ok(());
        }
        let request = JoinRequest::from_webhook_payload(payload)?;
        match signer.prepare(&request) {
            Ok(join) => info!(
                "Would join {} (stream {}) via {}",
                join.meeting_uuid, join.stream_id, join.server_urls
            ),
            Err(e) => warn!("Cannot join {}: {e}", request.meeting_uuid()),
        }
        Ok(())
    }));

    if let Err(e) = started {
        error!("Failed to start webhook listener: {e}");
        std::process::exit(1);
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for shutdown signal: {e}");
    }
    info!("Shutting down");
    server.stop();
}
