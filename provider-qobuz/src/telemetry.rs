//! Playback reporting
//!
//! Qobuz expects a `track/reportStreamingStart` post when a stream starts and
//! another one, carrying the played duration, when it ends. Reports are fire
//! and forget: failures are logged and never retried.

use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::CachingClient;
use crate::types::{Session, StreamingEventRecord};

const REPORT_ENDPOINT: &str = "track/reportStreamingStart";

pub struct TelemetryReporter {
    client: Arc<CachingClient>,
    provider_id: String,
}

impl TelemetryReporter {
    pub fn new(client: Arc<CachingClient>, provider_id: impl Into<String>) -> Self {
        Self {
            client,
            provider_id: provider_id.into(),
        }
    }

    /// Record describing `event` for the signed-in account
    pub fn record(&self, event: &PlaybackEvent, session: &Session) -> StreamingEventRecord {
        let duration = match event {
            PlaybackEvent::StreamingStarted { .. } => None,
            PlaybackEvent::StreamingEnded { seconds, .. } => Some(*seconds),
        };

        StreamingEventRecord {
            online: true,
            sample: false,
            intent: "stream".to_string(),
            device_id: session.device_id.clone(),
            track_id: event.track_id().to_string(),
            purchase: false,
            date: self.client.clock().unix_timestamp(),
            duration,
            credential_id: session.credential_id.clone(),
            user_id: session.user_id.clone(),
            local: false,
            format_id: event
                .details()
                .get("format_id")
                .cloned()
                .unwrap_or(Value::Null),
        }
    }

    /// Report one playback event; events of other providers are ignored
    pub async fn handle(&self, event: &PlaybackEvent) {
        if event.provider() != self.provider_id {
            return;
        }

        let Some(session) = self.client.session().current().await else {
            warn!(
                event = event.name(),
                track_id = event.track_id(),
                "No Qobuz session, skipping playback report"
            );
            return;
        };

        let record = self.record(event, &session);
        let body = match serde_json::to_value([record]) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode playback report");
                return;
            }
        };

        debug!(event = event.name(), track_id = event.track_id(), "Reporting playback");
        match self.client.post(REPORT_ENDPOINT, &body).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!(event = event.name(), track_id = event.track_id(), "Playback report rejected"),
            Err(e) => warn!(event = event.name(), error = %e, "Playback report failed"),
        }
    }

    /// Listen for this provider's playback events on `bus` until it closes
    pub fn spawn(self: Arc<Self>, bus: &EventBus) -> JoinHandle<()> {
        let provider_id = self.provider_id.clone();
        let mut stream = EventStream::new(bus.subscribe()).filter(move |event| {
            matches!(event, CoreEvent::Playback(playback) if playback.provider() == provider_id)
        });

        tokio::spawn(async move {
            loop {
                match stream.recv().await {
                    Ok(CoreEvent::Playback(event)) => self.handle(&event).await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Playback reporter lagged behind the event bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            info!("Event bus closed, playback reporting stopped");
        })
    }
}
