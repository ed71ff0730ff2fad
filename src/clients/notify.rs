use anyhow::Result;
use log::warn;
use reqwest::Client;
use serde::Serialize;

use crate::config::settings::CollaboratorSettings;

use super::identity::build_client;

/// Fire-and-forget event delivery. A failed dispatch is logged and never
/// fails or blocks the operation that produced the event.
#[derive(Clone)]
pub struct Notifier {
    client: Client,
    base_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub event_type: &'static str,
    pub recipient_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournament_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ladder_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<i64>,
}

impl NotificationEvent {
    pub fn for_match(event_type: &'static str, recipient_id: i64, match_id: i64) -> Self {
        Self {
            event_type,
            recipient_id,
            tournament_id: None,
            ladder_id: None,
            match_id: Some(match_id),
        }
    }

    pub fn for_tournament(event_type: &'static str, recipient_id: i64, tournament_id: i64) -> Self {
        Self {
            event_type,
            recipient_id,
            tournament_id: Some(tournament_id),
            ladder_id: None,
            match_id: None,
        }
    }

    pub fn ladder(mut self, ladder_id: i64) -> Self {
        self.ladder_id = Some(ladder_id);
        self
    }
}

impl Notifier {
    pub fn new(settings: &CollaboratorSettings) -> Result<Self> {
        let client = build_client(settings)?;
        Ok(Self {
            client,
            base_url: settings.notify_base_url.clone(),
        })
    }

    /// Spawns the delivery so the caller never waits on the notification
    /// service.
    pub fn dispatch(&self, event: NotificationEvent) {
        let client = self.client.clone();
        let url = format!("{}/v1/events", self.base_url);

        tokio::spawn(async move {
            let result = client.post(&url).json(&event).send().await;
            match result {
                Ok(response) if !response.status().is_success() => {
                    warn!(
                        "Notification {} for {} rejected with {}",
                        event.event_type,
                        event.recipient_id,
                        response.status()
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "Notification {} for {} failed: {}",
                        event.event_type, event.recipient_id, e
                    );
                }
            }
        });
    }

    pub fn dispatch_all(&self, events: impl IntoIterator<Item = NotificationEvent>) {
        for event in events {
            self.dispatch(event);
        }
    }
}
