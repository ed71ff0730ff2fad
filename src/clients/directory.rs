use std::collections::HashMap;

use anyhow::Result;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::config::settings::CollaboratorSettings;

use super::identity::build_client;

/// Read-only participant lookup, used only to decorate responses with
/// display names and skill tiers. Lookups that fail degrade to id-only
/// display and never affect control flow.
pub struct DirectoryClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantProfile {
    pub participant_id: i64,
    pub display_name: String,
    pub skill_tier: Option<String>,
}

impl DirectoryClient {
    pub fn new(settings: &CollaboratorSettings) -> Result<Self> {
        let client = build_client(settings)?;
        Ok(Self {
            client,
            base_url: settings.directory_base_url.clone(),
        })
    }

    pub async fn lookup(&self, participant_id: i64) -> Option<ParticipantProfile> {
        let url = format!("{}/v1/participants/{}", self.base_url, participant_id);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Directory lookup for {} failed: {}", participant_id, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(
                "Directory lookup for {} returned {}",
                participant_id,
                response.status()
            );
            return None;
        }

        response.json().await.ok()
    }

    pub async fn lookup_many(&self, participant_ids: &[i64]) -> HashMap<i64, ParticipantProfile> {
        let mut profiles = HashMap::new();
        for &id in participant_ids {
            if profiles.contains_key(&id) {
                continue;
            }
            if let Some(profile) = self.lookup(id).await {
                profiles.insert(id, profile);
            }
        }
        profiles
    }
}
