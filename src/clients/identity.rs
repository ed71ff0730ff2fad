use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::settings::CollaboratorSettings;
use crate::domain::{CompetitionError, CompetitionResult};

/// Token verification against the platform identity service. The engine
/// never issues or stores credentials; a bearer token goes in, a participant
/// id comes out.
pub struct IdentityClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    participant_id: i64,
}

impl IdentityClient {
    pub fn new(settings: &CollaboratorSettings) -> Result<Self> {
        let client = build_client(settings)?;
        Ok(Self {
            client,
            base_url: settings.identity_base_url.clone(),
        })
    }

    pub async fn verify_token(&self, token: &str) -> CompetitionResult<i64> {
        let url = format!("{}/v1/verify", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&VerifyRequest { token })
            .send()
            .await
            .context("Failed to reach identity service")?;

        if response.status() == StatusCode::UNAUTHORIZED
            || response.status() == StatusCode::FORBIDDEN
        {
            return Err(CompetitionError::unauthorized("Invalid bearer token"));
        }
        if !response.status().is_success() {
            return Err(CompetitionError::Internal(anyhow::anyhow!(
                "Identity service returned status: {}",
                response.status()
            )));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .context("Failed to parse identity service response")?;
        Ok(body.participant_id)
    }
}

pub(crate) fn build_client(settings: &CollaboratorSettings) -> Result<Client> {
    Client::builder()
        .user_agent(settings.user_agent)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}
