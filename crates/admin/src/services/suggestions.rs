//! AI suggestion queue, served by the agents service.

use preco_real_core::{Suggestion, SuggestionId};
use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use super::{Ack, ServiceClient};
use crate::error::ConsoleError;

#[derive(Clone)]
pub struct SuggestionsClient {
    client: ServiceClient,
}

impl SuggestionsClient {
    pub(crate) const fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// Pending AI suggestions.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all)]
    pub async fn list(&self, credential: &SecretString) -> Result<Vec<Suggestion>, ConsoleError> {
        self.client
            .get("/api/agents/suggestions", Some(credential))
            .await
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip(self, credential), fields(id = %id))]
    pub async fn reject(
        &self,
        id: &SuggestionId,
        credential: &SecretString,
    ) -> Result<Ack, ConsoleError> {
        let ack: Option<Ack> = self
            .client
            .send::<(), _>(
                Method::PUT,
                &format!("/api/agents/suggestions/{id}/reject"),
                &[],
                None,
                Some(credential),
            )
            .await?;
        Ok(ack.unwrap_or_default())
    }
}
