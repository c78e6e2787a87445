//! Criticism queue, served by the users service.

use preco_real_core::Criticism;
use secrecy::SecretString;
use tracing::instrument;

use super::ServiceClient;
use crate::error::ConsoleError;

#[derive(Clone)]
pub struct CriticismsClient {
    client: ServiceClient,
}

impl CriticismsClient {
    pub(crate) const fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all)]
    pub async fn list(&self, credential: &SecretString) -> Result<Vec<Criticism>, ConsoleError> {
        self.client.get("/api/criticas", Some(credential)).await
    }
}
