//! Health-check service client.

use serde_json::Value;
use tracing::instrument;

use super::ServiceClient;
use crate::error::ConsoleError;

#[derive(Clone)]
pub struct HealthClient {
    client: ServiceClient,
}

impl HealthClient {
    pub(crate) const fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// Fetch the aggregated status document. No credential is sent.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` for a non-2xx answer.
    #[instrument(skip_all)]
    pub async fn status(&self) -> Result<Value, ConsoleError> {
        self.client.get("/api/health", None).await
    }
}
