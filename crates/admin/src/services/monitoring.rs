//! Monitoring service client: dashboard metrics and price history.

use preco_real_core::{GeneralMetrics, PriceMetrics, PricePoint, ProductId, UsageMetrics};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use super::ServiceClient;
use crate::error::ConsoleError;

#[derive(Debug, Deserialize)]
struct PriceHistory {
    #[serde(default)]
    data: Vec<PricePoint>,
}

#[derive(Clone)]
pub struct MonitoringClient {
    client: ServiceClient,
}

impl MonitoringClient {
    pub(crate) const fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all)]
    pub async fn usage(&self, credential: &SecretString) -> Result<UsageMetrics, ConsoleError> {
        self.client.get("/api/metricas/uso", Some(credential)).await
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all)]
    pub async fn prices(&self, credential: &SecretString) -> Result<PriceMetrics, ConsoleError> {
        self.client
            .get("/api/metricas/precos", Some(credential))
            .await
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all)]
    pub async fn general(&self, credential: &SecretString) -> Result<GeneralMetrics, ConsoleError> {
        self.client
            .get("/api/metricas/gerais", Some(credential))
            .await
    }

    /// Recorded prices for one product, oldest first.
    ///
    /// The endpoint is public; the credential is sent when there is one.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip(self, credential), fields(product_id = %product_id))]
    pub async fn price_history(
        &self,
        product_id: &ProductId,
        credential: Option<&SecretString>,
    ) -> Result<Vec<PricePoint>, ConsoleError> {
        let history: PriceHistory = self
            .client
            .get_query(
                "/api/monitoring/prices",
                &[("product_id", product_id.as_str())],
                credential,
            )
            .await?;
        let mut points = history.data;
        points.sort_by_key(|p| p.time);
        Ok(points)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Service;

    #[tokio::test]
    async fn test_price_history_is_sorted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/monitoring/prices"))
            .and(query_param("product_id", "p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
                {"time": "2024-05-02T10:00:00+00:00", "price": 5.49, "product_id": "p1"},
                {"time": "2024-05-01T10:00:00+00:00", "price": 5.99, "product_id": "p1"}
            ]})))
            .mount(&server)
            .await;

        let client = MonitoringClient::new(ServiceClient::new(
            reqwest::Client::new(),
            Service::Monitoring,
            Url::parse(&server.uri()).unwrap(),
        ));
        let points = client
            .price_history(&ProductId::new("p1"), None)
            .await
            .unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].price - 5.99).abs() < f64::EPSILON);
    }
}
