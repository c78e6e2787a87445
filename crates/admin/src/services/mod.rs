//! REST clients for the backend services.
//!
//! Every service is optional. [`Services`] builds a typed client on demand
//! and reports [`ConsoleError::ConfigurationMissing`] when the service's
//! base URL is unset, so a missing URL degrades one view instead of the
//! whole console.

pub mod criticisms;
pub mod health;
pub mod monitoring;
pub mod products;
pub mod stores;
pub mod suggestions;

use std::sync::Arc;

use reqwest::Method;
use reqwest::multipart::Form;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::config::{Service, ServiceUrls};
use crate::error::ConsoleError;

pub use criticisms::CriticismsClient;
pub use health::HealthClient;
pub use monitoring::MonitoringClient;
pub use products::ProductsClient;
pub use stores::StoresClient;
pub use suggestions::SuggestionsClient;

/// Acknowledgement returned by mutating endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "productId", alias = "storeId", alias = "id")]
    pub id: Option<String>,
}

/// Factory for the typed service clients.
#[derive(Clone)]
pub struct Services {
    http: reqwest::Client,
    urls: ServiceUrls,
}

impl Services {
    #[must_use]
    pub const fn new(http: reqwest::Client, urls: ServiceUrls) -> Self {
        Self { http, urls }
    }

    fn client(&self, service: Service) -> Result<ServiceClient, ConsoleError> {
        let base = self.urls.require(service)?;
        Ok(ServiceClient::new(self.http.clone(), service, base.clone()))
    }

    /// # Errors
    ///
    /// `ConfigurationMissing` when `PRODUCTS_API_URL` is unset.
    pub fn products(&self) -> Result<ProductsClient, ConsoleError> {
        self.client(Service::Products).map(ProductsClient::new)
    }

    /// # Errors
    ///
    /// `ConfigurationMissing` when `STORES_API_URL` is unset.
    pub fn stores(&self) -> Result<StoresClient, ConsoleError> {
        self.client(Service::Stores).map(StoresClient::new)
    }

    /// # Errors
    ///
    /// `ConfigurationMissing` when `AI_API_URL` is unset.
    pub fn suggestions(&self) -> Result<SuggestionsClient, ConsoleError> {
        self.client(Service::Agents).map(SuggestionsClient::new)
    }

    /// # Errors
    ///
    /// `ConfigurationMissing` when `USERS_API_URL` is unset.
    pub fn criticisms(&self) -> Result<CriticismsClient, ConsoleError> {
        self.client(Service::Users).map(CriticismsClient::new)
    }

    /// # Errors
    ///
    /// `ConfigurationMissing` when `MONITORING_API_URL` is unset.
    pub fn monitoring(&self) -> Result<MonitoringClient, ConsoleError> {
        self.client(Service::Monitoring).map(MonitoringClient::new)
    }

    /// # Errors
    ///
    /// `ConfigurationMissing` when `HEALTHCHECK_API_URL` is unset.
    pub fn health(&self) -> Result<HealthClient, ConsoleError> {
        self.client(Service::Healthcheck).map(HealthClient::new)
    }

    /// Raw client for the agents service.
    ///
    /// # Errors
    ///
    /// `ConfigurationMissing` when `AI_API_URL` is unset.
    pub fn agents(&self) -> Result<ServiceClient, ConsoleError> {
        self.client(Service::Agents)
    }
}

/// JSON-over-HTTP client bound to one service's base URL.
#[derive(Clone)]
pub struct ServiceClient {
    inner: Arc<ServiceClientInner>,
}

struct ServiceClientInner {
    http: reqwest::Client,
    service: Service,
    base: String,
}

impl ServiceClient {
    #[must_use]
    pub fn new(http: reqwest::Client, service: Service, base: Url) -> Self {
        Self {
            inner: Arc::new(ServiceClientInner {
                http,
                service,
                base: base.as_str().trim_end_matches('/').to_string(),
            }),
        }
    }

    #[must_use]
    pub fn service(&self) -> Service {
        self.inner.service
    }

    fn url(&self, path: &str) -> Result<Url, ConsoleError> {
        Url::parse(&format!("{}{path}", self.inner.base)).map_err(|e| ConsoleError::Transport {
            status: None,
            message: format!("URL inválida para {}: {e}", self.inner.service),
        })
    }

    /// `GET {base}{path}`.
    ///
    /// # Errors
    ///
    /// `Transport` for network failures, non-2xx answers and undecodable bodies.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: Option<&SecretString>,
    ) -> Result<T, ConsoleError> {
        self.send::<(), T>(Method::GET, path, &[], None, credential)
            .await
    }

    /// `GET {base}{path}?{query}`.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceClient::get`].
    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        credential: Option<&SecretString>,
    ) -> Result<T, ConsoleError> {
        self.send::<(), T>(Method::GET, path, query, None, credential)
            .await
    }

    /// Send a JSON request and decode the JSON answer.
    ///
    /// An empty body decodes as `null`.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceClient::get`].
    #[instrument(
        skip(self, query, body, credential),
        fields(service = %self.inner.service, status = tracing::field::Empty)
    )]
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        credential: Option<&SecretString>,
    ) -> Result<T, ConsoleError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut request = self.inner.http.request(method, url);
        if let Some(credential) = credential {
            request = request.bearer_auth(credential.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        self.read_response(request.send().await?).await
    }

    /// `POST {base}{path}` with a multipart body, decoding the JSON answer.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceClient::get`].
    #[instrument(
        skip(self, form, credential),
        fields(service = %self.inner.service, status = tracing::field::Empty)
    )]
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
        credential: Option<&SecretString>,
    ) -> Result<T, ConsoleError> {
        let mut request = self.inner.http.post(self.url(path)?).multipart(form);
        if let Some(credential) = credential {
            request = request.bearer_auth(credential.expose_secret());
        }
        self.read_response(request.send().await?).await
    }

    /// Map a response to its decoded body or a `Transport` error.
    async fn read_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ConsoleError> {
        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| error_message(&body));
            tracing::warn!(status = status.as_u16(), ?message, "service returned error");
            return Err(ConsoleError::http(status.as_u16(), message));
        }

        let decoded = if bytes.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_slice(&bytes)
        };
        decoded.map_err(|e| ConsoleError::Transport {
            status: Some(status.as_u16()),
            message: format!("Resposta inválida de {}: {e}", self.inner.service),
        })
    }
}

/// Operator-facing message from an error body.
///
/// Flask services answer `{"error": ...}`; `FastAPI` answers `{"detail": ...}`
/// where `detail` is a string or a list of validation errors.
fn error_message(body: &Value) -> Option<String> {
    let text = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    };

    if let Some(error) = body.get("error").and_then(text) {
        return Some(error);
    }
    match body.get("detail")? {
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("msg"))
            .and_then(text),
        other => text(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> ServiceClient {
        ServiceClient::new(
            reqwest::Client::new(),
            Service::Products,
            Url::parse(&format!("{}/", server.uri())).unwrap(),
        )
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(&json!({"error": "Produto não encontrado."})),
            Some("Produto não encontrado.".to_string())
        );
        assert_eq!(
            error_message(&json!({"detail": "Not authenticated"})),
            Some("Not authenticated".to_string())
        );
        assert_eq!(
            error_message(&json!({"detail": [{"loc": ["body"], "msg": "field required"}]})),
            Some("field required".to_string())
        );
        assert_eq!(error_message(&json!({"message": "x"})), None);
    }

    #[test]
    fn test_missing_service_url() {
        let services = Services::new(reqwest::Client::new(), ServiceUrls::default());
        let err = services.products().err().unwrap();
        assert_eq!(
            err,
            ConsoleError::ConfigurationMissing("URL da API de Produtos não configurada.".into())
        );
    }

    #[tokio::test]
    async fn test_get_sends_bearer_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/monitoring/prices"))
            .and(query_param("product_id", "p1"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let body: Value = client(&server)
            .get_query(
                "/api/monitoring/prices",
                &[("product_id", "p1")],
                Some(&SecretString::from("tok")),
            )
            .await
            .unwrap();
        assert_eq!(body, json!({"data": []}));
    }

    #[tokio::test]
    async fn test_non_2xx_without_body_uses_status_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server)
            .send::<(), Value>(Method::DELETE, "/api/products/p1", &[], None, None)
            .await
            .unwrap_err();
        assert_eq!(err, ConsoleError::http(500, None));
        assert_eq!(err.to_string(), "HTTP error! status: 500");
    }

    #[tokio::test]
    async fn test_empty_body_decodes_as_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let ack: Option<Ack> = client(&server)
            .send::<(), _>(Method::DELETE, "/api/products/p1", &[], None, None)
            .await
            .unwrap();
        assert!(ack.is_none());
    }
}
