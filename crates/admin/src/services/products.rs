//! Products service client.

use preco_real_core::{NewProduct, Product, ProductId, StoreAssignment};
use reqwest::Method;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use super::{Ack, ServiceClient};
use crate::error::ConsoleError;

#[derive(Debug, Deserialize)]
struct ProductList {
    #[serde(default)]
    products: Vec<Product>,
}

/// Catalog, moderation queue and store assignments.
#[derive(Clone)]
pub struct ProductsClient {
    client: ServiceClient,
}

impl ProductsClient {
    pub(crate) const fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// Every product, canonical and store-bound.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all)]
    pub async fn list(&self, credential: &SecretString) -> Result<Vec<Product>, ConsoleError> {
        let list: ProductList = self.client.get("/api/products", Some(credential)).await?;
        Ok(list.products)
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails or the product
    /// does not exist.
    #[instrument(skip(self, credential), fields(id = %id))]
    pub async fn get(
        &self,
        id: &ProductId,
        credential: &SecretString,
    ) -> Result<Product, ConsoleError> {
        self.client
            .get(&format!("/api/products/{id}"), Some(credential))
            .await
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all, fields(name = %product.name))]
    pub async fn create(
        &self,
        product: &NewProduct,
        credential: &SecretString,
    ) -> Result<Ack, ConsoleError> {
        self.client
            .send(Method::POST, "/api/products", &[], Some(product), Some(credential))
            .await
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip(self, product, credential), fields(id = %id))]
    pub async fn update(
        &self,
        id: &ProductId,
        product: &NewProduct,
        credential: &SecretString,
    ) -> Result<Ack, ConsoleError> {
        self.client
            .send(
                Method::PUT,
                &format!("/api/products/{id}"),
                &[],
                Some(product),
                Some(credential),
            )
            .await
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip(self, credential), fields(id = %id))]
    pub async fn delete(&self, id: &ProductId, credential: &SecretString) -> Result<(), ConsoleError> {
        let _: Option<Ack> = self
            .client
            .send::<(), _>(
                Method::DELETE,
                &format!("/api/products/{id}"),
                &[],
                None,
                Some(credential),
            )
            .await?;
        Ok(())
    }

    /// Products waiting for moderation.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all)]
    pub async fn pending(&self, credential: &SecretString) -> Result<Vec<Product>, ConsoleError> {
        let list: ProductList = self
            .client
            .get("/api/products/pending", Some(credential))
            .await?;
        Ok(list.products)
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip(self, credential), fields(id = %id))]
    pub async fn approve(&self, id: &ProductId, credential: &SecretString) -> Result<Ack, ConsoleError> {
        self.moderate(id, "approve", credential).await
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip(self, credential), fields(id = %id))]
    pub async fn reject(&self, id: &ProductId, credential: &SecretString) -> Result<Ack, ConsoleError> {
        self.moderate(id, "reject", credential).await
    }

    async fn moderate(
        &self,
        id: &ProductId,
        action: &str,
        credential: &SecretString,
    ) -> Result<Ack, ConsoleError> {
        let ack: Option<Ack> = self
            .client
            .send::<(), _>(
                Method::POST,
                &format!("/api/products/{id}/{action}"),
                &[],
                None,
                Some(credential),
            )
            .await?;
        Ok(ack.unwrap_or_default())
    }

    /// Offer a canonical product in a store at a price.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all, fields(product = %assignment.canonical_product_id, store = %assignment.store_id))]
    pub async fn from_canonical(
        &self,
        assignment: &StoreAssignment,
        credential: &SecretString,
    ) -> Result<Ack, ConsoleError> {
        self.client
            .send(
                Method::POST,
                "/api/products/from_canonical",
                &[],
                Some(assignment),
                Some(credential),
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use preco_real_core::Price;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Service;

    fn products(server: &MockServer) -> ProductsClient {
        ProductsClient::new(ServiceClient::new(
            reqwest::Client::new(),
            Service::Products,
            Url::parse(&server.uri()).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_pending_reads_products_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/pending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [{"id": "p1", "name": "Leite", "category": "Laticínios", "status": "pending"}]
            })))
            .mount(&server)
            .await;

        let pending = products(&server)
            .pending(&SecretString::from("tok"))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "Leite");
    }

    #[tokio::test]
    async fn test_from_canonical_posts_assignment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/products/from_canonical"))
            .and(body_json(json!({
                "canonical_product_id": "c1",
                "store_id": "s1",
                "price": 4.99
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "message": "Produto adicionado à loja.",
                "productId": "p9"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let assignment = StoreAssignment {
            canonical_product_id: ProductId::new("c1"),
            store_id: preco_real_core::StoreId::new("s1"),
            price: Price::parse("4,99").unwrap(),
        };
        let ack = products(&server)
            .from_canonical(&assignment, &SecretString::from("tok"))
            .await
            .unwrap();
        assert_eq!(ack.id.as_deref(), Some("p9"));
    }

    #[tokio::test]
    async fn test_approve_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/products/p1/approve"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ack = products(&server)
            .approve(&ProductId::new("p1"), &SecretString::from("tok"))
            .await
            .unwrap();
        assert_eq!(ack, Ack::default());
    }
}
