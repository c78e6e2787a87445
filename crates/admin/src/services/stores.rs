//! Stores service client.

use preco_real_core::{Store, StoreId};
use reqwest::Method;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use super::{Ack, ServiceClient};
use crate::error::ConsoleError;

#[derive(Debug, Deserialize)]
struct StoreList {
    #[serde(default)]
    stores: Vec<Store>,
}

/// Body for creating or updating a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDraft {
    pub name: String,
    /// Address, location and other fields passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone)]
pub struct StoresClient {
    client: ServiceClient,
}

impl StoresClient {
    pub(crate) const fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all)]
    pub async fn list(&self, credential: &SecretString) -> Result<Vec<Store>, ConsoleError> {
        let list: StoreList = self.client.get("/api/stores", Some(credential)).await?;
        Ok(list.stores)
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip(self, credential), fields(id = %id))]
    pub async fn get(&self, id: &StoreId, credential: &SecretString) -> Result<Store, ConsoleError> {
        self.client
            .get(&format!("/api/stores/{id}"), Some(credential))
            .await
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip_all, fields(name = %store.name))]
    pub async fn create(
        &self,
        store: &StoreDraft,
        credential: &SecretString,
    ) -> Result<Ack, ConsoleError> {
        self.client
            .send(Method::POST, "/api/stores", &[], Some(store), Some(credential))
            .await
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip(self, store, credential), fields(id = %id))]
    pub async fn update(
        &self,
        id: &StoreId,
        store: &StoreDraft,
        credential: &SecretString,
    ) -> Result<Ack, ConsoleError> {
        self.client
            .send(
                Method::PUT,
                &format!("/api/stores/{id}"),
                &[],
                Some(store),
                Some(credential),
            )
            .await
    }

    /// # Errors
    ///
    /// Returns `ConsoleError::Transport` if the request fails.
    #[instrument(skip(self, credential), fields(id = %id))]
    pub async fn delete(&self, id: &StoreId, credential: &SecretString) -> Result<(), ConsoleError> {
        let _: Option<Ack> = self
            .client
            .send::<(), _>(
                Method::DELETE,
                &format!("/api/stores/{id}"),
                &[],
                None,
                Some(credential),
            )
            .await?;
        Ok(())
    }
}
