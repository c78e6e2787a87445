//! Catalog records exchanged with the products, stores, agents and users
//! services.
//!
//! The services are loosely typed document stores. Records keep the fields
//! the console reads and carry everything else through `extra`, so an update
//! sent back with `PUT` does not drop fields this crate does not know about.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{CriticismId, Price, ProductId, ReviewStatus, StoreId, SuggestionId};

/// A product as stored by the products service.
///
/// Canonical products have no `store_id`. Store products carry the store
/// they belong to and the price that store charges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReviewStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<StoreId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Whether this is a canonical catalog entry rather than a store listing.
    #[must_use]
    pub const fn is_canonical(&self) -> bool {
        self.store_id.is_none()
    }
}

/// Body for creating or updating a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Body for `POST /api/products/from_canonical`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAssignment {
    pub canonical_product_id: ProductId,
    pub store_id: StoreId,
    pub price: Price,
}

/// A retail store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A product suggested by the AI agents and awaiting review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A user-submitted criticism of a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criticism {
    pub id: CriticismId,
    pub produto_id: ProductId,
    pub tipo_critica: String,
    #[serde(default)]
    pub comentario: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criado_em: Option<String>,
}

/// A structured product produced by a successful intake task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_name: String,
    pub category_standard: String,
    #[serde(default)]
    pub description_long: String,
    #[serde(default)]
    pub features_list: Vec<String>,
}

impl ProductRecord {
    /// Interpret an intake result as a product record, if it has that shape.
    #[must_use]
    pub fn from_result(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_product_keeps_unknown_fields() {
        let raw = json!({
            "id": "p1",
            "name": "Leite Integral",
            "category": "laticinios",
            "brand": "Vaquinha",
        });
        let product: Product = serde_json::from_value(raw.clone()).expect("product");
        assert!(product.is_canonical());
        assert_eq!(product.extra.get("brand"), Some(&json!("Vaquinha")));
        assert_eq!(serde_json::to_value(&product).expect("json"), raw);
    }

    #[test]
    fn test_store_product_price() {
        let product: Product = serde_json::from_value(json!({
            "id": "p2",
            "name": "Pão Francês",
            "category": "padaria",
            "store_id": "s1",
            "price": 0.89,
        }))
        .expect("product");
        assert!(!product.is_canonical());
        assert_eq!(product.price, Some(Decimal::new(89, 2)));
    }

    #[test]
    fn test_criticism_portuguese_fields() {
        let criticism: Criticism = serde_json::from_value(json!({
            "id": "c1",
            "produto_id": "p1",
            "tipo_critica": "preco_errado",
            "comentario": "Preço desatualizado",
            "status": "pendente",
            "criado_em": "2025-09-24T10:00:00Z",
        }))
        .expect("criticism");
        assert_eq!(criticism.produto_id.as_str(), "p1");
        assert_eq!(criticism.tipo_critica, "preco_errado");
    }

    #[test]
    fn test_product_record_from_result() {
        let value = json!({
            "product_name": "Arroz Agulhinha 5kg",
            "category_standard": "mercearia",
            "description_long": "Arroz tipo 1",
            "features_list": ["5kg", "tipo 1"],
        });
        let record = ProductRecord::from_result(&value).expect("record");
        assert_eq!(record.features_list.len(), 2);
        assert!(ProductRecord::from_result(&json!({"message": "ok"})).is_none());
    }

    #[test]
    fn test_store_assignment_body() {
        let body = StoreAssignment {
            canonical_product_id: ProductId::new("p1"),
            store_id: StoreId::new("s1"),
            price: Price::parse("4.99").expect("price"),
        };
        assert_eq!(
            serde_json::to_value(&body).expect("json"),
            json!({"canonical_product_id": "p1", "store_id": "s1", "price": 4.99})
        );
    }
}
