//! Derived view state for the catalog screens.
//!
//! Everything here is a pure function of records already fetched from the
//! backend services, so the console routes and the CLI can share it.

use serde::{Deserialize, Serialize};

use crate::types::{
    DailyCount, GeneralMetrics, PriceMetrics, PriceTrendPoint, Product, Store, StoreId,
    UsageMetrics,
};

/// Search and category filter for the canonical catalog table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring matched against name, description and barcode.
    #[serde(default)]
    pub search: Option<String>,
    /// Case-insensitive exact category match.
    #[serde(default)]
    pub category: Option<String>,
}

impl ProductFilter {
    /// Whether `product` passes both the search and the category filter.
    ///
    /// Blank filter values match everything.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_search(product) && self.matches_category(product)
    }

    /// Keep only the products that pass the filter, preserving order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }

    fn matches_search(&self, product: &Product) -> bool {
        let Some(term) = non_blank(self.search.as_deref()) else {
            return true;
        };
        let term = term.to_lowercase();
        let contains = |field: Option<&str>| {
            field.is_some_and(|value| value.to_lowercase().contains(&term))
        };
        contains(Some(&product.name))
            || contains(product.description.as_deref())
            || contains(product.barcode.as_deref())
    }

    fn matches_category(&self, product: &Product) -> bool {
        non_blank(self.category.as_deref())
            .is_none_or(|category| product.category.to_lowercase() == category.to_lowercase())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Distinct categories present in `products`, sorted, for the filter dropdown.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut categories: Vec<String> = products
        .iter()
        .map(|p| p.category.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect();
    categories.sort_unstable();
    categories.dedup();
    categories
}

/// The store showcase: canonical products on one side, the selected store's
/// listings on the other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Showcase {
    pub stores: Vec<Store>,
    pub selected_store: Option<StoreId>,
    pub canonical: Vec<Product>,
    pub store_products: Vec<Product>,
}

impl Showcase {
    /// Partition `products` for `selected`, defaulting to the first store.
    ///
    /// A selection that names an unknown store falls back to the default.
    #[must_use]
    pub fn build(stores: Vec<Store>, products: Vec<Product>, selected: Option<&StoreId>) -> Self {
        let selected_store = selected
            .filter(|id| stores.iter().any(|s| &s.id == *id))
            .cloned()
            .or_else(|| stores.first().map(|s| s.id.clone()));

        let (canonical, listed): (Vec<_>, Vec<_>) =
            products.into_iter().partition(Product::is_canonical);
        let store_products = listed
            .into_iter()
            .filter(|p| p.store_id.is_some() && p.store_id == selected_store)
            .collect();

        Self {
            stores,
            selected_store,
            canonical,
            store_products,
        }
    }
}

/// Headline numbers and chart series for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub active_users_today: u64,
    pub searches_last_day: u64,
    pub pending_critiques: u64,
    pub canonical_products: u64,
    pub searches_per_day: Vec<DailyCount>,
    pub price_trend: Vec<PriceTrendPoint>,
}

impl DashboardSummary {
    /// Combine the three metric documents.
    ///
    /// The search series is sorted by date and the last-day figure is the
    /// count of the most recent entry (zero when the series is empty).
    #[must_use]
    pub fn derive(usage: UsageMetrics, prices: PriceMetrics, general: &GeneralMetrics) -> Self {
        let mut searches_per_day = usage.searches_per_day;
        searches_per_day.sort_by_key(|d| d.date);
        let mut price_trend = prices.average_price_trend;
        price_trend.sort_by_key(|p| p.date);

        Self {
            active_users_today: usage.active_users_today,
            searches_last_day: searches_per_day.last().map_or(0, |d| d.count),
            pending_critiques: general.pending_critiques_count,
            canonical_products: general.canonical_products_count,
            searches_per_day,
            price_trend,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn product(value: serde_json::Value) -> Product {
        serde_json::from_value(value).expect("product")
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(json!({"id": "1", "name": "Leite Integral", "category": "Laticinios", "barcode": "7891000"})),
            product(json!({"id": "2", "name": "Pão Francês", "category": "padaria", "description": "Fresco, feito com LEITE"})),
            product(json!({"id": "3", "name": "Arroz", "category": "mercearia", "store_id": "s1", "price": 21.9})),
            product(json!({"id": "4", "name": "Feijão", "category": "mercearia", "store_id": "s2", "price": 8.5})),
        ]
    }

    fn store(id: &str) -> Store {
        serde_json::from_value(json!({"id": id, "name": format!("Loja {id}")})).expect("store")
    }

    #[test]
    fn test_search_is_case_insensitive_over_name_description_barcode() {
        let products = catalog();
        let filter = ProductFilter {
            search: Some("leite".into()),
            category: None,
        };
        let ids: Vec<_> = filter.apply(&products).iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let by_barcode = ProductFilter {
            search: Some("7891".into()),
            category: None,
        };
        assert_eq!(by_barcode.apply(&products).len(), 1);
    }

    #[test]
    fn test_category_is_exact_case_insensitive() {
        let products = catalog();
        let filter = ProductFilter {
            search: None,
            category: Some("laticinios".into()),
        };
        assert_eq!(filter.apply(&products).len(), 1);

        let partial = ProductFilter {
            search: None,
            category: Some("latic".into()),
        };
        assert!(partial.apply(&products).is_empty());
    }

    #[test]
    fn test_blank_filter_matches_everything() {
        let products = catalog();
        let filter = ProductFilter {
            search: Some("   ".into()),
            category: Some(String::new()),
        };
        assert_eq!(filter.apply(&products).len(), products.len());
    }

    #[test]
    fn test_categories_sorted_and_deduplicated() {
        assert_eq!(
            categories(&catalog()),
            vec!["Laticinios", "mercearia", "padaria"]
        );
    }

    #[test]
    fn test_showcase_defaults_to_first_store() {
        let showcase = Showcase::build(vec![store("s1"), store("s2")], catalog(), None);
        assert_eq!(showcase.selected_store, Some(StoreId::new("s1")));
        assert_eq!(showcase.canonical.len(), 2);
        assert_eq!(showcase.store_products.len(), 1);
        assert_eq!(showcase.store_products[0].id.as_str(), "3");
    }

    #[test]
    fn test_showcase_unknown_selection_falls_back() {
        let showcase = Showcase::build(
            vec![store("s1"), store("s2")],
            catalog(),
            Some(&StoreId::new("s9")),
        );
        assert_eq!(showcase.selected_store, Some(StoreId::new("s1")));

        let second = Showcase::build(
            vec![store("s1"), store("s2")],
            catalog(),
            Some(&StoreId::new("s2")),
        );
        assert_eq!(second.store_products[0].id.as_str(), "4");
    }

    #[test]
    fn test_showcase_without_stores_has_no_listings() {
        let showcase = Showcase::build(Vec::new(), catalog(), None);
        assert_eq!(showcase.selected_store, None);
        assert!(showcase.store_products.is_empty());
        assert_eq!(showcase.canonical.len(), 2);
    }

    #[test]
    fn test_dashboard_last_day_uses_latest_date() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 9, d).expect("date");
        let usage = UsageMetrics {
            active_users_today: 1502,
            searches_per_day: vec![
                DailyCount { date: day(24), count: 15589 },
                DailyCount { date: day(20), count: 12034 },
            ],
        };
        let general = GeneralMetrics {
            pending_critiques_count: 7,
            canonical_products_count: 120,
        };
        let summary = DashboardSummary::derive(usage, PriceMetrics::default(), &general);
        assert_eq!(summary.searches_last_day, 15589);
        assert_eq!(summary.searches_per_day[0].date, day(20));
        assert_eq!(summary.pending_critiques, 7);
        assert_eq!(summary.canonical_products, 120);
    }

    #[test]
    fn test_dashboard_empty_series() {
        let summary = DashboardSummary::derive(
            UsageMetrics::default(),
            PriceMetrics::default(),
            &GeneralMetrics::default(),
        );
        assert_eq!(summary.searches_last_day, 0);
        assert!(summary.price_trend.is_empty());
    }
}
