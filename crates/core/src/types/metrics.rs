//! Metric documents served by the monitoring service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ProductId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTrendPoint {
    pub date: NaiveDate,
    pub avg_price: f64,
}

/// `GET /api/metricas/uso`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageMetrics {
    #[serde(default)]
    pub active_users_today: u64,
    #[serde(default)]
    pub searches_per_day: Vec<DailyCount>,
}

/// `GET /api/metricas/precos`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceMetrics {
    #[serde(default)]
    pub average_price_trend: Vec<PriceTrendPoint>,
}

/// `GET /api/metricas/gerais`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneralMetrics {
    #[serde(default)]
    pub pending_critiques_count: u64,
    #[serde(default)]
    pub canonical_products_count: u64,
}

/// One observation in a product's price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: DateTime<Utc>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_metrics_ignores_extra_fields() {
        let usage: UsageMetrics = serde_json::from_str(
            r#"{
                "active_users_today": 1502,
                "active_users_week": 8432,
                "searches_per_day": [{"date": "2025-09-20", "count": 12034}]
            }"#,
        )
        .expect("usage");
        assert_eq!(usage.active_users_today, 1502);
        assert_eq!(
            usage.searches_per_day[0].date,
            NaiveDate::from_ymd_opt(2025, 9, 20).expect("date")
        );
    }

    #[test]
    fn test_price_point_parses_offset_timestamp() {
        let point: PricePoint =
            serde_json::from_str(r#"{"time": "2025-09-24T10:00:00+00:00", "price": 5.49}"#)
                .expect("point");
        assert!(point.product_id.is_none());
        assert!((point.price - 5.49).abs() < f64::EPSILON);
    }
}
