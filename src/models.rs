use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the product catalog. Read-only from this app's perspective.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
}

/// Raw sale row: header joined to its line detail and the product catalog.
/// `total` is kept textual here; numeric coercion happens in the aggregator
/// so malformed amounts are dropped per row instead of failing the fetch.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct SaleRecord {
    pub date: NaiveDate,
    pub total: String,
    pub product_id: i64,
}

/// One bucket of an aggregated or forecast series.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub period: NaiveDate,
    pub total: f64,
}
