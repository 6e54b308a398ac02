use anyhow::{Context, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;

use crate::config::DbConfig;
use crate::models::{Product, SaleRecord};

const PRODUCTS_QUERY: &str = "SELECT id, nombre AS name FROM productos ORDER BY nombre";

/// `total` is selected as text on purpose: the column has historically held
/// non-numeric junk, and coercion (with per-row drop) lives in the aggregator.
const SALES_QUERY: &str = "\
    SELECT vp.fecha AS date, CAST(vp.total AS CHAR) AS total, vpd.producto_id AS product_id \
    FROM ventasproductos vp \
    INNER JOIN ventasproductodetalles vpd ON vp.id = vpd.ventasproducto_id \
    INNER JOIN productos p ON vpd.producto_id = p.id";

const SALES_FILTER: &str = " WHERE p.id = ?";
const SALES_ORDER: &str = " ORDER BY vp.fecha ASC";

fn sales_query(filtered: bool) -> String {
    if filtered {
        format!("{SALES_QUERY}{SALES_FILTER}{SALES_ORDER}")
    } else {
        format!("{SALES_QUERY}{SALES_ORDER}")
    }
}

/// Connections are opened per call and closed before returning: the store is
/// only touched on explicit user interaction, so there is nothing to pool.
async fn connect(cfg: &DbConfig) -> Result<MySqlConnection> {
    let options = MySqlConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.database);

    tracing::debug!(host = %cfg.host, database = %cfg.database, "opening connection");

    MySqlConnection::connect_with(&options)
        .await
        .with_context(|| format!("failed to connect to {}:{}", cfg.host, cfg.port))
}

/// Full product catalog, ordered by display name. No pagination, no filter.
pub async fn fetch_products(cfg: &DbConfig) -> Result<Vec<Product>> {
    let mut conn = connect(cfg).await?;

    let rows = sqlx::query_as::<_, Product>(PRODUCTS_QUERY)
        .fetch_all(&mut conn)
        .await;

    // Close on every path; a failed graceful close is not worth surfacing.
    if let Err(e) = conn.close().await {
        tracing::debug!("connection close failed: {e}");
    }

    rows.context("failed to load product catalog")
}

/// Every sale-detail row joined to its header and product, optionally
/// restricted to a single product id. The filter is bound as a parameter,
/// never interpolated into the query text.
pub async fn fetch_sales(cfg: &DbConfig, product_id: Option<i64>) -> Result<Vec<SaleRecord>> {
    let mut conn = connect(cfg).await?;

    let query = sales_query(product_id.is_some());
    let mut q = sqlx::query_as::<_, SaleRecord>(&query);
    if let Some(id) = product_id {
        q = q.bind(id);
    }
    let rows = q.fetch_all(&mut conn).await;

    if let Err(e) = conn.close().await {
        tracing::debug!("connection close failed: {e}");
    }

    let rows = rows.context("failed to load sale records")?;
    tracing::debug!(count = rows.len(), product = ?product_id, "fetched sale records");
    Ok(rows)
}
