//! `PostgreSQL` store.
//!
//! Stock is reserved with a conditional decrement per product inside the
//! order transaction:
//!
//! ```sql
//! UPDATE products SET stock = stock - $1 WHERE id = $2 AND is_active AND stock >= $1
//! ```
//!
//! Zero affected rows means the product is gone, deactivated or short, and the
//! whole transaction rolls back. Rows are touched in ascending product id order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use super::{Annotation, CatalogStore, OrderFilter, OrderStore, StoreError, UpdateOutcome};
use crate::catalog::{Product, ProductPricing};
use crate::delivery::DeliveryPolicy;
use crate::inventory::{self, InventoryError, StockRequest};
use crate::order::{CustomerDetails, NewOrder, Order, OrderItem};
use crate::pricing::PriceTier;
use crate::types::{CategoryId, Email, Money, OrderId, OrderItemId, OrderStatus, ProductId};

/// Settings key for the flat delivery fee.
pub const DELIVERY_COST_KEY: &str = "delivery_cost";

/// Settings key for the free-delivery threshold (`0` disables it).
pub const FREE_DELIVERY_THRESHOLD_KEY: &str = "free_delivery_threshold";

const ORDER_COLUMNS: &str = "id, order_number, status, customer_name, customer_email, \
    customer_phone, shipping_address, city, postal_code, country, customer_notes, \
    subtotal, delivery_fee, total, tracking_number, admin_note, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, product_sku, quantity, \
    unit_price, price_tier, line_total";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    slug: String,
    sku: Option<String>,
    category_id: Option<CategoryId>,
    original_price: Option<Money>,
    discounted_price: Option<Money>,
    deal_price: Option<Money>,
    stock: i32,
    is_active: bool,
    is_deal: bool,
    is_featured: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            sku: row.sku,
            category_id: row.category_id,
            pricing: ProductPricing {
                original: row.original_price,
                discounted: row.discounted_price,
                deal: row.deal_price,
            },
            stock: row.stock,
            is_active: row.is_active,
            is_deal: row.is_deal,
            is_featured: row.is_featured,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    status: OrderStatus,
    customer_name: String,
    customer_email: Email,
    customer_phone: Option<String>,
    shipping_address: String,
    city: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    customer_notes: Option<String>,
    subtotal: Money,
    delivery_fee: Money,
    total: Money,
    tracking_number: Option<String>,
    admin_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            status: self.status,
            customer: CustomerDetails {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
                shipping_address: self.shipping_address,
                city: self.city,
                postal_code: self.postal_code,
                country: self.country,
                notes: self.customer_notes,
            },
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total: self.total,
            tracking_number: self.tracking_number,
            admin_note: self.admin_note,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: Option<ProductId>,
    product_name: String,
    product_sku: Option<String>,
    quantity: i32,
    unit_price: Money,
    price_tier: PriceTier,
    line_total: Money,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            StoreError::Corrupt(format!(
                "order item {} has quantity {}",
                row.id, row.quantity
            ))
        })?;
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            product_sku: row.product_sku,
            quantity,
            unit_price: row.unit_price,
            tier: row.price_tier,
            line_total: row.line_total,
        })
    }
}

/// `ILIKE` pattern matching `query` anywhere, with wildcards escaped.
fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn quantity_column(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity).map_err(|_| StoreError::Corrupt(format!("quantity {quantity} overflows")))
}

// =============================================================================
// Store
// =============================================================================

/// [`CatalogStore`] and [`OrderStore`] over a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn items_for(
        conn: &mut PgConnection,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        );
        let rows: Vec<OrderItemRow> = sqlx::query_as(&sql)
            .bind(order_ids)
            .fetch_all(&mut *conn)
            .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            grouped.entry(order_id).or_default().push(row.try_into()?);
        }
        Ok(grouped)
    }

    async fn with_items(conn: &mut PgConnection, row: OrderRow) -> Result<Order, StoreError> {
        let mut items = Self::items_for(conn, &[row.id]).await?;
        let items = items.remove(&row.id).unwrap_or_default();
        Ok(row.into_order(items))
    }

    async fn current_status(
        conn: &mut PgConnection,
        id: OrderId,
    ) -> Result<Option<OrderStatus>, StoreError> {
        let status = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(status)
    }

    /// Decrement stock for every request or fail without side effects.
    ///
    /// Must run inside a transaction; the caller rolls back on error.
    async fn reserve_stock(
        conn: &mut PgConnection,
        requests: &[StockRequest],
    ) -> Result<(), StoreError> {
        for request in inventory::coalesce(requests.iter().copied()) {
            let quantity = quantity_column(request.quantity)?;
            let result = sqlx::query(
                "UPDATE products SET stock = stock - $1, updated_at = NOW() \
                 WHERE id = $2 AND is_active AND stock >= $1",
            )
            .bind(quantity)
            .bind(request.product_id)
            .execute(&mut *conn)
            .await?;

            if result.rows_affected() == 0 {
                let current: Option<(i32, bool)> =
                    sqlx::query_as("SELECT stock, is_active FROM products WHERE id = $1")
                        .bind(request.product_id)
                        .fetch_optional(&mut *conn)
                        .await?;
                let err = match current {
                    None => InventoryError::UnknownProduct(request.product_id),
                    Some((_, false)) => InventoryError::Inactive(request.product_id),
                    Some((available, true)) => InventoryError::InsufficientStock {
                        product_id: request.product_id,
                        available,
                        requested: request.quantity,
                    },
                };
                return Err(err.into());
            }
        }
        Ok(())
    }

    async fn release_stock(
        conn: &mut PgConnection,
        requests: &[StockRequest],
    ) -> Result<(), StoreError> {
        for request in inventory::coalesce(requests.iter().copied()) {
            sqlx::query(
                "UPDATE products SET stock = stock + $1, updated_at = NOW() WHERE id = $2",
            )
            .bind(quantity_column(request.quantity)?)
            .bind(request.product_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

impl CatalogStore for PgStore {
    #[instrument(skip(self), fields(count = ids.len()))]
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, name, slug, sku, category_id, original_price, discounted_price, \
             deal_price, stock, is_active, is_deal, is_featured \
             FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn delivery_policy(&self) -> Result<DeliveryPolicy, StoreError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM site_settings WHERE key = ANY($1)")
                .bind([DELIVERY_COST_KEY, FREE_DELIVERY_THRESHOLD_KEY].as_slice())
                .fetch_all(&self.pool)
                .await?;

        let defaults = DeliveryPolicy::default();
        let mut fee = defaults.flat_fee();
        let mut threshold = defaults.stored_threshold();
        for (key, value) in rows {
            let parsed: Money = value
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("setting {key} = {value:?}: {e}")))?;
            match key.as_str() {
                DELIVERY_COST_KEY => fee = parsed,
                _ => threshold = parsed,
            }
        }

        DeliveryPolicy::from_settings(fee, threshold)
            .map_err(|e| StoreError::Corrupt(format!("delivery settings: {e}")))
    }

    #[instrument(skip(self))]
    async fn set_delivery_policy(&self, policy: DeliveryPolicy) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in [
            (DELIVERY_COST_KEY, policy.flat_fee()),
            (FREE_DELIVERY_THRESHOLD_KEY, policy.stored_threshold()),
        ] {
            sqlx::query(
                "INSERT INTO site_settings (key, value) VALUES ($1, $2) \
                 ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()",
            )
            .bind(key)
            .bind(value.to_string())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

impl OrderStore for PgStore {
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;

        let requests: Vec<StockRequest> = order
            .items
            .iter()
            .map(|item| StockRequest::new(item.product_id, item.quantity))
            .collect();
        Self::reserve_stock(&mut tx, &requests).await?;

        let customer = &order.customer;
        let sql = format!(
            "INSERT INTO orders (order_number, status, customer_name, customer_email, \
             customer_phone, shipping_address, city, postal_code, country, customer_notes, \
             subtotal, delivery_fee, total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {ORDER_COLUMNS}"
        );
        let row: OrderRow = sqlx::query_as(&sql)
            .bind(&order.order_number)
            .bind(OrderStatus::Pending)
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&customer.shipping_address)
            .bind(&customer.city)
            .bind(&customer.postal_code)
            .bind(&customer.country)
            .bind(&customer.notes)
            .bind(order.subtotal)
            .bind(order.delivery_fee)
            .bind(order.total)
            .fetch_one(&mut *tx)
            .await?;

        let item_sql = format!(
            "INSERT INTO order_items (order_id, product_id, product_name, product_sku, \
             quantity, unit_price, price_tier, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {ITEM_COLUMNS}"
        );
        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let item_row: OrderItemRow = sqlx::query_as(&item_sql)
                .bind(row.id)
                .bind(item.product_id)
                .bind(&item.product_name)
                .bind(&item.product_sku)
                .bind(quantity_column(item.quantity)?)
                .bind(item.unit_price)
                .bind(item.tier)
                .bind(item.line_total)
                .fetch_one(&mut *tx)
                .await?;
            items.push(OrderItem::try_from(item_row)?);
        }

        tx.commit().await?;
        Ok(row.into_order(items))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::with_items(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(order_number)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::with_items(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::order_status IS NULL OR status = $1) \
               AND ($2::text IS NULL \
                    OR order_number ILIKE $2 \
                    OR customer_name ILIKE $2 \
                    OR customer_email ILIKE $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(filter.status)
            .bind(filter.query.as_deref().map(contains_pattern))
            .bind(filter.limit.map(i64::from))
            .bind(i64::from(filter.offset))
            .fetch_all(&mut *conn)
            .await?;

        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let mut items = Self::items_for(&mut conn, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn transition_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        to: OrderStatus,
        restock: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE orders SET status = $1, updated_at = NOW() \
             WHERE id = $2 AND status = $3 \
             RETURNING {ORDER_COLUMNS}"
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(to)
            .bind(id)
            .bind(expected)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Ok(match Self::current_status(&mut tx, id).await? {
                Some(current) => UpdateOutcome::Conflict(current),
                None => UpdateOutcome::NotFound,
            });
        };

        let order = Self::with_items(&mut tx, row).await?;
        if restock {
            let returned: Vec<StockRequest> = order
                .items
                .iter()
                .filter_map(|i| i.product_id.map(|p| StockRequest::new(p, i.quantity)))
                .collect();
            Self::release_stock(&mut tx, &returned).await?;
        }

        tx.commit().await?;
        Ok(UpdateOutcome::Updated(Box::new(order)))
    }

    #[instrument(skip(self))]
    async fn delete_order(&self, id: OrderId) -> Result<bool, StoreError> {
        // order_items go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn annotate(&self, id: OrderId, annotation: Annotation) -> Result<UpdateOutcome, StoreError> {
        let locked: Vec<&str> = OrderStatus::ALL
            .iter()
            .filter(|s| !s.accepts_annotations())
            .map(|s| s.as_str())
            .collect();

        let (column, value) = match annotation {
            Annotation::TrackingNumber(value) => ("tracking_number", value),
            Annotation::AdminNote(value) => ("admin_note", value),
        };
        let sql = format!(
            "UPDATE orders SET {column} = $1, updated_at = NOW() \
             WHERE id = $2 AND status::text <> ALL($3) \
             RETURNING {ORDER_COLUMNS}"
        );

        let mut conn = self.pool.acquire().await?;
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(value)
            .bind(id)
            .bind(locked)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(UpdateOutcome::Updated(Box::new(
                Self::with_items(&mut conn, row).await?,
            ))),
            None => Ok(match Self::current_status(&mut conn, id).await? {
                Some(current) => UpdateOutcome::Conflict(current),
                None => UpdateOutcome::NotFound,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("ORD-2026"), "%ORD-2026%");
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
