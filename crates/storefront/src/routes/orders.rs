//! Order confirmation.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use lustre_core::order::OrderItem;
use lustre_core::store::{OrderStore, Store};
use lustre_core::{Money, Order, OrderStatus, PriceTier};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Customer-facing order. Internal notes are never included.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order_number: String,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub items: Vec<OrderItemView>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub product_name: String,
    pub product_sku: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub tier: PriceTier,
    pub line_total: Money,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_name: item.product_name.clone(),
            product_sku: item.product_sku.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            tier: item.tier,
            line_total: item.line_total,
        }
    }
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        let customer = &order.customer;
        Self {
            order_number: order.order_number.clone(),
            status: order.status,
            customer_name: customer.name.clone(),
            customer_email: customer.email.as_str().to_string(),
            shipping_address: customer.shipping_address.clone(),
            city: customer.city.clone(),
            postal_code: customer.postal_code.clone(),
            country: customer.country.clone(),
            items: order.items.iter().map(OrderItemView::from).collect(),
            subtotal: order.subtotal,
            delivery_fee: order.delivery_fee,
            total: order.total,
            tracking_number: order.tracking_number.clone(),
            created_at: order.created_at,
        }
    }
}

/// Show an order by its order number.
#[instrument(skip(state))]
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderView>> {
    let order = state
        .store()
        .get_order_by_number(&order_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_number}")))?;
    Ok(Json(OrderView::from(&order)))
}
