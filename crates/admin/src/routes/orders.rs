//! Order management route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use lustre_core::store::{OrderFilter, Store};
use lustre_core::{Money, Order, OrderId, OrderStatus};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Hard ceiling on a single listing, whatever the request asks for.
pub const MAX_ORDER_PAGE_SIZE: u32 = 500;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Status name; empty means all statuses.
    pub status: Option<String>,
    /// Search on order number, customer name and email.
    pub q: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

impl ListQuery {
    fn into_filter(self, default_limit: u32) -> Result<OrderFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<OrderStatus>().map_err(AppError::BadRequest)?),
        };
        let query = self
            .q
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        let limit = self
            .limit
            .unwrap_or(default_limit)
            .clamp(1, MAX_ORDER_PAGE_SIZE);
        let page = self.page.unwrap_or(1).max(1);
        Ok(OrderFilter {
            status,
            query,
            limit: Some(limit),
            offset: (page - 1).saturating_mul(limit),
        })
    }
}

/// Row in the order listing.
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub item_count: u32,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            status: order.status,
            customer_name: order.customer.name.clone(),
            customer_email: order.customer.email.as_str().to_string(),
            item_count: order.item_count(),
            total: order.total,
            created_at: order.created_at,
        }
    }
}

/// Full order, with the statuses it may move to next.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub item_count: u32,
    pub next_statuses: Vec<OrderStatus>,
    pub accepts_annotations: bool,
}

impl From<Order> for OrderDetail {
    fn from(order: Order) -> Self {
        Self {
            item_count: order.item_count(),
            next_statuses: order.status.next_statuses(),
            accepts_annotations: order.status.accepts_annotations(),
            order,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct TrackingUpdate {
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteUpdate {
    #[serde(default)]
    pub note: Option<String>,
}

/// List orders, newest first.
#[instrument(skip(state))]
pub async fn index<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OrderSummary>>> {
    let filter = query.into_filter(state.order_page_size())?;
    let orders = state.orders().list(filter).await?;
    Ok(Json(orders.iter().map(OrderSummary::from).collect()))
}

/// Order detail.
#[instrument(skip(state))]
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let order = state.orders().get(id).await?;
    Ok(Json(order.into()))
}

/// Move an order to a new status. Cancelling restocks its items.
#[instrument(skip(state))]
pub async fn update_status<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<OrderDetail>> {
    let order = state.orders().transition(id, body.status).await?;
    Ok(Json(order.into()))
}

/// Delete a delivered or cancelled order.
#[instrument(skip(state))]
pub async fn destroy<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    state.orders().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set or clear the tracking number.
#[instrument(skip(state))]
pub async fn update_tracking<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<OrderId>,
    Json(body): Json<TrackingUpdate>,
) -> Result<Json<OrderDetail>> {
    let order = state
        .orders()
        .update_tracking(id, body.tracking_number.as_deref())
        .await?;
    Ok(Json(order.into()))
}

/// Set or clear the internal note.
#[instrument(skip(state, body))]
pub async fn update_note<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<OrderId>,
    Json(body): Json<NoteUpdate>,
) -> Result<Json<OrderDetail>> {
    let order = state.orders().update_note(id, body.note.as_deref()).await?;
    Ok(Json(order.into()))
}
