//! Delivery settings.
//!
//! The stored threshold uses zero for "always charge delivery", the same
//! convention the settings table uses.

use axum::{Json, extract::State};
use lustre_core::store::{CatalogStore, Store};
use lustre_core::{DeliveryPolicy, Money};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySettings {
    pub delivery_cost: Money,
    /// Zero disables free delivery.
    pub free_delivery_threshold: Money,
}

impl From<DeliveryPolicy> for DeliverySettings {
    fn from(policy: DeliveryPolicy) -> Self {
        Self {
            delivery_cost: policy.flat_fee(),
            free_delivery_threshold: policy.stored_threshold(),
        }
    }
}

/// Current delivery settings.
#[instrument(skip(state))]
pub async fn show_delivery<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<DeliverySettings>> {
    let policy = state.store().delivery_policy().await?;
    Ok(Json(policy.into()))
}

/// Replace the delivery settings. Applies to quotes and checkouts from the
/// next request on; existing orders keep the fee they were placed with.
#[instrument(skip(state))]
pub async fn update_delivery<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<DeliverySettings>,
) -> Result<Json<DeliverySettings>> {
    let policy = DeliveryPolicy::from_settings(
        body.delivery_cost.rounded(),
        body.free_delivery_threshold.rounded(),
    )?;
    state.store().set_delivery_policy(policy).await?;

    info!(
        delivery_cost = %policy.flat_fee(),
        free_delivery_threshold = %policy.stored_threshold(),
        "Delivery settings updated"
    );
    Ok(Json(policy.into()))
}
