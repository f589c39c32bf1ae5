//! Delivery pricing commands.

use lustre_core::store::{CatalogStore, PgStore};
use lustre_core::{DeliveryPolicy, Money};
use tracing::info;

/// Log the current delivery policy.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the settings are corrupt.
pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let store = PgStore::new(super::connect().await?);
    let policy = store.delivery_policy().await?;

    info!("Delivery fee: {}", policy.flat_fee());
    match policy.free_threshold() {
        Some(threshold) => info!("Free delivery from: {threshold}"),
        None => info!("Free delivery: disabled"),
    }
    Ok(())
}

/// Replace the delivery policy.
///
/// # Errors
///
/// Returns an error if either amount is negative or the write fails.
pub async fn set(fee: Money, threshold: Money) -> Result<(), Box<dyn std::error::Error>> {
    let policy = DeliveryPolicy::from_settings(fee.rounded(), threshold.rounded())?;

    let store = PgStore::new(super::connect().await?);
    store.set_delivery_policy(policy).await?;

    info!(
        fee = %policy.flat_fee(),
        threshold = %policy.stored_threshold(),
        "Delivery settings updated"
    );
    Ok(())
}
