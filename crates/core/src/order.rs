//! Orders and their price-snapshotted line items.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::pricing::PriceTier;
use crate::types::{Email, EmailError, Money, OrderId, OrderItemId, OrderStatus, ProductId};

/// Maximum stored length of a tracking number.
pub const MAX_TRACKING_NUMBER_LENGTH: usize = 100;

// =============================================================================
// Customer details
// =============================================================================

/// Why submitted checkout details were rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomerDetailsError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("invalid email: {0}")]
    Email(#[from] EmailError),
}

/// Raw checkout form data, as submitted by the customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub shipping_address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validated customer and shipping snapshot stored on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub shipping_address: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    /// Free-text notes from the customer.
    pub notes: Option<String>,
}

impl TryFrom<CustomerForm> for CustomerDetails {
    type Error = CustomerDetailsError;

    fn try_from(form: CustomerForm) -> Result<Self, Self::Error> {
        let name = required("name", &form.name, 150)?;
        let email = Email::parse(&form.email)?;
        let shipping_address = required("shipping_address", &form.shipping_address, 1000)?;

        Ok(Self {
            name,
            email,
            phone: optional("phone", form.phone, 30)?,
            shipping_address,
            city: optional("city", form.city, 100)?,
            postal_code: optional("postal_code", form.postal_code, 20)?,
            country: optional("country", form.country, 100)?,
            notes: optional("notes", form.notes, 2000)?,
        })
    }
}

fn required(field: &'static str, value: &str, max: usize) -> Result<String, CustomerDetailsError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CustomerDetailsError::Required { field });
    }
    if value.chars().count() > max {
        return Err(CustomerDetailsError::TooLong { field, max });
    }
    Ok(value.to_owned())
}

fn optional(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, CustomerDetailsError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max => Err(CustomerDetailsError::TooLong { field, max }),
        Some(v) => Ok(Some(v.to_owned())),
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A purchased line, frozen at checkout.
///
/// `unit_price`, `tier` and `line_total` are written once and never
/// recomputed from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    /// Weak reference for display and relinking; `None` once the product is deleted.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub tier: PriceTier,
    pub line_total: Money,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Customer-facing reference, e.g. `ORD-20240115-9F3A61C2`.
    pub order_number: String,
    pub status: OrderStatus,
    pub customer: CustomerDetails,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub tracking_number: Option<String>,
    /// Internal annotation, never shown to the customer.
    pub admin_note: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Units across all items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Item data handed to the store when an order is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub tier: PriceTier,
    pub line_total: Money,
}

/// Everything needed to persist an order atomically with its stock reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: String,
    pub customer: CustomerDetails,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub items: Vec<NewOrderItem>,
}

/// Generate an order number like `ORD-20240115-9F3A61C2`.
#[must_use]
pub fn generate_order_number(date: NaiveDate) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("ORD-{}-{suffix}", date.format("%Y%m%d"))
}

/// Normalize an admin-supplied tracking number or note: blank clears it.
#[must_use]
pub fn normalize_annotation(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> CustomerForm {
        CustomerForm {
            name: " Ada Lovelace ".to_string(),
            email: "ada@example.com".to_string(),
            phone: Some(String::new()),
            shipping_address: "12 Analytical Row".to_string(),
            city: Some("London".to_string()),
            postal_code: None,
            country: Some("  ".to_string()),
            notes: None,
        }
    }

    #[test]
    fn test_customer_details_trim_and_blank_optionals() {
        let details = CustomerDetails::try_from(form()).unwrap();
        assert_eq!(details.name, "Ada Lovelace");
        assert_eq!(details.phone, None);
        assert_eq!(details.city.as_deref(), Some("London"));
        assert_eq!(details.country, None);
    }

    #[test]
    fn test_customer_details_required_fields() {
        let mut f = form();
        f.name = "   ".to_string();
        assert_eq!(
            CustomerDetails::try_from(f),
            Err(CustomerDetailsError::Required { field: "name" })
        );

        let mut f = form();
        f.shipping_address = String::new();
        assert_eq!(
            CustomerDetails::try_from(f),
            Err(CustomerDetailsError::Required {
                field: "shipping_address"
            })
        );
    }

    #[test]
    fn test_customer_details_length_limits() {
        let mut f = form();
        f.phone = Some("1".repeat(31));
        assert_eq!(
            CustomerDetails::try_from(f),
            Err(CustomerDetailsError::TooLong {
                field: "phone",
                max: 30
            })
        );
    }

    #[test]
    fn test_customer_details_bad_email() {
        let mut f = form();
        f.email = "ada-at-example".to_string();
        assert!(matches!(
            CustomerDetails::try_from(f),
            Err(CustomerDetailsError::Email(_))
        ));
    }

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let number = generate_order_number(date);
        assert!(number.starts_with("ORD-20240115-"));
        assert_eq!(number.len(), "ORD-20240115-".len() + 8);
        assert!(
            number
                .rsplit('-')
                .next()
                .unwrap()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())
        );
    }

    #[test]
    fn test_order_numbers_differ() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_ne!(generate_order_number(date), generate_order_number(date));
    }

    #[test]
    fn test_normalize_annotation() {
        assert_eq!(normalize_annotation(Some("  1Z999 ")), Some("1Z999".to_string()));
        assert_eq!(normalize_annotation(Some("   ")), None);
        assert_eq!(normalize_annotation(None), None);
    }
}
