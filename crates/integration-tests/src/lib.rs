//! Shared fixtures for the Lustre integration tests.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory pipeline tests
//! cargo test -p lustre-integration-tests
//!
//! # PostgreSQL-backed tests (migrations are applied automatically)
//! TEST_DATABASE_URL=postgres://localhost/lustre_test \
//!     cargo test -p lustre-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use chrono::Utc;
use lustre_core::order::{NewOrder, NewOrderItem, generate_order_number};
use lustre_core::store::PgStore;
use lustre_core::{
    Cart, CustomerDetails, CustomerForm, Money, PriceTier, Product, ProductId, ProductPricing,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Price in whole currency units.
#[must_use]
pub fn money(amount: i64) -> Money {
    Money::new(Decimal::from(amount))
}

/// An active, non-deal product with the given tiers.
#[must_use]
pub fn product(
    id: i32,
    original: Option<Money>,
    discounted: Option<Money>,
    stock: i32,
) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Piece {id}"),
        slug: format!("piece-{id}"),
        sku: Some(format!("PC-{id:04}")),
        category_id: None,
        pricing: ProductPricing {
            original,
            discounted,
            deal: None,
        },
        stock,
        is_active: true,
        is_deal: false,
        is_featured: false,
    }
}

#[must_use]
pub fn customer() -> CustomerDetails {
    CustomerDetails::try_from(CustomerForm {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        shipping_address: "12 Analytical Row".to_string(),
        city: Some("London".to_string()),
        ..CustomerForm::default()
    })
    .unwrap()
}

#[must_use]
pub fn cart_of(lines: &[(ProductId, u32)]) -> Cart {
    let mut cart = Cart::new(100);
    for &(id, quantity) in lines {
        cart.add(id, quantity);
    }
    cart
}

/// A priced order for one product, as checkout hands it to the store.
///
/// Lets tests reach the store's reservation without going through pricing,
/// as if the catalog changed between pricing and commit.
#[must_use]
pub fn new_order_for(product_id: ProductId, quantity: u32, unit_price: Money) -> NewOrder {
    let line_total = unit_price * quantity;
    NewOrder {
        order_number: generate_order_number(Utc::now().date_naive()),
        customer: customer(),
        subtotal: line_total,
        delivery_fee: Money::ZERO,
        total: line_total,
        items: vec![NewOrderItem {
            product_id,
            product_name: format!("Piece {product_id}"),
            product_sku: None,
            quantity,
            unit_price,
            tier: PriceTier::Original,
            line_total,
        }],
    }
}

/// Flip a product's `is_active` flag, as an admin edit would.
pub async fn set_active(pool: &PgPool, id: ProductId, active: bool) {
    sqlx::query("UPDATE products SET is_active = $1 WHERE id = $2")
        .bind(active)
        .bind(id.as_i32())
        .execute(pool)
        .await
        .unwrap();
}

/// Connect to `TEST_DATABASE_URL` and bring the schema up to date.
pub async fn pg_store() -> PgStore {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .unwrap();
    PgStore::new(pool)
}

/// Insert a product with a unique slug and return its id.
pub async fn insert_product(
    pool: &PgPool,
    original: Option<Money>,
    discounted: Option<Money>,
    stock: i32,
) -> ProductId {
    let slug = format!("test-{}", uuid::Uuid::new_v4());
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO products (name, slug, original_price, discounted_price, stock) \
         VALUES ($1, $1, $2, $3, $4) RETURNING id",
    )
    .bind(&slug)
    .bind(original)
    .bind(discounted)
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap();
    ProductId::new(id)
}

pub async fn stock_of(pool: &PgPool, id: ProductId) -> i32 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(id.as_i32())
        .fetch_one(pool)
        .await
        .unwrap()
}
