//! Lustre Core - the storefront order pipeline.
//!
//! This crate turns a customer's cart into a durable order and manages the
//! order afterwards. It is shared by every Lustre component:
//! - `storefront` - Public cart and checkout API
//! - `admin` - Internal order and settings API
//! - `cli` - Migrations and catalog seeding
//!
//! # Architecture
//!
//! Pricing, cart, delivery and inventory rules are pure functions over plain
//! values. Persistence goes through the [`store::CatalogStore`] and
//! [`store::OrderStore`] traits; [`store::MemoryStore`] is always available,
//! `store::PgStore` is added by the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and order status
//! - [`catalog`] - Products and their price tiers
//! - [`pricing`] - Effective price resolution
//! - [`cart`] - Session cart contents
//! - [`delivery`] - Delivery fee policy
//! - [`inventory`] - All-or-nothing stock reservation
//! - [`order`] - Orders, items, and customer details
//! - [`checkout`] - Cart to order
//! - [`lifecycle`] - Status transitions and annotations
//! - [`store`] - Persistence traits and implementations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod delivery;
pub mod inventory;
pub mod lifecycle;
pub mod order;
pub mod pricing;
pub mod store;
pub mod types;

pub use cart::{Cart, CartLine};
pub use catalog::{Product, ProductPricing};
pub use checkout::{CheckoutError, CheckoutOrchestrator, PricedLine, Quote};
pub use delivery::{DeliveryPolicy, DeliveryPolicyError};
pub use lifecycle::{LifecycleError, OrderLifecycleManager};
pub use order::{CustomerDetails, CustomerDetailsError, CustomerForm, Order, OrderItem};
pub use pricing::{PriceTier, PricingError, ResolvedPrice};
pub use types::*;
