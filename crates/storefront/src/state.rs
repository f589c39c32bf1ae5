//! Application state shared across handlers.

use std::sync::Arc;

use lustre_core::store::Store;
use lustre_core::CheckoutOrchestrator;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Generic over the store so the router runs
/// against `PgStore` in production and `MemoryStore` in tests.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    store: S,
    cart_max_qty_per_line: u32,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> AppState<S> {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: S, cart_max_qty_per_line: u32) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                cart_max_qty_per_line,
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    #[must_use]
    pub fn checkout(&self) -> CheckoutOrchestrator<'_, S> {
        CheckoutOrchestrator::new(&self.inner.store)
    }

    #[must_use]
    pub fn cart_max_qty_per_line(&self) -> u32 {
        self.inner.cart_max_qty_per_line
    }
}
