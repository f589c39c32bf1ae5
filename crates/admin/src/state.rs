//! Application state shared across handlers.

use std::sync::Arc;

use lustre_core::OrderLifecycleManager;
use lustre_core::store::Store;

/// Application state shared across all handlers.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    store: S,
    order_page_size: u32,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> AppState<S> {
    #[must_use]
    pub fn new(store: S, order_page_size: u32) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                order_page_size,
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    #[must_use]
    pub fn orders(&self) -> OrderLifecycleManager<'_, S> {
        OrderLifecycleManager::new(&self.inner.store)
    }

    #[must_use]
    pub fn order_page_size(&self) -> u32 {
        self.inner.order_page_size
    }
}
