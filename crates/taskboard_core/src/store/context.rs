//! Ambient store access for code that cannot thread a `Store` parameter.
//!
//! # Invariants
//! - At most one current store per thread.
//! - `StoreProvider` guards nest; dropping one restores the store that was
//!   current before it was created. Drop them in reverse creation order.
//! - Reading the current store without a provider fails fast with
//!   `StoreError::MissingContext`.

use crate::store::error::{StoreError, StoreResult};
use crate::store::Store;
use log::{debug, warn};
use std::cell::RefCell;

thread_local! {
    static CURRENT_STORE: RefCell<Option<Store>> = const { RefCell::new(None) };
}

/// Scope guard returned by `provide`.
#[must_use = "the store is only provided while the guard is alive"]
pub struct StoreProvider {
    previous: Option<Store>,
}

impl Drop for StoreProvider {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_STORE.with(|current| *current.borrow_mut() = previous);
        debug!("event=store_context module=store status=ok action=teardown");
    }
}

/// Makes `store` the current store of this thread until the guard drops.
pub fn provide(store: Store) -> StoreProvider {
    debug!(
        "event=store_context module=store status=ok action=provide name={}",
        store.name()
    );
    let previous = CURRENT_STORE.with(|current| current.borrow_mut().replace(store));
    StoreProvider { previous }
}

/// Returns the current store of this thread.
///
/// # Errors
/// - `MissingContext` when no provider is alive.
pub fn current_store() -> StoreResult<Store> {
    CURRENT_STORE
        .with(|current| current.borrow().clone())
        .ok_or_else(|| {
            warn!("event=store_context module=store status=error reason=missing_provider");
            StoreError::MissingContext
        })
}

pub fn has_current_store() -> bool {
    CURRENT_STORE.with(|current| current.borrow().is_some())
}
