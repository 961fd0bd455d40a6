//! In-flight operation sharing.
//!
//! An explicit registry slot holding one shared future per operation kind.
//! Late callers attach to the in-flight future and observe the identical
//! result; the slot clears only after settlement, so a subsequent call
//! re-runs the operation from scratch.

use std::future::Future;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;

pub(crate) struct SingleFlight<T: Clone> {
    slot: Mutex<Option<Shared<BoxFuture<'static, T>>>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    /// Join the in-flight operation, or start one via `operation`.
    pub async fn run<F, Fut>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut slot = self.slot.lock().await;
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let created = operation().boxed().shared();
                    *slot = Some(created.clone());
                    created
                }
            }
        };

        let value = shared.clone().await;

        // Every finisher clears the slot, but only for its own generation;
        // an operation started after this one settled stays registered.
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&shared)) {
            *slot = None;
        }

        value
    }
}
