//! Middleware pipeline.
//!
//! Middleware observe every dispatched action together with the state before
//! and after the reducer ran. They may perform external side effects and
//! dispatch follow-up actions, but never receive a mutable state reference.
//! The store spawns each interceptor on its own task, so a slow interceptor
//! cannot block the next action or a sibling interceptor; every interceptor
//! registered for an action fires for it.
//!
//! Delivery from the transport boundary upward is at-least-once, so
//! interceptors must tolerate observing the same action twice.

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::AppAction;
use crate::error::Result;
use crate::state::AppState;
use crate::store::Dispatcher;

/// Re-dispatch handle handed to middleware.
///
/// Follow-up actions are queued behind the action currently being applied;
/// they are never applied re-entrantly.
#[derive(Clone)]
pub struct MiddlewareContext {
    dispatcher: Dispatcher,
}

impl MiddlewareContext {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Dispatch a follow-up action.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DispatchClosed`](crate::Error::DispatchClosed) if the
    /// store has shut down.
    pub fn dispatch(&self, action: AppAction) -> Result<()> {
        self.dispatcher.dispatch(action)
    }
}

/// An interceptor observing dispatched actions.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Observe one applied action.
    ///
    /// `before` and `after` are immutable snapshots around the reducer run.
    async fn handle(
        &self,
        ctx: MiddlewareContext,
        action: AppAction,
        before: Arc<AppState>,
        after: Arc<AppState>,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::store::Store;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counting {
        seen: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Middleware for Counting {
        async fn handle(
            &self,
            _ctx: MiddlewareContext,
            _action: AppAction,
            _before: Arc<AppState>,
            _after: Arc<AppState>,
        ) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FollowUp;

    #[async_trait]
    impl Middleware for FollowUp {
        async fn handle(
            &self,
            ctx: MiddlewareContext,
            action: AppAction,
            _before: Arc<AppState>,
            _after: Arc<AppState>,
        ) {
            // React to the startup marker with a view selection.
            if matches!(action, AppAction::Startup) {
                let _ = ctx.dispatch(AppAction::SelectView { tag: 7 });
            }
        }
    }

    #[tokio::test]
    async fn test_every_middleware_observes_every_action() {
        let seen_a = Arc::new(AtomicU32::new(0));
        let seen_b = Arc::new(AtomicU32::new(0));

        let store = Store::builder(CoreConfig::default())
            .with_middleware(Arc::new(Counting { seen: seen_a.clone() }))
            .with_middleware(Arc::new(Counting { seen: seen_b.clone() }))
            .spawn();

        let dispatcher = store.dispatcher();
        dispatcher.dispatch(AppAction::AddMissedReading).unwrap();
        dispatcher.dispatch(AppAction::AddMissedReading).unwrap();
        store.drain().await;

        assert_eq!(seen_a.load(Ordering::SeqCst), 2);
        assert_eq!(seen_b.load(Ordering::SeqCst), 2);

        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_middleware_can_dispatch_follow_ups() {
        let store = Store::builder(CoreConfig::default())
            .with_middleware(Arc::new(FollowUp))
            .spawn();

        let dispatcher = store.dispatcher();
        dispatcher.dispatch(AppAction::Startup).unwrap();
        store.drain().await;
        store.drain().await;

        assert_eq!(store.current().await.selected_view, 7);
        store.shutdown().await;
    }
}
