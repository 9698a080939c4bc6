//! The store: serialized action dispatch over the canonical state.
//!
//! Exactly one writer exists: the dispatch loop task. It consumes actions
//! from a queue one at a time, applies the reducer, publishes the resulting
//! snapshot, runs the reducer's declared effects, and fans each applied
//! action out to the middleware pipeline on detached tasks. Readers (UI,
//! middleware, the connector pump) only ever see fully-applied
//! `Arc<AppState>` snapshots.
//!
//! There is no mid-action cancellation: an action, once queued, runs to
//! completion against the state. Shutdown stops consuming the queue.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::{AppAction, Effect};
use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::middleware::{Middleware, MiddlewareContext};
use crate::notify::NotificationPort;
use crate::reducer;
use crate::state::AppState;

enum Command {
    Action(AppAction),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle for dispatching actions and reading snapshots.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Command>,
    current: Arc<RwLock<Arc<AppState>>>,
}

impl Dispatcher {
    /// Queue an action for application.
    ///
    /// Never blocks; actions are applied strictly in dispatch order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DispatchClosed`] if the store has shut down.
    pub fn dispatch(&self, action: AppAction) -> Result<()> {
        self.tx
            .send(Command::Action(action))
            .map_err(|_| Error::DispatchClosed)
    }

    /// The latest fully-applied state snapshot.
    pub async fn current(&self) -> Arc<AppState> {
        Arc::clone(&*self.current.read().await)
    }
}

/// Builder for a [`Store`].
#[must_use]
pub struct StoreBuilder {
    config: CoreConfig,
    middleware: Vec<Arc<dyn Middleware>>,
    notifications: Option<Arc<dyn NotificationPort>>,
}

impl StoreBuilder {
    /// Register a middleware. Registration order is preserved for
    /// observation; execution is concurrent.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Inject the notification collaborator used by the effect runner.
    pub fn with_notifications(mut self, port: Arc<dyn NotificationPort>) -> Self {
        self.notifications = Some(port);
        self
    }

    /// Start the dispatch loop and return the running store.
    pub fn spawn(self) -> Store {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(AppState::new(&self.config));
        let current = Arc::new(RwLock::new(Arc::clone(&state)));
        let (snapshots, _) = broadcast::channel(self.config.event_capacity);
        let cancel = CancellationToken::new();

        let dispatcher = Dispatcher {
            tx,
            current: Arc::clone(&current),
        };

        let loop_task = DispatchLoop {
            state: (*state).clone(),
            current,
            snapshots: snapshots.clone(),
            middleware: self.middleware,
            notifications: self.notifications,
            dispatcher: dispatcher.clone(),
            cancel: cancel.clone(),
        };

        let handle = tokio::spawn(loop_task.run(rx));

        Store {
            dispatcher,
            snapshots,
            cancel,
            handle,
        }
    }
}

/// Running store. Owns the dispatch loop task.
pub struct Store {
    dispatcher: Dispatcher,
    snapshots: broadcast::Sender<Arc<AppState>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Store {
    /// Create a builder for a store with the given configuration.
    pub fn builder(config: CoreConfig) -> StoreBuilder {
        StoreBuilder {
            config,
            middleware: Vec::new(),
            notifications: None,
        }
    }

    /// Get a cloneable dispatch handle.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// The latest fully-applied state snapshot.
    pub async fn current(&self) -> Arc<AppState> {
        self.dispatcher.current().await
    }

    /// Subscribe to state snapshots, one per applied action.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AppState>> {
        self.snapshots.subscribe()
    }

    /// Wait until every action queued so far has been applied and every
    /// middleware task spawned for those actions has finished.
    ///
    /// Follow-up actions dispatched by middleware during the drain land
    /// behind it; call `drain` again to flush those too.
    pub async fn drain(&self) {
        let (tx, rx) = oneshot::channel();
        if self.dispatcher.tx.send(Command::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Stop the dispatch loop. Queued but unapplied actions are dropped.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!("dispatch loop task failed: {e}");
        }
    }
}

struct DispatchLoop {
    state: AppState,
    current: Arc<RwLock<Arc<AppState>>>,
    snapshots: broadcast::Sender<Arc<AppState>>,
    middleware: Vec<Arc<dyn Middleware>>,
    notifications: Option<Arc<dyn NotificationPort>>,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

impl DispatchLoop {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("store cancelled, shutting down dispatch loop");
                    break;
                }
                command = rx.recv() => {
                    match command {
                        Some(Command::Action(action)) => self.apply(action, &mut tasks).await,
                        Some(Command::Flush(ack)) => {
                            // Settle every task spawned for already-applied actions.
                            while tasks.join_next().await.is_some() {}
                            let _ = ack.send(());
                        }
                        None => {
                            debug!("all dispatchers dropped, dispatch loop finished");
                            break;
                        }
                    }
                }
            }
        }

        tasks.abort_all();
    }

    async fn apply(&mut self, action: AppAction, tasks: &mut JoinSet<()>) {
        let before = Arc::new(self.state.clone());
        let effects = reducer::apply(&mut self.state, &action, OffsetDateTime::now_utc());
        let after = Arc::new(self.state.clone());

        // Publish the snapshot before middleware run, so any reader woken by
        // a middleware side effect already sees the applied state.
        *self.current.write().await = Arc::clone(&after);
        let _ = self.snapshots.send(Arc::clone(&after));

        self.run_effects(&effects, tasks);

        for middleware in &self.middleware {
            let middleware = Arc::clone(middleware);
            let ctx = MiddlewareContext::new(self.dispatcher.clone());
            let action = action.clone();
            let before = Arc::clone(&before);
            let after = Arc::clone(&after);

            tasks.spawn(async move {
                middleware.handle(ctx, action, before, after).await;
            });
        }
    }

    fn run_effects(&self, effects: &[Effect], tasks: &mut JoinSet<()>) {
        for effect in effects {
            match effect {
                Effect::StopAlarmSound => {
                    if let Some(port) = &self.notifications {
                        let port = Arc::clone(port);
                        tasks.spawn(async move {
                            port.stop_sound().await;
                        });
                    }
                }
            }
        }
    }
}
