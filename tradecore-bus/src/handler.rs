use crate::error::HandlerError;
use crate::event::Event;
use futures::future::BoxFuture;
use std::{future::Future, sync::Arc};

/// Opaque handle returned by `subscribe`/`subscribe_blocking`, used to
/// target a specific subscriber with `unsubscribe`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Boxed async handler function, the shape every `subscribe` closure is
/// coerced into.
pub type HandlerFn = Arc<dyn Fn(Event) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Boxed synchronous handler function, run via `spawn_blocking`.
pub type BlockingHandlerFn = Arc<dyn Fn(Event) -> Result<(), HandlerError> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Subscriber {
    Async { id: Option<SubscriptionId>, handler: HandlerFn },
    Blocking { id: Option<SubscriptionId>, handler: BlockingHandlerFn },
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subscriber::Async { id, .. } => f.debug_struct("Subscriber::Async").field("id", id).finish(),
            Subscriber::Blocking { id, .. } => f.debug_struct("Subscriber::Blocking").field("id", id).finish(),
        }
    }
}

impl Subscriber {
    pub(crate) fn new_async<F, Fut>(handler: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Subscriber::Async {
            id: None,
            handler: Arc::new(move |event| Box::pin(handler(event))),
        }
    }

    pub(crate) fn new_blocking<F>(handler: F) -> Self
    where
        F: Fn(Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Subscriber::Blocking {
            id: None,
            handler: Arc::new(handler),
        }
    }

    pub(crate) fn with_id(self, id: SubscriptionId) -> Self {
        match self {
            Subscriber::Async { handler, .. } => Subscriber::Async { id: Some(id), handler },
            Subscriber::Blocking { handler, .. } => Subscriber::Blocking { id: Some(id), handler },
        }
    }

    pub(crate) fn id(&self) -> Option<SubscriptionId> {
        match self {
            Subscriber::Async { id, .. } | Subscriber::Blocking { id, .. } => *id,
        }
    }

    /// Invoke the handler, running blocking handlers on a worker thread so
    /// the bus's own task is never blocked (spec.md §4.1).
    pub(crate) async fn invoke(&self, event: Event) -> Result<(), HandlerError> {
        match self {
            Subscriber::Async { handler, .. } => handler(event).await,
            Subscriber::Blocking { handler, .. } => {
                let handler = handler.clone();
                tokio::task::spawn_blocking(move || handler(event))
                    .await
                    .unwrap_or_else(|join_err| Err(HandlerError::new(format!("handler task panicked: {join_err}"))))
            }
        }
    }
}
