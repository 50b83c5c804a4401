//! Handler registry (spec §4.5): a mutable, concurrency-safe mapping from
//! operation name to handler.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::Payload;
use crate::errors::AppResult;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn execute(&self, payload: &Payload) -> AppResult<()>;
}

pub type DynHandler = Arc<dyn Handler>;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, DynHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-registering an operation replaces the prior handler.
    pub async fn register(&self, operation: impl Into<String>, handler: DynHandler) {
        self.handlers.write().await.insert(operation.into(), handler);
    }

    /// Returns `None` rather than an error when no handler is registered, so
    /// the worker can distinguish "no handler" from a genuine failure.
    pub async fn get(&self, operation: &str) -> Option<DynHandler> {
        self.handlers.read().await.get(operation).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::operation;

    struct NoopHandler;

    #[async_trait]
    impl Handler for NoopHandler {
        async fn execute(&self, _payload: &Payload) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn lookup_misses_return_none_not_an_error() {
        let registry = HandlerRegistry::new();
        assert!(registry.get(operation::CLONE_REPOSITORY).await.is_none());
    }

    #[tokio::test]
    async fn re_registering_replaces_the_prior_handler() {
        let registry = HandlerRegistry::new();
        registry.register(operation::CLONE_REPOSITORY, Arc::new(NoopHandler)).await;
        registry.register(operation::CLONE_REPOSITORY, Arc::new(NoopHandler)).await;
        assert!(registry.get(operation::CLONE_REPOSITORY).await.is_some());
    }
}
