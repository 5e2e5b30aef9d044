//! Named middleware.
//!
//! Middleware is the place for cross-cutting concerns: authentication,
//! request logging, header stamping. The host application supplies the
//! bodies and registers each under a name; annotations refer to them by that
//! name (`middlewares = ["Auth" "Logging"]`).
//!
//! A middleware is a transform from one handler to another:
//!
//! ```rust
//! use restop::{BoxedHandler, MiddlewareRegistry, Request, Response};
//! use std::sync::Arc;
//!
//! let registry = MiddlewareRegistry::new();
//! registry
//!     .register("Logging", |next: BoxedHandler| -> BoxedHandler {
//!         Arc::new(move |res: &mut Response, req: &mut Request| {
//!             tracing::info!(path = req.path(), "request");
//!             next(res, req);
//!         })
//!     })
//!     .unwrap();
//! ```
//!
//! # Composition order
//!
//! Chains compose as an onion: the first name listed is the outermost layer.
//! For `["A", "B"]` a request runs A-pre, B-pre, the handler, B-post,
//! A-post.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::RegistryError;
use crate::handler::BoxedHandler;

/// A shared handler transform.
pub type Middleware = Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static>;

/// Name → middleware mapping shared by everything that binds routes.
///
/// Create one at startup and pass it by reference to the binder. Mutations
/// (`register`, `clear`) take the write lock; lookups and composition take the
/// read lock. No operation calls back into the registry while holding a lock,
/// and middleware transforms are only invoked after the read lock is released.
#[derive(Default)]
pub struct MiddlewareRegistry {
    entries: RwLock<HashMap<String, Middleware>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `middleware` under `name`. The first registration wins; a
    /// second one fails until the registry is cleared.
    pub fn register<M>(&self, name: impl Into<String>, middleware: M) -> Result<(), RegistryError>
    where
        M: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        let name = name.into();
        let mut entries = self.entries.write();
        if entries.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        tracing::debug!(middleware = %name, "middleware registered");
        entries.insert(name, Arc::new(middleware));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Middleware, RegistryError> {
        self.entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_owned()))
    }

    /// Resolves every name, in order, under one read lock. Fails on the first
    /// unknown name without returning any of the others.
    pub fn lookup_many<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Middleware>, RegistryError> {
        let entries = self.entries.read();
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                entries
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RegistryError::NotFound(name.to_owned()))
            })
            .collect()
    }

    /// Wraps `handler` in the named chain, first name outermost.
    pub fn compose<S: AsRef<str>>(
        &self,
        handler: BoxedHandler,
        names: &[S],
    ) -> Result<BoxedHandler, RegistryError> {
        let chain = self.lookup_many(names)?;
        Ok(chain.iter().rev().fold(handler, |inner, middleware| middleware(inner)))
    }

    /// Drops every registration.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
