//! Route table.
//!
//! The binder does not care what the table looks like; it only needs
//! something that accepts `(method, path, handler, name)`. That is the
//! [`RouteRegistrar`] capability. [`Router`] is the implementation this crate
//! ships: one radix tree per HTTP method, O(path-length) lookup.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::error::RouteError;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// What a registration produced: enough to find or describe the route later.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteHandle {
    pub name: String,
    pub method: Method,
    pub path: String,
}

/// Anything routes can be registered into.
pub trait RouteRegistrar {
    /// Registers `handler` for `method` + `path`, tagged with `name`.
    /// The path template is passed through untouched.
    fn register(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler,
        name: &str,
    ) -> Result<RouteHandle, RouteError>;
}

/// The application router.
///
/// Build it once at startup, fill it through [`bind`](crate::bind) or
/// [`Router::on`], pass it to [`Server::serve`](crate::Server::serve).
pub struct Router {
    trees: HashMap<Method, MatchitRouter<BoxedHandler>>,
    handles: Vec<RouteHandle>,
}

impl Router {
    pub fn new() -> Self {
        Self { trees: HashMap::new(), handles: Vec::new() }
    }

    /// Registers a hand-written handler. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves
    /// them:
    ///
    /// ```rust
    /// # use restop::{Method, Request, Response, Router};
    /// let router = Router::new()
    ///     .on(Method::Get, "/healthz", |res: &mut Response, _req: &mut Request| res.text("ok"))
    ///     .unwrap();
    /// assert_eq!(router.routes().len(), 1);
    /// ```
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Result<Self, RouteError> {
        let name = format!("{method} {path}");
        self.register(method, path, handler.into_boxed_handler(), &name)?;
        Ok(self)
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.trees.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Every registered route, in registration order.
    pub fn routes(&self) -> &[RouteHandle] {
        &self.handles
    }

    /// Finds a route by the name it was registered under.
    pub fn route(&self, name: &str) -> Option<&RouteHandle> {
        self.handles.iter().find(|h| h.name == name)
    }

    /// True when some route matches `path` under any method.
    pub(crate) fn matches_any(&self, path: &str) -> bool {
        self.trees.values().any(|tree| tree.at(path).is_ok())
    }
}

impl RouteRegistrar for Router {
    fn register(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler,
        name: &str,
    ) -> Result<RouteHandle, RouteError> {
        self.trees
            .entry(method)
            .or_default()
            .insert(path, handler)
            .map_err(|source| RouteError::Insert { method, path: path.to_owned(), source })?;
        let handle = RouteHandle { name: name.to_owned(), method, path: path.to_owned() };
        self.handles.push(handle.clone());
        Ok(handle)
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::response::Response;

    fn ok(res: &mut Response, req: &mut Request) {
        res.text(req.param("uid").unwrap_or("none").to_owned());
    }

    #[test]
    fn lookup_extracts_path_params() {
        let router = Router::new().on(Method::Get, "/person/{uid}", ok).unwrap();
        let (handler, params) = router.lookup(Method::Get, "/person/42").unwrap();
        assert_eq!(params.get("uid").map(String::as_str), Some("42"));

        let mut req = Request::new("GET", "/person/42").with_param("uid", "42");
        let mut res = Response::new();
        handler(&mut res, &mut req);
        assert_eq!(res.body(), b"42");
    }

    #[test]
    fn methods_have_separate_trees() {
        let router = Router::new().on(Method::Post, "/person", ok).unwrap();
        assert!(router.lookup(Method::Get, "/person").is_none());
        assert!(router.lookup(Method::Post, "/person").is_some());
        assert!(router.matches_any("/person"));
    }

    #[test]
    fn conflicting_path_is_an_error() {
        let router = Router::new().on(Method::Get, "/person/{uid}", ok).unwrap();
        let err = router.on(Method::Get, "/person/{uid}", ok).err().unwrap();
        assert!(matches!(err, RouteError::Insert { method: Method::Get, .. }));
    }

    #[test]
    fn handles_are_kept_in_order_and_findable() {
        let mut router = Router::new();
        router.register(Method::Get, "/a", Arc::new(ok), "pkg.T.a").unwrap();
        router.register(Method::Put, "/b", Arc::new(ok), "pkg.T.b").unwrap();
        let names: Vec<_> = router.routes().iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["pkg.T.a", "pkg.T.b"]);
        assert_eq!(router.route("pkg.T.b").map(|h| h.method), Some(Method::Put));
    }
}
