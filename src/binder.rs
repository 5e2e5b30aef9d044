//! Binding scanned routes to a live handler.
//!
//! For every [`RouteBinding`], in scan order:
//!
//! 1. a binding declared on another type is skipped, so one source unit can
//!    describe routes for several handler types;
//! 2. the method name is resolved in the handler's [`Capabilities`];
//! 3. the method must have the exchange signature;
//! 4. it is wrapped in a closure holding the instance;
//! 5. the annotation's middleware chain is composed around it;
//! 6. the result is registered under `(method, path)` with the name
//!    `package.Type.method`.
//!
//! The first failure stops the bind. Routes registered before it stay in the
//! router: there is no rollback, and callers are expected to treat any
//! error as fatal to startup.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{BindError, Error};
use crate::handler::{is_structured, BoxedHandler, Capabilities, Capability, ExchangeFn, Routable};
use crate::middleware::MiddlewareRegistry;
use crate::request::Request;
use crate::response::Response;
use crate::router::{RouteHandle, RouteRegistrar};
use crate::scanner::{self, RouteBinding};

/// Registers every binding that belongs to `H` into `router`.
///
/// Returns the handles of the routes registered, in order.
pub fn bind<H, R>(
    router: &mut R,
    handler: Arc<H>,
    bindings: &[RouteBinding],
    middlewares: &MiddlewareRegistry,
) -> Result<Vec<RouteHandle>, BindError>
where
    H: Routable,
    R: RouteRegistrar + ?Sized,
{
    let full_name = std::any::type_name::<H>();
    if !is_structured(full_name) {
        return Err(BindError::NotAReferenceToStruct { type_name: full_name });
    }

    let type_name = H::type_name();
    let capabilities = H::capabilities();
    let mut handles = Vec::new();

    for binding in bindings {
        if !binding.handler_type.is_empty() && binding.handler_type != type_name {
            debug!(
                route = %binding.route_name(),
                handler = type_name,
                "route declared for another handler type, skipped"
            );
            continue;
        }
        handles.push(bind_one(router, &handler, type_name, &capabilities, binding, middlewares)?);
    }

    Ok(handles)
}

fn bind_one<H, R>(
    router: &mut R,
    handler: &Arc<H>,
    type_name: &str,
    capabilities: &Capabilities<H>,
    binding: &RouteBinding,
    middlewares: &MiddlewareRegistry,
) -> Result<RouteHandle, BindError>
where
    H: Routable,
    R: RouteRegistrar + ?Sized,
{
    let method = match capabilities.get(&binding.handler_method) {
        Some(Capability::Exchange(f)) => f,
        Some(Capability::Other { signature }) => {
            return Err(BindError::SignatureMismatch {
                method: binding.handler_method.clone(),
                handler_type: type_name.to_owned(),
                signature,
            });
        }
        None => {
            return Err(BindError::MethodNotFound {
                method: binding.handler_method.clone(),
                handler_type: type_name.to_owned(),
            });
        }
    };

    let route = binding.route_name();
    let descriptor = &binding.descriptor;

    let wrapped = middlewares
        .compose(adapt(handler, method), descriptor.middlewares())
        .map_err(|source| BindError::MiddlewareNotFound { route: route.clone(), source })?;

    let handle = router
        .register(descriptor.method(), descriptor.path(), wrapped, &route)
        .map_err(|source| BindError::Registration { route: route.clone(), source })?;

    info!(
        route = %route,
        method = %descriptor.method(),
        path = descriptor.path(),
        middlewares = ?descriptor.middlewares(),
        timeout_secs = descriptor.timeout_secs(),
        disable_auth = descriptor.disable_auth(),
        "registered route"
    );
    Ok(handle)
}

/// Forwards both exchange arguments, unchanged, to `method` on `instance`.
fn adapt<H: Routable>(instance: &Arc<H>, method: ExchangeFn<H>) -> BoxedHandler {
    let instance = Arc::clone(instance);
    Arc::new(move |res: &mut Response, req: &mut Request| method(&instance, res, req))
}

/// Scans `source` and binds the result to `handler` in one step.
pub fn register_routes<H, R>(
    router: &mut R,
    handler: Arc<H>,
    source: impl AsRef<Path>,
    middlewares: &MiddlewareRegistry,
) -> Result<Vec<RouteHandle>, Error>
where
    H: Routable,
    R: RouteRegistrar + ?Sized,
{
    let bindings = scanner::scan(source)?;
    Ok(bind(router, handler, &bindings, middlewares)?)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::method::Method;
    use crate::router::Router;
    use crate::scanner::scan_source;

    #[derive(Default)]
    struct Handler {
        calls: Mutex<Vec<String>>,
    }

    impl Handler {
        fn get(&self, res: &mut Response, req: &mut Request) {
            self.calls.lock().unwrap().push(req.path().to_owned());
            res.text("got");
        }

        fn put(&self, res: &mut Response, _req: &mut Request) {
            res.text("put");
        }
    }

    impl Routable for Handler {
        fn capabilities() -> Capabilities<Self> {
            Capabilities::new()
                .exchange("get", Self::get)
                .exchange("put", Self::put)
                .other("count", "fn(&self) -> usize")
        }
    }

    fn bindings(src: &str) -> Vec<RouteBinding> {
        scan_source(src, "person").unwrap()
    }

    #[test]
    fn binds_and_invokes_through_the_router() {
        let routes = bindings(
            r#"
            impl Handler {
                /// @RestOperation( method = "GET", path = "/person/{uid}" )
                fn get(&self) {}
            }
            "#,
        );
        let handler = Arc::new(Handler::default());
        let mut router = Router::new();
        let handles = bind(&mut router, Arc::clone(&handler), &routes, &MiddlewareRegistry::new()).unwrap();

        assert_eq!(handles, [RouteHandle {
            name: "person.Handler.get".into(),
            method: Method::Get,
            path: "/person/{uid}".into(),
        }]);

        let (route, _) = router.lookup(Method::Get, "/person/7").unwrap();
        let mut res = Response::new();
        route(&mut res, &mut Request::new("GET", "/person/7"));
        assert_eq!(res.body(), b"got");
        assert_eq!(*handler.calls.lock().unwrap(), ["/person/7"]);
    }

    #[test]
    fn other_types_are_skipped_and_free_functions_bound() {
        let routes = bindings(
            r#"
            impl Other {
                /// @RestOperation( method = "GET", path = "/other" )
                fn missing_here(&self) {}
            }

            /// @RestOperation( method = "PUT", path = "/person" )
            fn put() {}
            "#,
        );
        let mut router = Router::new();
        let handles = bind(&mut router, Arc::new(Handler::default()), &routes, &MiddlewareRegistry::new()).unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].name, "person..put");
    }

    #[test]
    fn unknown_method_names_method_and_type() {
        let routes = bindings(
            r#"
            impl Handler {
                /// @RestOperation( method = "GET", path = "/x" )
                fn Missing(&self) {}
            }
            "#,
        );
        let err = bind(&mut Router::new(), Arc::new(Handler::default()), &routes, &MiddlewareRegistry::new())
            .unwrap_err();
        match err {
            BindError::MethodNotFound { method, handler_type } => {
                assert_eq!(method, "Missing");
                assert_eq!(handler_type, "Handler");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_exchange_method_is_a_signature_mismatch() {
        let routes = bindings(
            r#"
            impl Handler {
                /// @RestOperation( method = "GET", path = "/count" )
                fn count(&self) -> usize { 0 }
            }
            "#,
        );
        let err = bind(&mut Router::new(), Arc::new(Handler::default()), &routes, &MiddlewareRegistry::new())
            .unwrap_err();
        assert!(matches!(err, BindError::SignatureMismatch { signature: "fn(&self) -> usize", .. }));
    }

    #[test]
    fn failure_keeps_earlier_routes_and_stops_later_ones() {
        let routes = bindings(
            r#"
            impl Handler {
                /// @RestOperation( method = "GET", path = "/first" )
                fn get(&self) {}
                /// @RestOperation( method = "PUT", path = "/second", middlewares = ["Ghost"] )
                fn put(&self) {}
                /// @RestOperation( method = "POST", path = "/third" )
                fn get(&self) {}
            }
            "#,
        );
        let mut router = Router::new();
        let err = bind(&mut router, Arc::new(Handler::default()), &routes, &MiddlewareRegistry::new())
            .unwrap_err();
        assert!(matches!(err, BindError::MiddlewareNotFound { ref route, .. } if route == "person.Handler.put"));
        let paths: Vec<_> = router.routes().iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, ["/first"]);
    }

    impl Routable for u32 {
        fn capabilities() -> Capabilities<Self> {
            Capabilities::new()
        }
    }

    #[test]
    fn primitive_handlers_are_rejected() {
        let err = bind(&mut Router::new(), Arc::new(7u32), &[], &MiddlewareRegistry::new()).unwrap_err();
        assert!(matches!(err, BindError::NotAReferenceToStruct { type_name: "u32" }));
    }

    #[test]
    fn route_conflicts_surface_as_registration_errors() {
        let routes = bindings(
            r#"
            impl Handler {
                /// @RestOperation( method = "GET", path = "/same" )
                fn get(&self) {}
                /// @RestOperation( method = "GET", path = "/same" )
                fn put(&self) {}
            }
            "#,
        );
        let err = bind(&mut Router::new(), Arc::new(Handler::default()), &routes, &MiddlewareRegistry::new())
            .unwrap_err();
        assert!(matches!(err, BindError::Registration { .. }));
    }
}
