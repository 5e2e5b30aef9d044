//! # restop
//!
//! Declarative routing for Rust services: write the route next to the
//! handler method, in its doc comment, and let startup wire it up.
//!
//! ```rust,ignore
//! impl PersonHandler {
//!     /// @RestOperation( method = "GET", path = "/person/{uid}", middlewares = ["Auth"], timeout = 30 )
//!     fn get_person(&self, res: &mut Response, req: &mut Request) { ... }
//! }
//! ```
//!
//! ## The pipeline
//!
//! | stage | input | output |
//! |---|---|---|
//! | [`scan`] | a Rust source file | [`RouteBinding`]s, in source order |
//! | [`parse`] | one annotation | a validated [`RouteDescriptor`] |
//! | [`MiddlewareRegistry::compose`] | handler + names | the wrapped handler |
//! | [`bind`] | bindings + a live handler | routes in a [`RouteRegistrar`] |
//!
//! Everything runs once, synchronously, at startup. Every failure is a typed
//! error naming the declaration, method or middleware at fault, and is meant
//! to abort startup.
//!
//! ## What restop does not do
//!
//! - **Runtime reflection**: handler types publish their routable methods
//!   in a [`Capabilities`] table; names in annotations are looked up there.
//! - **Timeouts**: `timeout` is carried on the descriptor for middleware or
//!   the router to use. Nothing here enforces it.
//! - **Route groups, OpenAPI, body validation**: out of scope.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use restop::{Capabilities, MiddlewareRegistry, Request, Response, Routable, Router, Server};
//!
//! struct PersonHandler;
//!
//! impl PersonHandler {
//!     /// @RestOperation( method = "GET", path = "/person/{uid}" )
//!     fn get_person(&self, res: &mut Response, req: &mut Request) {
//!         let uid = req.param("uid").unwrap_or("unknown");
//!         res.json(format!(r#"{{"uid":"{uid}"}}"#).into_bytes());
//!     }
//! }
//!
//! impl Routable for PersonHandler {
//!     fn capabilities() -> Capabilities<Self> {
//!         Capabilities::new().exchange("get_person", Self::get_person)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restop::Error> {
//!     let middlewares = MiddlewareRegistry::new();
//!     let mut router = Router::new();
//!     restop::register_routes(&mut router, Arc::new(PersonHandler), "src/person.rs", &middlewares)?;
//!
//!     Server::bind("0.0.0.0:8080")?.serve(router).await
//! }
//! ```

mod binder;
mod descriptor;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod scanner;
mod server;

pub mod middleware;

pub use binder::{bind, register_routes};
pub use descriptor::{parse, RouteDescriptor, DEFAULT_TIMEOUT_SECS, MARKER};
pub use error::{BindError, Error, ParseError, RegistryError, RouteError, ScanError};
pub use handler::{BoxedHandler, Capabilities, Capability, ExchangeFn, Handler, Routable};
pub use http::StatusCode;
pub use method::{Method, UnknownMethod};
pub use middleware::{Middleware, MiddlewareRegistry};
pub use request::Request;
pub use response::{ContentType, Response};
pub use router::{RouteHandle, RouteRegistrar, Router};
pub use scanner::{scan, scan_source, RouteBinding, Scanner};
pub use server::Server;
