//! Error types, one per stage of the startup pipeline.
//!
//! Every failure here is a configuration or programming error: a malformed
//! annotation, a handler that does not expose the annotated method, a
//! middleware nobody registered. None of them is retried. They surface from
//! startup and are expected to stop the process.

use std::net::AddrParseError;
use std::num::ParseIntError;
use std::path::PathBuf;

use crate::method::Method;

/// A single `@RestOperation` annotation could not be turned into a
/// [`RouteDescriptor`](crate::RouteDescriptor).
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid @RestOperation format: {detail}")]
    InvalidFormat { detail: String },

    #[error("method is required")]
    MissingMethod,

    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),

    #[error("path is required")]
    MissingPath,

    /// `source` is set when the value was not an integer at all and empty
    /// when it parsed but was negative.
    #[error("invalid timeout `{value}`: must be a non-negative integer")]
    InvalidTimeout {
        value: String,
        #[source]
        source: Option<ParseIntError>,
    },
}

/// A source unit could not be scanned. Nothing from a failed scan is kept.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {unit}")]
    Syntax {
        unit: String,
        #[source]
        source: syn::Error,
    },

    #[error("failed to parse annotation on {declaration}")]
    AnnotationParse {
        declaration: String,
        #[source]
        source: ParseError,
    },
}

/// Middleware registry failures.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("middleware {0} already registered")]
    AlreadyRegistered(String),

    #[error("middleware {0} not found")]
    NotFound(String),
}

/// The route table rejected a registration.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("cannot register {method} {path}")]
    Insert {
        method: Method,
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

/// A binding could not be attached to the handler instance.
///
/// Routes registered before the failing binding stay registered.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("handler must be a pointer to a struct, got `{type_name}`")]
    NotAReferenceToStruct { type_name: &'static str },

    #[error("method {method} not found in handler {handler_type}")]
    MethodNotFound { method: String, handler_type: String },

    #[error("method {handler_type}.{method} has signature `{signature}`, not an exchange handler")]
    SignatureMismatch {
        method: String,
        handler_type: String,
        signature: &'static str,
    },

    #[error("failed to apply middlewares to {route}")]
    MiddlewareNotFound {
        route: String,
        #[source]
        source: RegistryError,
    },

    #[error("failed to register {route}")]
    Registration {
        route: String,
        #[source]
        source: RouteError,
    },
}

/// The crate-level error, for callers that run the whole pipeline at once.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid listen address: {0}")]
    Addr(#[from] AddrParseError),

    #[error("failed to parse routes: {0}")]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
