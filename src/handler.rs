//! Handler callables and handler capability tables.
//!
//! # The canonical callable
//!
//! Every route ends up as a [`BoxedHandler`]: a shared, type-erased
//! `Fn(&mut Response, &mut Request)`. Plain closures get there through the
//! sealed [`Handler`] trait; annotated methods get there through the binder,
//! which wraps a method of a live handler instance in a forwarding closure.
//!
//! # Capability tables
//!
//! Annotations name methods by string. Rust has no runtime method lookup, so
//! each handler type publishes its routable surface once through
//! [`Routable::capabilities`]:
//!
//! ```rust
//! use restop::{Capabilities, Request, Response, Routable};
//!
//! struct Handler;
//!
//! impl Handler {
//!     fn get(&self, res: &mut Response, _req: &mut Request) {
//!         res.text("hello");
//!     }
//! }
//!
//! impl Routable for Handler {
//!     fn capabilities() -> Capabilities<Self> {
//!         Capabilities::new()
//!             .exchange("get", Self::get)
//!             .other("lookup", "fn(&self, &str) -> Option<Person>")
//!     }
//! }
//! ```
//!
//! The string-to-callable step stays name-addressed; what it looks up is a
//! table the compiler has already type-checked.

use std::collections::HashMap;
use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

// ── Canonical callable ────────────────────────────────────────────────────────

/// A heap-allocated, type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Fn(&mut Response, &mut Request) + Send + Sync + 'static>;

/// Implemented for every closure or function usable as a route handler:
///
/// ```text
/// fn name(res: &mut Response, req: &mut Request)
/// ```
///
/// The trait is sealed; only the blanket impl below satisfies it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F> private::Sealed for F
where
    F: Fn(&mut Response, &mut Request) + Send + Sync + 'static,
{
}

impl<F> Handler for F
where
    F: Fn(&mut Response, &mut Request) + Send + Sync + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

// ── Capability tables ─────────────────────────────────────────────────────────

/// A method with the exchange signature, as a plain function pointer.
pub type ExchangeFn<H> = fn(&H, &mut Response, &mut Request);

/// One named method a handler type exposes.
pub enum Capability<H> {
    /// Callable as a route: `(&self, &mut Response, &mut Request)`.
    Exchange(ExchangeFn<H>),
    /// Exposed under this name but with another signature. Naming it in an
    /// annotation is a signature mismatch, not a missing method.
    Other { signature: &'static str },
}

impl<H> Clone for Capability<H> {
    fn clone(&self) -> Self { *self }
}

impl<H> Copy for Capability<H> {}

/// Name → method table for one handler type.
pub struct Capabilities<H> {
    methods: HashMap<&'static str, Capability<H>>,
}

impl<H> Capabilities<H> {
    pub fn new() -> Self {
        Self { methods: HashMap::new() }
    }

    /// Publishes `f` as a routable method under `name`.
    pub fn exchange(mut self, name: &'static str, f: ExchangeFn<H>) -> Self {
        self.methods.insert(name, Capability::Exchange(f));
        self
    }

    /// Publishes a method that exists but cannot serve a route.
    pub fn other(mut self, name: &'static str, signature: &'static str) -> Self {
        self.methods.insert(name, Capability::Other { signature });
        self
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<Capability<H>> {
        self.methods.get(name).copied()
    }

    pub fn len(&self) -> usize { self.methods.len() }
    pub fn is_empty(&self) -> bool { self.methods.is_empty() }
}

impl<H> Default for Capabilities<H> {
    fn default() -> Self { Self::new() }
}

/// A handler type whose methods can be bound to annotated routes.
pub trait Routable: Send + Sync + Sized + 'static {
    /// The methods this type exposes, by name. Called once per bind.
    fn capabilities() -> Capabilities<Self>;

    /// The name annotations use for this type: the unqualified type name
    /// without generic arguments. Override when the scanned source refers to
    /// the type by another name.
    fn type_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// `my_app::person::Handler<u8>` → `Handler`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).trim_start_matches(['&', '*'])
}

const PRIMITIVES: &[&str] = &[
    "bool", "char", "str", "!",
    "u8", "u16", "u32", "u64", "u128", "usize",
    "i8", "i16", "i32", "i64", "i128", "isize",
    "f32", "f64",
];

/// True when `full` names a nominal type (struct, enum, union) rather than a
/// primitive, reference, pointer, tuple, slice, array or fn pointer.
pub(crate) fn is_structured(full: &str) -> bool {
    let kind_prefixes = ["&", "*", "(", "[", "fn(", "fn (", "dyn ", "impl "];
    if kind_prefixes.iter().any(|p| full.starts_with(p)) {
        return false;
    }
    !PRIMITIVES.contains(&full)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    impl Probe {
        fn hit(&self, res: &mut Response, _req: &mut Request) {
            res.text("hit");
        }
    }

    impl Routable for Probe {
        fn capabilities() -> Capabilities<Self> {
            Capabilities::new()
                .exchange("hit", Self::hit)
                .other("count", "fn(&self) -> usize")
        }
    }

    #[test]
    fn default_type_name_is_unqualified() {
        assert_eq!(Probe::type_name(), "Probe");
        assert_eq!(short_type_name("a::b::Wrapper<a::Inner>"), "Wrapper");
        assert_eq!(short_type_name("&a::b::Handler"), "Handler");
    }

    #[test]
    fn capabilities_are_looked_up_by_exact_name() {
        let caps = Probe::capabilities();
        assert_eq!(caps.len(), 2);
        assert!(matches!(caps.get("hit"), Some(Capability::Exchange(_))));
        assert!(matches!(caps.get("count"), Some(Capability::Other { signature: "fn(&self) -> usize" })));
        assert!(caps.get("Hit").is_none());
    }

    #[test]
    fn exchange_entries_call_through() {
        let Some(Capability::Exchange(f)) = Probe::capabilities().get("hit") else {
            panic!("hit should be an exchange method");
        };
        let mut res = Response::new();
        f(&Probe, &mut res, &mut Request::new("GET", "/"));
        assert_eq!(res.body(), b"hit");
    }

    #[test]
    fn structured_kinds() {
        assert!(is_structured("my_app::Handler"));
        assert!(is_structured("my_app::Wrapper<u8>"));
        assert!(!is_structured("u32"));
        assert!(!is_structured("()"));
        assert!(!is_structured("(u8, my_app::Handler)"));
        assert!(!is_structured("&my_app::Handler"));
        assert!(!is_structured("[u8; 4]"));
        assert!(!is_structured("fn(u8) -> u8"));
    }
}
