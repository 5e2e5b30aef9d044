//! Annotated person service.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example person
//!
//! Try:
//!   curl http://localhost:8080/person/123
//!   curl -X DELETE http://localhost:8080/person/123
//!
//! The routes below are declared in doc comments; at startup this file
//! scans itself and binds what it finds to a `PersonHandler`.

use std::sync::Arc;

use restop::{
    BoxedHandler, Capabilities, MiddlewareRegistry, Request, Response, Routable, Router, Server,
    StatusCode,
};
use tracing_subscriber::EnvFilter;

const SOURCE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/person.rs");

struct Person {
    uid: String,
    name: &'static str,
    addr: String,
}

impl Person {
    fn to_json(&self) -> Vec<u8> {
        format!(r#"{{"uid":"{}","name":"{}","addr":"{}"}}"#, self.uid, self.name, self.addr)
            .into_bytes()
    }
}

struct PersonHandler;

impl PersonHandler {
    fn find(&self, uid: &str) -> Option<Person> {
        (!uid.is_empty()).then(|| Person {
            uid: uid.to_owned(),
            name: "John Doe",
            addr: String::new(),
        })
    }

    /// Returns one person, with the address the middleware attached.
    /// @RestOperation( method = "GET", path = "/person/{uid}", middlewares = ["PersonMiddleware"], timeout = 30, disableAuth = true )
    fn get_person(&self, res: &mut Response, req: &mut Request) {
        let Some(mut person) = self.find(req.param("uid").unwrap_or_default()) else {
            res.error(StatusCode::NOT_FOUND, "no such person");
            return;
        };
        person.addr = req.header("address").unwrap_or_default().to_owned();
        res.json(person.to_json());
    }

    /// @RestOperation( method = "DELETE", path = "/person/{uid}" )
    fn delete_person(&self, res: &mut Response, _req: &mut Request) {
        res.set_status(StatusCode::NO_CONTENT);
    }
}

impl Routable for PersonHandler {
    fn capabilities() -> Capabilities<Self> {
        Capabilities::new()
            .exchange("get_person", Self::get_person)
            .exchange("delete_person", Self::delete_person)
            .other("find", "fn(&self, &str) -> Option<Person>")
    }
}

fn person_middleware(next: BoxedHandler) -> BoxedHandler {
    Arc::new(move |res: &mut Response, req: &mut Request| {
        tracing::info!("setting address header");
        req.set_header("address", "123 Main St");
        next(res, req);
    })
}

#[tokio::main]
async fn main() -> Result<(), restop::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let middlewares = MiddlewareRegistry::new();
    middlewares.register("PersonMiddleware", person_middleware)?;

    let mut router = Router::new();
    restop::register_routes(&mut router, Arc::new(PersonHandler), SOURCE, &middlewares)?;

    let addr = std::env::var("RESTOP_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    Server::bind(&addr)?.serve(router).await
}
