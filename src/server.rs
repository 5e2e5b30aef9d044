//! HTTP server and graceful shutdown.
//!
//! Serves a bound [`Router`]. On SIGTERM or Ctrl-C the server:
//! 1. stops accepting new connections;
//! 2. lets every in-flight connection run to completion;
//! 3. returns from [`Server::serve`].
//!
//! Handlers are synchronous and run on the connection's task. A route's
//! `timeout` annotation is not enforced here; it is metadata for whoever
//! wraps the handler.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use restop::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// assert_eq!(server.addr().port(), 3000);
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { addr: addr.parse()? })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accepts connections and dispatches them through `router` until
    /// SIGTERM or Ctrl-C, then drains in-flight requests.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), stopping when `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, router: Router, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);

        info!(addr = %self.addr, routes = router.routes().len(), "restop listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once,
                // even with connections queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set does not grow
                // without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("restop stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response. Every failure becomes a
/// status code, so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_owned();

    let Ok(method) = parts.method.as_str().parse::<Method>() else {
        return Ok(status_only(StatusCode::METHOD_NOT_ALLOWED));
    };

    let Some((handler, params)) = router.lookup(method, &path) else {
        let status = if router.matches_any(&path) {
            StatusCode::METHOD_NOT_ALLOWED
        } else {
            StatusCode::NOT_FOUND
        };
        return Ok(status_only(status));
    };

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes().to_vec(),
        Err(e) => {
            warn!(path = %path, "failed to read request body: {e}");
            return Ok(status_only(StatusCode::BAD_REQUEST));
        }
    };

    let headers = parts.headers.iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_owned(), v.to_owned())))
        .collect();

    let mut request = Request::from_parts(method.as_str().to_owned(), path, headers, body, params);
    let mut response = Response::new();
    handler(&mut response, &mut request);

    Ok(response.into_http())
}

fn status_only(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut res = Response::new();
    res.set_status(status);
    res.into_http()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. If a handler cannot be
/// installed, that arm never resolves and the failure is logged.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
