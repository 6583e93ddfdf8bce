//! # HTTP Server
//!
//! HTTP host for a [`Dispatcher`], built on Hyper and Tokio.
//! Implements graceful shutdown with signal handling.
//!
//! ## Key Features
//!
//! - Async connection handling with Tokio runtime
//! - Graceful shutdown on SIGINT with connection draining
//! - Connection keep-alive support
//! - Error boundary: errors raised by action targets become 500 responses

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::request::{Method, Request};
use crate::response::Response;
use http_body_util::Full;
pub use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// HTTP server serving one sealed registry
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Create a server with the default configuration
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_config(dispatcher, ServerConfig::default())
    }

    /// Create a server with an explicit configuration
    #[must_use]
    pub fn with_config(dispatcher: Dispatcher, config: ServerConfig) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Bind the server to an address
    #[must_use]
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.address = addr;
        self
    }

    /// Set max request body size
    pub fn set_max_body_size(&mut self, bytes: usize) {
        self.config.max_body_size = bytes;
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Start the server with graceful shutdown on CTRL+C
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address cannot be bound and
    /// `Error::Io` if accepting a connection fails
    pub async fn serve(&self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Start the server, stopping when `shutdown` completes
    ///
    /// Open connections are asked to close after their in-flight request and
    /// are given `shutdown_timeout` to do so.
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address cannot be bound and
    /// `Error::Io` if accepting a connection fails
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.config.address;
        let bind_error = |source| Error::BindError {
            address: addr.to_string(),
            source,
        };

        let socket = if addr.is_ipv4() {
            tokio::net::TcpSocket::new_v4()
        } else {
            tokio::net::TcpSocket::new_v6()
        }
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        #[cfg(not(windows))]
        {
            socket.set_reuseport(true).map_err(bind_error)?;
        }
        socket.bind(addr).map_err(bind_error)?;

        let listener = socket.listen(1024).map_err(bind_error)?;

        info!("Server listening on http://{}", addr);

        let tracker = ConnectionTracker::default();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let max_body_size = self.config.max_body_size;
        let keep_alive = self.config.keep_alive;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = accept_result?;
                    let io = TokioIo::new(stream);

                    let guard = tracker.track();
                    let dispatcher = Arc::clone(&self.dispatcher);
                    let mut shutdown_rx = shutdown_rx.clone();

                    tokio::task::spawn(async move {
                        let _guard = guard;

                        let service = service_fn(move |req| {
                            let dispatcher = Arc::clone(&dispatcher);
                            async move {
                                handle_request(req, &dispatcher, remote_addr, max_body_size).await
                            }
                        });

                        let mut builder = http1::Builder::new();
                        builder.keep_alive(keep_alive);
                        let conn = builder.serve_connection(io, service);
                        tokio::pin!(conn);

                        let result = tokio::select! {
                            result = conn.as_mut() => result,
                            _ = shutdown_rx.changed() => {
                                conn.as_mut().graceful_shutdown();
                                conn.as_mut().await
                            }
                        };
                        if let Err(err) = result {
                            error!("Error serving connection: {:?}", err);
                        }
                    });
                }
                () = &mut shutdown => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        let _ = shutdown_tx.send(true);
        let drain = async {
            while tracker.active() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(self.config.shutdown_timeout(), drain)
            .await
            .is_err()
        {
            warn!(
                open = tracker.active(),
                "Shutdown timeout reached with open connections"
            );
        }
        Ok(())
    }

    /// Execute a test request directly without network stack
    pub async fn test_request(
        &self,
        method: Method,
        path: &str,
        headers: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Response {
        if let Some(b) = body.as_ref() {
            if b.len() > self.config.max_body_size {
                return Response::error(413, "Payload Too Large");
            }
        }
        let mut req = Request::new(method, path, headers, body);
        req.set_header("x-client-ip", "test");

        process_request(&mut req, &self.dispatcher)
    }
}

/// Counts open connections for shutdown draining
#[derive(Debug, Clone, Default)]
struct ConnectionTracker {
    active: Arc<AtomicUsize>,
}

impl ConnectionTracker {
    /// Record a new connection; the count drops again with the guard
    fn track(&self) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active: Arc::clone(&self.active),
        }
    }

    fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Releases one tracked connection when dropped
#[derive(Debug)]
struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", err);
        std::future::pending::<()>().await;
    }
}

/// Core request processing logic (network agnostic)
fn process_request(req: &mut Request, dispatcher: &Dispatcher) -> Response {
    if req.header("x-request-id").is_none() {
        let request_id = generate_request_id();
        req.set_header("x-request-id", &request_id);
    }

    let mut response = match dispatcher.handle(req) {
        Ok(response) => response,
        Err(err) => {
            error!(path = %req.path, error = %err, "Action failed");
            Response::error(500, "Internal Server Error")
        }
    };

    if let Some(request_id) = req.header("x-request-id") {
        response.set_header("x-request-id", request_id);
    }
    response
}

async fn handle_request(
    req: hyper::Request<hyper::body::Incoming>,
    dispatcher: &Dispatcher,
    remote_addr: SocketAddr,
    max_body_size: usize,
) -> std::result::Result<hyper::Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let version = req.version();

    let response = match Request::from_hyper_with_limit(req, max_body_size).await {
        Ok(mut request) => {
            request.set_header("x-client-ip", &remote_addr.ip().to_string());
            process_request(&mut request, dispatcher)
        }
        Err(Error::PayloadTooLarge { limit, actual }) => {
            warn!(limit, actual, "Rejected oversized request body");
            Response::error(413, "Payload Too Large")
        }
        Err(err) => {
            error!("Failed to parse request: {}", err);
            Response::error(400, "Bad Request")
        }
    };

    info!(
        "    {} - \"{} {} {:?}\" {}",
        remote_addr, method, path, version, response.status
    );
    Ok(response.into_hyper())
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}
