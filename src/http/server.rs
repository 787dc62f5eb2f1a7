//! Site server: one listener and one route table per site group.
//!
//! # Responsibilities
//! - Create the Axum router that dispatches into the site's handlers
//! - Wire up middleware (tracing, panic capture)
//! - Run the accept loop and per-connection HTTP/1.1 + HTTP/2 service
//! - Drain in two budgets on shutdown: in-flight requests, then connections
//!
//! Request path:
//! ```text
//! route lookup → read body → synthesize event → Handler::call → adapt response
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::LengthLimitError;
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tower::ServiceExt;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::framework::{InvocationContext, Verb};
use crate::http::request::{synthesize_event, InboundRequest};
use crate::http::response::{adapt_response, error_response};
use crate::lifecycle::shutdown::DrainBudget;
use crate::lifecycle::state::{advance, SiteState};
use crate::net::connection::InFlightTracker;
use crate::routing::{RouteInfo, RouteMiss, SiteRouter};

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Application state injected into the dispatcher.
#[derive(Clone)]
pub struct AppState {
    site: Arc<SiteShared>,
}

struct SiteShared {
    group: String,
    router: SiteRouter,
    tracker: InFlightTracker,
    max_body_bytes: usize,
}

/// A site group's server before it is bound.
pub struct SiteServer {
    shared: Arc<SiteShared>,
}

impl SiteServer {
    pub fn new(group: impl Into<String>, router: SiteRouter, max_body_bytes: usize) -> Self {
        Self {
            shared: Arc::new(SiteShared {
                group: group.into(),
                router,
                tracker: InFlightTracker::new(),
                max_body_bytes,
            }),
        }
    }

    pub fn group(&self) -> &str {
        &self.shared.group
    }

    pub fn routes(&self) -> Vec<RouteInfo> {
        self.shared.router.routes()
    }

    /// Build the Axum router with all middleware layers.
    pub fn app(&self) -> Router {
        let state = AppState {
            site: Arc::clone(&self.shared),
        };
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
    }

    /// Start serving on `bound`. Stops accepting when `shutdown` fires.
    ///
    /// `state` is the group's lifecycle channel; it moves to `Serving` here.
    pub fn spawn(
        self,
        bound: BoundListener,
        state: watch::Sender<SiteState>,
        shutdown: broadcast::Receiver<()>,
    ) -> SiteServerHandle {
        let BoundListener {
            listener,
            local_addr,
            endpoint,
        } = bound;
        let app = self.app();
        advance(&state, &self.shared.group, SiteState::Serving);
        let accept = tokio::spawn(accept_loop(
            listener,
            app,
            shutdown,
            self.shared.group.clone(),
        ));

        SiteServerHandle {
            group: self.shared.group.clone(),
            local_addr,
            endpoint,
            routes: self.routes(),
            state,
            tracker: self.shared.tracker.clone(),
            accept,
        }
    }
}

/// A listening socket and the endpoint advertised for it.
#[derive(Debug)]
pub struct BoundListener {
    pub listener: TcpListener,
    pub local_addr: SocketAddr,
    pub endpoint: String,
}

/// A serving site group.
pub struct SiteServerHandle {
    group: String,
    local_addr: SocketAddr,
    endpoint: String,
    routes: Vec<RouteInfo>,
    state: watch::Sender<SiteState>,
    tracker: InFlightTracker,
    accept: JoinHandle<Connections>,
}

impl SiteServerHandle {
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    pub fn state(&self) -> SiteState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SiteState> {
        self.state.subscribe()
    }

    pub fn in_flight(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Drain and stop. The shutdown signal must already have been sent.
    pub async fn drain(self, budget: DrainBudget) -> SiteState {
        let SiteServerHandle {
            group,
            state,
            tracker,
            accept,
            ..
        } = self;
        advance(&state, &group, SiteState::Draining);

        let connections = match accept.await {
            Ok(connections) => Some(connections),
            Err(e) => {
                tracing::error!(site_group = %group, error = %e, "Accept loop failed");
                None
            }
        };

        if tokio::time::timeout(budget.request_grace, tracker.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                site_group = %group,
                in_flight = tracker.active_count(),
                "Request grace period elapsed with requests still running"
            );
        }

        if let Some(mut connections) = connections {
            let closed = tokio::time::timeout(budget.connection_grace, async {
                while connections.tasks.join_next().await.is_some() {}
            })
            .await;
            if closed.is_err() {
                tracing::warn!(
                    site_group = %group,
                    remaining = connections.tasks.len(),
                    "Connection grace period elapsed, forcing close"
                );
                connections.tasks.abort_all();
                connections.tasks.detach_all();
            }
            drop(connections.close);
        }

        advance(&state, &group, SiteState::Stopped);
        tracing::info!(site_group = %group, "Site stopped");
        SiteState::Stopped
    }
}

impl std::fmt::Debug for SiteServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteServerHandle")
            .field("group", &self.group)
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

/// Open connections left behind by a stopped accept loop.
struct Connections {
    tasks: JoinSet<()>,
    /// Flipped to `true` to ask every connection to finish gracefully.
    close: watch::Sender<bool>,
}

async fn accept_loop(
    listener: TcpListener,
    app: Router,
    mut shutdown: broadcast::Receiver<()>,
    group: String,
) -> Connections {
    let (close, close_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::trace!(site_group = %group, peer = %peer, "Connection accepted");
                    tasks.spawn(serve_connection(stream, peer, app.clone(), close_rx.clone()));
                }
                Err(e) => {
                    tracing::warn!(site_group = %group, error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            _ = shutdown.recv() => {
                tracing::info!(site_group = %group, "Shutdown signal received, no longer accepting");
                break;
            }
        }
    }

    drop(listener);
    let _ = close.send(true);
    Connections { tasks, close }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    app: Router,
    mut close: watch::Receiver<bool>,
) {
    let service = app.map_request(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        request.map(Body::new)
    });

    let builder = Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(service));
    let mut conn = std::pin::pin!(conn);
    let mut closing = false;

    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(peer = %peer, error = %e, "Connection ended with error");
                }
                break;
            }
            _ = close.changed(), if !closing => {
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

/// Dispatch one request into the handler bound to its route.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let site = &state.site;
    let _guard = site.tracker.track();

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let path = request.uri().path().to_owned();

    tracing::info!(
        site_group = %site.group,
        method = %request.method(),
        path = %path,
        peer = ?peer,
        "Received request"
    );

    let matched = match site.router.resolve(&path, Verb::from_method(request.method())) {
        Ok(matched) => matched,
        Err(RouteMiss::NotFound) => {
            tracing::debug!(site_group = %site.group, path = %path, "No route matched");
            return error_response(StatusCode::NOT_FOUND, "Not Found");
        }
        Err(RouteMiss::MethodNotAllowed(allowed)) => {
            tracing::debug!(site_group = %site.group, path = %path, "Method not bound on route");
            return method_not_allowed(&allowed);
        }
    };

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, site.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) if is_length_limit(&e) => {
            tracing::warn!(site_group = %site.group, path = %path, limit = site.max_body_bytes, "Request body too large");
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
        Err(e) => {
            tracing::warn!(site_group = %site.group, path = %path, error = %e, "Failed to read request body");
            return error_response(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };

    let inbound = InboundRequest {
        method: &parts.method,
        path: &path,
        path_params: &matched.params,
        query: parts.uri.query(),
        headers: &parts.headers,
        peer,
        body: &body,
    };
    let event = match synthesize_event(&inbound, Some(matched.resource)) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(site_group = %site.group, path = %path, error = %e, "Rejecting request");
            return error_response(StatusCode::BAD_REQUEST, "Request body is not valid UTF-8");
        }
    };

    let context = InvocationContext::new(site.group.as_str(), matched.binding.name.as_str());
    let request_id = context.request_id;
    tracing::debug!(request_id = %request_id, event = ?event, "Constructed synthetic event");

    // Handlers are synchronous; keep them off the connection task so a
    // forced close can still abort it.
    let handler = Arc::clone(&matched.binding.handler);
    let verb = matched.verb;
    let call = tokio::task::spawn_blocking(move || handler.call(verb, &event, Some(&context)));

    let result = match call.await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::error!(
                site_group = %site.group,
                handler = %matched.binding.name,
                request_id = %request_id,
                resource = %matched.resource,
                error = %e,
                "Handler failed"
            );
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        }
        Err(e) => {
            let message = if e.is_panic() {
                panic_message(e.into_panic())
            } else {
                e.to_string()
            };
            tracing::error!(
                site_group = %site.group,
                handler = %matched.binding.name,
                request_id = %request_id,
                panic = %message,
                "Handler panicked"
            );
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        }
    };

    match adapt_response(result) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                site_group = %site.group,
                handler = %matched.binding.name,
                request_id = %request_id,
                error = %e,
                "Handler returned an unusable response"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn method_not_allowed(allowed: &[Verb]) -> Response {
    let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    let allow = allowed
        .iter()
        .map(Verb::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn panic_message(panic: Box<dyn std::any::Any + Send + 'static>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!(panic = %panic_message(panic), "Request processing panicked");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}
