use crate::guard::{Guard, require_staff_session};
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{any, get, post},
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::{Layer, ServiceBuilder};
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, debug_span, error, info};
use ulid::Ulid;

pub mod handlers;
mod upstream;

pub use self::handlers::logout::SessionCookie;
pub use self::upstream::{DEFAULT_UPSTREAM_TIMEOUT_SECONDS, MAX_BODY_BYTES, Upstream};

pub const HEALTH_PATH: &str = "/health";

/// Routes served by the gateway itself. Anything else goes upstream.
#[derive(Clone, Debug)]
pub struct Routes {
    pub forbidden_path: String,
    pub logout_path: String,
}

impl Routes {
    /// Check the local routes are literal paths that do not collide.
    ///
    /// # Errors
    /// Returns a message naming the offending path.
    pub fn validate(&self) -> Result<(), String> {
        let paths = [
            HEALTH_PATH,
            self.forbidden_path.as_str(),
            self.logout_path.as_str(),
        ];
        for (i, path) in paths.iter().enumerate() {
            // axum treats these as captures or wildcards
            if !path.starts_with('/') || path.contains(['{', '}', '*']) || path.contains("/:") {
                return Err(format!("route {path:?} must be a literal absolute path"));
            }
            if paths[..i].contains(path) {
                return Err(format!("route {path:?} is configured more than once"));
            }
        }
        Ok(())
    }
}

/// Build the gateway.
///
/// The guard wraps the inner router as a service, so a denied request is
/// rewritten to the forbidden path before the inner router picks a route.
#[must_use]
pub fn router(
    guard: Arc<Guard>,
    upstream: Arc<Upstream>,
    cookie: SessionCookie,
    routes: &Routes,
) -> Router {
    let inner = Router::new()
        .route(
            HEALTH_PATH,
            get(handlers::health::health).options(handlers::health::health),
        )
        .route(&routes.forbidden_path, any(handlers::forbidden::forbidden))
        .route(&routes.logout_path, post(handlers::logout::logout))
        .fallback(upstream::forward)
        .layer(Extension(upstream))
        .layer(Extension(cookie));

    let guarded = middleware::from_fn_with_state(guard, require_staff_session).layer(inner);

    Router::new().fallback_service(guarded).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    )
}

/// Serve the gateway until SIGINT/SIGTERM.
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(
    port: u16,
    guard: Arc<Guard>,
    upstream: Arc<Upstream>,
    cookie: SessionCookie,
    routes: Routes,
) -> Result<()> {
    let app = router(guard, upstream, cookie, &routes);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

// span; headers are left out since they carry the session credential
fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", %method, path, request_id)
}
