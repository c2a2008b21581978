//! axum middleware that applies the guard and rewrites denied requests.
//!
//! The layer must wrap the router (not be added with `Router::layer`) so the
//! rewrite happens before routing.

use axum::{
    extract::{OriginalUri, Request, State},
    http::{StatusCode, Uri, uri::PathAndQuery},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{Decision, Guard};

/// Pass allowed requests through untouched; serve the forbidden view for the
/// rest without changing the client-visible URL.
pub async fn require_staff_session(
    State(guard): State<Arc<Guard>>,
    mut request: Request,
    next: Next,
) -> Response {
    let decision = guard
        .authorize(request.uri().path(), request.headers())
        .await;

    if decision == Decision::Deny {
        let original = request.uri().clone();
        if request.extensions().get::<OriginalUri>().is_none() {
            request.extensions_mut().insert(OriginalUri(original.clone()));
        }
        let Some(rewritten) = rewrite_path(&original, guard.config().forbidden_path()) else {
            return StatusCode::FORBIDDEN.into_response();
        };
        *request.uri_mut() = rewritten;
    }

    next.run(request).await
}

/// Swap the path of `uri` for `path`, keeping the query and everything else.
/// `None` when `path` is not a valid request path.
fn rewrite_path(uri: &Uri, path: &str) -> Option<Uri> {
    let target = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(target.parse::<PathAndQuery>().ok()?);
    Uri::from_parts(parts).ok()
}
