use axum::{
    extract::OriginalUri,
    http::{StatusCode, header::CACHE_CONTROL},
    response::{Html, IntoResponse},
};
use tracing::debug;

// Nothing from the request is reflected in this page.
const FORBIDDEN_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="robots" content="noindex">
<title>Access denied</title>
</head>
<body>
<main>
<h1>Access denied</h1>
<p>You need an active staff session to view this page.</p>
</main>
</body>
</html>
"#;

/// Forbidden view. Denied requests are rewritten here by the guard, so the
/// browser keeps the URL it asked for.
pub async fn forbidden(OriginalUri(original): OriginalUri) -> impl IntoResponse {
    debug!(requested = %original.path(), "rendering forbidden view");
    (
        StatusCode::FORBIDDEN,
        [(CACHE_CONTROL, "no-store")],
        Html(FORBIDDEN_PAGE),
    )
}
