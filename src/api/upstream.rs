use crate::APP_USER_AGENT;
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension,
    body::{Body, to_bytes},
    extract::Request,
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use reqwest::{Client, redirect::Policy};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, instrument};
use url::Url;

/// Largest request body forwarded upstream.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 30;

static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Backoffice UI the gateway fronts.
#[derive(Debug)]
pub struct Upstream {
    base: String,
    client: Client,
}

impl Upstream {
    /// # Errors
    /// Returns an error if the URL is not `http`/`https` or the client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(base_url).context("invalid upstream URL")?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("upstream URL must use http or https: {base_url}"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(anyhow!("upstream URL must not carry a query or fragment"));
        }

        // Redirects belong to the browser, not to the gateway.
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .use_rustls_tls()
            .redirect(Policy::none())
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("failed to build upstream client")?;

        Ok(Self {
            base: url.as_str().trim_end_matches('/').to_string(),
            client,
        })
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn target(&self, path_and_query: &str) -> String {
        format!("{}{path_and_query}", self.base)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by `Connection` are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Forward an allowed request to the upstream and relay its answer.
#[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn forward(Extension(upstream): Extension<Arc<Upstream>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("Request body rejected: {err}");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
    let target = upstream.target(path_and_query);

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    let result = upstream
        .client
        .request(parts.method, &target)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            error!("Upstream request failed: {err}");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status = response.status();
    let mut headers = response.headers().clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);

    match response.bytes().await {
        Ok(bytes) => {
            debug!(%status, "Upstream responded");
            let mut relayed = Response::new(Body::from(bytes));
            *relayed.status_mut() = status;
            *relayed.headers_mut() = headers;
            relayed
        }
        Err(err) => {
            error!("Failed to read upstream response: {err}");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn upstream_url_must_be_http() {
        assert!(Upstream::new("ftp://backoffice", Duration::from_secs(1)).is_err());
        assert!(Upstream::new("not a url", Duration::from_secs(1)).is_err());
        assert!(Upstream::new("http://backoffice?x=1", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn target_joins_base_and_path() -> Result<()> {
        let upstream = Upstream::new("http://backoffice:3000/", Duration::from_secs(1))?;
        assert_eq!(upstream.base(), "http://backoffice:3000");
        assert_eq!(
            upstream.target("/staff/leads?page=2"),
            "http://backoffice:3000/staff/leads?page=2"
        );

        let upstream = Upstream::new("http://backoffice:3000/ui", Duration::from_secs(1))?;
        assert_eq!(upstream.target("/staff"), "http://backoffice:3000/ui/staff");
        Ok(())
    }

    #[test]
    fn hop_by_hop_headers_are_removed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-trace"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-trace", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::ACCEPT));
    }
}
