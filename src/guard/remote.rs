//! Remote Verification Authority client.
//!
//! Used only when no session secret is configured. One attempt per request,
//! bounded by the client timeout, never cached.

use anyhow::{Context, Result, anyhow};
use reqwest::{
    Client,
    header::{CACHE_CONTROL, PRAGMA},
    redirect::Policy,
};
use std::time::Duration;
use tracing::{Instrument, info_span, warn};
use url::{Host, Url};

use super::{claims::RawClaims, error::GuardError};

#[derive(Debug)]
pub struct RemoteAuthority {
    verify_url: Url,
    client: Client,
}

impl RemoteAuthority {
    /// Build a client for `{base_url}{verify_path}`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid, is not `https` (loopback hosts
    /// excepted), or the HTTP client cannot be built.
    pub fn new(base_url: &str, verify_path: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).context("Invalid verification authority URL")?;
        if base.scheme() != "https" && !is_loopback(&base) {
            return Err(anyhow!(
                "Verification authority URL must use https: {base_url}"
            ));
        }

        let verify_url = Url::parse(&format!(
            "{}{verify_path}",
            base.as_str().trim_end_matches('/')
        ))
        .context("Invalid verification path")?;

        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(crate::APP_USER_AGENT)
            // a redirect is a non-success answer
            .redirect(Policy::none())
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("Failed to build verification authority HTTP client")?;

        Ok(Self { verify_url, client })
    }

    #[must_use]
    pub fn verify_url(&self) -> &str {
        self.verify_url.as_str()
    }

    /// Ask the authority to validate `token` and return the claims it reports.
    pub(super) async fn verify(&self, token: &str) -> Result<RawClaims, GuardError> {
        let span = info_span!(
            "guard.authority.verify",
            http.method = "POST",
            url = %self.verify_url
        );
        async {
            let response = self
                .client
                .post(self.verify_url.clone())
                .bearer_auth(token)
                .header(CACHE_CONTROL, "no-store")
                .header(PRAGMA, "no-cache")
                .send()
                .await
                .map_err(|err| {
                    warn!(error = %err, timeout = err.is_timeout(), "verification authority unreachable");
                    GuardError::AuthorityUnavailable
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(GuardError::AuthorityRejected(status.as_u16()));
            }

            response.json::<RawClaims>().await.map_err(|err| {
                if err.is_timeout() {
                    GuardError::AuthorityUnavailable
                } else {
                    warn!(error = %err, "verification authority returned an unreadable body");
                    GuardError::Invalid
                }
            })
        }
        .instrument(span)
        .await
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::RemoteAuthority;
    use crate::guard::GuardError;
    use anyhow::Result;
    use serde_json::json;
    use std::{
        net::TcpListener,
        time::{Duration, Instant},
    };
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VERIFY_PATH: &str = "/api/auth/verify";

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn requires_https_except_loopback() {
        let timeout = Duration::from_secs(1);
        assert!(RemoteAuthority::new("http://api.example.test", VERIFY_PATH, timeout).is_err());
        assert!(RemoteAuthority::new("https://api.example.test", VERIFY_PATH, timeout).is_ok());
        assert!(RemoteAuthority::new("http://localhost:9000", VERIFY_PATH, timeout).is_ok());
        assert!(RemoteAuthority::new("http://127.0.0.1:9000", VERIFY_PATH, timeout).is_ok());
        assert!(RemoteAuthority::new("http://[::1]:9000", VERIFY_PATH, timeout).is_ok());
        assert!(RemoteAuthority::new("not a url", VERIFY_PATH, timeout).is_err());
    }

    #[test]
    fn verify_url_keeps_base_path() -> Result<()> {
        let authority = RemoteAuthority::new(
            "https://api.example.test/v2/",
            VERIFY_PATH,
            Duration::from_secs(1),
        )?;
        assert_eq!(
            authority.verify_url(),
            "https://api.example.test/v2/api/auth/verify"
        );
        Ok(())
    }

    #[tokio::test]
    async fn posts_bearer_without_cache() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .and(header("authorization", "Bearer tok-1"))
            .and(header("cache-control", "no-store"))
            .and(header("pragma", "no-cache"))
            .and(body_string(""))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"role": "admin", "sub": "u-7"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let authority = RemoteAuthority::new(&server.uri(), VERIFY_PATH, Duration::from_secs(2))?;
        let raw = authority.verify("tok-1").await?;
        assert_eq!(raw.role.as_deref(), Some("admin"));
        assert_eq!(raw.sub.as_deref(), Some("u-7"));
        Ok(())
    }

    #[tokio::test]
    async fn non_success_is_rejection() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"role": "admin"})))
            .mount(&server)
            .await;

        let authority = RemoteAuthority::new(&server.uri(), VERIFY_PATH, Duration::from_secs(2))?;
        let result = authority.verify("tok").await;
        assert!(matches!(result, Err(GuardError::AuthorityRejected(401))));
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_body_is_invalid() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let authority = RemoteAuthority::new(&server.uri(), VERIFY_PATH, Duration::from_secs(2))?;
        assert!(matches!(
            authority.verify("tok").await,
            Err(GuardError::Invalid)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn slow_authority_times_out() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"role": "admin"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let authority =
            RemoteAuthority::new(&server.uri(), VERIFY_PATH, Duration::from_millis(200))?;
        let started = Instant::now();
        let result = authority.verify("tok").await;
        assert!(matches!(result, Err(GuardError::AuthorityUnavailable)));
        assert!(started.elapsed() < Duration::from_secs(2));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_authority_is_unavailable() -> Result<()> {
        // Grab a free port and release it so nothing is listening there.
        let port = match TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener.local_addr()?.port(),
            Err(_) => {
                eprintln!("Skipping test: cannot bind localhost");
                return Ok(());
            }
        };
        let authority = RemoteAuthority::new(
            &format!("http://127.0.0.1:{port}"),
            VERIFY_PATH,
            Duration::from_millis(500),
        )?;
        assert!(matches!(
            authority.verify("tok").await,
            Err(GuardError::AuthorityUnavailable)
        ));
        Ok(())
    }
}
