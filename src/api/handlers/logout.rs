use axum::{
    Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use tracing::error;

/// Session cookie attributes used when clearing it on logout.
#[derive(Clone, Debug)]
pub struct SessionCookie {
    name: String,
    secure: bool,
}

impl SessionCookie {
    #[must_use]
    pub fn new(name: impl Into<String>, secure: bool) -> Self {
        Self {
            name: name.into(),
            secure,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// `Set-Cookie` value that expires the session cookie.
    ///
    /// # Errors
    /// Returns an error if the cookie name is not a valid header value.
    pub fn clear(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        // Only mark cookies secure when the backoffice is served over HTTPS.
        let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.name);
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Clear the staff session cookie. Always `204`, even without a session.
pub async fn logout(Extension(cookie): Extension<SessionCookie>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    match cookie.clear() {
        Ok(value) => {
            headers.insert(SET_COOKIE, value);
        }
        Err(err) => error!("Failed to build clearing cookie: {err}"),
    }
    (StatusCode::NO_CONTENT, headers)
}
