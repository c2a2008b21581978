//! Bearer credential extraction.
//!
//! Sources are tried in order and the first non-empty token wins: the session
//! cookie, then `Authorization: Bearer <token>`.

use axum::http::{
    HeaderMap,
    header::{AUTHORIZATION, COOKIE},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    Cookie,
    BearerHeader,
}

const SOURCES: [CredentialSource; 2] = [CredentialSource::Cookie, CredentialSource::BearerHeader];

impl CredentialSource {
    fn read(self, headers: &HeaderMap, cookie_name: &str) -> Option<String> {
        match self {
            Self::Cookie => cookie_token(headers, cookie_name),
            Self::BearerHeader => bearer_token(headers),
        }
    }
}

/// Return the credential and where it came from, if any source has one.
#[must_use]
pub fn extract(headers: &HeaderMap, cookie_name: &str) -> Option<(String, CredentialSource)> {
    SOURCES
        .into_iter()
        .find_map(|source| source.read(headers, cookie_name).map(|token| (token, source)))
}

fn cookie_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    // HTTP/2 clients may split cookies across several headers.
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == cookie_name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
