//! # Staffgate (Backoffice Staff Session Guard)
//!
//! `staffgate` sits in front of the CRM backoffice and decides, for every
//! request under the staff area, whether the caller holds a valid staff
//! session. Allowed requests are forwarded to the backoffice upstream; denied
//! requests are rewritten to a forbidden view without a redirect.
//!
//! ## Credentials
//!
//! The bearer credential is a signed JWT issued by the backend login endpoint.
//! It is read from the session cookie first and from `Authorization: Bearer`
//! second.
//!
//! ## Two Trust Sources
//!
//! - **Local:** when a session secret is configured the signature and expiry
//!   are checked in-process. A local failure is final; the remote authority is
//!   never consulted in this mode.
//! - **Remote:** without a secret the token is posted to the backend
//!   verification endpoint with a bounded timeout and no caching.
//!
//! In both modes the `role` claim must be an exact, case-sensitive member of
//! the allowed role set.
//!
//! ## Fail Closed
//!
//! Every failure (missing, malformed, expired, wrong role, authority down)
//! produces the same `403` forbidden view. Causes are only logged.

pub mod api;
pub mod cli;
pub mod guard;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
