use crate::guard::{
    DEFAULT_ALLOWED_ROLES, DEFAULT_COOKIE_NAME, DEFAULT_FORBIDDEN_PATH, DEFAULT_LOGIN_PATH,
    DEFAULT_LOGOUT_PATH, DEFAULT_PROTECTED_PREFIX, DEFAULT_VERIFY_PATH, RoleSet,
};
use clap::{
    Arg, ArgAction, ArgMatches, Command,
    builder::{BoolishValueParser, ValueParser},
};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_ALLOWED_ROLES: &str = "allowed-roles";
pub const ARG_GUARD_DISABLED: &str = "guard-disabled";
pub const ARG_AUTHORITY_URL: &str = "authority-url";
pub const ARG_VERIFY_PATH: &str = "verify-path";
pub const ARG_VERIFY_TIMEOUT_MS: &str = "verify-timeout-ms";
pub const ARG_PROTECTED_PREFIX: &str = "protected-prefix";
pub const ARG_LOGIN_PATH: &str = "login-path";
pub const ARG_LOGOUT_PATH: &str = "logout-path";
pub const ARG_BYPASS_PATHS: &str = "bypass-paths";
pub const ARG_FORBIDDEN_PATH: &str = "forbidden-path";
pub const ARG_COOKIE_NAME: &str = "cookie-name";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

#[derive(Debug, Clone)]
pub struct Options {
    pub secret: Option<SecretString>,
    pub allowed_roles: RoleSet,
    pub disabled: bool,
    pub authority_url: Option<String>,
    pub verify_path: String,
    pub verify_timeout: Duration,
    pub protected_prefix: String,
    pub login_path: String,
    pub logout_path: String,
    pub bypass_paths: Vec<String>,
    pub forbidden_path: String,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl Options {
    /// Parse guard arguments from matches.
    ///
    /// # Errors
    /// Returns an error if an argument with a default is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // env vars set to "" count as unset
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };
        let get_required = |id: &str| {
            get_non_empty(id).ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        let verify_timeout_ms = matches
            .get_one::<u64>(ARG_VERIFY_TIMEOUT_MS)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_VERIFY_TIMEOUT_MS}"))?;

        Ok(Self {
            secret: get_non_empty(ARG_SESSION_SECRET).map(SecretString::from),
            allowed_roles: matches
                .get_one::<RoleSet>(ARG_ALLOWED_ROLES)
                .cloned()
                .unwrap_or_default(),
            disabled: matches.get_flag(ARG_GUARD_DISABLED),
            authority_url: get_non_empty(ARG_AUTHORITY_URL),
            verify_path: get_required(ARG_VERIFY_PATH)?,
            verify_timeout: Duration::from_millis(verify_timeout_ms),
            protected_prefix: get_required(ARG_PROTECTED_PREFIX)?,
            login_path: get_required(ARG_LOGIN_PATH)?,
            logout_path: get_required(ARG_LOGOUT_PATH)?,
            bypass_paths: matches
                .get_many::<String>(ARG_BYPASS_PATHS)
                .map(|paths| {
                    paths
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            forbidden_path: get_required(ARG_FORBIDDEN_PATH)?,
            cookie_name: get_required(ARG_COOKIE_NAME)?,
            cookie_secure: matches
                .get_one::<bool>(ARG_COOKIE_SECURE)
                .copied()
                .unwrap_or(true),
        })
    }
}

#[must_use]
pub fn validator_roles() -> ValueParser {
    ValueParser::from(move |roles: &str| -> std::result::Result<RoleSet, String> {
        let parsed = RoleSet::parse(roles);
        if parsed.is_empty() {
            Err("at least one role is required".to_string())
        } else {
            Ok(parsed)
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_trust_args(command);
    with_route_args(command)
}

fn with_trust_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Shared HMAC secret used to verify session tokens locally")
                .long_help(
                    "Shared HMAC secret used to verify session tokens locally.\n\nWhen set, the remote authority is never consulted: a token that fails local verification is denied.",
                )
                .env("STAFFGATE_SESSION_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_AUTHORITY_URL)
                .long(ARG_AUTHORITY_URL)
                .help("Remote verification authority base URL, used when no session secret is set")
                .env("STAFFGATE_AUTHORITY_URL"),
        )
        .arg(
            Arg::new(ARG_VERIFY_PATH)
                .long(ARG_VERIFY_PATH)
                .help("Verification path on the remote authority")
                .env("STAFFGATE_VERIFY_PATH")
                .default_value(DEFAULT_VERIFY_PATH),
        )
        .arg(
            Arg::new(ARG_VERIFY_TIMEOUT_MS)
                .long(ARG_VERIFY_TIMEOUT_MS)
                .help("Remote verification timeout in milliseconds")
                .env("STAFFGATE_VERIFY_TIMEOUT_MS")
                .default_value("1500")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_ALLOWED_ROLES)
                .long(ARG_ALLOWED_ROLES)
                .help("Comma separated roles allowed into the staff area (case-sensitive)")
                .env("STAFFGATE_ALLOWED_ROLES")
                .default_value(DEFAULT_ALLOWED_ROLES)
                .value_parser(validator_roles()),
        )
        .arg(
            Arg::new(ARG_GUARD_DISABLED)
                .long(ARG_GUARD_DISABLED)
                .help("Disable the guard and allow every request (local development only)")
                .env("STAFFGATE_GUARD_DISABLED")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
}

fn with_route_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROTECTED_PREFIX)
                .long(ARG_PROTECTED_PREFIX)
                .help("Path prefix guarded by the staff session check")
                .env("STAFFGATE_PROTECTED_PREFIX")
                .default_value(DEFAULT_PROTECTED_PREFIX),
        )
        .arg(
            Arg::new(ARG_LOGIN_PATH)
                .long(ARG_LOGIN_PATH)
                .help("Login page, always reachable")
                .env("STAFFGATE_LOGIN_PATH")
                .default_value(DEFAULT_LOGIN_PATH),
        )
        .arg(
            Arg::new(ARG_LOGOUT_PATH)
                .long(ARG_LOGOUT_PATH)
                .help("Logout endpoint, clears the session cookie")
                .env("STAFFGATE_LOGOUT_PATH")
                .default_value(DEFAULT_LOGOUT_PATH),
        )
        .arg(
            Arg::new(ARG_BYPASS_PATHS)
                .long(ARG_BYPASS_PATHS)
                .help("Extra comma separated paths under the prefix that skip the guard")
                .env("STAFFGATE_BYPASS_PATHS")
                .value_delimiter(','),
        )
        .arg(
            Arg::new(ARG_FORBIDDEN_PATH)
                .long(ARG_FORBIDDEN_PATH)
                .help("Path denied requests are rewritten to")
                .env("STAFFGATE_FORBIDDEN_PATH")
                .default_value(DEFAULT_FORBIDDEN_PATH),
        )
        .arg(
            Arg::new(ARG_COOKIE_NAME)
                .long(ARG_COOKIE_NAME)
                .help("Cookie carrying the session token")
                .env("STAFFGATE_COOKIE_NAME")
                .default_value(DEFAULT_COOKIE_NAME),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the logout cookie Secure (disable only for plain HTTP development)")
                .env("STAFFGATE_COOKIE_SECURE")
                .default_value("true")
                .value_parser(BoolishValueParser::new()),
        )
}
