use crate::cli::{
    actions::{Action, server::Args},
    commands,
};
use anyhow::{Result, anyhow};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    // Refuse to start without a trust source unless the guard is disabled
    commands::validate(matches).map_err(|e| anyhow!(e))?;

    let upstream = commands::upstream::Options::parse(matches)?;
    let guard = commands::guard::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        upstream,
        guard,
    }))
}
