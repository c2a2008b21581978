pub mod guard;
pub mod logging;
pub mod upstream;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Validate that the guard has a trust source unless it is disabled.
///
/// # Errors
/// Returns an error string if neither a session secret nor an authority URL is set.
pub fn validate(matches: &clap::ArgMatches) -> Result<(), String> {
    if matches.get_flag(guard::ARG_GUARD_DISABLED) {
        return Ok(());
    }

    let is_set = |id: &str| {
        matches
            .get_one::<String>(id)
            .is_some_and(|v| !v.trim().is_empty())
    };

    if !is_set(guard::ARG_SESSION_SECRET) && !is_set(guard::ARG_AUTHORITY_URL) {
        return Err(format!(
            "Missing required argument: --{} or --{} (required unless --{})",
            guard::ARG_SESSION_SECRET,
            guard::ARG_AUTHORITY_URL,
            guard::ARG_GUARD_DISABLED
        ));
    }
    Ok(())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("staffgate")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("STAFFGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = upstream::with_args(command);
    let command = guard::with_args(command);
    logging::with_args(command)
}
