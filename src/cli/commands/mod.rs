mod logging;

use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        BoolishValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

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

    let command = Command::new("portal")
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
                .env("PORTAL_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("identity-url")
                .long("identity-url")
                .help("Identity Service base URL, example: https://project.supabase.co")
                .env("PORTAL_IDENTITY_URL")
                .required(true),
        )
        .arg(
            Arg::new("identity-anon-key")
                .long("identity-anon-key")
                .help("Identity Service public (anon) API key")
                .env("PORTAL_IDENTITY_ANON_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("upload-url")
                .long("upload-url")
                .help("Internal upload endpoint; /api/upload answers 503 when unset")
                .env("PORTAL_UPLOAD_URL"),
        )
        .arg(
            Arg::new("cookie-secure")
                .long("cookie-secure")
                .help("Mark session cookies Secure (serve over HTTPS)")
                .env("PORTAL_COOKIE_SECURE")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        );

    logging::with_args(command)
}
