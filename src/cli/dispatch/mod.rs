use crate::cli::{
    actions::{server::Args, Action},
    globals::GlobalArgs,
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let identity_url = matches
        .get_one::<String>("identity-url")
        .cloned()
        .context("missing required argument: --identity-url")?;
    let identity_anon_key = matches
        .get_one::<String>("identity-anon-key")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --identity-anon-key")?;

    let upload_url = matches
        .get_one::<String>("upload-url")
        .cloned()
        .filter(|url| !url.trim().is_empty());

    let globals = GlobalArgs::new(identity_url, identity_anon_key)
        .with_cookie_secure(matches.get_flag("cookie-secure"));

    Ok(Action::Server(Args {
        port,
        upload_url,
        globals,
    }))
}
