use clap::Parser;

/// Dynamically reconfigurable name-based HTTP reverse-proxy gateway.
#[derive(Parser, Debug)]
#[command(name = "vhost-gatewayd", author, version)]
pub struct Options {
    /// Gateway address (host:port) the public reverse proxy binds to.
    #[arg(long = "addr", env = "GATEWAY_ADDRESS", default_value = "localhost:8080")]
    pub addr: String,

    /// Public domain name used as a suffix for all vhosts, e.g.
    /// `vhost1.public-hostname.com`. Include a custom port if one is used.
    #[arg(long = "domain", env = "DOMAIN", default_value = "localhost:8080")]
    pub domain: String,

    /// Address of the control-plane API server that manages the gateway.
    #[arg(long = "api", env = "API_ADDRESS", default_value = "localhost:8083")]
    pub api: String,

    /// Path to an optional JSON config file.
    #[arg(short = 'c', long = "config", env = "CONFIG")]
    pub config: Option<std::path::PathBuf>,
}

/// Parses CLI arguments and also returns the raw [`clap::ArgMatches`] so the
/// caller can distinguish an explicitly-passed flag/env-var from a
/// `default_value` fallback, for config-file merge precedence.
pub fn parse() -> (Options, clap::ArgMatches) {
    use clap::{CommandFactory, FromArgMatches};
    let matches = Options::command().get_matches();
    let options = Options::from_arg_matches(&matches).expect("derived command matches its own struct");
    (options, matches)
}

/// True if `id`'s value came from the command line or an environment
/// variable, as opposed to its `default_value`.
pub fn was_explicit(matches: &clap::ArgMatches, id: &str) -> bool {
    matches!(
        matches.value_source(id),
        Some(clap::parser::ValueSource::CommandLine) | Some(clap::parser::ValueSource::EnvVariable)
    )
}
