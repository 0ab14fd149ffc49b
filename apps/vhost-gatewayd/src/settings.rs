use std::str::FromStr;
use std::time::Duration;

use vhost_gateway::{Host, VhostUri};

use crate::cli::{was_explicit, Options};
use crate::config::Config;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fully resolved runtime configuration: CLI/env values that were explicitly
/// provided win, otherwise the config file's value is used, otherwise the
/// CLI flag's hard-coded default.
pub struct Settings {
    pub gateway_address: String,
    pub domain_name: String,
    pub api_address: String,
    pub timeout: Duration,
    pub hosts: Vec<Host>,
}

pub fn resolve(
    options: Options,
    matches: &clap::ArgMatches,
    config: Config,
) -> anyhow::Result<Settings> {
    let gateway_address = merge_str(matches, "addr", options.addr, config.gateway_address);
    let domain_name = merge_str(matches, "domain", options.domain, config.domain_name);
    let api_address = merge_str(matches, "api", options.api, config.api_address);
    let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);

    let hosts = config
        .hosts
        .into_iter()
        .map(|h| {
            let name = format!("{}.{}", h.name, domain_name);
            let uri = VhostUri::from_str(&h.uri)
                .map_err(|e| anyhow::anyhow!("invalid uri for host {name}: {e}"))?;
            Ok(Host::new(name, uri))
        })
        .collect::<anyhow::Result<Vec<Host>>>()?;

    Ok(Settings {
        gateway_address,
        domain_name,
        api_address,
        timeout,
        hosts,
    })
}

fn merge_str(
    matches: &clap::ArgMatches,
    id: &str,
    cli_value: String,
    config_value: Option<String>,
) -> String {
    if was_explicit(matches, id) {
        cli_value
    } else {
        config_value.unwrap_or(cli_value)
    }
}
