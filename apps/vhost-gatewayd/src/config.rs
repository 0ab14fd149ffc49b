use std::path::Path;

use serde::Deserialize;

/// On-disk JSON configuration. Every field is optional; CLI flags fill in
/// whatever the config file and hard-coded defaults leave unset.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub gateway_address: Option<String>,
    pub domain_name: Option<String>,
    pub api_address: Option<String>,
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<std::time::Duration>,
    #[serde(default)]
    pub hosts: Vec<ConfigHost>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigHost {
    /// Subdomain prefix; the loader suffixes it with `.<domain_name>`.
    pub name: String,
    pub uri: String,
}

pub fn load(path: &Path) -> anyhow::Result<Config> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
    Ok(cfg)
}
