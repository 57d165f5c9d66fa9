use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};
use tracing::debug;

/// How the `write` action arguments are turned into binary.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AbiEncoding {
    /// Ask the chain RPC (`abi_json_to_bin`).
    #[default]
    Remote,
    /// Use the embedded encoder for the fixed `write(name, uint64)` shape.
    Local,
}

/// Everything a single push run needs. Built once and handed to the components.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PusherConfig {
    /// Chain RPC endpoint.
    pub api_endpoint: String,
    /// File holding the private key.
    pub key_file: PathBuf,
    /// Account pushing the value.
    pub owner: String,
    /// Oracle contract account.
    pub contract: String,
    /// Action invoked on the oracle contract.
    pub action: String,
    /// Permission the owner signs with.
    pub permission: String,
    /// Currency pair queried from the ticker.
    pub pair: String,
    /// Base URL of the market-data service.
    pub ticker_url: String,
    /// Seconds added to the chain head time to form the transaction expiration.
    pub expiration_secs: u32,
    /// Per-request HTTP timeout.
    pub http_timeout_secs: u64,
    pub abi_encoding: AbiEncoding,
}

impl Default for PusherConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.eosmetal.io".to_string(),
            key_file: PathBuf::from("oracle.key"),
            owner: "eosmetaliobp".to_string(),
            contract: "delphioracle".to_string(),
            action: "write".to_string(),
            permission: "oracle".to_string(),
            pair: "EOSUSD".to_string(),
            ticker_url: "https://api.kraken.com".to_string(),
            expiration_secs: 30,
            http_timeout_secs: 10,
            abi_encoding: AbiEncoding::Remote,
        }
    }
}

impl PusherConfig {
    /// Checks the fields every stage relies on.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("api_endpoint", &self.api_endpoint),
            ("owner", &self.owner),
            ("contract", &self.contract),
            ("action", &self.action),
            ("permission", &self.permission),
            ("pair", &self.pair),
            ("ticker_url", &self.ticker_url),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("Config field `{}` must not be empty", field);
            }
        }
        if self.expiration_secs == 0 {
            anyhow::bail!("Config field `expiration_secs` must be greater than zero");
        }
        Ok(())
    }
}

/// Loads and validates a pusher configuration YAML file.
///
/// Fields missing from the file keep their defaults.
pub fn load_pusher_config(path: impl AsRef<Path>) -> Result<PusherConfig> {
    let path_ref = path.as_ref();
    debug!(path = %path_ref.display(), "Loading pusher config file");

    let yaml_content = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read pusher config file: {}", path_ref.display()))?;

    let config: PusherConfig = serde_yaml::from_str(&yaml_content)
        .with_context(|| format!("Failed to parse YAML from file: {}", path_ref.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid pusher config in {}", path_ref.display()))?;

    debug!(?config, "Loaded pusher config");
    Ok(config)
}
