//! Minimal client for the chain's `/v1/chain/*` HTTP API.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

/// Subset of `get_info` needed to build a transaction header.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainInfo {
    pub chain_id: String,
    pub head_block_num: u32,
    /// UTC, without zone suffix, e.g. `2018-06-01T12:00:00.500`.
    pub head_block_time: String,
    pub last_irreversible_block_num: u32,
    pub last_irreversible_block_id: String,
}

impl ChainInfo {
    pub fn chain_id_bytes(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(&self.chain_id).context("chain_id is not hex")?;
        bytes
            .try_into()
            .map_err(|_| anyhow!("chain_id must be 32 bytes"))
    }

    pub fn ref_block_num(&self) -> u16 {
        (self.last_irreversible_block_num & 0xffff) as u16
    }

    /// Little-endian u32 taken from bytes 8..12 of the reference block id.
    pub fn ref_block_prefix(&self) -> Result<u32> {
        let id = hex::decode(&self.last_irreversible_block_id).context("block id is not hex")?;
        let prefix: [u8; 4] = id
            .get(8..12)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| anyhow!("block id is too short: {}", self.last_irreversible_block_id))?;
        Ok(u32::from_le_bytes(prefix))
    }

    /// Head block time plus `secs`, as seconds since the unix epoch.
    pub fn expiration(&self, secs: u32) -> Result<u32> {
        let head = NaiveDateTime::parse_from_str(&self.head_block_time, "%Y-%m-%dT%H:%M:%S%.f")
            .with_context(|| format!("Unparseable head_block_time: {}", self.head_block_time))?;
        let expiration = head.and_utc().timestamp() + i64::from(secs);
        u32::try_from(expiration).context("Expiration does not fit in 32 bits")
    }
}

#[derive(Debug, Deserialize)]
struct AbiJsonToBinResponse {
    binargs: String,
}

/// Body of `push_transaction`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PackedTransaction {
    pub signatures: Vec<String>,
    pub compression: String,
    pub packed_context_free_data: String,
    pub packed_trx: String,
}

impl PackedTransaction {
    pub fn new(signature: String, packed_trx: &[u8]) -> Self {
        Self {
            signatures: vec![signature],
            compression: "none".to_string(),
            packed_context_free_data: String::new(),
            packed_trx: hex::encode(packed_trx),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PushTransactionResponse {
    pub transaction_id: String,
    #[serde(default)]
    pub processed: Option<ProcessedTransaction>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessedTransaction {
    #[serde(default)]
    pub block_num: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: Option<RpcErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorDetail {
    #[serde(default)]
    what: String,
    #[serde(default)]
    details: Vec<RpcErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorMessage {
    message: String,
}

/// Turns a nodeos error body into one readable line.
fn describe_rpc_error(body: &str) -> String {
    match serde_json::from_str::<RpcErrorBody>(body) {
        Ok(parsed) => {
            let mut parts = vec![parsed.message];
            if let Some(error) = parsed.error {
                parts.push(error.what);
                parts.extend(error.details.into_iter().map(|d| d.message));
            }
            parts.retain(|p| !p.is_empty());
            parts.join(": ")
        }
        Err(_) => body.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct EosRpcClient {
    http: reqwest::Client,
    endpoint: String,
}

impl EosRpcClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for chain RPC")?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<B: Serialize + ?Sized, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = format!("{}/v1/chain/{}", self.endpoint, path);
        debug!(%url, "Calling chain RPC");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", url))?;
        if !status.is_success() {
            anyhow::bail!("{} returned {}: {}", path, status, describe_rpc_error(&text));
        }
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {} response", path))
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn get_info(&self) -> Result<ChainInfo> {
        self.call("get_info", &json!({})).await
    }

    /// Encodes `args` for `code::action` using the ABI stored on chain.
    #[instrument(skip(self, args), level = "debug")]
    pub async fn abi_json_to_bin<A: Serialize + ?Sized>(&self, code: &str, action: &str, args: &A) -> Result<Vec<u8>> {
        let body = json!({ "code": code, "action": action, "args": args });
        let response: AbiJsonToBinResponse = self.call("abi_json_to_bin", &body).await?;
        hex::decode(&response.binargs).context("abi_json_to_bin returned non-hex binargs")
    }

    #[instrument(skip_all, level = "debug")]
    pub async fn push_transaction(&self, trx: &PackedTransaction) -> Result<PushTransactionResponse> {
        self.call("push_transaction", trx).await
    }
}
