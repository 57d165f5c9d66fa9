use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scale applied to market prices before they are written on-chain (4 decimals).
pub const PRICE_SCALE: i64 = 10_000;

/// A normalized price observation for a single currency pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    /// Pair identifier as understood by the market-data source (e.g. "EOSUSD").
    pub pair: String,
    /// Price scaled by [`PRICE_SCALE`] and truncated toward zero.
    pub value: i64,
    /// When the tick was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl PriceTick {
    pub fn new(pair: impl Into<String>, value: i64) -> Self {
        Self {
            pair: pair.into(),
            value,
            fetched_at: Utc::now(),
        }
    }
}

/// Structured arguments of the oracle `write` action, in ABI field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteArgs {
    pub owner: String,
    pub value: u64,
}

/// An `actor@permission` pair authorizing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionLevel {
    pub actor: String,
    pub permission: String,
}

/// A fully-built oracle write, ready to be wrapped in a transaction and signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleWriteAction {
    /// Account the oracle contract is deployed to.
    pub contract: String,
    /// Action name on the contract.
    pub action: String,
    pub authorization: Vec<PermissionLevel>,
    pub args: WriteArgs,
    /// ABI-encoded `args`.
    pub data: Vec<u8>,
}

/// What the chain told us after accepting a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReceipt {
    pub transaction_id: String,
    pub block_num: Option<u32>,
}
