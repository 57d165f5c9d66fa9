use crate::{
    credentials::SecretKey,
    error::PushResult,
    types::{BroadcastReceipt, OracleWriteAction, WriteArgs},
};
use async_trait::async_trait;
use std::fmt::Debug;

/// Converts structured action arguments into the chain's binary argument format.
///
/// Implementors may call out to the chain RPC or encode locally; either way the
/// output must match what the contract ABI expects.
#[async_trait]
pub trait AbiEncoder: Send + Sync + Debug {
    /// Encodes `args` for `action` on `contract`.
    ///
    /// # Errors
    /// Any failure is reported as [`PushError::Encoding`](crate::PushError::Encoding).
    async fn encode_write(&self, contract: &str, action: &str, args: &WriteArgs) -> PushResult<Vec<u8>>;
}

/// Trait representing the target blockchain's submission layer.
///
/// This is the only network-mutating operation of a push. It is not idempotent:
/// every call produces a new transaction with a fresh expiration.
#[async_trait]
pub trait Broadcaster: Send + Sync + Debug {
    /// Wraps `action` in a transaction, signs it with `key`, and submits it.
    ///
    /// # Errors
    /// * [`PushError::Signing`](crate::PushError::Signing) when the key cannot be
    ///   parsed or used.
    /// * [`PushError::Broadcast`](crate::PushError::Broadcast) when the RPC cannot be
    ///   reached or rejects the transaction.
    async fn sign_and_broadcast(
        &self,
        action: &OracleWriteAction,
        key: &SecretKey,
    ) -> PushResult<BroadcastReceipt>;
}
