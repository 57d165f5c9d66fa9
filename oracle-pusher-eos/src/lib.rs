pub mod abi;
pub mod keys;
pub mod name;
pub mod pack;
pub mod rpc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use keys::PrivateKey;
use oracle_pusher_core::{
    Broadcaster, BroadcastReceipt, OracleWriteAction, PushError, PushResult, SecretKey,
};
use pack::{PackedAction, Transaction};
use rpc::{ChainInfo, EosRpcClient, PackedTransaction};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

pub use abi::{EosAbiEncoder, LocalWriteEncoder, RemoteAbiEncoder};

/// Digest the chain expects signatures over:
/// `sha256(chain_id || packed_trx || sha256(context_free_data))`, where empty
/// context-free data contributes 32 zero bytes.
pub fn signing_digest(chain_id: &[u8; 32], packed_trx: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(chain_id);
    hasher.update(packed_trx);
    hasher.update([0u8; 32]);
    hasher.finalize().into()
}

/// EOSIO implementation of the Broadcaster trait.
#[derive(Debug, Clone)]
pub struct EosChain {
    rpc: EosRpcClient,
    expiration_secs: u32,
}

impl EosChain {
    pub fn new(rpc: EosRpcClient, expiration_secs: u32) -> Self {
        Self { rpc, expiration_secs }
    }

    /// Wraps one action in a transaction header referencing the last irreversible block.
    pub fn build_transaction(&self, info: &ChainInfo, action: &OracleWriteAction) -> Result<Transaction> {
        let action = PackedAction::try_from(action)?;
        Ok(Transaction {
            expiration: info.expiration(self.expiration_secs)?,
            ref_block_num: info.ref_block_num(),
            ref_block_prefix: info.ref_block_prefix()?,
            actions: vec![action],
        })
    }
}

#[async_trait]
impl Broadcaster for EosChain {
    #[instrument(skip_all, fields(endpoint = %self.rpc.endpoint(), contract = %action.contract), level = "info")]
    async fn sign_and_broadcast(
        &self,
        action: &OracleWriteAction,
        key: &SecretKey,
    ) -> PushResult<BroadcastReceipt> {
        // Parse the key before touching the network.
        let private_key = PrivateKey::parse(key.expose())
            .context("Failed to parse private key")
            .map_err(PushError::Signing)?;
        info!(public_key = %private_key.public_key(), "Signing with key");

        let chain_info = self
            .rpc
            .get_info()
            .await
            .context("Failed to fetch chain info")
            .map_err(PushError::Broadcast)?;
        let chain_id = chain_info.chain_id_bytes().map_err(PushError::Broadcast)?;

        let transaction = self
            .build_transaction(&chain_info, action)
            .context("Failed to build transaction")
            .map_err(PushError::Encoding)?;
        let packed = transaction.pack();
        debug!(
            expiration = transaction.expiration,
            ref_block_num = transaction.ref_block_num,
            ref_block_prefix = transaction.ref_block_prefix,
            packed_len = packed.len(),
            "Packed transaction"
        );

        let digest = signing_digest(&chain_id, &packed);
        let signature = private_key
            .sign_digest(&digest)
            .map_err(PushError::Signing)?;

        let response = self
            .rpc
            .push_transaction(&PackedTransaction::new(signature, &packed))
            .await
            .context("Transaction was not accepted")
            .map_err(PushError::Broadcast)?;

        info!(tx_id = %response.transaction_id, "Transaction submitted successfully.");
        Ok(BroadcastReceipt {
            transaction_id: response.transaction_id,
            block_num: response.processed.and_then(|p| p.block_num),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use oracle_pusher_core::{PermissionLevel, WriteArgs};
    use serde_json::json;
    use std::time::Duration;

    const WIF: &str = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3";
    const CHAIN_ID: &str = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";
    const INFO_BODY: &str = r#"{"chain_id":"aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906","head_block_num":1000,"last_irreversible_block_num":990,"last_irreversible_block_id":"000003de0102030405060708000000000000000000000000000000000000000000","head_block_time":"2018-06-01T12:00:00.000"}"#;

    fn write_action() -> OracleWriteAction {
        OracleWriteAction {
            contract: "delphioracle".to_string(),
            action: "write".to_string(),
            authorization: vec![PermissionLevel {
                actor: "acct1".to_string(),
                permission: "oracle".to_string(),
            }],
            args: WriteArgs {
                owner: "acct1".to_string(),
                value: 23456,
            },
            data: hex::decode("0000000080901132a05b000000000000").unwrap(),
        }
    }

    fn chain(url: String) -> EosChain {
        EosChain::new(EosRpcClient::new(url, Duration::from_secs(5)).unwrap(), 30)
    }

    #[test]
    fn test_signing_digest_layout() {
        let chain_id: [u8; 32] = hex::decode(CHAIN_ID).unwrap().try_into().unwrap();
        let mut manual = Vec::new();
        manual.extend_from_slice(&chain_id);
        manual.extend_from_slice(&[9, 9, 9]);
        manual.extend_from_slice(&[0u8; 32]);
        let expected: [u8; 32] = Sha256::digest(&manual).into();

        assert_eq!(signing_digest(&chain_id, &[9, 9, 9]), expected);
    }

    #[tokio::test]
    async fn test_sign_and_broadcast_submits_packed_transaction() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chain/get_info")
            .with_status(200)
            .with_body(INFO_BODY)
            .create_async()
            .await;

        let chain = chain(server.url());
        let info: ChainInfo = serde_json::from_str(INFO_BODY).unwrap();
        let expected_trx = chain.build_transaction(&info, &write_action()).unwrap();
        assert_eq!(expected_trx.expiration, 1527854430);
        assert_eq!(expected_trx.ref_block_num, 990);
        assert_eq!(expected_trx.ref_block_prefix, 0x0807_0605);

        let push = server
            .mock("POST", "/v1/chain/push_transaction")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({
                    "compression": "none",
                    "packed_context_free_data": "",
                    "packed_trx": hex::encode(expected_trx.pack()),
                })),
                Matcher::Regex(r#""signatures":\["SIG_K1_[1-9A-HJ-NP-Za-km-z]+"\]"#.to_string()),
            ]))
            .with_status(202)
            .with_body(r#"{"transaction_id":"f00d","processed":{"block_num":1001}}"#)
            .create_async()
            .await;

        let receipt = chain
            .sign_and_broadcast(&write_action(), &SecretKey::new(WIF.to_string()))
            .await
            .unwrap();

        push.assert_async().await;
        assert_eq!(
            receipt,
            BroadcastReceipt {
                transaction_id: "f00d".to_string(),
                block_num: Some(1001)
            }
        );
    }

    #[tokio::test]
    async fn test_bad_key_fails_before_rpc() {
        let mut server = mockito::Server::new_async().await;
        let info = server
            .mock("POST", "/v1/chain/get_info")
            .expect(0)
            .create_async()
            .await;

        let err = chain(server.url())
            .sign_and_broadcast(&write_action(), &SecretKey::new("5Knotakey".to_string()))
            .await
            .unwrap_err();

        info.assert_async().await;
        assert!(matches!(err, PushError::Signing(_)));
    }

    #[tokio::test]
    async fn test_rejected_transaction_is_broadcast_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chain/get_info")
            .with_status(200)
            .with_body(INFO_BODY)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/chain/push_transaction")
            .with_status(500)
            .with_body(r#"{"code":500,"message":"Internal Service Error","error":{"what":"Expired Transaction","details":[{"message":"expired transaction f00d"}]}}"#)
            .create_async()
            .await;

        let err = chain(server.url())
            .sign_and_broadcast(&write_action(), &SecretKey::new(WIF.to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, PushError::Broadcast(_)));
        assert!(err.to_string().contains("Expired Transaction"));
    }

    #[tokio::test]
    async fn test_unreachable_rpc_is_broadcast_error() {
        let err = chain("http://127.0.0.1:9".to_string())
            .sign_and_broadcast(&write_action(), &SecretKey::new(WIF.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PushError::Broadcast(_)));
    }
}
