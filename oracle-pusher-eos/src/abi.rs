use crate::{name::Name, pack::Packer, rpc::EosRpcClient};
use anyhow::Context;
use async_trait::async_trait;
use oracle_pusher_core::{AbiEncoder, AbiEncoding, PushError, PushResult, WriteArgs};

/// Delegates encoding to the chain's `abi_json_to_bin` endpoint.
#[derive(Debug, Clone)]
pub struct RemoteAbiEncoder {
    rpc: EosRpcClient,
}

impl RemoteAbiEncoder {
    pub fn new(rpc: EosRpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl AbiEncoder for RemoteAbiEncoder {
    async fn encode_write(&self, contract: &str, action: &str, args: &WriteArgs) -> PushResult<Vec<u8>> {
        self.rpc
            .abi_json_to_bin(contract, action, args)
            .await
            .with_context(|| format!("abi_json_to_bin failed for {}::{}", contract, action))
            .map_err(PushError::Encoding)
    }
}

/// Embedded encoder for `write(name owner, uint64 value)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalWriteEncoder;

#[async_trait]
impl AbiEncoder for LocalWriteEncoder {
    async fn encode_write(&self, _contract: &str, _action: &str, args: &WriteArgs) -> PushResult<Vec<u8>> {
        let owner: Name = args
            .owner
            .parse()
            .context("Owner is not a valid account name")
            .map_err(PushError::Encoding)?;
        let mut p = Packer::new();
        p.name(owner).u64(args.value);
        Ok(p.finish())
    }
}

/// Encoder selected from configuration at startup.
#[derive(Debug, Clone)]
pub enum EosAbiEncoder {
    Remote(RemoteAbiEncoder),
    Local(LocalWriteEncoder),
}

impl EosAbiEncoder {
    pub fn from_config(encoding: AbiEncoding, rpc: &EosRpcClient) -> Self {
        match encoding {
            AbiEncoding::Remote => EosAbiEncoder::Remote(RemoteAbiEncoder::new(rpc.clone())),
            AbiEncoding::Local => EosAbiEncoder::Local(LocalWriteEncoder),
        }
    }
}

#[async_trait]
impl AbiEncoder for EosAbiEncoder {
    async fn encode_write(&self, contract: &str, action: &str, args: &WriteArgs) -> PushResult<Vec<u8>> {
        match self {
            EosAbiEncoder::Remote(encoder) => encoder.encode_write(contract, action, args).await,
            EosAbiEncoder::Local(encoder) => encoder.encode_write(contract, action, args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn args() -> WriteArgs {
        WriteArgs {
            owner: "acct1".to_string(),
            value: 23456,
        }
    }

    #[tokio::test]
    async fn test_local_encoding() {
        let data = LocalWriteEncoder
            .encode_write("delphioracle", "write", &args())
            .await
            .unwrap();
        assert_eq!(hex::encode(data), "0000000080901132a05b000000000000");
    }

    #[tokio::test]
    async fn test_local_rejects_bad_owner() {
        let bad = WriteArgs {
            owner: "Not An Account".to_string(),
            value: 1,
        };
        let err = LocalWriteEncoder.encode_write("delphioracle", "write", &bad).await.unwrap_err();
        assert!(matches!(err, PushError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_remote_matches_local() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chain/abi_json_to_bin")
            .match_body(Matcher::PartialJson(json!({ "args": { "owner": "acct1", "value": 23456 } })))
            .with_status(200)
            .with_body(r#"{"binargs":"0000000080901132a05b000000000000"}"#)
            .create_async()
            .await;

        let rpc = EosRpcClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let remote = EosAbiEncoder::from_config(AbiEncoding::Remote, &rpc);
        let local = EosAbiEncoder::from_config(AbiEncoding::Local, &rpc);

        let remote_bin = remote.encode_write("delphioracle", "write", &args()).await.unwrap();
        let local_bin = local.encode_write("delphioracle", "write", &args()).await.unwrap();
        assert_eq!(remote_bin, local_bin);
    }

    #[tokio::test]
    async fn test_remote_failure_is_encoding_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chain/abi_json_to_bin")
            .with_status(500)
            .with_body(r#"{"code":500,"message":"Internal Service Error","error":{"what":"Unknown action write in contract delphioracle","details":[]}}"#)
            .create_async()
            .await;

        let rpc = EosRpcClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = RemoteAbiEncoder::new(rpc)
            .encode_write("delphioracle", "write", &args())
            .await
            .unwrap_err();
        assert!(matches!(err, PushError::Encoding(_)));
        assert!(err.to_string().contains("Unknown action write"));
    }
}
