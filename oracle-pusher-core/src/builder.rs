use crate::{
    chain::AbiEncoder,
    config::PusherConfig,
    error::{PushError, PushResult},
    types::{OracleWriteAction, PermissionLevel, PriceTick, WriteArgs},
};
use tracing::debug;

/// Turns a price tick into an encoded oracle `write` action.
#[derive(Debug)]
pub struct TransactionBuilder<E: AbiEncoder> {
    encoder: E,
    contract: String,
    action: String,
    permission: String,
}

impl<E: AbiEncoder> TransactionBuilder<E> {
    pub fn new(
        encoder: E,
        contract: impl Into<String>,
        action: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            encoder,
            contract: contract.into(),
            action: action.into(),
            permission: permission.into(),
        }
    }

    pub fn from_config(encoder: E, config: &PusherConfig) -> Self {
        Self::new(
            encoder,
            config.contract.clone(),
            config.action.clone(),
            config.permission.clone(),
        )
    }

    /// Validates the inputs and encodes `{owner, value}` through the ABI encoder.
    pub async fn build(&self, tick: &PriceTick, owner: &str) -> PushResult<OracleWriteAction> {
        if tick.value <= 0 {
            return Err(PushError::Validation(format!(
                "tick value must be positive, got {} for {}",
                tick.value, tick.pair
            )));
        }
        if owner.trim().is_empty() {
            return Err(PushError::Validation("owner account must not be empty".to_string()));
        }

        let args = WriteArgs {
            owner: owner.to_string(),
            // Positive i64 always fits.
            value: tick.value as u64,
        };
        let data = self
            .encoder
            .encode_write(&self.contract, &self.action, &args)
            .await?;
        debug!(
            contract = %self.contract,
            action = %self.action,
            owner,
            value = args.value,
            data_len = data.len(),
            "Encoded oracle write action"
        );

        Ok(OracleWriteAction {
            contract: self.contract.clone(),
            action: self.action.clone(),
            authorization: vec![PermissionLevel {
                actor: owner.to_string(),
                permission: self.permission.clone(),
            }],
            args,
            data,
        })
    }
}
