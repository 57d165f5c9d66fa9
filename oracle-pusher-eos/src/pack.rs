//! Binary serialization of EOSIO transactions.

use crate::name::Name;
use anyhow::{Context, Result};
use oracle_pusher_core::OracleWriteAction;

/// Little-endian byte writer following the chain's packing rules.
#[derive(Debug, Default)]
pub struct Packer {
    buf: Vec<u8>,
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn varuint32(&mut self, mut v: u32) -> &mut Self {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                return self;
            }
            self.buf.push(byte | 0x80);
        }
    }

    pub fn name(&mut self, name: Name) -> &mut Self {
        self.u64(name.value())
    }

    /// Length-prefixed byte string.
    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.varuint32(data.len() as u32);
        self.buf.extend_from_slice(data);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPermission {
    pub actor: Name,
    pub permission: Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedAction {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PackedPermission>,
    pub data: Vec<u8>,
}

impl TryFrom<&OracleWriteAction> for PackedAction {
    type Error = anyhow::Error;

    fn try_from(action: &OracleWriteAction) -> Result<Self> {
        let authorization = action
            .authorization
            .iter()
            .map(|level| {
                Ok(PackedPermission {
                    actor: level.actor.parse().context("Invalid authorization actor")?,
                    permission: level.permission.parse().context("Invalid authorization permission")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            account: action.contract.parse().context("Invalid contract account")?,
            name: action.action.parse().context("Invalid action name")?,
            authorization,
            data: action.data.clone(),
        })
    }
}

/// Transaction header plus actions. Resource limits, delay, context-free
/// actions and extensions are always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Seconds since the unix epoch.
    pub expiration: u32,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub actions: Vec<PackedAction>,
}

impl Transaction {
    pub fn pack(&self) -> Vec<u8> {
        let mut p = Packer::new();
        p.u32(self.expiration)
            .u16(self.ref_block_num)
            .u32(self.ref_block_prefix)
            .varuint32(0) // max_net_usage_words
            .u8(0) // max_cpu_usage_ms
            .varuint32(0) // delay_sec
            .varuint32(0); // context_free_actions
        p.varuint32(self.actions.len() as u32);
        for action in &self.actions {
            p.name(action.account).name(action.name);
            p.varuint32(action.authorization.len() as u32);
            for level in &action.authorization {
                p.name(level.actor).name(level.permission);
            }
            p.bytes(&action.data);
        }
        p.varuint32(0); // transaction_extensions
        p.finish()
    }
}
