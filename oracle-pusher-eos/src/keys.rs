//! secp256k1 ("K1") keys and signatures in EOSIO text formats.

use anyhow::{anyhow, Context, Result};
use k256::ecdsa::{
    signature::hazmat::{PrehashSigner, RandomizedPrehashSigner},
    RecoveryId, Signature, SigningKey,
};
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::fmt::{self, Debug, Formatter};
use zeroize::Zeroizing;

const WIF_VERSION: u8 = 0x80;
const PVT_K1_PREFIX: &str = "PVT_K1_";
const SIG_K1_PREFIX: &str = "SIG_K1_";
const PUB_PREFIX: &str = "EOS";
const MAX_SIGNING_ATTEMPTS: usize = 64;
const K1_SUFFIX: &[u8] = b"K1";

fn ripemd160(parts: &[&[u8]]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// A K1 private key. The underlying scalar is wiped on drop.
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key())
            .finish()
    }
}

impl PrivateKey {
    /// Parses a legacy WIF (`5...`) or `PVT_K1_...` private key.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let secret = match text.strip_prefix(PVT_K1_PREFIX) {
            Some(body) => decode_pvt_k1(body)?,
            None => decode_wif(text)?,
        };
        let signing_key = SigningKey::from_slice(secret.as_slice())
            .map_err(|_| anyhow!("Private key is not a valid secp256k1 scalar"))?;
        Ok(Self { signing_key })
    }

    /// Public key in legacy `EOS...` format.
    pub fn public_key(&self) -> String {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let compressed = point.as_bytes();
        let checksum = ripemd160(&[compressed]);
        let mut data = compressed.to_vec();
        data.extend_from_slice(&checksum[..4]);
        format!("{}{}", PUB_PREFIX, bs58::encode(data).into_string())
    }

    /// Signs a 32-byte digest and returns a canonical `SIG_K1_...` signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<String> {
        for attempt in 0..MAX_SIGNING_ATTEMPTS {
            let signed = if attempt == 0 {
                PrehashSigner::<Signature>::sign_prehash(&self.signing_key, digest)
            } else {
                RandomizedPrehashSigner::<Signature>::sign_prehash_with_rng(&self.signing_key, &mut OsRng, digest)
            };
            let signature = signed.map_err(|e| anyhow!("Failed to sign transaction digest: {}", e))?;
            let signature = signature.normalize_s().unwrap_or(signature);

            let rs = signature.to_bytes();
            if !is_canonical(&rs) {
                continue;
            }
            let recovery_id =
                RecoveryId::trial_recovery_from_prehash(self.signing_key.verifying_key(), digest, &signature)
                    .map_err(|e| anyhow!("Failed to compute signature recovery id: {}", e))?;
            return Ok(encode_signature(recovery_id, &rs));
        }
        anyhow::bail!(
            "No canonical signature found after {} attempts",
            MAX_SIGNING_ATTEMPTS
        )
    }
}

fn decode_wif(text: &str) -> Result<Zeroizing<Vec<u8>>> {
    let data = Zeroizing::new(
        bs58::decode(text)
            .into_vec()
            .context("Private key is not valid base58")?,
    );
    if data.len() != 37 || data[0] != WIF_VERSION {
        anyhow::bail!("Private key is not a WIF key");
    }
    let checksum = double_sha256(&data[..33]);
    if checksum[..4] != data[33..] {
        anyhow::bail!("Private key checksum mismatch");
    }
    Ok(Zeroizing::new(data[1..33].to_vec()))
}

fn decode_pvt_k1(body: &str) -> Result<Zeroizing<Vec<u8>>> {
    let data = Zeroizing::new(
        bs58::decode(body)
            .into_vec()
            .context("Private key is not valid base58")?,
    );
    if data.len() != 36 {
        anyhow::bail!("PVT_K1 key has wrong length");
    }
    let checksum = ripemd160(&[&data[..32], K1_SUFFIX]);
    if checksum[..4] != data[32..] {
        anyhow::bail!("Private key checksum mismatch");
    }
    Ok(Zeroizing::new(data[..32].to_vec()))
}

/// The chain only accepts signatures whose r and s have no high bit set and no
/// redundant leading zero byte.
fn is_canonical(rs: &[u8]) -> bool {
    let (r, s) = rs.split_at(32);
    r[0] & 0x80 == 0
        && !(r[0] == 0 && r[1] & 0x80 == 0)
        && s[0] & 0x80 == 0
        && !(s[0] == 0 && s[1] & 0x80 == 0)
}

fn encode_signature(recovery_id: RecoveryId, rs: &[u8]) -> String {
    let mut data = Vec::with_capacity(69);
    // compact + compressed header
    data.push(recovery_id.to_byte() + 27 + 4);
    data.extend_from_slice(rs);
    let checksum = ripemd160(&[&data[..], K1_SUFFIX]);
    data.extend_from_slice(&checksum[..4]);
    format!("{}{}", SIG_K1_PREFIX, bs58::encode(data).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::VerifyingKey;

    const WIF: &str = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3";
    const PVT_K1: &str = "PVT_K1_2bfGi9rYsXQSXXTvJbDAPhHLQUojjaNLomdm3cEJ1XTzMqUt3V";
    const PUBLIC: &str = "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV";

    #[test]
    fn test_wif_public_key() {
        let key = PrivateKey::parse(WIF).unwrap();
        assert_eq!(key.public_key(), PUBLIC);
    }

    #[test]
    fn test_pvt_k1_public_key() {
        let key = PrivateKey::parse(PVT_K1).unwrap();
        assert_eq!(key.public_key(), PUBLIC);
    }

    #[test]
    fn test_rejects_bad_checksum() {
        // last character changed
        assert!(PrivateKey::parse("5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD4").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(PrivateKey::parse("not-a-key").is_err());
        assert!(PrivateKey::parse("").is_err());
        assert!(PrivateKey::parse("PVT_K1_abc").is_err());
    }

    #[test]
    fn test_debug_shows_only_public_key() {
        let key = PrivateKey::parse(WIF).unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains(PUBLIC));
        assert!(!debug.contains(WIF));
    }

    #[test]
    fn test_signature_recovers_signer() {
        let key = PrivateKey::parse(WIF).unwrap();
        let digest: [u8; 32] = Sha256::digest(b"delphioracle write").into();

        let sig = key.sign_digest(&digest).unwrap();
        let body = sig.strip_prefix(SIG_K1_PREFIX).unwrap();
        let data = bs58::decode(body).into_vec().unwrap();
        assert_eq!(data.len(), 69);

        let checksum = ripemd160(&[&data[..65], K1_SUFFIX]);
        assert_eq!(&checksum[..4], &data[65..]);
        assert!(is_canonical(&data[1..65]));

        let recovery_id = RecoveryId::from_byte(data[0] - 31).unwrap();
        let signature = Signature::from_slice(&data[1..65]).unwrap();
        let recovered = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id).unwrap();
        assert_eq!(&recovered, key.signing_key.verifying_key());
    }

    #[test]
    fn test_canonical_rules() {
        let mut rs = [0x11u8; 64];
        assert!(is_canonical(&rs));
        rs[0] = 0x80;
        assert!(!is_canonical(&rs));
        rs[0] = 0x00;
        rs[1] = 0x10;
        assert!(!is_canonical(&rs));
        rs[1] = 0x90;
        assert!(is_canonical(&rs));
        rs[32] = 0xff;
        assert!(!is_canonical(&rs));
    }
}
