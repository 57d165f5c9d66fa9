use crate::error::{PushError, PushResult};
use anyhow::{anyhow, Context};
use std::{
    fmt::{self, Debug, Formatter},
    fs,
    path::PathBuf,
};
use tracing::debug;
use zeroize::Zeroizing;

/// Private key text as read from the credential store.
///
/// The buffer is wiped when dropped and never shows up in `Debug` output.
pub struct SecretKey(Zeroizing<String>);

impl SecretKey {
    pub fn new(key: String) -> Self {
        Self(Zeroizing::new(key))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Source of the signing key for a run.
pub trait KeyStore: Send + Sync + Debug {
    fn load(&self) -> PushResult<SecretKey>;
}

/// Reads a single private key string from a file.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self) -> PushResult<SecretKey> {
        debug!(path = %self.path.display(), "Reading private key file");
        let raw = Zeroizing::new(
            fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read private key file: {}", self.path.display()))
                .map_err(PushError::Config)?,
        );
        // Strip the trailing newline and any surrounding whitespace.
        let key = raw.trim();
        if key.is_empty() {
            return Err(PushError::Config(anyhow!(
                "Private key file is empty: {}",
                self.path.display()
            )));
        }
        Ok(SecretKey::new(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_trims_newline() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3").unwrap();

        let key = FileKeyStore::new(file.path()).load().unwrap();
        assert_eq!(key.expose(), "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = FileKeyStore::new("/no/such/oracle.key").load().unwrap_err();
        assert!(matches!(err, PushError::Config(_)));
        assert!(err.to_string().contains("Failed to read private key file"));
    }

    #[test]
    fn test_load_blank_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "  \n").unwrap();

        let err = FileKeyStore::new(file.path()).load().unwrap_err();
        assert!(matches!(err, PushError::Config(_)));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SecretKey::new("5Ksecret".to_string());
        assert_eq!(format!("{:?}", key), "SecretKey(<redacted>)");
    }
}
