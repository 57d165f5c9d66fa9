pub mod builder;
pub mod chain;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod price;
pub mod types;

// Re-export key types/functions for easier use by other crates
pub use builder::TransactionBuilder;
pub use chain::{AbiEncoder, Broadcaster};
pub use config::{load_pusher_config, AbiEncoding, PusherConfig};
pub use controller::{PushOutcome, Pusher};
pub use credentials::{FileKeyStore, KeyStore, SecretKey};
pub use error::{PushError, PushResult, Stage};
pub use price::{KrakenClient, PriceSource};
pub use types::{BroadcastReceipt, OracleWriteAction, PermissionLevel, PriceTick, WriteArgs};
