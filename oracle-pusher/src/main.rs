use anyhow::{Context, Result};
use clap::Parser;
use oracle_pusher_core::{
    load_pusher_config, AbiEncoding, FileKeyStore, KrakenClient, PushOutcome, Pusher, PusherConfig,
    TransactionBuilder,
};
use oracle_pusher_eos::{rpc::EosRpcClient, EosAbiEncoder, EosChain};
use std::{fs::OpenOptions, path::PathBuf, sync::Mutex, time::Duration};
use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::{fmt, prelude::*};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Pushes the latest market price to an on-chain oracle", long_about = None)]
struct Args {
    /// Print logged info to screen.
    #[clap(short, long)]
    verbose: bool,

    /// Print debug info.
    #[clap(short, long)]
    debug: bool,

    /// Log file.
    #[clap(short, long, value_parser, default_value = "oracle-pusher.log")]
    log_file: PathBuf,

    /// Optional YAML file with pusher settings. Flags below override it.
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Chain API endpoint URI.
    #[clap(short = 'u', long, value_parser)]
    api_endpoint: Option<String>,

    /// Path to a file with the private key.
    #[clap(short, long, value_parser)]
    key: Option<PathBuf>,

    /// Account pushing the value.
    #[clap(short, long, value_parser)]
    owner: Option<String>,

    /// Currency pair to query from the ticker.
    #[clap(long, value_parser)]
    pair: Option<String>,

    /// Encode the action locally instead of calling abi_json_to_bin.
    #[clap(long)]
    local_abi: bool,
}

impl Args {
    fn into_config(self) -> Result<PusherConfig> {
        let mut config = match &self.config {
            Some(path) => load_pusher_config(path)
                .with_context(|| format!("Failed to load pusher config from {:?}", path))?,
            None => PusherConfig::default(),
        };
        if let Some(endpoint) = self.api_endpoint {
            config.api_endpoint = endpoint;
        }
        if let Some(key) = self.key {
            config.key_file = key;
        }
        if let Some(owner) = self.owner {
            config.owner = owner;
        }
        if let Some(pair) = self.pair {
            config.pair = pair;
        }
        if self.local_abi {
            config.abi_encoding = AbiEncoding::Local;
        }
        config.validate().context("Invalid pusher configuration")?;
        Ok(config)
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let level = if args.debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
        .with_context(|| format!("Failed to open log file {:?}", args.log_file))?;

    let file_layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
    let stdout_layer = args.verbose.then(|| fmt::layer().with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(level)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("Setting default tracing subscriber failed")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // --- Setup Logging ---
    init_logging(&args)?;
    debug!(?args, "Parsed command line arguments");

    // --- Load Configuration ---
    let config = args.into_config()?;
    let timeout = Duration::from_secs(config.http_timeout_secs);
    info!(
        endpoint = %config.api_endpoint,
        owner = %config.owner,
        pair = %config.pair,
        encoding = ?config.abi_encoding,
        "Starting oracle pusher"
    );

    // --- Initialize Components ---
    let kraken = KrakenClient::new(config.ticker_url.clone(), timeout)?;
    let rpc = EosRpcClient::new(config.api_endpoint.clone(), timeout)?;
    let encoder = EosAbiEncoder::from_config(config.abi_encoding, &rpc);
    let builder = TransactionBuilder::from_config(encoder, &config);
    let chain = EosChain::new(rpc, config.expiration_secs);
    let key_store = FileKeyStore::new(config.key_file.clone());

    let pusher = Pusher::new(&config, key_store, kraken, builder, chain);

    // --- Single push cycle ---
    // Failures are already logged by the pusher; the process still ends normally.
    match pusher.run().await {
        PushOutcome::Done { tick, receipt } => {
            info!(value = tick.value, tx_id = %receipt.transaction_id, "Push cycle complete");
        }
        PushOutcome::Failed { stage, .. } => {
            info!(%stage, "Push cycle aborted");
        }
    }
    Ok(())
}
