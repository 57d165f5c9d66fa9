use crate::{
    builder::TransactionBuilder,
    chain::{AbiEncoder, Broadcaster},
    config::PusherConfig,
    credentials::{KeyStore, SecretKey},
    error::{PushError, Stage},
    price::PriceSource,
    types::{BroadcastReceipt, OracleWriteAction, PriceTick},
};
use tracing::{debug, error, info, instrument};

/// Terminal state of a push cycle.
#[derive(Debug)]
pub enum PushOutcome {
    Done {
        tick: PriceTick,
        receipt: BroadcastReceipt,
    },
    Failed {
        stage: Stage,
        error: PushError,
    },
}

impl PushOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, PushOutcome::Done { .. })
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            PushOutcome::Failed { stage, .. } => Some(*stage),
            PushOutcome::Done { .. } => None,
        }
    }
}

// The key travels with the state so it is dropped, and wiped, on every exit path.
enum PushState {
    LoadKey,
    FetchPrice {
        key: SecretKey,
    },
    BuildTransaction {
        key: SecretKey,
        tick: PriceTick,
    },
    Broadcast {
        key: SecretKey,
        tick: PriceTick,
        action: OracleWriteAction,
    },
}

/// Runs LoadKey → FetchPrice → BuildTransaction → Broadcast exactly once,
/// stopping at the first failing stage.
#[derive(Debug)]
pub struct Pusher<K, S, E, B>
where
    K: KeyStore,
    S: PriceSource,
    E: AbiEncoder,
    B: Broadcaster,
{
    key_store: K,
    price_source: S,
    builder: TransactionBuilder<E>,
    broadcaster: B,
    pair: String,
    owner: String,
}

impl<K, S, E, B> Pusher<K, S, E, B>
where
    K: KeyStore,
    S: PriceSource,
    E: AbiEncoder,
    B: Broadcaster,
{
    pub fn new(
        config: &PusherConfig,
        key_store: K,
        price_source: S,
        builder: TransactionBuilder<E>,
        broadcaster: B,
    ) -> Self {
        Self {
            key_store,
            price_source,
            builder,
            broadcaster,
            pair: config.pair.clone(),
            owner: config.owner.clone(),
        }
    }

    /// Performs one push cycle. Failures are logged and returned, never raised.
    #[instrument(skip_all, name = "push_cycle", fields(pair = %self.pair, owner = %self.owner))]
    pub async fn run(&self) -> PushOutcome {
        let mut state = PushState::LoadKey;
        loop {
            state = match state {
                PushState::LoadKey => {
                    debug!(stage = %Stage::LoadKey, "Entering stage");
                    match self.key_store.load() {
                        Ok(key) => PushState::FetchPrice { key },
                        Err(e) => return fail(Stage::LoadKey, e),
                    }
                }
                PushState::FetchPrice { key } => {
                    debug!(stage = %Stage::FetchPrice, "Entering stage");
                    match self.price_source.fetch(&self.pair).await {
                        Ok(tick) => PushState::BuildTransaction { key, tick },
                        Err(e) => return fail(Stage::FetchPrice, e),
                    }
                }
                PushState::BuildTransaction { key, tick } => {
                    debug!(stage = %Stage::BuildTransaction, value = tick.value, "Entering stage");
                    match self.builder.build(&tick, &self.owner).await {
                        Ok(action) => PushState::Broadcast { key, tick, action },
                        Err(e) => return fail(Stage::BuildTransaction, e),
                    }
                }
                PushState::Broadcast { key, tick, action } => {
                    debug!(stage = %Stage::Broadcast, "Entering stage");
                    return match self.broadcaster.sign_and_broadcast(&action, &key).await {
                        Ok(receipt) => {
                            info!(
                                value = tick.value,
                                tx_id = %receipt.transaction_id,
                                block_num = ?receipt.block_num,
                                "Pushed price to oracle"
                            );
                            PushOutcome::Done { tick, receipt }
                        }
                        Err(e) => fail(Stage::Broadcast, e),
                    };
                }
            };
        }
    }
}

fn fail(stage: Stage, error: PushError) -> PushOutcome {
    error!(%stage, kind = error.kind(), error = %error, "Push cycle failed");
    PushOutcome::Failed { stage, error }
}
