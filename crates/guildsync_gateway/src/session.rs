//! Shard session loop.

use crate::{
    CacheEventHandler, DispatchEvent, DispatchObserver, DispatchOutcome, DispatchRecord,
    RawDispatch, ReadyGate, SessionContext,
};
use derive_getters::Getters;
use guildsync_cache::FieldCacheConfig;
use guildsync_error::{ConfigError, GuildsyncResult};
use guildsync_shard::{HeartbeatTiming, PeriodicTask, ShardCount, ShardHeartbeat, ShardRegistry};
use guildsync_store::SharedStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, trace};

/// Settings of one shard session.
///
/// # Example
///
/// ```
/// use guildsync_gateway::SessionConfigBuilder;
/// use guildsync_shard::ShardCount;
///
/// let config = SessionConfigBuilder::default()
///     .shard_id(1u32)
///     .shard_count(ShardCount::new(2).unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(*config.shard_id(), 1);
///
/// let out_of_range = SessionConfigBuilder::default()
///     .shard_id(2u32)
///     .shard_count(ShardCount::new(2).unwrap())
///     .build();
/// assert!(out_of_range.is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_builder::Builder)]
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct SessionConfig {
    /// Shard this session serves
    shard_id: u32,
    /// Total shard count
    shard_count: ShardCount,
    /// Liveness marker timing
    #[builder(default)]
    heartbeat: HeartbeatTiming,
    /// Field cache of the guild handles the handlers create
    #[builder(default)]
    field_cache: FieldCacheConfig,
}

impl SessionConfigBuilder {
    /// Build the config, rejecting a shard ID outside the shard count.
    pub fn build(&self) -> GuildsyncResult<SessionConfig> {
        let config = self
            .build_internal()
            .map_err(|e| ConfigError::new(e.to_string()))?;
        if config.shard_id >= config.shard_count.get() {
            return Err(ConfigError::new(format!(
                "shard_id {} is outside shard_count {}",
                config.shard_id, config.shard_count
            ))
            .into());
        }
        Ok(config)
    }
}

/// One shard's event stream, processed strictly in arrival order.
///
/// Until the first `READY` is routed every other event is held by a
/// [`ReadyGate`]; afterwards events are decoded and handed to
/// [`CacheEventHandler`] one at a time, each awaited before the next.
/// Handler failures are logged and never end the stream.
///
/// A reconnect builds a new session.
pub struct ShardSession {
    config: SessionConfig,
    handler: CacheEventHandler,
    gate: ReadyGate,
    ctx: SessionContext,
    heartbeat: Option<PeriodicTask>,
    observer: Option<Arc<dyn DispatchObserver>>,
}

impl std::fmt::Debug for ShardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardSession")
            .field("config", &self.config)
            .field("ctx", &self.ctx)
            .field("ready", &self.gate.is_ready())
            .field("buffered", &self.gate.buffered())
            .field("connected", &self.heartbeat.is_some())
            .finish()
    }
}

impl ShardSession {
    /// Create a session over `store`.
    pub fn new(store: SharedStore, config: SessionConfig) -> Self {
        let registry = ShardRegistry::new(store.clone(), config.shard_count);
        let handler =
            CacheEventHandler::new(store, registry).with_cache_config(config.field_cache.clone());
        Self {
            ctx: SessionContext::new(config.shard_id),
            config,
            handler,
            gate: ReadyGate::new(),
            heartbeat: None,
            observer: None,
        }
    }

    /// Report every routed event to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// What the session has learned from ready.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// The ready gate.
    pub fn gate(&self) -> &ReadyGate {
        &self.gate
    }

    /// Whether the baseline has been applied.
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Registry the session maintains.
    pub fn registry(&self) -> &ShardRegistry {
        self.handler.registry()
    }

    /// Whether [`connect`](Self::connect) has succeeded.
    pub fn is_connected(&self) -> bool {
        self.heartbeat.is_some()
    }

    /// Check the shard count and start the liveness heartbeat.
    ///
    /// A shard count differing from the one the cache was built with fails
    /// with a fatal error and the session must not be run. Connecting twice
    /// is a no-op.
    #[instrument(skip(self), fields(shard_id = self.config.shard_id, shard_count = %self.config.shard_count))]
    pub async fn connect(&mut self) -> GuildsyncResult<()> {
        if self.heartbeat.is_some() {
            return Ok(());
        }
        self.registry().verify_shard_count().await?;

        let heartbeat = ShardHeartbeat::new(
            self.handler.store().clone(),
            self.config.shard_id,
            self.config.heartbeat,
        );
        heartbeat.beat().await?;
        self.heartbeat = Some(heartbeat.start());
        info!("Shard session connected");
        Ok(())
    }

    /// Feed one event through the gate.
    ///
    /// `READY` is routed at once and then the buffer is flushed oldest
    /// first; anything else waits until that has happened.
    pub async fn dispatch(&mut self, raw: RawDispatch) {
        if raw.is_ready() {
            self.route(raw).await;
            let buffered = self.gate.open();
            if !buffered.is_empty() {
                debug!(count = buffered.len(), "Flushing events buffered before ready");
            }
            for raw in buffered {
                self.route(raw).await;
            }
            return;
        }

        match self.gate.admit(raw) {
            Some(raw) => self.route(raw).await,
            None => trace!(buffered = self.gate.buffered(), "Event buffered until ready"),
        }
    }

    async fn route(&mut self, raw: RawDispatch) {
        let started = Instant::now();
        let name = raw.name.clone();

        let outcome = match DispatchEvent::decode(raw) {
            Ok(None) => {
                trace!(event = %name, "No handler for event");
                DispatchOutcome::Ignored
            }
            Ok(Some(event)) => match self.handler.handle(&mut self.ctx, event).await {
                Ok(()) => DispatchOutcome::Handled,
                Err(e) => {
                    error!(shard_id = self.ctx.shard_id(), event = %name, error = %e, "Event handler failed");
                    DispatchOutcome::Failed
                }
            },
            Err(e) => {
                error!(shard_id = self.ctx.shard_id(), event = %name, error = %e, "Event payload could not be decoded");
                DispatchOutcome::Failed
            }
        };

        if let Some(observer) = &self.observer {
            observer.on_dispatch(&DispatchRecord {
                name: &name,
                shard_id: self.ctx.shard_id(),
                elapsed: started.elapsed(),
                outcome,
            });
        }
    }

    /// Connect if needed, then process `events` until the sender closes.
    pub async fn run(&mut self, mut events: mpsc::Receiver<RawDispatch>) -> GuildsyncResult<()> {
        self.connect().await?;
        while let Some(raw) = events.recv().await {
            self.dispatch(raw).await;
        }
        info!(shard_id = self.ctx.shard_id(), "Event stream closed");
        self.shutdown().await;
        Ok(())
    }

    /// Stop the heartbeat. The liveness marker lapses after its expiry.
    pub async fn shutdown(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop().await;
        }
    }
}
