//! Choosing between the live host and the headless engine.
//!
//! The chosen backend lives in a slot guarded by an async mutex that is
//! held for the whole initialization. Callers arriving while a live probe
//! is in flight queue on the lock and then find the slot filled, so there
//! is never more than one initialization attempt at a time.

use crate::backend::{Backend, HeadlessEngine, LiveBackend};
use crate::channel::Channel;
use crate::commands::CommandTable;
use crate::config::{BackendMode, BridgeConfig};
use crate::discovery;
use crate::error::CoreError;
use crate::error::channel::ChannelError;
use crate::error::selector::SelectorError;
use crate::storage::IpcDirectory;
use crate::trigger::{SignalSink, Trigger};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use log::{debug, info, warn};
use models::{BackendKind, ErrorKind, Params};
use serde_json::Value;
use tokio::sync::Mutex;

/// Establishes a live backend, or reports why none is reachable.
pub trait LiveConnector: Send + Sync {
    fn connect(&self) -> BoxFuture<'_, Result<Arc<dyn Backend>, CoreError>>;
}

/// Connects through a [`Channel`] on a shared directory.
///
/// Before probing it optionally checks the process table for the host,
/// and sweeps artifacts left behind by earlier sessions.
pub struct ChannelConnector {
    directory: IpcDirectory,
    sink: Arc<dyn SignalSink>,
    table: Arc<CommandTable>,
    poll_interval: Duration,
    call_timeout: Duration,
    probe_timeout: Duration,
    stale_threshold: Duration,
    host_process: Option<String>,
}

impl ChannelConnector {
    pub fn new(directory: IpcDirectory, sink: Arc<dyn SignalSink>, table: Arc<CommandTable>) -> Self {
        Self::from_config(&BridgeConfig::default(), sink, table).with_directory(directory)
    }

    pub fn from_config(
        config: &BridgeConfig,
        sink: Arc<dyn SignalSink>,
        table: Arc<CommandTable>,
    ) -> Self {
        Self {
            directory: IpcDirectory::new(config.ipc_dir()),
            sink,
            table,
            poll_interval: config.poll_interval(),
            call_timeout: config.call_timeout(),
            probe_timeout: config.probe_timeout(),
            stale_threshold: config.stale_threshold(),
            host_process: config.host.process_name.clone(),
        }
    }

    pub fn with_directory(mut self, directory: IpcDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeouts(mut self, call_timeout: Duration, probe_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn with_host_process(mut self, host_process: Option<String>) -> Self {
        self.host_process = host_process;
        self
    }

    async fn establish(&self) -> Result<Arc<dyn Backend>, CoreError> {
        if let Some(name) = self.host_process.clone() {
            let running = tokio::task::spawn_blocking({
                let name = name.clone();
                move || discovery::is_host_running(&name)
            })
            .await
            .unwrap_or(false);

            if !running {
                return Err(SelectorError::InitFailure {
                    message: format!("host process '{name}' is not running"),
                    location: ErrorLocation::from(Location::caller()),
                }
                .into());
            }
        }

        self.directory.ensure_exists().map_err(ChannelError::from)?;
        match self.directory.sweep_stale(self.stale_threshold) {
            Ok(0) => {}
            Ok(removed) => info!("Swept {removed} stale artifact(s) from {}", self.directory.root().display()),
            Err(e) => warn!("Stale sweep of {} failed: {e}", self.directory.root().display()),
        }

        let channel = Channel::new(self.directory.clone(), Trigger::new(self.sink.clone()))
            .with_poll_interval(self.poll_interval);
        let backend = LiveBackend::new(
            channel,
            self.table.clone(),
            self.call_timeout,
            self.probe_timeout,
        );

        backend.ping().await?;
        info!("Live host answered at {}", self.directory.root().display());
        Ok(Arc::new(backend))
    }
}

impl LiveConnector for ChannelConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Arc<dyn Backend>, CoreError>> {
        self.establish().boxed()
    }
}

pub struct BackendSelector {
    mode: BackendMode,
    table: Arc<CommandTable>,
    connector: Arc<dyn LiveConnector>,
    slot: Mutex<Option<Arc<dyn Backend>>>,
}

impl BackendSelector {
    pub fn new(mode: BackendMode, table: Arc<CommandTable>, connector: Arc<dyn LiveConnector>) -> Self {
        Self {
            mode,
            table,
            connector,
            slot: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    pub fn table(&self) -> &Arc<CommandTable> {
        &self.table
    }

    /// Kind of the selected backend, `None` before the first selection.
    pub async fn current_kind(&self) -> Option<BackendKind> {
        self.slot.lock().await.as_ref().map(|backend| backend.kind())
    }

    /// The selected backend, initializing it on first use.
    pub async fn select(&self) -> Result<Arc<dyn Backend>, SelectorError> {
        let mut slot = self.slot.lock().await;

        if let Some(backend) = slot.as_ref() {
            return Ok(backend.clone());
        }

        let backend = self.initialize().await?;
        info!("Selected {} backend (mode {})", backend.kind(), self.mode);
        *slot = Some(backend.clone());
        Ok(backend)
    }

    /// Forget the selected backend; the next call selects again.
    pub async fn invalidate(&self) {
        if self.slot.lock().await.take().is_some() {
            debug!("Backend selection cleared");
        }
    }

    /// Execute through the selected backend.
    ///
    /// When a live backend fails at the channel level and then fails a
    /// health check, the selection is cleared. The failed call itself is
    /// not retried.
    pub async fn execute(&self, command: &str, params: &Params) -> Result<Value, CoreError> {
        let backend = self.select().await?;
        let result = backend.execute(command, params).await;

        if let Err(e) = &result
            && backend.kind() == BackendKind::Live
            && matches!(e.kind(), ErrorKind::Timeout | ErrorKind::ChannelIo)
            && !backend.health().await
        {
            let mut slot = self.slot.lock().await;
            if slot
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &backend))
            {
                warn!("Live backend unhealthy after '{command}', clearing selection");
                *slot = None;
            }
        }

        result
    }

    async fn initialize(&self) -> Result<Arc<dyn Backend>, SelectorError> {
        match self.mode {
            BackendMode::Headless => Ok(self.headless()),
            BackendMode::Live => self.connector.connect().await.map_err(|e| {
                SelectorError::InitFailure {
                    message: format!("live backend unavailable: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                }
            }),
            BackendMode::Auto => match self.connector.connect().await {
                Ok(backend) => Ok(backend),
                Err(e) => {
                    info!("No live host ({e}), falling back to headless");
                    Ok(self.headless())
                }
            },
        }
    }

    fn headless(&self) -> Arc<dyn Backend> {
        Arc::new(HeadlessEngine::new(self.table.clone()))
    }
}
