use crate::helpers::{TEST_POLL_INTERVAL, embedded_sink, shared_directory};

use bridge_core::backend::{Backend, HeadlessEngine};
use bridge_core::commands::CommandTable;
use bridge_core::config::BackendMode;
use bridge_core::error::CoreError;
use bridge_core::error::channel::ChannelError;
use bridge_core::error::selector::SelectorError;
use bridge_core::selector::{BackendSelector, ChannelConnector, LiveConnector};
use bridge_core::trigger::NullSink;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use models::{BackendKind, ErrorKind, Params};
use serde_json::{Value, json};

/// Counts attempts; succeeds with a headless engine after a delay.
struct SlowConnector {
    attempts: AtomicUsize,
    table: Arc<CommandTable>,
}

impl LiveConnector for SlowConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Arc<dyn Backend>, CoreError>> {
        async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(Arc::new(HeadlessEngine::new(self.table.clone())) as Arc<dyn Backend>)
        }
        .boxed()
    }
}

/// Counts attempts; always fails.
#[derive(Default)]
struct UnreachableConnector {
    attempts: AtomicUsize,
}

impl LiveConnector for UnreachableConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Arc<dyn Backend>, CoreError>> {
        async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(SelectorError::InitFailure {
                message: "no host answered".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
            .into())
        }
        .boxed()
    }
}

/// A live backend whose host has died: every call times out.
struct DeadHost;

impl Backend for DeadHost {
    fn kind(&self) -> BackendKind {
        BackendKind::Live
    }

    fn execute<'a>(
        &'a self,
        _command: &'a str,
        _params: &'a Params,
    ) -> BoxFuture<'a, Result<Value, CoreError>> {
        async {
            Err(ChannelError::Timeout {
                message: "no response".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
            .into())
        }
        .boxed()
    }

    fn health(&self) -> BoxFuture<'_, bool> {
        async { false }.boxed()
    }
}

#[derive(Default)]
struct DeadHostConnector {
    attempts: AtomicUsize,
}

impl LiveConnector for DeadHostConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Arc<dyn Backend>, CoreError>> {
        async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(DeadHost) as Arc<dyn Backend>)
        }
        .boxed()
    }
}

/// **VALUE**: Verifies single-flight initialization under concurrency.
///
/// **WHY THIS MATTERS**: Each live probe writes to shared storage and pokes the
/// host console. Concurrent first calls must share one probe, or the host sees a
/// burst of pings and callers end up holding different backends.
///
/// **BUG THIS CATCHES**: Would catch releasing the slot lock while connecting
/// (check, unlock, connect, lock, store).
#[tokio::test]
async fn given_concurrent_first_calls_when_selecting_then_one_initialization() {
    // GIVEN: A slow connector behind a live-mode selector
    let table = Arc::new(CommandTable::builtin(false));
    let connector = Arc::new(SlowConnector {
        attempts: AtomicUsize::new(0),
        table: table.clone(),
    });
    let selector = BackendSelector::new(BackendMode::Live, table, connector.clone());

    // WHEN: Eight callers select at once
    let selected = join_all((0..8).map(|_| selector.select())).await;

    // THEN: One attempt, and every caller holds the same backend
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    let backends: Vec<Arc<dyn Backend>> = selected.into_iter().map(Result::unwrap).collect();
    assert!(backends.iter().all(|backend| Arc::ptr_eq(backend, &backends[0])));
}

/// **VALUE**: Verifies single-flight initialization in auto mode, whether the
/// live probe succeeds or falls back.
///
/// **WHY THIS MATTERS**: Auto is the default mode. A failed probe is not an error
/// there, so a broken guard would let every queued caller probe again and end up
/// with its own headless engine and its own drawing.
///
/// **BUG THIS CATCHES**: Would catch the fallback result not being stored in the
/// slot, so only successful probes are shared.
#[tokio::test]
async fn given_auto_mode_and_concurrent_first_calls_when_selecting_then_one_probe_shared() {
    // GIVEN: One auto selector with a reachable host and one without
    let table = Arc::new(CommandTable::builtin(false));
    let reachable = Arc::new(SlowConnector {
        attempts: AtomicUsize::new(0),
        table: table.clone(),
    });
    let unreachable = Arc::new(UnreachableConnector::default());
    let with_host = BackendSelector::new(BackendMode::Auto, table.clone(), reachable.clone());
    let without_host = BackendSelector::new(BackendMode::Auto, table, unreachable.clone());

    // WHEN: Eight callers select at once on each
    let from_host = join_all((0..8).map(|_| with_host.select())).await;
    let from_fallback = join_all((0..8).map(|_| without_host.select())).await;

    // THEN: One probe each, and every caller holds the same backend
    assert_eq!(reachable.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(unreachable.attempts.load(Ordering::SeqCst), 1);
    for selected in [from_host, from_fallback] {
        let backends: Vec<Arc<dyn Backend>> = selected.into_iter().map(Result::unwrap).collect();
        assert!(backends.iter().all(|backend| Arc::ptr_eq(backend, &backends[0])));
    }
    assert_eq!(without_host.current_kind().await, Some(BackendKind::Headless));
}

/// **VALUE**: Verifies the fallback in auto mode.
///
/// **WHY THIS MATTERS**: Most callers do not care where commands run; without a
/// host they should still get working geometry operations.
///
/// **BUG THIS CATCHES**: Would catch an auto-mode probe failure being surfaced to
/// the caller.
#[tokio::test]
async fn given_auto_mode_and_no_host_when_executing_then_headless_answers() {
    // GIVEN: Auto mode with an unreachable host
    let connector = Arc::new(UnreachableConnector::default());
    let selector = BackendSelector::new(
        BackendMode::Auto,
        Arc::new(CommandTable::builtin(false)),
        connector.clone(),
    );

    // WHEN: Executing ping twice
    let first = selector.execute("ping", &Params::new()).await.unwrap();
    selector.execute("ping", &Params::new()).await.unwrap();

    // THEN: Headless answered and the probe ran once
    assert_eq!(first, json!({ "pong": true }));
    assert_eq!(selector.current_kind().await, Some(BackendKind::Headless));
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
}

/// **VALUE**: Verifies that an explicit live mode never falls back.
///
/// **WHY THIS MATTERS**: A caller who asked for the live host and silently got an
/// in-memory document would lose every change when the process exits.
///
/// **BUG THIS CATCHES**: Would catch auto-mode fallback applied to explicit modes,
/// or a failed attempt being cached so the host is never retried.
#[tokio::test]
async fn given_live_mode_and_no_host_when_selecting_then_init_failure_and_retry_later() {
    // GIVEN: Live mode with an unreachable host
    let connector = Arc::new(UnreachableConnector::default());
    let selector = BackendSelector::new(
        BackendMode::Live,
        Arc::new(CommandTable::builtin(false)),
        connector.clone(),
    );

    // WHEN: Executing twice
    let first = selector.execute("ping", &Params::new()).await;
    let second = selector.execute("ping", &Params::new()).await;

    // THEN: Init failure both times, each time a fresh attempt
    for result in [first, second] {
        match result {
            Err(error) => assert_eq!(error.kind(), ErrorKind::InitFailure),
            Ok(value) => panic!("Expected init failure, got {value}"),
        }
    }
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(selector.current_kind().await, None);
}

/// **VALUE**: Verifies that headless mode never probes.
///
/// **BUG THIS CATCHES**: Would catch headless mode paying the probe timeout.
#[tokio::test]
async fn given_headless_mode_when_selecting_then_connector_untouched() {
    // GIVEN: Headless mode
    let connector = Arc::new(UnreachableConnector::default());
    let selector = BackendSelector::new(
        BackendMode::Headless,
        Arc::new(CommandTable::builtin(false)),
        connector.clone(),
    );

    // WHEN: Selecting
    let backend = selector.select().await.unwrap();

    // THEN: Headless without any attempt
    assert_eq!(backend.kind(), BackendKind::Headless);
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
}

/// **VALUE**: Verifies re-selection after the live host dies.
///
/// **WHY THIS MATTERS**: A host restarted by the user should be picked up again
/// without restarting the controller.
///
/// **BUG THIS CATCHES**: Would catch a dead backend cached forever, or the slot
/// being cleared on ordinary handler errors.
#[tokio::test]
async fn given_live_backend_failing_health_when_call_times_out_then_selection_cleared() {
    // GIVEN: A selector holding a dead live backend
    let connector = Arc::new(DeadHostConnector::default());
    let selector = BackendSelector::new(
        BackendMode::Live,
        Arc::new(CommandTable::builtin(false)),
        connector.clone(),
    );
    assert_eq!(
        selector.select().await.unwrap().kind(),
        BackendKind::Live
    );

    // WHEN: A call times out
    let result = selector.execute("entity-count", &Params::new()).await;

    // THEN: The error surfaces, the slot is empty and the next call reconnects
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Timeout);
    assert_eq!(selector.current_kind().await, None);
    let _ = selector.execute("entity-count", &Params::new()).await;
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
}

/// **VALUE**: Verifies the channel connector against a real host and a silent one.
///
/// **WHY THIS MATTERS**: This is the production connector: probe by ping within
/// the probe timeout, live on success, fallback otherwise.
///
/// **BUG THIS CATCHES**: Would catch the probe using the long call timeout, which
/// would stall every auto-mode start without a host.
#[tokio::test]
async fn given_channel_connector_when_host_present_or_silent_then_live_or_headless() {
    // GIVEN: One directory served by an embedded host, one by nobody
    let table = Arc::new(CommandTable::builtin(false));
    let (_served_temp, served) = shared_directory();
    let (_silent_temp, silent) = shared_directory();

    let live_connector = ChannelConnector::new(
        served.clone(),
        embedded_sink(&served, table.clone()),
        table.clone(),
    )
    .with_poll_interval(TEST_POLL_INTERVAL);
    let silent_connector = ChannelConnector::new(silent.clone(), Arc::new(NullSink), table.clone())
        .with_poll_interval(TEST_POLL_INTERVAL)
        .with_timeouts(Duration::from_secs(1), Duration::from_millis(200));

    let with_host = BackendSelector::new(BackendMode::Auto, table.clone(), Arc::new(live_connector));
    let without_host = BackendSelector::new(BackendMode::Auto, table, Arc::new(silent_connector));

    // WHEN: Selecting on both
    let started = std::time::Instant::now();
    let silent_kind = without_host.select().await.unwrap().kind();
    let fallback_elapsed = started.elapsed();
    let live_kind = with_host.select().await.unwrap().kind();

    // THEN: Live where a host answered, headless quickly elsewhere
    assert_eq!(live_kind, BackendKind::Live);
    assert_eq!(silent_kind, BackendKind::Headless);
    assert!(fallback_elapsed < Duration::from_secs(1));
    assert!(silent.pending_requests().unwrap().is_empty());
}

/// **VALUE**: Verifies the process pre-check of the channel connector.
///
/// **BUG THIS CATCHES**: Would catch probing (and waiting) when the configured host
/// process is not running at all.
#[tokio::test]
async fn given_host_process_absent_when_connecting_then_init_failure_without_probe() {
    // GIVEN: A connector requiring a process that does not exist
    let (_temp, directory) = shared_directory();
    let table = Arc::new(CommandTable::builtin(false));
    let connector = ChannelConnector::new(directory.clone(), Arc::new(NullSink), table)
        .with_host_process(Some("no-such-cad-host-7f3a9c".to_string()));

    // WHEN: Connecting
    let result = connector.connect().await;

    // THEN: Init failure, and no request was ever written
    match result {
        Err(error) => assert_eq!(error.kind(), ErrorKind::InitFailure),
        Ok(_) => panic!("Expected init failure"),
    }
    assert!(std::fs::read_dir(directory.root()).unwrap().next().is_none());
}
