use crate::helpers::{
    TEST_POLL_INTERVAL, TEST_TIMEOUT, channel_over, embedded_live_backend, embedded_sink,
    leftover_files, line_params, publish, request, shared_directory,
};

use bridge_core::codec::{Codec, JsonCodec};
use bridge_core::commands::CommandTable;
use bridge_core::dispatcher::Dispatcher;
use bridge_core::error::CoreError;
use bridge_core::error::channel::ChannelError;
use bridge_core::error::trigger::TriggerError;
use bridge_core::host::SimulatedHost;
use bridge_core::trigger::{NullSink, Signal, SignalSink};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use models::{ErrorKind, Params};
use serde_json::json;

struct BrokenConsole;

impl SignalSink for BrokenConsole {
    fn send(&self, _signal: Signal) -> Result<(), TriggerError> {
        Err(TriggerError::Send {
            message: "console window closed".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// **VALUE**: Verifies a full round trip through shared storage.
///
/// **WHY THIS MATTERS**: This is the whole live path: publish, trigger, dispatch,
/// respond, poll, clean up.
///
/// **BUG THIS CATCHES**: Would catch any step leaving an artifact behind, or the
/// response being matched to the wrong request.
#[tokio::test]
async fn given_embedded_host_when_calling_ping_then_pong_and_directory_clean() {
    // GIVEN: An embedded host on a fresh directory
    let (_temp, directory) = shared_directory();
    let table = Arc::new(CommandTable::builtin(false));
    let sink = embedded_sink(&directory, table);
    let channel = channel_over(&directory, sink.clone());

    // WHEN: Calling ping
    let response = channel
        .call("ping", &Params::new(), TEST_TIMEOUT)
        .await
        .expect("Call should succeed");

    // THEN: Pong, one activation and nothing left on disk
    assert_eq!(response.payload(), Some(&json!({ "pong": true })));
    assert_eq!(sink.with_writer(|host| host.activations().len()), Some(1));
    assert!(leftover_files(&directory).is_empty(), "{:?}", leftover_files(&directory));
}

/// **VALUE**: Verifies the timeout path and request withdrawal.
///
/// **WHY THIS MATTERS**: A host that is not running must cost the caller exactly
/// the timeout. The abandoned request must be withdrawn so a host that starts
/// later does not execute it.
///
/// **BUG THIS CATCHES**: Would catch polling forever, or a request file left behind
/// after a timeout.
#[tokio::test]
async fn given_no_host_when_calling_then_timeout_and_request_withdrawn() {
    // GIVEN: A channel whose trigger reaches nobody
    let (_temp, directory) = shared_directory();
    let channel = channel_over(&directory, Arc::new(NullSink));

    // WHEN: Calling with a short timeout
    let started = std::time::Instant::now();
    let result = channel
        .call("ping", &Params::new(), Duration::from_millis(200))
        .await;

    // THEN: Timeout after roughly the bound, with nothing left on disk
    assert!(matches!(result, Err(ChannelError::Timeout { .. })));
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(leftover_files(&directory).is_empty());
}

/// **VALUE**: Verifies that a cancelled call withdraws its request.
///
/// **WHY THIS MATTERS**: Callers wrap calls in their own timeouts and selects; a
/// dropped future must not leave a command queued for later execution.
///
/// **BUG THIS CATCHES**: Would catch cleanup that only runs on the normal return
/// paths instead of on drop.
#[tokio::test]
async fn given_call_in_flight_when_future_dropped_then_request_withdrawn() {
    // GIVEN: A call that would wait a long time
    let (_temp, directory) = shared_directory();
    let channel = channel_over(&directory, Arc::new(NullSink));

    // WHEN: Dropping the future after 100ms
    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        channel.call("ping", &Params::new(), Duration::from_secs(30)),
    )
    .await;

    // THEN: The outer timeout fired and the request is gone
    assert!(outcome.is_err());
    assert!(directory.pending_requests().unwrap().is_empty());
}

/// **VALUE**: Verifies that a failed trigger does not fail the call.
///
/// **WHY THIS MATTERS**: Some hosts poll shared storage on their own. A console
/// that cannot be reached is worth a warning, not an error, as long as a
/// response still arrives within the timeout.
///
/// **BUG THIS CATCHES**: Would catch `?` on the trigger result inside `send`.
#[tokio::test]
async fn given_broken_trigger_and_polling_host_when_calling_then_response_arrives() {
    // GIVEN: A host draining the directory on its own, and a broken console
    let (_temp, directory) = shared_directory();
    let table = Arc::new(CommandTable::builtin(false));
    let stop = Arc::new(AtomicBool::new(false));
    let host = {
        let directory = directory.clone();
        let stop = stop.clone();
        std::thread::spawn(move || {
            let mut dispatcher = Dispatcher::new(directory, table, SimulatedHost::new());
            while !stop.load(Ordering::SeqCst) {
                dispatcher.drain().expect("Dispatcher failed");
                std::thread::sleep(TEST_POLL_INTERVAL);
            }
        })
    };
    let channel = channel_over(&directory, Arc::new(BrokenConsole));

    // WHEN: Calling
    let response = channel.call("create-line", &line_params(), TEST_TIMEOUT).await;
    stop.store(true, Ordering::SeqCst);
    host.join().expect("Host thread panicked");

    // THEN: The response arrived despite the trigger failure
    let response = response.expect("Call should succeed");
    assert_eq!(response.payload().unwrap()["entity_type"], "LINE");
}

/// **VALUE**: Verifies that the host answers unknown commands with an error response.
///
/// **WHY THIS MATTERS**: A controller whose whitelist is newer or older than the
/// host's must get an immediate, typed answer instead of a timeout.
///
/// **BUG THIS CATCHES**: Would catch the dispatcher skipping unknown requests and
/// leaving the caller to wait.
#[tokio::test]
async fn given_command_unknown_to_host_when_calling_then_unknown_command_response() {
    // GIVEN: An embedded host
    let (_temp, directory) = shared_directory();
    let sink = embedded_sink(&directory, Arc::new(CommandTable::builtin(false)));
    let channel = channel_over(&directory, sink);

    // WHEN: Calling a name outside the whitelist through the raw channel
    let response = channel
        .call("format-disk", &Params::new(), TEST_TIMEOUT)
        .await
        .expect("Call should complete");

    // THEN: Unknown command, reported by the host
    assert_eq!(response.error_kind(), Some(ErrorKind::UnknownCommand));
}

/// **VALUE**: Verifies that a concurrent reader never sees a partial request.
///
/// **WHY THIS MATTERS**: The host may scan the directory at any instant while the
/// controller is writing. A torn read would be answered as malformed and the
/// real request lost.
///
/// **BUG THIS CATCHES**: Would catch writing the final file name directly.
#[test]
fn given_reader_scanning_when_requests_published_then_every_read_decodes() {
    // GIVEN: A reader thread scanning continuously
    let (_temp, directory) = shared_directory();
    let stop = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicUsize::new(0));
    let reader = {
        let directory = directory.clone();
        let stop = stop.clone();
        let reads = reads.clone();
        std::thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                for id in directory.pending_requests().expect("Scan failed") {
                    let path = directory.request_path(&id);
                    if let Some(bytes) = directory.read_if_present(&path).expect("Read failed") {
                        JsonCodec
                            .decode_request(&bytes)
                            .expect("Reader saw a partial request");
                        reads.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        })
    };

    // WHEN: Publishing many large requests
    let text = "x".repeat(64 * 1024);
    for _ in 0..50 {
        publish(
            &directory,
            &request("create-text", Params::new().with("text", text.as_str())),
        );
    }
    std::thread::sleep(Duration::from_millis(50));
    stop.store(true, Ordering::SeqCst);

    // THEN: The reader never panicked and did read requests
    reader.join().expect("Reader observed a torn write");
    assert!(reads.load(Ordering::SeqCst) > 0);
}

/// **VALUE**: Verifies inline script staging for `execute-script`.
///
/// **WHY THIS MATTERS**: Script source travels as a separate artifact so it never
/// needs escaping inside the request. The artifact must be removed with the call.
///
/// **BUG THIS CATCHES**: Would catch the staged script leaking in shared storage,
/// or the inline `code` being forwarded instead of `code_file`.
#[tokio::test]
async fn given_inline_script_when_executed_live_then_staged_evaluated_and_removed() {
    // GIVEN: A live backend with scripts allowed
    let (_temp, directory) = shared_directory();
    let (backend, sink) = embedded_live_backend(&directory, Arc::new(CommandTable::builtin(true)));

    // WHEN: Executing inline code containing quotes and a newline
    let code = "(princ \"hello\")\n(command \"_LINE\" \"0,0\" \"1,1\" \"\")";
    let result = backend
        .execute_with_timeout("execute-script", &Params::new().with("code", code), TEST_TIMEOUT)
        .await
        .expect("Script should run");

    // THEN: Evaluated verbatim, and no artifact left behind
    assert_eq!(result["result"]["evaluated"], true);
    assert_eq!(
        sink.with_writer(|host| host.dispatcher().host().scripts().to_vec()),
        Some(vec![code.to_string()])
    );
    assert!(leftover_files(&directory).is_empty());
}

/// **VALUE**: Verifies that the live backend refuses non-whitelisted names locally.
///
/// **WHY THIS MATTERS**: Rejecting before publishing means no file is written and
/// the host is never poked for a request it would refuse anyway.
///
/// **BUG THIS CATCHES**: Would catch the controller forwarding any string it is
/// given to shared storage.
#[tokio::test]
async fn given_scripts_disabled_when_live_executes_script_then_unknown_without_io() {
    // GIVEN: A live backend without the script opt-in
    let (_temp, directory) = shared_directory();
    let (backend, sink) = embedded_live_backend(&directory, Arc::new(CommandTable::builtin(false)));

    // WHEN: Executing execute-script
    let result = backend
        .execute_with_timeout(
            "execute-script",
            &Params::new().with("code", "(princ)"),
            TEST_TIMEOUT,
        )
        .await;

    // THEN: Unknown command and the host never activated
    match result {
        Err(error @ CoreError::Command(_)) => assert_eq!(error.kind(), ErrorKind::UnknownCommand),
        other => panic!("Expected command error, got {other:?}"),
    }
    assert_eq!(sink.with_writer(|host| host.activations().len()), Some(0));
}
