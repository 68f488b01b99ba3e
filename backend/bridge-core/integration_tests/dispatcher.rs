use crate::helpers::{
    TEST_TIMEOUT, channel_over, embedded_live_backend, embedded_sink, leftover_files,
    line_params, publish, request, shared_directory,
};

use bridge_core::backend::Backend;

use bridge_core::DISPATCH_PHRASE;
use bridge_core::codec::{Codec, JsonCodec};
use bridge_core::commands::{CommandEntry, CommandTable};
use bridge_core::dispatcher::{Activation, Dispatcher};
use bridge_core::document::Document;
use bridge_core::error::command::CommandError;
use bridge_core::host::SimulatedHost;
use bridge_core::storage::IpcDirectory;

use std::io::Write;
use std::sync::Arc;

use models::{BackendKind, ErrorKind, Params, RequestId, Response};
use serde_json::{Value, json};

fn dispatcher(directory: &IpcDirectory, table: CommandTable) -> Dispatcher<SimulatedHost> {
    Dispatcher::new(directory.clone(), Arc::new(table), SimulatedHost::new())
}

fn read_response(directory: &IpcDirectory, request_id: &RequestId) -> Response {
    let bytes = directory
        .read_if_present(&directory.response_path(request_id))
        .expect("Failed to read response")
        .expect("Response was not written");
    JsonCodec
        .decode_response(&bytes)
        .expect("Failed to decode response")
}

fn failing(_document: &mut Document, _params: &Params) -> Result<Value, CommandError> {
    panic!("index out of range in handler");
}

fn echo(_document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    Ok(json!({ "echo": params.require_str("text")? }))
}

/// **VALUE**: Verifies exactly-once processing of a backlog in creation order.
///
/// **WHY THIS MATTERS**: Controllers may queue several requests before the host
/// wakes up. Each must run once, in order, and be answered individually.
///
/// **BUG THIS CATCHES**: Would catch a request processed twice (left in place
/// after answering) or out of order.
#[test]
fn given_queued_requests_when_drained_then_each_answered_once_in_order() {
    // GIVEN: Five create-line requests published oldest first
    let (_temp, directory) = shared_directory();
    let ids: Vec<RequestId> = (0..5)
        .map(|_| {
            std::thread::sleep(std::time::Duration::from_millis(2));
            let request = request("create-line", line_params());
            publish(&directory, &request);
            request.request_id
        })
        .collect();
    let mut dispatcher = dispatcher(&directory, CommandTable::builtin(false));

    // WHEN: Activating once, then draining the rest
    let first = dispatcher.activate().unwrap();
    let remaining = dispatcher.drain().unwrap();

    // THEN: The oldest went first, everything was answered once
    assert_eq!(
        first,
        Activation::Answered {
            request_id: ids[0].clone(),
            command: Some("create-line".to_string()),
            ok: true,
        }
    );
    assert_eq!(remaining, 4);
    assert_eq!(dispatcher.host().document().entities().len(), 5);
    assert!(directory.pending_requests().unwrap().is_empty());
    for (index, id) in ids.iter().enumerate() {
        let handle = format!("{:X}", 0x30 + index);
        assert_eq!(read_response(&directory, id).payload().unwrap()["handle"], handle);
    }
    assert_eq!(dispatcher.drain().unwrap(), 0);
}

/// **VALUE**: Verifies that a spurious activation is harmless.
///
/// **WHY THIS MATTERS**: Triggers may arrive after the controller already gave up
/// and withdrew its request, or be typed twice.
///
/// **BUG THIS CATCHES**: Would catch an empty directory being an error.
#[test]
fn given_nothing_pending_when_activated_then_idle() {
    // GIVEN: An empty directory
    let (_temp, directory) = shared_directory();
    let mut dispatcher = dispatcher(&directory, CommandTable::builtin(false));

    // WHEN/THEN: Idle, and no files appear
    assert_eq!(dispatcher.activate().unwrap(), Activation::Idle);
    assert!(leftover_files(&directory).is_empty());
}

/// **VALUE**: Verifies that malformed artifacts are answered, not skipped.
///
/// **WHY THIS MATTERS**: The caller is polling for this id. Skipping the file
/// would leave it to time out and leave the file to be retried forever.
///
/// **BUG THIS CATCHES**: Would catch a decode failure aborting the activation.
#[test]
fn given_malformed_request_when_activated_then_malformed_response_and_cleanup() {
    // GIVEN: Garbage under a valid request name, and a request whose id disagrees
    let (_temp, directory) = shared_directory();
    let garbage_id = RequestId::generate();
    std::fs::write(directory.request_path(&garbage_id), b"{\"request_id\": 42").unwrap();

    let mismatched_id = RequestId::generate();
    let inner = request("ping", Params::new());
    std::fs::write(
        directory.request_path(&mismatched_id),
        JsonCodec.encode_request(&inner).unwrap(),
    )
    .unwrap();
    let mut dispatcher = dispatcher(&directory, CommandTable::builtin(false));

    // WHEN: Draining
    let answered = dispatcher.drain().unwrap();

    // THEN: Both answered as malformed and removed
    assert_eq!(answered, 2);
    for id in [&garbage_id, &mismatched_id] {
        assert_eq!(
            read_response(&directory, id).error_kind(),
            Some(ErrorKind::MalformedPayload)
        );
    }
    assert!(directory.pending_requests().unwrap().is_empty());
}

/// **VALUE**: Verifies that a panicking handler does not take the dispatcher down.
///
/// **WHY THIS MATTERS**: The dispatcher runs inside the host application. A panic
/// would kill the session and strand every queued request.
///
/// **BUG THIS CATCHES**: Would catch handler panics escaping `activate`.
#[test]
fn given_panicking_handler_when_activated_then_error_response_and_next_request_served() {
    // GIVEN: A table with a panicking command and an echo, one request each
    let (_temp, directory) = shared_directory();
    let table = CommandTable::from_entries([
        CommandEntry::shared("explode", "Panics", false, failing),
        CommandEntry::shared("echo", "Echo text", false, echo),
    ]);
    let bad = request("explode", Params::new());
    publish(&directory, &bad);
    std::thread::sleep(std::time::Duration::from_millis(2));
    let good = request("echo", Params::new().with("text", "still alive"));
    publish(&directory, &good);
    let mut dispatcher = dispatcher(&directory, table);

    // WHEN: Draining
    dispatcher.drain().unwrap();

    // THEN: Handler error for the first, success for the second
    let failed = read_response(&directory, &bad.request_id);
    assert_eq!(failed.error_kind(), Some(ErrorKind::HandlerError));
    assert!(failed.error_message().unwrap().contains("index out of range"));
    assert_eq!(
        read_response(&directory, &good.request_id).payload(),
        Some(&json!({ "echo": "still alive" }))
    );
}

/// **VALUE**: Verifies console handling around the dispatch phrase.
///
/// **WHY THIS MATTERS**: Users type into the same console. Their leftover input
/// must neither activate the dispatcher nor break the next trigger.
///
/// **BUG THIS CATCHES**: Would catch the embedded host activating on any line, or
/// the first firing after stray input being lost.
#[tokio::test]
async fn given_stray_console_input_when_trigger_fires_then_request_served() {
    // GIVEN: An embedded host that saw a bare phrase, a rejected line and half-typed input
    let (_temp, directory) = shared_directory();
    let sink = embedded_sink(&directory, Arc::new(CommandTable::builtin(false)));
    sink.with_writer(|host| host.write_all(format!("{DISPATCH_PHRASE}\rZOOM\rCIRCLE 0,0 5").as_bytes()))
        .unwrap()
        .unwrap();
    assert_eq!(
        sink.with_writer(|host| host.console().pending_line()),
        Some("CIRCLE 0,0 5".to_string())
    );
    let channel = channel_over(&directory, sink.clone());

    // WHEN: Calling through the channel
    let response = channel
        .call("entity-count", &Params::new(), TEST_TIMEOUT)
        .await
        .expect("Call should succeed");

    // THEN: The request was served; the stray phrase only produced an idle activation
    assert_eq!(response.payload(), Some(&json!({ "count": 0 })));
    let activations = sink.with_writer(|host| host.activations().to_vec()).unwrap();
    assert_eq!(activations.len(), 2);
    assert_eq!(activations[0], Activation::Idle);
}

fn headless_only_table() -> CommandTable {
    CommandTable::from_entries([
        CommandEntry::shared("echo", "Return text", false, echo).restricted_to(BackendKind::Headless),
    ])
}

/// **VALUE**: Verifies headless-only commands fail fast on the live backend.
///
/// **WHY THIS MATTERS**: Availability is checked before dispatch, so a command
/// the host cannot run never costs a round trip or a trigger keystroke.
///
/// **BUG THIS CATCHES**: Would catch the live backend publishing the request and
/// waiting for the host to refuse it.
#[tokio::test]
async fn given_headless_only_command_when_live_executes_then_unsupported_without_io() {
    // GIVEN: A live backend over a table whose only command is headless-only
    let (_temp, directory) = shared_directory();
    let (backend, sink) = embedded_live_backend(&directory, Arc::new(headless_only_table()));

    // WHEN: Executing it
    let result = backend
        .execute("echo", &Params::new().with("text", "hi"))
        .await;

    // THEN: Unsupported, nothing written, host never woken
    assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Unsupported));
    assert!(!directory.root().exists() || leftover_files(&directory).is_empty());
    assert_eq!(sink.with_writer(|host| host.activations().len()), Some(0));
}

/// **VALUE**: Verifies the dispatcher answers headless-only commands with Unsupported.
///
/// **BUG THIS CATCHES**: Would catch a request written straight to storage
/// bypassing the availability check and running inside the host.
#[test]
fn given_headless_only_request_when_dispatched_then_unsupported_response() {
    // GIVEN: A request for a headless-only command published directly
    let (_temp, directory) = shared_directory();
    let mut dispatcher = dispatcher(&directory, headless_only_table());
    let published = request("echo", Params::new().with("text", "hi"));
    publish(&directory, &published);

    // WHEN: Activating once
    let activation = dispatcher.activate().unwrap();

    // THEN: Answered with an Unsupported failure, request consumed
    assert_eq!(
        activation,
        Activation::Answered {
            request_id: published.request_id.clone(),
            command: Some("echo".to_string()),
            ok: false,
        }
    );
    let response = read_response(&directory, &published.request_id);
    assert_eq!(response.error_kind(), Some(ErrorKind::Unsupported));
    assert!(!directory.request_path(&published.request_id).exists());
}
