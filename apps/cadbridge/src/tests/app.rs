use crate::app::{
    SNAPSHOT_COMMAND, build_selector, describe_commands, exec, sweep, with_call_timeout,
};
use crate::error::CadbridgeError;

use bridge_core::commands::{CommandTable, EXECUTE_SCRIPT};
use bridge_core::config::{BackendMode, BridgeConfig};

use std::sync::Arc;
use std::time::Duration;

use models::{ErrorKind, Params};
use tempfile::TempDir;

fn headless_config() -> BridgeConfig {
    BridgeConfig {
        backend: BackendMode::Headless,
        ..BridgeConfig::default()
    }
}

/// **VALUE**: Verifies the success envelope of `cadbridge exec`.
///
/// **WHY THIS MATTERS**: Callers read `ok`, `backend` and `payload` from stdout;
/// the backend name tells them whether the host or the fallback did the work.
///
/// **BUG THIS CATCHES**: Would catch the backend being reported before selection
/// happened, which leaves it null.
#[tokio::test]
async fn given_headless_mode_when_exec_then_envelope_names_backend() {
    // GIVEN: A headless selector
    let table = Arc::new(CommandTable::builtin(false));
    let selector = build_selector(&headless_config(), table).unwrap();
    let params = Params::new()
        .with("cx", 0.0)
        .with("cy", 0.0)
        .with("radius", 2.5);

    // WHEN: Creating a circle without capture
    let envelope = exec(&selector, "create-circle", &params, false)
        .await
        .unwrap();

    // THEN: Envelope carries the payload and no snapshot
    assert_eq!(envelope["ok"], true);
    assert_eq!(envelope["command"], "create-circle");
    assert_eq!(envelope["backend"], "headless");
    assert_eq!(envelope["payload"]["entity_type"], "CIRCLE");
    assert!(envelope.get("snapshot").is_none());
}

/// **VALUE**: Verifies that `--capture` attaches a drawing summary.
///
/// **BUG THIS CATCHES**: Would catch the snapshot being taken on a fresh backend
/// instead of the one that just ran the command.
#[tokio::test]
async fn given_capture_when_exec_then_snapshot_sees_new_entity() {
    // GIVEN: A headless selector
    let table = Arc::new(CommandTable::builtin(false));
    let selector = build_selector(&headless_config(), table).unwrap();
    let params = Params::new()
        .with("x1", 0.0)
        .with("y1", 0.0)
        .with("x2", 1.0)
        .with("y2", 1.0);

    // WHEN: Creating a line with capture
    let envelope = exec(&selector, "create-line", &params, true).await.unwrap();

    // THEN: Snapshot from the same drawing
    assert_eq!(SNAPSHOT_COMMAND, "drawing-info");
    assert_eq!(envelope["snapshot"]["entity_count"], 1);
}

/// **VALUE**: Verifies that whitelist failures reach the caller as typed errors.
///
/// **BUG THIS CATCHES**: Would catch the selector silently falling back to some
/// other command or returning an empty payload.
#[tokio::test]
async fn given_unknown_command_when_exec_then_unknown_command_kind() {
    let table = Arc::new(CommandTable::builtin(false));
    let selector = build_selector(&headless_config(), table).unwrap();

    let result = exec(&selector, "format-disk", &Params::new(), false).await;

    match result {
        Err(err @ CadbridgeError::Core { .. }) => {
            assert_eq!(err.kind(), Some(ErrorKind::UnknownCommand))
        }
        other => panic!("Expected Core error, got {other:?}"),
    }
}

/// **VALUE**: Verifies the command listing, including the script opt-in.
///
/// **WHY THIS MATTERS**: `cadbridge commands` is how users discover the whitelist;
/// it must match what `exec` will accept.
///
/// **BUG THIS CATCHES**: Would catch `execute-script` being listed when scripts are
/// disabled.
#[test]
fn given_tables_when_described_then_listing_matches_whitelist() {
    // GIVEN: Tables with and without scripts
    let plain = CommandTable::builtin(false);
    let scripted = CommandTable::builtin(true);

    // WHEN: Describing both
    let plain_listing = describe_commands(&plain);
    let scripted_listing = describe_commands(&scripted);

    // THEN: Counts match the tables and only the opt-in lists the script command
    assert_eq!(plain_listing["count"], plain.len());
    assert_eq!(scripted_listing["count"], plain.len() + 1);
    let names: Vec<&str> = scripted_listing["commands"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|command| command["name"].as_str())
        .collect();
    assert!(names.contains(&EXECUTE_SCRIPT));
    assert!(
        plain_listing["commands"]
            .as_array()
            .unwrap()
            .iter()
            .all(|command| command["name"] != EXECUTE_SCRIPT)
    );
}

/// **VALUE**: Verifies that `--timeout` replaces the configured call timeout.
#[test]
fn given_timeout_override_when_applied_then_call_timeout_changes() {
    let config = with_call_timeout(BridgeConfig::default(), Some(Duration::from_secs(5)));
    assert_eq!(config.call_timeout(), Duration::from_secs(5));

    let untouched = with_call_timeout(BridgeConfig::default(), None);
    assert_eq!(untouched, BridgeConfig::default());
}

/// **VALUE**: Verifies that sweeping a directory that was never created is a no-op.
///
/// **BUG THIS CATCHES**: Would catch `cadbridge sweep` failing on a fresh machine.
#[test]
fn given_missing_directory_when_swept_then_nothing_removed() {
    // GIVEN: A shared directory path that does not exist
    let temp_dir = TempDir::new().unwrap();
    let mut config = BridgeConfig::default();
    config.ipc.dir = Some(temp_dir.path().join("never-created"));

    // WHEN: Sweeping
    let report = sweep(&config).unwrap();

    // THEN: Nothing removed, directory not created
    assert_eq!(report["removed"], 0);
    assert!(!temp_dir.path().join("never-created").exists());
}

/// **VALUE**: Verifies headless mode never touches the host console.
///
/// **WHY THIS MATTERS**: The console path usually points into the host's own
/// working files. A headless run must not create or lock it.
///
/// **BUG THIS CATCHES**: Would catch the keystroke sink being opened before the
/// backend mode is known to need it.
#[test]
fn given_headless_mode_with_console_when_building_selector_then_console_not_created() {
    // GIVEN: Headless mode with a console path that does not exist yet
    let temp_dir = TempDir::new().unwrap();
    let console = temp_dir.path().join("console.txt");
    let mut config = headless_config();
    config.host.console_path = Some(console.clone());

    // WHEN: Building the selector, then again in auto mode
    build_selector(&config, Arc::new(CommandTable::builtin(false))).unwrap();
    let untouched = console.exists();
    config.backend = BackendMode::Auto;
    build_selector(&config, Arc::new(CommandTable::builtin(false))).unwrap();

    // THEN: Only the mode that may trigger the host opens the console
    assert!(!untouched);
    assert!(console.exists());
}
