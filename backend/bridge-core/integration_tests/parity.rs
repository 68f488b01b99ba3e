use crate::helpers::{embedded_live_backend, line_params, shared_directory};

use bridge_core::backend::{Backend, HeadlessEngine};
use bridge_core::commands::{Availability, CommandTable};

use std::collections::BTreeSet;
use std::sync::Arc;

use models::{ErrorKind, Params};
use serde_json::Value;
use tempfile::TempDir;

/// Parameters exercising each shared command against the seeded drawing.
fn fixture(command: &str, scratch: &TempDir) -> Option<Params> {
    let last = || Params::new().with("entity_id", "last");
    let walls = || Params::new().with("name", "walls");

    let params = match command {
        "ping" | "drawing-info" | "drawing-purge" | "entity-list" | "entity-count"
        | "layer-list" => Params::new(),
        "drawing-get-variables" => Params::new().with(
            "names",
            models::ParamValue::List(vec!["$CLAYER".into(), "ACADVER".into()]),
        ),
        "drawing-create" => Params::new().with("name", "parity"),
        "drawing-save" => Params::new().with(
            "path",
            scratch.path().join("parity.json").display().to_string(),
        ),
        "create-line" => line_params(),
        "create-circle" => Params::new().with("cx", 1.5).with("cy", 2).with("radius", 4),
        "create-arc" => Params::new()
            .with("cx", 0)
            .with("cy", 0)
            .with("radius", 3)
            .with("start_angle", 0)
            .with("end_angle", 90.0),
        "create-polyline" => Params::new()
            .with(
                "points",
                models::ParamValue::List(vec![[0.0, 0.0].into(), [1.0, 1.0].into(), [2.0, 0.0].into()]),
            )
            .with("closed", true),
        "create-rectangle" => Params::new()
            .with("x1", 0)
            .with("y1", 0)
            .with("x2", 4)
            .with("y2", 3),
        "create-text" => Params::new()
            .with("x", 1)
            .with("y", 1)
            .with("text", "Section \"A\"")
            .with("height", 3.5),
        "entity-get" | "entity-erase" => last(),
        "entity-move" | "entity-copy" => last().with("dx", 1.25).with("dy", -2),
        "entity-rotate" => last().with("cx", 0).with("cy", 0).with("angle", 45),
        "entity-scale" => last().with("cx", 0).with("cy", 0).with("factor", 2),
        "layer-create" => Params::new().with("name", "doors").with("color", 5),
        "layer-set-current" | "layer-freeze" | "layer-thaw" | "layer-lock" | "layer-unlock" => {
            walls()
        }
        "layer-set-properties" => walls().with("color", "green").with("lineweight", 25),
        _ => return None,
    };
    Some(params)
}

async fn seed(backend: &dyn Backend) {
    backend
        .execute("create-line", &line_params())
        .await
        .expect("Seeding line failed");
    backend
        .execute("layer-create", &Params::new().with("name", "walls"))
        .await
        .expect("Seeding layer failed");
}

fn keys(value: &Value) -> BTreeSet<String> {
    value
        .as_object()
        .map(|object| object.keys().cloned().collect())
        .unwrap_or_default()
}

/// **VALUE**: Verifies that every shared command answers identically on both backends.
///
/// **WHY THIS MATTERS**: Callers switch backends (auto fallback) without changing
/// their code. A payload key present on one backend and missing on the other
/// breaks them only when the host is, or is not, running.
///
/// **BUG THIS CATCHES**: Would catch a handler reachable on one backend only, a
/// difference introduced by the wire encoding, or a new shared command added
/// without a parity fixture.
#[tokio::test]
async fn given_shared_commands_when_run_on_both_backends_then_same_payloads() {
    let table = Arc::new(CommandTable::builtin(false));
    let shared: Vec<&str> = table
        .entries()
        .filter(|entry| entry.availability == Availability::Both)
        .map(|entry| entry.name)
        .collect();
    assert!(!shared.is_empty());

    for command in shared {
        // GIVEN: Fresh seeded backends of each kind
        let (_temp, directory) = shared_directory();
        let headless_scratch = TempDir::new().unwrap();
        let live_scratch = TempDir::new().unwrap();
        let headless = HeadlessEngine::new(table.clone());
        let (live, _sink) = embedded_live_backend(&directory, table.clone());
        seed(&headless).await;
        seed(&live).await;

        let headless_params = fixture(command, &headless_scratch)
            .unwrap_or_else(|| panic!("No parity fixture for shared command '{command}'"));
        let live_params = fixture(command, &live_scratch).unwrap();

        // WHEN: Running the command on both
        let from_headless = headless
            .execute(command, &headless_params)
            .await
            .unwrap_or_else(|e| panic!("headless '{command}' failed: {e}"));
        let from_live = live
            .execute(command, &live_params)
            .await
            .unwrap_or_else(|e| panic!("live '{command}' failed: {e}"));

        // THEN: Same keys; same values except for the per-backend save path
        assert_eq!(keys(&from_headless), keys(&from_live), "keys of '{command}'");
        if command != "drawing-save" {
            assert_eq!(from_headless, from_live, "payload of '{command}'");
        }
    }
}

/// **VALUE**: Verifies that availability errors are identical on both backends.
///
/// **WHY THIS MATTERS**: An unknown name must fail the same way wherever it is
/// sent, and a live-only command must say "unsupported" on headless rather than
/// "unknown".
///
/// **BUG THIS CATCHES**: Would catch the headless engine reporting live-only
/// commands as unknown.
#[tokio::test]
async fn given_unknown_and_live_only_commands_when_run_then_kinds_match_availability() {
    // GIVEN: Both backends
    let table = Arc::new(CommandTable::builtin(false));
    let (_temp, directory) = shared_directory();
    let headless = HeadlessEngine::new(table.clone());
    let (live, _sink) = embedded_live_backend(&directory, table.clone());
    seed(&live).await;

    // WHEN: Running an unknown name and a live-only command
    let unknown_headless = headless.execute("shell", &Params::new()).await;
    let unknown_live = live.execute("shell", &Params::new()).await;
    let zoom_headless = headless.execute("zoom-extents", &Params::new()).await;
    let zoom_live = live.execute("zoom-extents", &Params::new()).await;

    // THEN: Unknown on both; zoom unsupported headless, answered live
    assert_eq!(unknown_headless.unwrap_err().kind(), ErrorKind::UnknownCommand);
    assert_eq!(unknown_live.unwrap_err().kind(), ErrorKind::UnknownCommand);
    assert_eq!(zoom_headless.unwrap_err().kind(), ErrorKind::Unsupported);
    assert_eq!(
        zoom_live.expect("zoom-extents should succeed live")["view"]["max"],
        serde_json::json!([10.0, 0.0])
    );
}
