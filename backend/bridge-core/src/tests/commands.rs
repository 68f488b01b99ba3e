use crate::commands::{Availability, CommandEntry, CommandTable, EXECUTE_SCRIPT};
use crate::document::Document;
use crate::error::command::CommandError;
use crate::host::{LiveHost, SimulatedHost};

use models::{BackendKind, ErrorKind, ParamValue, Params};
use serde_json::{Value, json};

fn run(table: &CommandTable, document: &mut Document, command: &str, params: Params) -> Value {
    table
        .execute_on_document(command, document, &params)
        .unwrap_or_else(|e| panic!("'{command}' failed: {e}"))
}

fn entity_total(document: &mut Document, _params: &Params) -> Result<Value, CommandError> {
    Ok(json!({ "entities": document.entities().len() }))
}

fn exploding(_document: &mut Document, _params: &Params) -> Result<Value, CommandError> {
    panic!("handler blew up");
}

/// **VALUE**: Verifies whitelist lookup outcomes.
///
/// **WHY THIS MATTERS**: The table is the only execution path. A name with no
/// entry and a name on the wrong backend must fail with distinct kinds so
/// callers can tell "typo" from "needs the live host".
///
/// **BUG THIS CATCHES**: Would catch live-only commands leaking into the headless
/// engine, or unknown names falling through to some default handler.
#[test]
fn given_builtin_table_when_checking_names_then_unknown_and_unsupported_distinguished() {
    // GIVEN: The builtin table without scripts
    let table = CommandTable::builtin(false);

    // WHEN/THEN: Known shared, live-only and unknown names
    assert!(table.check("create-line", BackendKind::Headless).is_ok());
    assert!(table.check("create-line", BackendKind::Live).is_ok());
    assert_eq!(
        table.check("undo", BackendKind::Headless).err().map(|e| e.kind()),
        Some(ErrorKind::Unsupported)
    );
    assert_eq!(
        table.check("rm -rf", BackendKind::Live).err().map(|e| e.kind()),
        Some(ErrorKind::UnknownCommand)
    );
}

/// **VALUE**: Verifies that `execute-script` exists only when allowed.
///
/// **WHY THIS MATTERS**: Arbitrary script evaluation bypasses every typed handler.
/// Without the opt-in it must be indistinguishable from any unknown name.
///
/// **BUG THIS CATCHES**: Would catch the entry being registered unconditionally
/// and merely hidden from listings.
#[test]
fn given_scripts_disabled_when_checking_execute_script_then_unknown_command() {
    // GIVEN: Tables with and without the opt-in
    let locked = CommandTable::builtin(false);
    let open = CommandTable::builtin(true);

    // WHEN/THEN: Only the opted-in table knows it, and only on the live backend
    assert!(locked.get(EXECUTE_SCRIPT).is_none());
    assert_eq!(
        locked.check(EXECUTE_SCRIPT, BackendKind::Live).err().map(|e| e.kind()),
        Some(ErrorKind::UnknownCommand)
    );
    let entry = open.get(EXECUTE_SCRIPT).unwrap();
    assert_eq!(entry.availability, Availability::Live);
    assert!(entry.undoable);
    assert_eq!(open.len(), locked.len() + 1);
}

/// **VALUE**: Verifies that a panicking handler becomes a handler error.
///
/// **WHY THIS MATTERS**: Inside the host a panic would take the dispatcher down
/// with the request still pending, and the caller would wait out its timeout.
///
/// **BUG THIS CATCHES**: Would catch removing the unwind guard around handlers.
#[test]
fn given_panicking_handler_when_executed_then_handler_error() {
    // GIVEN: A table whose only command panics
    let table = CommandTable::from_entries([CommandEntry::shared(
        "explode",
        "Always panics",
        false,
        exploding,
    )]);
    let mut document = Document::default();

    // WHEN: Executing it
    let result = table.execute_on_document("explode", &mut document, &Params::new());

    // THEN: Handler error mentioning the panic
    match result {
        Err(CommandError::Handler { message, .. }) => {
            assert!(message.contains("handler blew up"), "{message}")
        }
        other => panic!("Expected Handler error, got {other:?}"),
    }
}

/// **VALUE**: Verifies the create and query handlers end to end on a document.
///
/// **WHY THIS MATTERS**: These are the commands callers use most; their payload
/// keys are the contract both backends share.
///
/// **BUG THIS CATCHES**: Would catch creates that do not report the handle, or
/// layer filters ignored by list and count.
#[test]
fn given_created_entities_when_listing_then_payloads_match() {
    // GIVEN: A document with a line on 0 and a circle on "walls"
    let table = CommandTable::builtin(false);
    let mut document = Document::default();
    let line = run(
        &table,
        &mut document,
        "create-line",
        Params::new()
            .with("x1", 0)
            .with("y1", 0)
            .with("x2", 10.0)
            .with("y2", 0),
    );
    run(
        &table,
        &mut document,
        "create-circle",
        Params::new()
            .with("cx", 5.0)
            .with("cy", 5.0)
            .with("radius", 2.0)
            .with("layer", "walls"),
    );

    // WHEN: Listing everything and counting one layer
    let listed = run(&table, &mut document, "entity-list", Params::new());
    let counted = run(
        &table,
        &mut document,
        "entity-count",
        Params::new().with("layer", "walls"),
    );
    let fetched = run(
        &table,
        &mut document,
        "entity-get",
        Params::new().with("entity_id", "last"),
    );

    // THEN: Payloads agree with the document
    assert_eq!(line, json!({ "entity_type": "LINE", "handle": "30" }));
    assert_eq!(listed["count"], 2);
    assert_eq!(listed["entities"][1]["layer"], "walls");
    assert_eq!(counted, json!({ "count": 1 }));
    assert_eq!(fetched["type"], "CIRCLE");
    assert_eq!(fetched["radius"], 2.0);
}

/// **VALUE**: Verifies parameter validation in handlers.
///
/// **WHY THIS MATTERS**: Parameters arrive from an untyped wire format. Bad values
/// must become handler errors, never nonsense geometry.
///
/// **BUG THIS CATCHES**: Would catch a zero radius being accepted, or a polyline
/// with a single point.
#[test]
fn given_invalid_params_when_creating_then_handler_errors() {
    // GIVEN: The builtin table
    let table = CommandTable::builtin(false);
    let mut document = Document::default();
    let cases = [
        (
            "create-circle",
            Params::new().with("cx", 0).with("cy", 0).with("radius", 0),
        ),
        (
            "create-polyline",
            Params::new().with("points", ParamValue::List(vec![ParamValue::from([0.0, 0.0])])),
        ),
        ("create-line", Params::new().with("x1", "zero")),
        ("layer-create", Params::new().with("name", "bad/name")),
    ];

    // WHEN/THEN: Every case is a handler error and nothing was drawn
    for (command, params) in cases {
        let result = table.execute_on_document(command, &mut document, &params);
        assert_eq!(
            result.err().map(|e| e.kind()),
            Some(ErrorKind::HandlerError),
            "{command}"
        );
    }
    assert!(document.entities().is_empty());
}

/// **VALUE**: Verifies layer state rules across handlers.
///
/// **WHY THIS MATTERS**: Locked layers protect geometry from edits and the
/// current layer can never be frozen, mirroring the host's own rules.
///
/// **BUG THIS CATCHES**: Would catch erase or move ignoring the lock flag.
#[test]
fn given_locked_layer_when_editing_entity_then_refused_until_unlocked() {
    // GIVEN: A line on a locked layer "frame"
    let table = CommandTable::builtin(false);
    let mut document = Document::default();
    run(
        &table,
        &mut document,
        "layer-create",
        Params::new().with("name", "frame").with("color", "red"),
    );
    run(
        &table,
        &mut document,
        "create-line",
        Params::new()
            .with("x1", 0)
            .with("y1", 0)
            .with("x2", 1)
            .with("y2", 1)
            .with("layer", "frame"),
    );
    run(&table, &mut document, "layer-lock", Params::new().with("name", "frame"));

    // WHEN: Erasing while locked, then after unlocking
    let refused = table.execute_on_document(
        "entity-erase",
        &mut document,
        &Params::new().with("entity_id", "last"),
    );
    run(&table, &mut document, "layer-unlock", Params::new().with("name", "frame"));
    let erased = run(
        &table,
        &mut document,
        "entity-erase",
        Params::new().with("entity_id", "last"),
    );

    // THEN: Refused first, erased second; the current layer cannot be frozen
    assert_eq!(refused.err().map(|e| e.kind()), Some(ErrorKind::HandlerError));
    assert_eq!(erased, json!({ "erased": "30" }));
    assert_eq!(document.layer("frame").unwrap().color, 1);
    assert!(
        table
            .execute_on_document("layer-freeze", &mut document, &Params::new().with("name", "0"))
            .is_err()
    );
}

/// **VALUE**: Verifies undo points recorded by the host path.
///
/// **WHY THIS MATTERS**: Every modifying command run in the live host must be
/// undoable as one step, which is what users expect from the CAD application.
///
/// **BUG THIS CATCHES**: Would catch undoable entries not marking an undo point,
/// or read-only commands polluting the undo stack.
#[test]
fn given_modifying_command_on_host_when_undone_then_document_restored() {
    // GIVEN: A simulated host
    let table = CommandTable::builtin(false);
    let mut host = SimulatedHost::new();

    // WHEN: Creating a line, listing, then undoing once
    table
        .execute_on_host(
            "create-line",
            &mut host,
            &Params::new()
                .with("x1", 0)
                .with("y1", 0)
                .with("x2", 3)
                .with("y2", 4),
        )
        .unwrap();
    table
        .execute_on_host("entity-list", &mut host, &Params::new())
        .unwrap();
    let undone = table
        .execute_on_host("undo", &mut host, &Params::new())
        .unwrap();

    // THEN: The line is gone and a second undo has nothing left
    assert_eq!(undone, json!({ "undone": true }));
    assert!(host.document().entities().is_empty());
    assert!(!host.undo());
}

/// **VALUE**: Verifies that copying respects layer locks like every other edit.
///
/// **BUG THIS CATCHES**: Would catch entity-copy duplicating geometry off a
/// locked layer while erase, move, rotate and scale refuse it.
#[test]
fn given_locked_layer_when_copying_entity_then_refused() {
    // GIVEN: A circle on a locked layer
    let table = CommandTable::builtin(false);
    let mut document = Document::default();
    run(&table, &mut document, "layer-create", Params::new().with("name", "frame"));
    run(
        &table,
        &mut document,
        "create-circle",
        Params::new()
            .with("cx", 0)
            .with("cy", 0)
            .with("radius", 1)
            .with("layer", "frame"),
    );
    run(&table, &mut document, "layer-lock", Params::new().with("name", "frame"));

    // WHEN: Copying it
    let refused = table.execute_on_document(
        "entity-copy",
        &mut document,
        &Params::new().with("entity_id", "last").with("dx", 5).with("dy", 0),
    );

    // THEN: Handler error and no new entity
    assert_eq!(refused.err().map(|e| e.kind()), Some(ErrorKind::HandlerError));
    assert_eq!(document.entities().len(), 1);
}

/// **VALUE**: Verifies that a rejected command leaves undo history alone.
///
/// **WHY THIS MATTERS**: Users undo, mistype a command, then redo. If the failed
/// command recorded an undo point it would also wipe the redo history, and the
/// next undo would revert nothing.
///
/// **BUG THIS CATCHES**: Would catch the undo point being recorded before the
/// handler runs instead of after it succeeds.
#[test]
fn given_undone_line_when_undoable_command_fails_then_redo_still_available() {
    // GIVEN: A line created and undone on the host
    let table = CommandTable::builtin(false);
    let mut host = SimulatedHost::new();
    table
        .execute_on_host(
            "create-line",
            &mut host,
            &Params::new()
                .with("x1", 0)
                .with("y1", 0)
                .with("x2", 3)
                .with("y2", 4),
        )
        .unwrap();
    table
        .execute_on_host("undo", &mut host, &Params::new())
        .unwrap();

    // WHEN: An undoable command fails on a missing radius
    let failed = table.execute_on_host(
        "create-circle",
        &mut host,
        &Params::new().with("cx", 0).with("cy", 0),
    );

    // THEN: Redo brings the line back and there is exactly one undo step
    assert!(failed.is_err());
    let redone = table
        .execute_on_host("redo", &mut host, &Params::new())
        .unwrap();
    assert_eq!(redone, json!({ "redone": true }));
    assert_eq!(host.document().entities().len(), 1);
    assert!(host.undo());
    assert!(!host.undo());
}

/// **VALUE**: Verifies headless-only entries are refused by the host path.
///
/// **BUG THIS CATCHES**: Would catch availability only being checked for live-only
/// entries, letting a headless-only handler run inside the host.
#[test]
fn given_headless_only_entry_when_executed_on_host_then_unsupported() {
    // GIVEN: A table with one headless-only command
    let table = CommandTable::from_entries([CommandEntry::shared(
        "drawing-info",
        "Summary of the in-memory drawing",
        false,
        entity_total,
    )
    .restricted_to(BackendKind::Headless)]);
    let mut host = SimulatedHost::new();
    let mut document = Document::default();

    // WHEN: Running it on both paths
    let on_host = table.execute_on_host("drawing-info", &mut host, &Params::new());
    let on_document = table.execute_on_document("drawing-info", &mut document, &Params::new());

    // THEN: Host refuses with Unsupported, document path runs
    assert_eq!(
        table.get("drawing-info").map(|entry| entry.availability),
        Some(Availability::Headless)
    );
    assert_eq!(on_host.err().map(|e| e.kind()), Some(ErrorKind::Unsupported));
    assert_eq!(on_document.unwrap(), json!({ "entities": 0 }));
}
