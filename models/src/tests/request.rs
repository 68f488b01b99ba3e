use crate::request::REQUEST_ID_LEN;
use crate::{ModelError, Params, RequestBuilder, RequestId};

/// **VALUE**: Verifies the shape of generated request ids.
///
/// **WHY THIS MATTERS**: The id is embedded in artifact file names and matched by the
/// dispatcher's discovery pattern. Any other shape is invisible to the host.
///
/// **BUG THIS CATCHES**: Would catch uppercase hex, hyphens from the UUID, or a wrong length.
#[test]
fn given_generated_id_when_parsed_then_round_trips() {
    // GIVEN: A fresh id
    let id = RequestId::generate();

    // WHEN: Parsing its string form
    let parsed = RequestId::parse(id.as_str()).unwrap();

    // THEN: 28 lowercase hex characters, identical after parsing
    assert_eq!(id.as_str().len(), REQUEST_ID_LEN);
    assert!(
        id.as_str()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    );
    assert_eq!(parsed, id);
}

/// **VALUE**: Verifies that ids sort by creation time.
///
/// **WHY THIS MATTERS**: The dispatcher processes the smallest pending id first, which
/// is what makes queued requests run in creation order.
///
/// **BUG THIS CATCHES**: Would catch a timestamp that is not zero-padded, which breaks
/// lexicographic ordering.
#[test]
fn given_ids_generated_in_sequence_when_compared_then_ordered_by_creation() {
    // GIVEN: Two ids created a moment apart
    let first = RequestId::generate();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = RequestId::generate();

    // WHEN/THEN: Earlier sorts first and carries an earlier timestamp
    assert!(first < second);
    assert!(first.created_micros() < second.created_micros());
}

/// **VALUE**: Verifies that malformed ids are rejected.
///
/// **WHY THIS MATTERS**: Ids arrive from file names and file contents written by another
/// process; path separators or dots must never be accepted into a file name.
///
/// **BUG THIS CATCHES**: Would catch a parser that only checks length.
#[test]
fn given_malformed_ids_when_parsed_then_rejected() {
    // GIVEN: Wrong length, uppercase and path-like input
    let candidates = [
        "abc",
        "0000000000000000ABCDEF123456",
        "../../../../../../etc/passwd",
        "",
    ];

    // WHEN/THEN: Each fails validation
    for raw in candidates {
        assert!(
            matches!(RequestId::parse(raw), Err(ModelError::Validation { .. })),
            "{raw:?} should be rejected"
        );
    }
}

/// **VALUE**: Verifies builder validation of the command name.
///
/// **WHY THIS MATTERS**: Command names are whitelist keys; whitespace can only come from
/// a caller bug and should fail before anything is written to shared storage.
///
/// **BUG THIS CATCHES**: Would catch the builder accepting an empty or missing command.
#[test]
fn given_invalid_commands_when_building_request_then_validation_fails() {
    // GIVEN: Missing, empty and spaced commands
    let missing = RequestBuilder::default().build();
    let empty = RequestBuilder::default().with_command("").build();
    let spaced = RequestBuilder::default().with_command("create line").build();

    // THEN: All fail validation
    assert!(matches!(missing, Err(ModelError::Validation { .. })));
    assert!(matches!(empty, Err(ModelError::Validation { .. })));
    assert!(matches!(spaced, Err(ModelError::Validation { .. })));
}

/// **VALUE**: Verifies the builder keeps a supplied id and params.
///
/// **WHY THIS MATTERS**: The channel chooses the id up front so it can stage script
/// artifacts under the same id before the request is written.
///
/// **BUG THIS CATCHES**: Would catch `build()` replacing a supplied id.
#[test]
fn given_explicit_id_when_building_request_then_id_preserved() {
    // GIVEN: An explicit id and params
    let id = RequestId::generate();
    let params = Params::new().with("radius", 2.5);

    // WHEN: Building
    let request = RequestBuilder::default()
        .with_request_id(id.clone())
        .with_command("create-circle")
        .with_params(params.clone())
        .with_param("layer", "0")
        .build()
        .unwrap();

    // THEN: Id kept, params merged
    assert_eq!(request.request_id, id);
    assert_eq!(request.command, "create-circle");
    assert_eq!(request.params.get("radius"), params.get("radius"));
    assert!(request.params.contains("layer"));
    assert!(request.ts > 0);
}
