use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: Every error in the bridge (channel timeouts, dispatcher
/// failures, selector init errors) reports its origin through this type. Wrong
/// coordinates make a timed-out host round trip impossible to trace.
///
/// **BUG THIS CATCHES**: Would catch if `Location::caller()` data stops being copied
/// into the struct, or if line capture drifts.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN: The current source line
    let expected_line = line!() + 3;

    // WHEN: Creating ErrorLocation from the caller location
    let location = ErrorLocation::from(Location::caller());

    // THEN: File, line and column are captured
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert_eq!(location.line, expected_line, "Should capture line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies the `[file:line:column]` display format.
///
/// **WHY THIS MATTERS**: Error messages printed by the CLI and written to the log file
/// embed this format; tooling that greps logs for call sites depends on it.
///
/// **BUG THIS CATCHES**: Would catch a Display change that drops the brackets or
/// one of the three coordinates.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: An ErrorLocation
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Formatting it
    let formatted = location.to_string();

    // THEN: "[file:line:column]"
    assert!(formatted.starts_with('['), "Should start with '['");
    assert!(formatted.ends_with(']'), "Should end with ']'");
    assert!(formatted.contains("error_location.rs"));
    assert!(formatted.contains(&location.line.to_string()));
    assert_eq!(formatted.matches(':').count(), 2, "Exactly 2 colons");
}

/// **VALUE**: Verifies `#[track_caller]` propagation into `ErrorLocation::from()`.
///
/// **WHY THIS MATTERS**: Error constructors in bridge-core capture `Location::caller()`
/// from inside `#[track_caller]` helpers. If propagation breaks, every error points at
/// the helper instead of the failing call site.
///
/// **BUG THIS CATCHES**: Would catch a `from()` that stops honouring the caller chain.
#[test]
fn given_multiple_call_sites_when_capturing_location_then_each_has_unique_line() {
    // GIVEN: A tracked helper
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    // WHEN: Capturing from consecutive lines
    let loc1 = capture_location();
    let loc2 = capture_location();

    // THEN: Same file, sequential lines
    assert_eq!(loc1.file, loc2.file);
    assert_eq!(loc1.line + 1, loc2.line, "Lines should be sequential");
}
