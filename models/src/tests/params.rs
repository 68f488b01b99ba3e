use crate::{ModelError, ParamValue, Params};

/// **VALUE**: Verifies that an absent optional parameter is reported as `None`.
///
/// **WHY THIS MATTERS**: Handlers such as `create-text` treat a missing `rotation`
/// as "use the default" but a supplied `0.0` as an explicit value. Collapsing absence
/// to zero would make the two indistinguishable.
///
/// **BUG THIS CATCHES**: Would catch an accessor that returns `Some(0.0)` or an error
/// for a key that was never provided.
#[test]
fn given_absent_key_when_optional_f64_called_then_returns_none() {
    // GIVEN: Params without a rotation and with an explicit zero height
    let params = Params::new().with("height", 0.0);

    // WHEN: Reading both
    let rotation = params.optional_f64("rotation").unwrap();
    let height = params.optional_f64("height").unwrap();

    // THEN: Absent is None, zero stays zero
    assert_eq!(rotation, None);
    assert_eq!(height, Some(0.0));
}

/// **VALUE**: Verifies that integers are accepted where numbers are expected.
///
/// **WHY THIS MATTERS**: JSON callers routinely write `"radius": 5` instead of `5.0`.
///
/// **BUG THIS CATCHES**: Would catch `as_f64` rejecting `ParamValue::Int`.
#[test]
fn given_integer_value_when_require_f64_called_then_widens_to_float() {
    // GIVEN: An integer radius
    let params = Params::new().with("radius", 5);

    // WHEN: Reading it as a number
    let radius = params.require_f64("radius").unwrap();

    // THEN: Widened without loss
    assert_eq!(radius, 5.0);
}

/// **VALUE**: Verifies the error for a parameter of the wrong type.
///
/// **WHY THIS MATTERS**: The dispatcher forwards `reason()` to the remote caller, so the
/// message must name the key, what was expected and what arrived.
///
/// **BUG THIS CATCHES**: Would catch a type mismatch silently treated as "absent".
#[test]
fn given_wrong_type_when_require_str_called_then_returns_invalid_param() {
    // GIVEN: A numeric layer name
    let params = Params::new().with("layer", 7);

    // WHEN: Requiring a string
    let result = params.require_str("layer");

    // THEN: InvalidParam naming the key and both types
    match result {
        Err(ModelError::InvalidParam {
            key,
            expected,
            found,
            ..
        }) => {
            assert_eq!(key, "layer");
            assert_eq!(expected, "a string");
            assert_eq!(found, "an integer");
        }
        other => panic!("Expected InvalidParam, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a missing required parameter yields `MissingParam`.
///
/// **WHY THIS MATTERS**: Handlers rely on this to fail with a descriptive message instead
/// of crashing the dispatch loop.
///
/// **BUG THIS CATCHES**: Would catch `require_*` returning a default value.
#[test]
fn given_missing_key_when_require_f64_called_then_reason_names_the_key() {
    // GIVEN: Empty params
    let params = Params::new();

    // WHEN: Requiring a value
    let error = params.require_f64("x1").unwrap_err();

    // THEN: MissingParam with a location-free reason
    assert!(matches!(error, ModelError::MissingParam { .. }));
    assert_eq!(error.reason(), "parameter 'x1' is required");
}

/// **VALUE**: Verifies point list extraction.
///
/// **WHY THIS MATTERS**: `create-polyline` takes its vertices as `[[x, y], ...]`; a
/// malformed vertex must be rejected as a whole rather than partially drawn.
///
/// **BUG THIS CATCHES**: Would catch three-element vertices or text coordinates
/// being accepted.
#[test]
fn given_point_lists_when_require_points_called_then_only_pairs_accepted() {
    // GIVEN: One valid and one invalid vertex list
    let valid = Params::new().with(
        "points",
        vec![ParamValue::from([0.0, 0.0]), ParamValue::from([10.0, 5.5])],
    );
    let invalid = Params::new().with(
        "points",
        vec![ParamValue::from([0.0, 0.0]), ParamValue::from("1,2")],
    );

    // WHEN: Extracting
    let points = valid.require_points("points").unwrap();
    let rejected = invalid.require_points("points");

    // THEN: Pairs returned, bad list rejected
    assert_eq!(points, vec![[0.0, 0.0], [10.0, 5.5]]);
    assert!(matches!(rejected, Err(ModelError::InvalidParam { .. })));
}

/// **VALUE**: Verifies that a single string is accepted as a one-element list.
///
/// **WHY THIS MATTERS**: `drawing-get-variables` accepts `names` as either form.
///
/// **BUG THIS CATCHES**: Would catch the single-string shorthand being rejected.
#[test]
fn given_single_string_when_optional_str_list_called_then_wraps_in_list() {
    // GIVEN: A bare string
    let params = Params::new().with("names", "CLAYER");

    // WHEN: Reading as a list
    let names = params.optional_str_list("names").unwrap();

    // THEN: One-element list
    assert_eq!(names, Some(vec![String::from("CLAYER")]));
}

/// **VALUE**: Verifies untagged deserialization picks the narrowest numeric variant.
///
/// **WHY THIS MATTERS**: `color` must stay an integer so `require_i64` accepts it after a
/// trip through the file channel.
///
/// **BUG THIS CATCHES**: Would catch variant ordering that decodes `3` as a float.
#[test]
fn given_json_numbers_when_deserialized_then_integers_stay_integers() {
    // GIVEN: JSON with an integer and a float
    let json = r#"{"color": 3, "x": 1.5, "name": "walls", "frozen": false}"#;

    // WHEN: Deserializing
    let params: Params = serde_json::from_str(json).unwrap();

    // THEN: Variants preserved
    assert_eq!(params.get("color"), Some(&ParamValue::Int(3)));
    assert_eq!(params.get("x"), Some(&ParamValue::Float(1.5)));
    assert_eq!(params.get("name"), Some(&ParamValue::from("walls")));
    assert_eq!(params.get("frozen"), Some(&ParamValue::Bool(false)));
}
