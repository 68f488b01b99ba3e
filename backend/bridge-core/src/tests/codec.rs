use crate::codec::{Codec, JsonCodec, round_float};
use crate::error::codec::CodecError;

use models::{ErrorKind, ParamValue, Params, RequestBuilder, RequestId, Response};
use serde_json::{Value, json};

fn request_with(params: Params) -> models::Request {
    RequestBuilder::default()
        .with_command("create-text")
        .with_params(params)
        .build()
        .unwrap()
}

/// **VALUE**: Verifies that text parameters survive encoding byte for byte.
///
/// **WHY THIS MATTERS**: Drawing text and script source routinely contain quotes,
/// backslashes and newlines. The host parses the artifact with a JSON reader; an
/// unescaped quote would truncate the payload or break the whole request.
///
/// **BUG THIS CATCHES**: Would catch hand-built JSON that forgets to escape control
/// characters or backslashes.
#[test]
fn given_text_with_special_characters_when_round_tripped_then_identical() {
    // GIVEN: Text mixing quotes, a backslash path, a newline, a tab and a control char
    let tricky = "He said \"hi\"\nC:\\drawings\\plan.dwg\t\u{1}end";
    let request = request_with(Params::new().with("text", tricky));

    // WHEN: Encoding and decoding the request
    let codec = JsonCodec;
    let bytes = codec.encode_request(&request).unwrap();
    let decoded = codec.decode_request(&bytes).unwrap();

    // THEN: The text is unchanged and the encoded form contains no raw newline
    assert_eq!(decoded.params.require_str("text").unwrap(), tricky);
    assert!(!bytes.contains(&b'\n'));
}

/// **VALUE**: Verifies float rounding on the wire.
///
/// **WHY THIS MATTERS**: Coordinates computed by callers carry binary noise
/// (0.1 + 0.2). Both backends must see the same rounded value or geometry checks
/// diverge between live and headless runs.
///
/// **BUG THIS CATCHES**: Would catch rounding only top-level floats and skipping
/// floats nested in point lists.
#[test]
fn given_noisy_floats_when_encoded_then_rounded_to_six_decimals() {
    // GIVEN: A top-level float and a nested point with noise
    let params = Params::new()
        .with("x", 0.1 + 0.2)
        .with(
            "points",
            ParamValue::List(vec![ParamValue::from([1.000_000_4, 2.0]), ParamValue::from([3.0, 4.0])]),
        );

    // WHEN: Encoding then decoding
    let codec = JsonCodec;
    let decoded = codec
        .decode_request(&codec.encode_request(&request_with(params)).unwrap())
        .unwrap();

    // THEN: Every float is rounded
    assert_eq!(decoded.params.require_f64("x").unwrap(), 0.3);
    assert_eq!(
        decoded.params.require_points("points").unwrap()[0],
        [1.0, 2.0]
    );
    assert_eq!(round_float(-2.345_678_91), -2.345_679);
}

/// **VALUE**: Verifies that NaN and infinity are refused at encode time.
///
/// **WHY THIS MATTERS**: JSON cannot express non-finite numbers. Failing early
/// keeps a broken request from ever reaching shared storage.
///
/// **BUG THIS CATCHES**: Would catch the encoder silently writing `null` in their
/// place, which the host would then reject with a confusing parameter error.
#[test]
fn given_non_finite_param_when_encoded_then_encode_error() {
    // GIVEN: A NaN nested inside a list
    let params = Params::new().with("values", ParamValue::List(vec![ParamValue::from(f64::NAN)]));

    // WHEN: Encoding
    let result = JsonCodec.encode_request(&request_with(params));

    // THEN: Encode error naming the parameter
    match result {
        Err(CodecError::Encode { message, .. }) => assert!(message.contains("values")),
        other => panic!("Expected Encode error, got {other:?}"),
    }
}

/// **VALUE**: Verifies rejection of malformed request artifacts.
///
/// **WHY THIS MATTERS**: Shared storage is writable by anything. Truncated or
/// hand-edited files must become a malformed-payload response, never a panic.
///
/// **BUG THIS CATCHES**: Would catch decoding that defaults a missing command to
/// an empty string and then tries to dispatch it.
#[test]
fn given_malformed_request_bytes_when_decoded_then_malformed_error() {
    // GIVEN: Truncated JSON, a missing command and a blank command
    let id = RequestId::generate();
    let candidates = [
        b"{\"request_id\":".to_vec(),
        format!("{{\"request_id\":\"{id}\",\"params\":{{}}}}").into_bytes(),
        format!("{{\"request_id\":\"{id}\",\"command\":\"  \"}}").into_bytes(),
    ];

    // WHEN/THEN: Each decodes to Malformed
    for bytes in candidates {
        assert!(
            matches!(JsonCodec.decode_request(&bytes), Err(CodecError::Malformed { .. })),
            "{:?} should be malformed",
            String::from_utf8_lossy(&bytes)
        );
    }
}

/// **VALUE**: Verifies that a success with a `null` payload is still a success.
///
/// **WHY THIS MATTERS**: Some commands legitimately return nothing. The decoder
/// must tell an explicit `null` apart from a payload that is missing.
///
/// **BUG THIS CATCHES**: Would catch `Option<Value>` deserialization collapsing
/// `"payload": null` into `None` and rejecting the response.
#[test]
fn given_success_with_null_payload_when_decoded_then_success() {
    // GIVEN: Hand-written success with null payload and one with no payload at all
    let id = RequestId::generate();
    let with_null = format!("{{\"request_id\":\"{id}\",\"ok\":true,\"payload\":null}}");
    let without = format!("{{\"request_id\":\"{id}\",\"ok\":true}}");

    // WHEN: Decoding both
    let decoded = JsonCodec.decode_response(with_null.as_bytes()).unwrap();
    let missing = JsonCodec.decode_response(without.as_bytes());

    // THEN: Null is a success; missing is malformed
    assert_eq!(decoded.payload(), Some(&Value::Null));
    assert!(matches!(missing, Err(CodecError::Malformed { .. })));
}

/// **VALUE**: Verifies that failure responses keep their error kind across the wire.
///
/// **WHY THIS MATTERS**: Callers branch on the kind (unknown command versus handler
/// failure). Losing it would turn every remote failure into a generic error.
///
/// **BUG THIS CATCHES**: Would catch the encoder dropping `error_kind`, or the
/// decoder accepting a failure that also carries a payload.
#[test]
fn given_failure_response_when_round_tripped_then_kind_and_message_preserved() {
    // GIVEN: An unknown-command failure
    let id = RequestId::generate();
    let response = Response::failure(id.clone(), ErrorKind::UnknownCommand, "unknown command 'x'");

    // WHEN: Round-tripping it
    let bytes = JsonCodec.encode_response(&response).unwrap();
    let decoded = JsonCodec.decode_response(&bytes).unwrap();

    // THEN: Kind and message survive; a contradictory artifact is rejected
    assert_eq!(decoded.error_kind(), Some(ErrorKind::UnknownCommand));
    assert_eq!(decoded.error_message(), Some("unknown command 'x'"));

    let contradictory = json!({
        "request_id": id.as_str(),
        "ok": false,
        "payload": 1,
        "error": "boom",
    });
    assert!(matches!(
        JsonCodec.decode_response(contradictory.to_string().as_bytes()),
        Err(CodecError::Malformed { .. })
    ));
}

/// Deterministic stream of integers for building parameter tables.
struct Sequence(u64);

impl Sequence {
    fn next(&mut self) -> u64 {
        // Knuth's MMIX constants
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 11
    }

    /// A float that is exactly representable at six decimals, up to ±2^52 millionths.
    fn six_decimal_float(&mut self) -> f64 {
        let millionths = (self.next() >> 1) as i64 - (1_i64 << 51);
        millionths as f64 / 1_000_000.0
    }
}

fn scalar(sequence: &mut Sequence) -> ParamValue {
    match sequence.next() % 4 {
        0 => ParamValue::Int(sequence.next() as i64 - (1_i64 << 52)),
        1 => ParamValue::Bool(sequence.next() % 2 == 0),
        2 => ParamValue::Float(sequence.six_decimal_float()),
        _ => ParamValue::Text(format!("t\"{}\\\n", sequence.next() % 1000)),
    }
}

/// **VALUE**: Verifies decode(encode(x)) == x over many mixed parameter maps.
///
/// **WHY THIS MATTERS**: Every command crosses the channel through this codec.
/// A single value type that does not survive (an integer read back as a float,
/// a nested map flattened, a float off by one ULP) changes what the host draws.
///
/// **BUG THIS CATCHES**: Would catch untagged decoding picking the wrong variant,
/// rounding that drifts values already at six decimals, and nested lists or maps
/// losing entries.
#[test]
fn given_generated_mixed_params_when_round_tripped_then_identical() {
    let mut sequence = Sequence(0x5eed);
    let codec = JsonCodec;

    for case in 0..200 {
        // GIVEN: A map mixing scalars with nested lists and maps
        let mut params = Params::new();
        for index in 0..6 {
            params.insert(format!("scalar_{index}"), scalar(&mut sequence));
        }
        let list: Vec<ParamValue> = (0..(sequence.next() % 5))
            .map(|_| scalar(&mut sequence))
            .collect();
        let map = (0..(sequence.next() % 4))
            .map(|index| (format!("key_{index}"), scalar(&mut sequence)))
            .collect();
        params.insert("list", ParamValue::List(list.clone()));
        params.insert(
            "nested",
            ParamValue::Map(
                [
                    ("inner".to_string(), ParamValue::Map(map)),
                    ("items".to_string(), ParamValue::List(list)),
                ]
                .into_iter()
                .collect(),
            ),
        );
        let request = request_with(params);

        // WHEN: Encoding then decoding
        let bytes = codec.encode_request(&request).unwrap();
        let decoded = codec.decode_request(&bytes).unwrap();

        // THEN: Identical request
        assert_eq!(decoded, request, "case {case} changed on the wire");
    }
}

/// **VALUE**: Verifies the magnitude edges of float encoding.
///
/// **WHY THIS MATTERS**: Scaling a huge float for rounding overflows to infinity,
/// which JSON writes as `null`; the host then rejects the whole request.
///
/// **BUG THIS CATCHES**: Would catch rounding that scales before checking the
/// magnitude, and tiny values being sent unrounded.
#[test]
fn given_extreme_magnitudes_when_round_tripped_then_large_kept_and_tiny_rounded() {
    // GIVEN: Large floats beyond six-decimal precision and tiny ones below it
    let large = [1.0e303, -1.0e303, f64::MAX, f64::MIN, 9_007_199_254.740_993, 1.0e20];
    let tiny = [(4.0e-7, 0.0), (-4.0e-7, 0.0), (6.0e-7, 0.000_001), (1.0e-300, 0.0)];
    let codec = JsonCodec;

    for value in large {
        // WHEN: Round-tripping
        let request = request_with(Params::new().with("x", value));
        let decoded = codec
            .decode_request(&codec.encode_request(&request).unwrap())
            .unwrap();

        // THEN: Unchanged, never null
        assert_eq!(decoded.params.require_f64("x").unwrap(), round_float(value));
        assert!(round_float(value).is_finite(), "{value} became non-finite");
    }
    assert_eq!(round_float(1.0e303), 1.0e303);

    for (value, expected) in tiny {
        let request = request_with(Params::new().with("x", value));
        let decoded = codec
            .decode_request(&codec.encode_request(&request).unwrap())
            .unwrap();
        assert_eq!(decoded.params.require_f64("x").unwrap(), expected);
    }

    // Payload floats follow the same rule
    let response = Response::success(RequestId::generate(), json!({ "max": [1.0e303, 0.5] }));
    let decoded = codec
        .decode_response(&codec.encode_response(&response).unwrap())
        .unwrap();
    assert_eq!(decoded.payload(), Some(&json!({ "max": [1.0e303, 0.5] })));
}
