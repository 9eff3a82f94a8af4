//! Verify status checking and resource decoding against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each vector describes a simulated response and the expected outcome.
//! Resources are compared as decoded records, so field order and omitted
//! optional fields in the vector files do not matter.

use hellosign_core::{parse_json, Account, ApiError, Embedded, HttpResponse, ReusableForm, SignatureRequest};
use serde::de::DeserializeOwned;
use serde_json::Value;

fn simulated(response: &Value) -> HttpResponse {
    HttpResponse::json(
        response["status"].as_u64().unwrap() as u16,
        response["body"].as_str().unwrap(),
    )
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected"];
        let result = parse_json(simulated(&case["response"]));

        match expected["kind"].as_str().unwrap() {
            "ok" => {
                assert_eq!(result.unwrap(), expected["json"], "{name}: body");
            }
            "http" => match result {
                Err(err @ ApiError::Http { .. }) => {
                    assert_eq!(err.to_string(), expected["display"].as_str().unwrap(), "{name}: display");
                    let ApiError::Http { status, message } = err else { unreachable!() };
                    assert_eq!(status as u64, expected["status"].as_u64().unwrap(), "{name}: status");
                    assert_eq!(message, expected["message"].as_str().unwrap(), "{name}: message");
                }
                other => panic!("{name}: expected Http error, got {other:?}"),
            },
            "malformed" => match result {
                Err(ApiError::MalformedErrorBody { status, body }) => {
                    assert_eq!(status as u64, expected["status"].as_u64().unwrap(), "{name}: status");
                    assert_eq!(body, expected["body"].as_str().unwrap(), "{name}: body");
                }
                other => panic!("{name}: expected MalformedErrorBody, got {other:?}"),
            },
            "deserialization" => {
                assert!(matches!(result, Err(ApiError::Deserialization(_))), "{name}: {result:?}");
            }
            other => panic!("{name}: unknown expectation kind {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

fn assert_decodes<T>(name: &str, field: &str, case: &Value)
where
    T: DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let response = HttpResponse::json(200, &case["body"].to_string());
    let body = parse_json(response).unwrap();
    let decoded: T = serde_json::from_value(body[field].clone()).unwrap();
    let expected: T = serde_json::from_value(case["expected"].clone()).unwrap();
    assert_eq!(decoded, expected, "{name}: decoded resource");
}

#[test]
fn resource_test_vectors() {
    let raw = include_str!("../../test-vectors/resources.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        match case["resource"].as_str().unwrap() {
            "account" => assert_decodes::<Account>(name, "account", case),
            "signature_request" => assert_decodes::<SignatureRequest>(name, "signature_request", case),
            "reusable_form" => assert_decodes::<ReusableForm>(name, "reusable_form", case),
            "embedded" => assert_decodes::<Embedded>(name, "embedded", case),
            other => panic!("{name}: unknown resource {other}"),
        }
    }
}

#[test]
fn signature_request_scenario_reads_id() {
    let raw = include_str!("../../test-vectors/resources.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let case = &vectors["cases"][0];

    let sr: SignatureRequest = serde_json::from_value(case["body"]["signature_request"].clone()).unwrap();

    assert_eq!(sr.signature_request_id.as_deref(), Some("abc123"));
    assert_eq!(sr.test_mode, Some(true));
}
