//! Verify request shaping and response normalization against JSON test
//! vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs and expected outputs. Comparing parsed
//! JSON (not raw strings) avoids false negatives from field-ordering
//! differences.

use std::sync::Arc;

use task_core::client::parse_response;
use task_core::tasks::query_string;
use task_core::{
    ApiClient, ApiError, HttpMethod, HttpResponse, MemoryStore, RequestOptions, TaskFilter, UreqTransport,
};

const BASE_URL: &str = "http://localhost:3000/api";

fn client(token: Option<&str>) -> ApiClient {
    let client = ApiClient::new(BASE_URL, Arc::new(UreqTransport::new()), Arc::new(MemoryStore::new()));
    client.set_token(token).unwrap();
    client
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn parse_headers(value: &serde_json::Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let c = client(case["token"].as_str());

        let options = RequestOptions {
            method: parse_method(case["method"].as_str().unwrap()),
            body: case["body"].as_str().map(str::to_string),
            headers: parse_headers(&case["headers"]),
        };
        let req = c.build_request(case["endpoint"].as_str().unwrap(), options);

        let expected = &case["expected_request"];
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");
        assert_eq!(req.headers, parse_headers(&expected["headers"]), "{name}: headers");
        assert_eq!(req.body.as_deref(), expected["body"].as_str(), "{name}: body");
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: parse_headers(&case["headers"]),
            body: case["body"].as_str().unwrap().to_string(),
        };
        let result = parse_response::<serde_json::Value>(response);
        let expected = &case["expected"];

        if let Some(ok) = expected.get("ok") {
            assert_eq!(&result.unwrap(), ok, "{name}: parsed result");
            continue;
        }

        let want = &expected["error"];
        let err = result.unwrap_err();
        match (want["kind"].as_str().unwrap(), &err) {
            ("ServerMisbehaving", ApiError::ServerMisbehaving) => {}
            ("Unexpected", ApiError::Unexpected(_)) => {}
            ("Application", ApiError::Application { status, code, .. }) => {
                assert_eq!(u64::from(*status), want["status"].as_u64().unwrap(), "{name}: status");
                assert_eq!(code.as_deref(), want["code"].as_str(), "{name}: code");
            }
            (kind, other) => panic!("{name}: expected {kind}, got {other:?}"),
        }
        if let Some(message) = want["message"].as_str() {
            assert_eq!(err.to_string(), message, "{name}: message");
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[test]
fn filter_test_vectors() {
    let raw = include_str!("../../test-vectors/filters.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["filter"];
        let filter = TaskFilter {
            status: input.get("status").map(|v| serde_json::from_value(v.clone()).unwrap()),
            priority: input.get("priority").map(|v| serde_json::from_value(v.clone()).unwrap()),
            search: input["search"].as_str().map(str::to_string),
        };
        assert_eq!(
            query_string(&filter),
            case["expected_query"].as_str().unwrap(),
            "{name}: query"
        );
    }
}
