//! Verify build and parse against JSON test vectors stored in `test-vectors/`.
//!
//! `requests.json` pairs an operation and its input with the request the
//! client must build; `responses.json` pairs a simulated response with the
//! envelope or error `parse` must produce. Comparing parsed JSON (not raw
//! strings) avoids false negatives from field-ordering differences.

use blog_admin_core::types::ChangePasswordRequest;
use blog_admin_core::{
    BlogApiClient, CreateCategory, CreatePost, HttpMethod, HttpRequest, HttpResponse, LoginRequest,
    PostQuery, UpdatePost,
};
use serde_json::Value;

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn input<T: serde::de::DeserializeOwned>(case: &Value) -> T {
    serde_json::from_value(case["input"].clone()).unwrap()
}

fn build(client: &BlogApiClient, case: &Value) -> HttpRequest {
    let id = case["id"].as_str().unwrap_or_default();
    match case["operation"].as_str().unwrap() {
        "login" => client.build_login(&input::<LoginRequest>(case)),
        "logout" => client.build_logout(),
        "change_password" => client.build_change_password(&input::<ChangePasswordRequest>(case)),
        "list_posts" => client.build_list_posts(&input::<PostQuery>(case)),
        "create_post" => client.build_create_post(&input::<CreatePost>(case)),
        "update_post" => client.build_update_post(id, &input::<UpdatePost>(case)),
        "delete_post" => client.build_delete_post(id),
        "get_post_by_slug" => client.build_get_post_by_slug(id),
        "create_category" => client.build_create_category(&input::<CreateCategory>(case)),
        "blog_stats" => client.build_blog_stats(),
        other => panic!("unknown operation: {other}"),
    }
    .unwrap()
}

/// Split a URL into its path and its query pairs, sorted.
fn split_url(url: &str) -> (String, Vec<(String, String)>) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    pairs.sort();
    (path.to_string(), pairs)
}

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();
    let client = BlogApiClient::new(base_url).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected_request"];
        let req = build(&client, case);

        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(
            split_url(&req.url),
            split_url(&format!("{base_url}{}", expected["url"].as_str().unwrap())),
            "{name}: url"
        );

        let expected_headers: Vec<(String, String)> = expected["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        let body: Value = req
            .body
            .as_ref()
            .and_then(|b| b.as_json())
            .map(|b| serde_json::from_str(b).unwrap())
            .unwrap_or(Value::Null);
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let client = BlogApiClient::new("http://localhost:8080").unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["response"];
        let headers = sim["content_type"]
            .as_str()
            .map(|ct| vec![("content-type".to_string(), ct.to_string())])
            .unwrap_or_default();
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers,
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let expected = &case["expected"];

        match client.parse::<Value>(response) {
            Ok(env) => {
                assert!(expected.get("error").is_none(), "{name}: expected an error, got {env:?}");
                assert_eq!(env.success, expected["success"].as_bool().unwrap(), "{name}: success");
                assert_eq!(env.data.unwrap_or(Value::Null), expected["data"], "{name}: data");
                if let Some(message) = expected.get("message") {
                    assert_eq!(env.message.as_deref(), message.as_str(), "{name}: message");
                }
                if expected["stamped"] == true {
                    assert!(env.timestamp.is_some(), "{name}: timestamp");
                }
            }
            Err(err) => {
                let error = expected
                    .get("error")
                    .unwrap_or_else(|| panic!("{name}: unexpected error {err:?}"));
                let envelope = err.envelope();
                assert!(!envelope.success, "{name}: success flag");
                assert_eq!(u64::from(envelope.code), error["code"].as_u64().unwrap(), "{name}: code");
                if let Some(message) = error.get("message") {
                    assert_eq!(envelope.message, message.as_str().unwrap(), "{name}: message");
                }
            }
        }
    }
}
