//! End-to-end tests: decode → flow → marshal over real HTTP.

use serde_json::{json, Value};

mod common;

const GREET: &str = r#"
    [[flows]]
    name = "greet"

    [flows.input.message.name]
    scalar = { type = "string" }

    [flows.input.message.age]
    scalar = { type = "int32" }

    [flows.input.message.status.enum]
    values = { ACTIVE = 1, BANNED = 2 }

    [[flows.steps]]
    name = "greeting"
    function = "sprintf"
    args = ["Hello %s (%d)", "{{ input:name }}", "{{ input:age }}"]

    [flows.output.message.message]
    reference = "greeting:result"
    scalar = { type = "string" }

    [flows.output.message.tags]
    reference = "input:tags"
    repeated = { scalar = { type = "string" } }

    [flows.output.message.status]
    reference = "input:status"
    enum = { values = { ACTIVE = 1, BANNED = 2 } }

    [flows.output.message.nickname]
    label = "required"
    reference = "input:nickname"
    scalar = { type = "string" }

    [[endpoints]]
    flow = "greet"
    method = "POST"
    path = "/greet"

    [[endpoints]]
    flow = "greet"
    method = "POST"
    path = "/graphql"
    codec = "graphql"

    [security]
    max_body_size = 512
"#;

#[tokio::test]
async fn test_json_to_json() {
    let gateway = common::start_gateway(GREET).await;

    let res = common::client()
        .post(gateway.url("/greet"))
        .json(&json!({"name": "Ann", "age": 30, "tags": ["a", "b"], "status": "BANNED"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );

    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "message": "Hello Ann (30)",
            "tags": ["a", "b"],
            "status": "BANNED",
            "nickname": null
        })
    );

    gateway.stop();
}

#[tokio::test]
async fn test_form_to_json() {
    let gateway = common::start_gateway(GREET).await;

    let res = common::client()
        .post(gateway.url("/greet"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=Ann+Lee&age=41&tags%5B0%5D=x&status=ACTIVE")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Hello Ann Lee (41)");
    assert_eq!(body["tags"], json!(["x"]));
    assert_eq!(body["status"], "ACTIVE");

    gateway.stop();
}

#[tokio::test]
async fn test_graphql_envelope() {
    let gateway = common::start_gateway(GREET).await;

    let res = common::client()
        .post(gateway.url("/graphql"))
        .json(&json!({
            "query": "query Greet($name: String!, $age: Int!) { greet(name: $name, age: $age) { message } }",
            "operationName": "Greet",
            "variables": {"name": "Bo", "age": 7}
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    // Absent fields are omitted, required or not.
    assert_eq!(body, json!({"data": {"message": "Hello Bo (7)"}}));

    gateway.stop();
}

#[tokio::test]
async fn test_unknown_enum_symbol_is_bad_request() {
    let gateway = common::start_gateway(GREET).await;

    let res = common::client()
        .post(gateway.url("/greet"))
        .header("x-request-id", "req-1")
        .json(&json!({"name": "Ann", "age": 1, "status": "GONE"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(res.headers()["x-request-id"], "req-1");

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["request_id"], "req-1");
    assert!(body["error"].as_str().unwrap().contains("GONE"));

    gateway.stop();
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let gateway = common::start_gateway(GREET).await;

    let res = common::client()
        .post(gateway.url("/greet"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    gateway.stop();
}

#[tokio::test]
async fn test_type_mismatch_is_bad_request() {
    let gateway = common::start_gateway(GREET).await;

    // age is not an int32; binding rejects it before the flow runs.
    let res = common::client()
        .post(gateway.url("/greet"))
        .json(&json!({"name": "Ann", "age": "old"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    gateway.stop();
}

#[tokio::test]
async fn test_path_syntax_in_keys_is_bad_request() {
    let gateway = common::start_gateway(GREET).await;
    let client = common::client();

    for body in [
        json!({"name": "Ann", "tags[50000000]": "x"}),
        json!({"name": "Ann", "user.name": "x"}),
        json!({"tags[18446744073709551615]": "x"}),
    ] {
        let res = client
            .post(gateway.url("/greet"))
            .json(&body)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 400, "body {body}");
        let error: Value = res.json().await.unwrap();
        assert!(error["error"].as_str().unwrap().contains("invalid key"));
    }

    gateway.stop();
}

#[tokio::test]
async fn test_no_endpoint() {
    let gateway = common::start_gateway(GREET).await;

    let res = common::client()
        .get(gateway.url("/greet"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert!(body["request_id"].is_string());

    gateway.stop();
}

#[tokio::test]
async fn test_body_too_large() {
    let gateway = common::start_gateway(GREET).await;

    let res = common::client()
        .post(gateway.url("/greet"))
        .header("content-type", "application/json")
        .body(format!("{{\"name\": \"{}\"}}", "x".repeat(1024)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 413);
    gateway.stop();
}

#[tokio::test]
async fn test_sequential_requests_do_not_share_state() {
    let gateway = common::start_gateway(GREET).await;
    let client = common::client();

    let first: Value = client
        .post(gateway.url("/greet"))
        .json(&json!({"name": "Ann", "age": 1, "tags": ["a", "b", "c"]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["tags"], json!(["a", "b", "c"]));

    let second: Value = client
        .post(gateway.url("/greet"))
        .json(&json!({"name": "Bo", "age": 2}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["message"], "Hello Bo (2)");
    assert!(second.get("tags").is_none());

    gateway.stop();
}
