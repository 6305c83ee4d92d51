//! End-to-end tests for the HTTP front.

use std::time::Duration;

use path_router::config::parse_config;
use serde_json::Value;

mod common;

const TABLE: &str = r#"
    [[routes]]
    path = "/users/<id:int>"
    methods = ["GET", "PUT"]
    name = "user"
    response = "user detail"

    [[routes.overrides]]
    path = "/users/1"
    methods = ["GET"]
    response = "root user"

    [[routes]]
    path = "/users/profile"
    response = "profile"

    [[routes]]
    path = "/files/<rest:path>"
    response = "file"
"#;

#[tokio::test]
async fn test_resolved_request_returns_json() {
    let server = common::start_server(TABLE).await;
    let client = common::client();

    let res = client.get(server.url("/users/42")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["route"], "/users/<id:int>");
    assert_eq!(body["name"], "user");
    assert_eq!(body["response"], "user detail");
    assert_eq!(body["params"]["id"], 42);
    assert_eq!(body["args"][0], "GET");
    assert_eq!(body["canonical_path"], "/users/42");

    let body: Value = client
        .get(server.url("/users/profile"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["response"], "profile");

    let body: Value = client
        .get(server.url("/files/css/site.css"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["params"]["rest"], "css/site.css");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_override_served_for_instance() {
    let server = common::start_server(TABLE).await;
    let client = common::client();

    let body: Value = client.get(server.url("/users/01")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["response"], "root user");

    let body: Value = client.put(server.url("/users/1")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["response"], "user detail");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_not_found_and_method_not_allowed() {
    let server = common::start_server(TABLE).await;
    let client = common::client();

    let res = client.get(server.url("/users/abc")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = client.get(server.url("/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let res = client.delete(server.url("/users/42")).send().await.unwrap();
    assert_eq!(res.status(), 405);
    assert_eq!(res.headers()["allow"], "GET, PUT");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_route_table_reload() {
    let server = common::start_server(TABLE).await;
    let client = common::client();

    let res = client.get(server.url("/orders/7")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let updated = parse_config(
        r#"
        [[routes]]
        path = "/orders/<id:int>"
        response = "order"
        "#,
    )
    .unwrap();
    server.updates.send(updated).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client.get(server.url("/orders/7")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let res = client.get(server.url("/users/42")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let server = common::start_server(TABLE).await;
    let client = common::client();
    assert_eq!(client.get(server.url("/users/profile")).send().await.unwrap().status(), 200);

    server.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(client.get(server.url("/users/profile")).send().await.is_err());
}
