use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use vhost_gateway::{Gateway, GatewayOptions};

async fn test_gateway() -> Gateway {
    Gateway::listen("127.0.0.1:0", GatewayOptions::default())
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn add_then_list_round_trips() {
    let gateway = test_gateway().await;
    let app = vhost_api::build_router(gateway.clone(), "example.com");

    let request = Request::post("/vhost/")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"host_prefix": "a", "target": "http://127.0.0.1:9000"}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let added = body_json(response).await;
    assert_eq!(added["hostname"], "a.example.com");

    let response = app
        .clone()
        .oneshot(Request::get("/vhost/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed["hosts"][0]["name"], "a.example.com");

    gateway.close().await.unwrap();
}

#[tokio::test]
async fn duplicate_add_returns_409() {
    let gateway = test_gateway().await;
    let app = vhost_api::build_router(gateway.clone(), "example.com");
    let body = json!({"host_prefix": "a", "target": "http://127.0.0.1:9000"}).to_string();

    let first = Request::post("/vhost/")
        .header("content-type", "application/json")
        .body(Body::from(body.clone()))
        .unwrap();
    assert_eq!(app.clone().oneshot(first).await.unwrap().status(), StatusCode::OK);

    let second = Request::post("/vhost/")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    assert_eq!(
        app.clone().oneshot(second).await.unwrap().status(),
        StatusCode::CONFLICT
    );

    gateway.close().await.unwrap();
}

#[tokio::test]
async fn missing_target_is_a_bad_request() {
    let gateway = test_gateway().await;
    let app = vhost_api::build_router(gateway.clone(), "example.com");

    let request = Request::post("/vhost/")
        .header("content-type", "application/json")
        .body(Body::from(json!({"host_prefix": "a"}).to_string()))
        .unwrap();
    assert_eq!(
        app.oneshot(request).await.unwrap().status(),
        StatusCode::BAD_REQUEST
    );

    gateway.close().await.unwrap();
}

#[tokio::test]
async fn remove_falls_back_to_domain_suffixed_name() {
    let gateway = test_gateway().await;
    let app = vhost_api::build_router(gateway.clone(), "example.com");

    gateway
        .add(
            "a.example.com",
            "http://127.0.0.1:9000".parse().unwrap(),
        )
        .await
        .unwrap();

    let request = Request::delete("/vhost/a").body(Body::empty()).unwrap();
    assert_eq!(app.oneshot(request).await.unwrap().status(), StatusCode::OK);
    assert!(!gateway.exists("a.example.com").await);

    gateway.close().await.unwrap();
}

#[tokio::test]
async fn remove_unknown_name_is_404() {
    let gateway = test_gateway().await;
    let app = vhost_api::build_router(gateway.clone(), "example.com");

    let request = Request::delete("/vhost/nobody").body(Body::empty()).unwrap();
    assert_eq!(
        app.oneshot(request).await.unwrap().status(),
        StatusCode::NOT_FOUND
    );

    gateway.close().await.unwrap();
}

#[tokio::test]
async fn random_generates_a_32_hex_char_prefix() {
    let gateway = test_gateway().await;
    let app = vhost_api::build_router(gateway.clone(), "example.com:18080");

    let request = Request::post("/random/")
        .header("content-type", "application/json")
        .body(Body::from(json!({"target": "http://127.0.0.1:9000"}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let added = body_json(response).await;
    let hostname = added["hostname"].as_str().unwrap();

    let re_prefix = &hostname[..32];
    assert!(re_prefix.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(&hostname[32..], ".example.com:18080");

    gateway.close().await.unwrap();
}

#[tokio::test]
async fn unsupported_method_on_known_path_is_400_not_405() {
    let gateway = test_gateway().await;
    let app = vhost_api::build_router(gateway.clone(), "example.com");

    let request = Request::put("/vhost/").body(Body::empty()).unwrap();
    assert_eq!(
        app.oneshot(request).await.unwrap().status(),
        StatusCode::BAD_REQUEST
    );

    gateway.close().await.unwrap();
}

#[tokio::test]
async fn health_reports_ok() {
    let gateway = test_gateway().await;
    let app = vhost_api::build_router(gateway.clone(), "example.com");

    let request = Request::get("/health/").body(Body::empty()).unwrap();
    assert_eq!(app.oneshot(request).await.unwrap().status(), StatusCode::OK);

    gateway.close().await.unwrap();
}
