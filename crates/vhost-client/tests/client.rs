use vhost_client::{ClientError, GatewayClient};
use vhost_gateway::{Gateway, GatewayOptions};

async fn spawn_api(gateway: Gateway) -> std::net::SocketAddr {
    let app = vhost_api::build_router(gateway, "example.com");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn add_list_and_remove_round_trip() {
    let gateway = Gateway::listen("127.0.0.1:0", GatewayOptions::default())
        .await
        .unwrap();
    let api_addr = spawn_api(gateway.clone()).await;
    let client = GatewayClient::new(&format!("http://{api_addr}")).unwrap();

    let hostname = client.add("a", "http://127.0.0.1:9000").await.unwrap();
    assert_eq!(hostname, "a.example.com");

    let hosts = client.list().await.unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].name, "a.example.com");

    let single = client.list_host("a.example.com").await.unwrap();
    assert_eq!(single.uri, "http://127.0.0.1:9000/");

    client.remove("a").await.unwrap();
    assert!(matches!(
        client.list_host("a.example.com").await.unwrap_err(),
        ClientError::NotFound
    ));

    gateway.close().await.unwrap();
}

#[tokio::test]
async fn random_returns_a_bound_hostname() {
    let gateway = Gateway::listen("127.0.0.1:0", GatewayOptions::default())
        .await
        .unwrap();
    let api_addr = spawn_api(gateway.clone()).await;
    let client = GatewayClient::new(&format!("http://{api_addr}")).unwrap();

    let hostname = client.random("http://127.0.0.1:9000").await.unwrap();
    assert!(hostname.ends_with(".example.com"));
    assert!(gateway.exists(&hostname).await);

    gateway.close().await.unwrap();
}

#[tokio::test]
async fn remove_missing_host_is_not_found() {
    let gateway = Gateway::listen("127.0.0.1:0", GatewayOptions::default())
        .await
        .unwrap();
    let api_addr = spawn_api(gateway.clone()).await;
    let client = GatewayClient::new(&format!("http://{api_addr}")).unwrap();

    assert!(matches!(
        client.remove("nobody").await.unwrap_err(),
        ClientError::NotFound
    ));

    gateway.close().await.unwrap();
}
