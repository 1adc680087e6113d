//! HTTP API served over a real socket with fake collaborators

mod common;

use std::net::SocketAddr;

use reqwest::StatusCode;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use catalog_mirror::catalog::Catalog;
use catalog_mirror::server;

use common::{FakeTree, Harness, ROOT};

struct Running {
    base: String,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Running {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.handle.await.unwrap();
    }
}

async fn start(h: &Harness) -> Running {
    let (stop, stopped) = oneshot::channel::<()>();
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let (bound, handle) = server::serve(addr, h.app_state(), async move {
        let _ = stopped.await;
    })
    .await
    .unwrap();

    Running {
        base: format!("http://{}", bound),
        stop,
        handle,
    }
}

fn silk_tree() -> FakeTree {
    let tree = FakeTree::new();
    tree.folder(ROOT, "silk", "Silk");
    tree.folder("silk", "red", "Red");
    tree.file("red", "a-id", "a.jpg");
    tree.file("red", "b-id", "b.png");
    tree
}

#[tokio::test]
async fn test_get_catalog_returns_json() {
    let h = Harness::new(silk_tree());
    let server = start(&h).await;

    let response = reqwest::get(format!("{}/api/catalog", server.base))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body[0]["name"], "Silk");
    assert_eq!(body[0]["subfolders"][0]["name"], "Red");
    assert_eq!(body[0]["subfolders"][0]["all"][1]["name"], "b");
    assert_eq!(body[0]["subfolders"][0]["preview"].as_array().unwrap().len(), 2);
    assert_eq!(
        body[0]["subfolders"][0]["all"][0]["image"],
        "https://cdn.test/sarees/a-id"
    );

    let again: Catalog = reqwest::get(format!("{}/api/catalog", server.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again[0].subfolders[0].all.len(), 2);
    assert_eq!(h.sink.upload_count(), 2);

    server.shutdown().await;
}

#[tokio::test]
async fn test_catalog_failure_is_plain_500() {
    // Root folder absent
    let h = Harness::new(FakeTree::new());
    let server = start(&h).await;

    let response = reqwest::get(format!("{}/api/catalog", server.base))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "Error fetching catalog");

    server.shutdown().await;
}

#[tokio::test]
async fn test_image_is_streamed_with_cached_mime() {
    let h = Harness::new(silk_tree());
    let server = start(&h).await;

    let response = reqwest::get(format!("{}/api/image/a-id", server.base))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/webp");
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"a-id");

    let response = reqwest::get(format!("{}/api/image/missing-7", server.base))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "Error fetching image");

    server.shutdown().await;
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let h = Harness::new(silk_tree());
    let server = start(&h).await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/catalog", server.base))
        .header("Origin", "https://shop.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    server.shutdown().await;
}
