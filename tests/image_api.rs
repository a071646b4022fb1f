use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rocket::figment::Figment;
use rocket::http::Status;
use rocket::local::asynchronous::Client;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use auraah::build_rocket;

fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 255])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

// Minimal upstream stub: serves a fixed response on every connection and
// counts how many times it was hit.
async fn spawn_upstream(
    status_line: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
    delay: Duration,
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let header = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status_line,
                    content_type,
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), hits)
}

fn test_figment(cache_dir: &Path, disk_enabled: bool) -> Figment {
    Figment::from(rocket::Config::default())
        .merge(("memory_cache_capacity", 16))
        .merge(("disk_cache_enabled", disk_enabled))
        .merge(("image_cache_dir", cache_dir.to_str().unwrap()))
        .merge(("timeout", 2))
}

fn cache_file_count(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

#[tokio::test]
async fn missing_url_returns_400() {
    let dir = tempfile::tempdir().unwrap();
    let client = Client::untracked(build_rocket(test_figment(dir.path(), true)).await)
        .await
        .unwrap();

    let response = client.get("/api/image-proxy").dispatch().await;
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(response.into_string().await.unwrap(), "Missing image URL");

    let response = client.get("/api/image-proxy?width=200&quality=80").dispatch().await;
    assert_eq!(response.status(), Status::BadRequest);

    assert_eq!(cache_file_count(dir.path()), 0);
}

#[tokio::test]
async fn cold_miss_then_memory_hit_with_identical_bytes() {
    let (upstream, hits) =
        spawn_upstream("200 OK", "image/png", png_fixture(64, 48), Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::untracked(build_rocket(test_figment(dir.path(), true)).await)
        .await
        .unwrap();

    let path = format!("/api/image-proxy?url={}/photo.png&width=32&quality=80", upstream);

    let response = client.get(path.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.headers().get_one("X-Cache"), Some("MISS"));
    assert_eq!(response.headers().get_one("Content-Type"), Some("image/webp"));
    let first = response.into_bytes().await.unwrap();

    let decoded = image::load_from_memory(&first).unwrap();
    assert_eq!(decoded.width(), 32);

    let response = client.get(path).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.headers().get_one("X-Cache"), Some("HIT-MEMORY"));
    let second = response.into_bytes().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    // Populated on disk as well
    assert_eq!(cache_file_count(dir.path()), 1);
}

#[tokio::test]
async fn disk_tier_survives_restart_and_promotes() {
    let (upstream, _) =
        spawn_upstream("200 OK", "image/png", png_fixture(40, 40), Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let path = format!("/api/image-proxy?url={}/a.png&width=20&quality=80", upstream);

    let client = Client::untracked(build_rocket(test_figment(dir.path(), true)).await)
        .await
        .unwrap();
    let response = client.get(path.clone()).dispatch().await;
    assert_eq!(response.headers().get_one("X-Cache"), Some("MISS"));
    let original = response.into_bytes().await.unwrap();
    drop(client);

    // New instance over the same cache directory simulates a restart
    let client = Client::untracked(build_rocket(test_figment(dir.path(), true)).await)
        .await
        .unwrap();
    let response = client.get(path.clone()).dispatch().await;
    assert_eq!(response.headers().get_one("X-Cache"), Some("HIT-DISK"));
    assert_eq!(response.into_bytes().await.unwrap(), original);

    let response = client.get(path).dispatch().await;
    assert_eq!(response.headers().get_one("X-Cache"), Some("HIT-MEMORY"));
}

#[tokio::test]
async fn upstream_failure_returns_500_and_caches_nothing() {
    let (upstream, hits) =
        spawn_upstream("404 Not Found", "text/plain", b"gone".to_vec(), Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::untracked(build_rocket(test_figment(dir.path(), true)).await)
        .await
        .unwrap();

    let path = format!("/api/image-proxy?url={}/missing.png&width=32", upstream);

    let response = client.get(path.clone()).dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);
    assert_eq!(response.into_string().await.unwrap(), "Failed to fetch image");
    assert_eq!(cache_file_count(dir.path()), 0);

    // Nothing cached in memory either: the retry reaches upstream again
    let response = client.get(path).dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_image_upstream_returns_500_and_caches_nothing() {
    let (upstream, _) = spawn_upstream(
        "200 OK",
        "text/html",
        b"<html>definitely not an image</html>".to_vec(),
        Duration::ZERO,
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::untracked(build_rocket(test_figment(dir.path(), true)).await)
        .await
        .unwrap();

    let response = client
        .get(format!("/api/image-proxy?url={}/page.html&width=32", upstream))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::InternalServerError);
    assert_eq!(response.into_string().await.unwrap(), "Error processing image");
    assert_eq!(cache_file_count(dir.path()), 0);
}

#[tokio::test]
async fn disabled_disk_tier_writes_no_files() {
    let (upstream, _) =
        spawn_upstream("200 OK", "image/png", png_fixture(40, 40), Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::untracked(build_rocket(test_figment(dir.path(), false)).await)
        .await
        .unwrap();

    let path = format!("/api/image-proxy?url={}/a.png&width=20", upstream);
    let response = client.get(path.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.headers().get_one("X-Cache"), Some("MISS"));
    assert_eq!(cache_file_count(dir.path()), 0);

    // Memory tier still serves repeats
    let response = client.get(path).dispatch().await;
    assert_eq!(response.headers().get_one("X-Cache"), Some("HIT-MEMORY"));
}

#[tokio::test]
async fn thumbnail_width_is_served_and_resized() {
    let (upstream, _) =
        spawn_upstream("200 OK", "image/png", png_fixture(200, 100), Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::untracked(build_rocket(test_figment(dir.path(), true)).await)
        .await
        .unwrap();

    let response = client
        .get(format!("/api/image-proxy?url={}/t.png&width=50&quality=100", upstream))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let decoded = image::load_from_memory(&response.into_bytes().await.unwrap()).unwrap();
    assert_eq!(decoded.width(), 50);
    assert_eq!(decoded.height(), 25);
}

#[tokio::test]
async fn host_allow_list_blocks_unlisted_upstream() {
    let (upstream, hits) =
        spawn_upstream("200 OK", "image/png", png_fixture(40, 40), Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let figment = test_figment(dir.path(), true)
        .merge(("image_host_allowlist", vec!["images.example.com"]));
    let client = Client::untracked(build_rocket(figment).await).await.unwrap();

    let response = client
        .get(format!("/api/image-proxy?url={}/a.png&width=20", upstream))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(cache_file_count(dir.path()), 0);
}

#[tokio::test]
async fn concurrent_misses_coalesce_into_one_fetch() {
    let (upstream, hits) = spawn_upstream(
        "200 OK",
        "image/png",
        png_fixture(64, 64),
        Duration::from_millis(200),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let client = Client::untracked(build_rocket(test_figment(dir.path(), true)).await)
        .await
        .unwrap();

    let path = format!("/api/image-proxy?url={}/c.png&width=32&quality=80", upstream);

    let (a, b, c) = tokio::join!(
        client.get(path.clone()).dispatch(),
        client.get(path.clone()).dispatch(),
        client.get(path.clone()).dispatch(),
    );

    assert_eq!(a.status(), Status::Ok);
    assert_eq!(b.status(), Status::Ok);
    assert_eq!(c.status(), Status::Ok);

    let bytes_a = a.into_bytes().await.unwrap();
    assert_eq!(bytes_a, b.into_bytes().await.unwrap());
    assert_eq!(bytes_a, c.into_bytes().await.unwrap());

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
