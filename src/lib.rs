#[macro_use]
extern crate rocket;

pub mod api;
pub mod aura;
pub mod cache;
pub mod config;
pub mod cors;
pub mod images;
pub mod models;

use log::info;
use rocket::figment::Figment;
use rocket::{Build, Rocket};

use aura::AuraService;
use cache::{AuraCache, ImageCache, Inflight};
use config::AppConfig;
use cors::CORS;
use images::{ImageProxy, TransformLimiter};

/// Assemble the Rocket instance from an already-built figment. Every piece
/// of shared state is constructed here and injected via `manage`, so tests
/// can stand up isolated instances with their own figment.
pub async fn build_rocket(figment: Figment) -> Rocket<Build> {
    let config = figment
        .extract::<AppConfig>()
        .expect("Invalid configuration");

    let image_proxy = ImageProxy::new(
        config.timeout,
        &config.user_agent,
        config.image_host_allowlist.clone(),
    );

    let disk_dir = config.disk_cache_enabled.then(|| config.image_cache_dir());
    match &disk_dir {
        Some(dir) => info!("Image disk cache enabled at {:?}", dir),
        None => info!("Image disk cache disabled"),
    }
    let image_cache = ImageCache::new(config.memory_cache_capacity, disk_dir);
    image_cache.init().await;

    let aura_service = AuraService::new(&config);
    let aura_cache = AuraCache::new(config.aura_cache_duration);

    let transform_limiter = TransformLimiter::new(config.transform_concurrency);

    info!(
        "Starting Auraah API server on {}:{}",
        config.address, config.port
    );

    rocket::custom(figment)
        .attach(CORS)
        .manage(image_cache)
        .manage(Inflight::new())
        .manage(image_proxy)
        .manage(transform_limiter)
        .manage(aura_service)
        .manage(aura_cache)
        .manage(config)
        .mount(
            "/api",
            routes![
                api::image::transform_image,
                api::aura::generate_aura,
                api::aura::generate_aura_groq,
            ],
        )
}
