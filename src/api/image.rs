use std::io::Cursor;

use rocket::http::{ContentType, Header};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::State;

use crate::api::ApiError;
use crate::cache::{cache_key, FlightSlot, ImageCache, Inflight};
use crate::config::AppConfig;
use crate::images::tools::{self, DEFAULT_QUALITY, THUMBNAIL_ENCODE_EFFORT};
use crate::images::{ImageProxy, TransformLimiter};

/// Encoded image plus the cache tier that produced it. Long-lived public
/// caching headers so CDNs keep serving while revalidating.
pub struct ImageResponse {
    pub data: Vec<u8>,
    pub cache_status: &'static str,
}

impl<'r> Responder<'r, 'static> for ImageResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let etag = format!("\"{:x}\"", md5::compute(&self.data));
        // Check If-None-Match header
        if let Some(if_none_match) = req.headers().get_one("If-None-Match") {
            if if_none_match == etag {
                return Response::build()
                    .status(rocket::http::Status::NotModified)
                    .header(Header::new("ETag", etag))
                    .header(Header::new(
                        "Cache-Control",
                        "public, max-age=432000, stale-while-revalidate=86400",
                    ))
                    .ok();
            }
        }
        Response::build()
            .header(ContentType::new("image", "webp"))
            .header(Header::new(
                "Cache-Control",
                "public, max-age=432000, stale-while-revalidate=86400",
            ))
            .header(Header::new("Surrogate-Control", "public, max-age=604800"))
            .header(Header::new("Vary", "Accept"))
            .header(Header::new("X-Content-Type-Options", "nosniff"))
            .header(Header::new("X-Cache", self.cache_status))
            .header(Header::new("Access-Control-Allow-Origin", "*"))
            .header(Header::new("ETag", etag))
            .sized_body(None, Cursor::new(self.data))
            .ok()
    }
}

#[get("/image-proxy?<url>&<width>&<quality>")]
pub async fn transform_image(
    url: Option<&str>,
    width: Option<&str>,
    quality: Option<&str>,
    config: &State<AppConfig>,
    cache: &State<ImageCache>,
    inflight: &State<Inflight>,
    image_proxy: &State<ImageProxy>,
    limiter: &State<TransformLimiter>,
) -> Result<ImageResponse, ApiError> {
    let url = match url {
        Some(u) if !u.is_empty() => u,
        _ => return Err(ApiError::MissingImageUrl),
    };

    // Non-numeric or zero width means "no resize"
    let width = width.and_then(|w| w.parse::<u32>().ok()).filter(|&w| w > 0);
    let quality = quality
        .and_then(|q| q.parse::<u8>().ok())
        .unwrap_or(DEFAULT_QUALITY);

    let thumbnail = tools::is_thumbnail(width);
    // The key carries the requested quality; clamping happens at encode time
    let key = cache_key(url, width, quality);

    if let Some((data, tier)) = cache.get(&key).await {
        log::debug!("Image cache {} for {}", tier.header_value(), url);
        return Ok(ImageResponse {
            data,
            cache_status: tier.header_value(),
        });
    }

    // Coalesce concurrent misses for the same key: one leader fetches, the
    // rest wait and re-read the cache
    let _guard = match inflight.acquire(&key).await {
        FlightSlot::Leader(guard) => Some(guard),
        FlightSlot::Follower => {
            if let Some((data, tier)) = cache.get(&key).await {
                return Ok(ImageResponse {
                    data,
                    cache_status: tier.header_value(),
                });
            }
            // The leader failed; fetch without a guard rather than retrying
            // the coalescing dance
            None
        }
    };

    log::info!("Image cache MISS for {} (width: {:?}, quality: {})", url, width, quality);

    let original = image_proxy.fetch_image(url, thumbnail).await?;

    let encode_quality = tools::effective_quality(quality, thumbnail);
    let effort = if thumbnail {
        THUMBNAIL_ENCODE_EFFORT
    } else {
        config.encode_effort
    };

    let encoded = {
        let _permit = limiter.acquire().await;
        tools::transform_to_webp(&original, width, encode_quality, effort)?
    };

    cache.store(&key, &encoded).await;

    Ok(ImageResponse {
        data: encoded,
        cache_status: "MISS",
    })
}
