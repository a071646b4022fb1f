use std::io::Cursor;

use rocket::http::{ContentType, Header};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::State;

use crate::api::ApiError;
use crate::aura::{fallback_image_url, AuraError, AuraService};
use crate::cache::AuraCache;
use crate::models::aura::{AuraProfile, AuraProfileResponse, AuraQuery};

#[post("/aura", data = "<query>")]
pub async fn generate_aura(
    query: Json<AuraQuery>,
    service: &State<AuraService>,
    cache: &State<AuraCache>,
) -> Result<JsonWithCache<AuraProfileResponse>, ApiError> {
    let name = query.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::MissingName);
    }

    respond(&name, "gemini", cache, gemini_profile(service, &name)).await
}

#[post("/aura/groq", data = "<query>")]
pub async fn generate_aura_groq(
    query: Json<AuraQuery>,
    service: &State<AuraService>,
    cache: &State<AuraCache>,
) -> Result<JsonWithCache<AuraProfileResponse>, ApiError> {
    let name = query.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::MissingName);
    }

    respond(&name, "groq", cache, groq_profile(service, &name)).await
}

// Shared cache-then-generate-then-fallback flow for both providers
async fn respond(
    name: &str,
    provider: &str,
    cache: &AuraCache,
    generate: impl std::future::Future<Output = Result<AuraProfile, AuraError>>,
) -> Result<JsonWithCache<AuraProfileResponse>, ApiError> {
    // Check cache first (non-expired data)
    if let Some((profile, age)) = cache.get(provider, name) {
        return Ok(JsonWithCache {
            inner: AuraProfileResponse {
                data: profile,
                from_cache: true,
                cache_age: Some(age),
            },
            from_cache: true,
            cache_age: Some(age),
            cache_duration: cache.cache_duration.as_secs(),
        });
    }

    match generate.await {
        Ok(profile) => {
            cache.store(provider, profile.clone());

            Ok(JsonWithCache {
                inner: AuraProfileResponse {
                    data: profile,
                    from_cache: false,
                    cache_age: None,
                },
                from_cache: false,
                cache_age: None,
                cache_duration: cache.cache_duration.as_secs(),
            })
        }
        Err(err) => {
            // Generation failed, serve expired cache data when available
            if let Some((profile, age)) = cache.get_even_expired(provider, name) {
                log::warn!(
                    "Using expired aura cache for {} as fallback due to generation error: {:?}",
                    name,
                    err
                );

                Ok(JsonWithCache {
                    inner: AuraProfileResponse {
                        data: profile,
                        from_cache: true,
                        cache_age: Some(age),
                    },
                    from_cache: true,
                    cache_age: Some(age),
                    cache_duration: cache.cache_duration.as_secs(),
                })
            } else {
                Err(err.into())
            }
        }
    }
}

async fn gemini_profile(service: &AuraService, name: &str) -> Result<AuraProfile, AuraError> {
    let gemini = service
        .gemini
        .as_ref()
        .ok_or(AuraError::MissingApiKey("GEMINI_API_KEY"))?;

    let mut profile = gemini.generate_aura(name).await?;

    let image = match &service.unsplash {
        Some(unsplash) => unsplash.search_image(name).await?,
        None => None,
    };
    profile.image_url =
        Some(image.unwrap_or_else(|| fallback_image_url(profile.entity_type).to_string()));

    Ok(profile)
}

async fn groq_profile(service: &AuraService, name: &str) -> Result<AuraProfile, AuraError> {
    let groq = service
        .groq
        .as_ref()
        .ok_or(AuraError::MissingApiKey("GROQ_API_KEY"))?;
    let tavily = service
        .tavily
        .as_ref()
        .ok_or(AuraError::MissingApiKey("TAVILY_API_KEY"))?;

    let mut profile = groq.generate_aura(name).await?;

    let image = tavily.find_image(name, profile.entity_type).await?;
    profile.image_url =
        Some(image.unwrap_or_else(|| fallback_image_url(profile.entity_type).to_string()));

    Ok(profile)
}

pub struct JsonWithCache<T> {
    pub inner: T,
    pub from_cache: bool,
    pub cache_age: Option<u64>,
    pub cache_duration: u64,
}

impl<'r, T: serde::Serialize> Responder<'r, 'static> for JsonWithCache<T> {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut response = Response::build();
        response.header(ContentType::JSON);
        // Cached data advertises only its remaining lifetime
        if self.from_cache {
            let max_age = self
                .cache_age
                .map(|age| self.cache_duration.saturating_sub(age))
                .unwrap_or(self.cache_duration);
            response.header(Header::new("Cache-Control", format!("public, max-age={}", max_age)));
        } else {
            response.header(Header::new(
                "Cache-Control",
                format!("public, max-age={}", self.cache_duration),
            ));
        }
        response.sized_body(
            None,
            Cursor::new(serde_json::to_vec(&self.inner).unwrap()),
        );
        response.ok()
    }
}
