use log::info;
use reqwest::Client;
use serde_json::{json, Value};

use crate::aura::AuraError;
use crate::models::aura::EntityType;

const UNSPLASH_ENDPOINT: &str = "https://api.unsplash.com/search/photos";
const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// Placeholder served when no representative image can be found.
pub fn fallback_image_url(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Person => "https://via.placeholder.com/400x400?text=Person+Image+Not+Found",
        EntityType::FictionalCharacter => {
            "https://via.placeholder.com/400x400?text=Character+Image+Not+Found"
        }
        EntityType::Place => "https://via.placeholder.com/400x400?text=Place+Image+Not+Found",
        EntityType::Brand => "https://via.placeholder.com/400x400?text=Brand+Logo+Not+Found",
        EntityType::Thing => "https://via.placeholder.com/400x400?text=Object+Image+Not+Found",
    }
}

pub struct UnsplashClient {
    client: Client,
    access_key: String,
}

impl UnsplashClient {
    pub fn new(access_key: String) -> Self {
        Self {
            client: Client::new(),
            access_key,
        }
    }

    /// First photo matching `query`, if any.
    pub async fn search_image(&self, query: &str) -> Result<Option<String>, AuraError> {
        let response = self
            .client
            .get(UNSPLASH_ENDPOINT)
            .query(&[
                ("query", query),
                ("client_id", self.access_key.as_str()),
                ("per_page", "1"),
            ])
            .send()
            .await?;

        let value: Value = response.json().await?;
        Ok(value
            .pointer("/results/0/urls/regular")
            .and_then(|v| v.as_str())
            .map(String::from))
    }
}

pub struct TavilyClient {
    client: Client,
    api_key: String,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Resolve a representative image for the entity: an entity-type-specific
    /// query first, then a broad query, then a basic-depth search as a last
    /// resort.
    pub async fn find_image(
        &self,
        name: &str,
        entity_type: EntityType,
    ) -> Result<Option<String>, AuraError> {
        let typed_query = match entity_type {
            EntityType::FictionalCharacter => {
                format!("official image of {} character anime manga", name)
            }
            EntityType::Person => format!("official portrait photo of {} person", name),
            EntityType::Place => format!("high quality photograph of {} location", name),
            EntityType::Brand | EntityType::Thing => {
                format!("official logo or image of {} product brand", name)
            }
        };

        if let Some(url) = self.search(&typed_query, "advanced", 3).await? {
            return Ok(Some(url));
        }

        if let Some(url) = self.search(&format!("best image of {}", name), "advanced", 3).await? {
            return Ok(Some(url));
        }

        info!("Falling back to basic image search for '{}'", name);
        self.search(&format!("{} image", name), "basic", 5).await
    }

    async fn search(
        &self,
        query: &str,
        depth: &str,
        max_results: u8,
    ) -> Result<Option<String>, AuraError> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": depth,
            "max_results": max_results,
            "include_images": true
        });

        let response = self.client.post(TAVILY_ENDPOINT).json(&body).send().await?;
        let value: Value = response.json().await?;

        Ok(value
            .pointer("/images/0")
            .and_then(|v| v.as_str())
            .map(String::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_covers_every_entity_type() {
        for entity_type in [
            EntityType::Person,
            EntityType::FictionalCharacter,
            EntityType::Place,
            EntityType::Brand,
            EntityType::Thing,
        ] {
            assert!(fallback_image_url(entity_type).starts_with("https://"));
        }
    }
}
