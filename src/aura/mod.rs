pub mod gemini;
pub mod groq;
pub mod search;

use chrono::Utc;
use log::warn;
use serde_json::Value;
use thiserror::Error;

use crate::models::aura::{AuraProfile, EntityType};

pub use gemini::GeminiClient;
pub use groq::GroqClient;
pub use search::{fallback_image_url, TavilyClient, UnsplashClient};

#[derive(Error, Debug)]
pub enum AuraError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Missing API key: {0}")]
    MissingApiKey(&'static str),

    #[error("Empty model response")]
    EmptyResponse,

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}

/// Holds whichever provider clients the configuration has keys for. Routes
/// fail with a missing-key error when their provider is absent.
pub struct AuraService {
    pub gemini: Option<GeminiClient>,
    pub groq: Option<GroqClient>,
    pub unsplash: Option<UnsplashClient>,
    pub tavily: Option<TavilyClient>,
}

impl AuraService {
    pub fn new(config: &crate::config::AppConfig) -> Self {
        Self {
            gemini: config.gemini_api_key.clone().map(GeminiClient::new),
            groq: config.groq_api_key.clone().map(GroqClient::new),
            unsplash: config.unsplash_access_key.clone().map(UnsplashClient::new),
            tavily: config.tavily_api_key.clone().map(TavilyClient::new),
        }
    }
}

// The instruction block sent to both providers. Asks for a strict JSON object
// describing the entity, ten similar-entity hashtags and a 1-100 popularity
// score with justification.
pub fn aura_prompt(name: &str) -> String {
    format!(
        r##"You're an intelligent AI designed to identify whether the input "{name}" is a person, place, or thing.

Step 1: Classify what "{name}" is - a real person, fictional character, place, brand, or thing - and describe it briefly in 1-2 sentences.

Step 2: Write a short paragraph explaining what makes "{name}" notable: its impact, fame, or importance.

Step 3: Recommend 10 similar entities of the same category (people for people, fictional characters for fictional characters, places for places, things or brands for things or brands), mixing same-region, same-field, and same-era picks.

Step 4: Generate a list of 10 hashtags from those recommendations. Use ONLY names of similar well-known entities, never elements taken from the input itself.

Step 5: Estimate the "auraMeter" score, a number from 1 to 100 reflecting the overall popularity, influence, and cultural relevance of "{name}".

Step 6: Explain the score briefly in "auraReason" (1-2 sentences).

Respond ONLY in the following strict JSON format:
{{
  "name": "{name}",
  "type": "<person | fictional character | place | thing | brand>",
  "description": "<Your description identifying what it is.>",
  "claimToFame": "<Short paragraph explaining its notability.>",
  "recommendedHashtags": "#Entity1, #Entity2, #Entity3, #Entity4, #Entity5, #Entity6, #Entity7, #Entity8, #Entity9, #Entity10",
  "auraMeter": <number from 1 to 100>,
  "auraReason": "<Short justification for the auraMeter score.>"
}}

Formatting Rules:
- Hashtags must be comma-separated with no extra descriptions or words.
- Output must be valid JSON with no markdown or HTML formatting."##
    )
}

/// Pull the JSON object out of a free-text model response: everything between
/// the first opening and the last closing brace. Models routinely wrap the
/// object in prose or markdown fences.
pub fn extract_json_object(raw: &str) -> Result<Value, AuraError> {
    let start = raw
        .find('{')
        .ok_or_else(|| AuraError::InvalidResponse("No JSON object in response".to_string()))?;
    let end = raw
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| AuraError::InvalidResponse("No JSON object in response".to_string()))?;

    serde_json::from_str(&raw[start..=end])
        .map_err(|e| AuraError::InvalidResponse(format!("Response is not valid JSON: {}", e)))
}

/// Build an `AuraProfile` from the extracted model JSON, validating that
/// every required field is present. The type field is optional; when the
/// model omits it the description text is used to classify.
pub fn profile_from_value(name: &str, value: &Value) -> Result<AuraProfile, AuraError> {
    let description = required_str(value, "description")?;
    let claim_to_fame = required_str(value, "claimToFame")?;
    let recommended_hashtags = required_str(value, "recommendedHashtags")?;
    let aura_reason = required_str(value, "auraReason")?;
    let aura_meter = value
        .get("auraMeter")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| AuraError::InvalidResponse("Missing required field: auraMeter".to_string()))?
        .clamp(1, 100) as u8;

    let entity_type = value
        .get("type")
        .and_then(|v| v.as_str())
        .and_then(EntityType::from_label)
        .unwrap_or_else(|| {
            warn!("Model response for '{}' carries no usable type field", name);
            EntityType::from_description(&description)
        });

    Ok(AuraProfile {
        name: name.to_string(),
        entity_type,
        description,
        claim_to_fame,
        recommended_hashtags,
        aura_meter,
        aura_reason,
        image_url: None,
        generated_at: Utc::now(),
    })
}

fn required_str(value: &Value, field: &str) -> Result<String, AuraError> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| AuraError::InvalidResponse(format!("Missing required field: {}", field)))
}
