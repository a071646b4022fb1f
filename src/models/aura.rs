use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "person")]
    Person,
    #[serde(rename = "fictional character")]
    FictionalCharacter,
    #[serde(rename = "place")]
    Place,
    #[serde(rename = "brand")]
    Brand,
    #[serde(rename = "thing")]
    Thing,
}

impl EntityType {
    // Parse the free-form type string the model returns
    pub fn from_label(label: &str) -> Option<EntityType> {
        match label.trim().to_lowercase().as_str() {
            "person" => Some(EntityType::Person),
            "fictional character" | "character" => Some(EntityType::FictionalCharacter),
            "place" => Some(EntityType::Place),
            "brand" => Some(EntityType::Brand),
            "thing" => Some(EntityType::Thing),
            _ => None,
        }
    }

    // Fallback classification when the model response carries no type field:
    // look for category words in the description text
    pub fn from_description(description: &str) -> EntityType {
        let desc = description.to_lowercase();
        if desc.contains("fictional character") {
            EntityType::FictionalCharacter
        } else if desc.contains("person") {
            EntityType::Person
        } else if desc.contains("place") {
            EntityType::Place
        } else if desc.contains("brand") {
            EntityType::Brand
        } else {
            EntityType::Thing
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuraProfile {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub description: String,
    pub claim_to_fame: String,
    /// Comma-separated hashtags of similar entities, as produced by the model.
    pub recommended_hashtags: String,
    /// Popularity/influence score, 1-100.
    pub aura_meter: u8,
    pub aura_reason: String,
    pub image_url: Option<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuraProfileResponse {
    pub data: AuraProfile,
    pub from_cache: bool,
    pub cache_age: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AuraQuery {
    // Defaulted so an absent name surfaces as a 400, not a body parse error
    #[serde(default)]
    pub name: String,
}
