use log::info;
use reqwest::Client;
use serde_json::{json, Value};

use crate::aura::{aura_prompt, extract_json_object, profile_from_value, AuraError};
use crate::models::aura::AuraProfile;

const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-001:generateContent";

pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    pub async fn generate_aura(&self, name: &str) -> Result<AuraProfile, AuraError> {
        info!("Generating aura for '{}' via Gemini", name);

        let body = json!({
            "contents": [{ "parts": [{ "text": aura_prompt(name) }] }]
        });

        let response = self
            .client
            .post(GEMINI_ENDPOINT)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuraError::InvalidResponse(format!(
                "Gemini API returned status {}",
                status
            )));
        }

        let value: Value = response.json().await?;
        let raw = value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .ok_or(AuraError::EmptyResponse)?;

        let object = extract_json_object(raw)?;
        profile_from_value(name, &object)
    }
}
