use std::time::Instant;

use log::info;
use reqwest::Client;
use serde_json::{json, Value};

use crate::aura::{aura_prompt, extract_json_object, profile_from_value, AuraError};
use crate::models::aura::AuraProfile;

const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_MODEL: &str = "llama3-8b-8192";

pub struct GroqClient {
    client: Client,
    api_key: String,
}

impl GroqClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    pub async fn generate_aura(&self, name: &str) -> Result<AuraProfile, AuraError> {
        info!("Generating aura for '{}' via Groq", name);
        let started = Instant::now();

        let body = json!({
            "messages": [{ "role": "user", "content": aura_prompt(name) }],
            "model": GROQ_MODEL,
            "temperature": 0.7,
            "max_tokens": 1500
        });

        let response = self
            .client
            .post(GROQ_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuraError::InvalidResponse(format!(
                "Groq API returned status {}",
                status
            )));
        }

        let value: Value = response.json().await?;
        let raw = value
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or(AuraError::EmptyResponse)?;

        info!("Groq inference time: {} ms", started.elapsed().as_millis());

        let object = extract_json_object(raw)?;
        profile_from_value(name, &object)
    }
}
