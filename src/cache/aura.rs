use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::models::aura::AuraProfile;

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub inserted_at: Instant,
    pub expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            data,
            inserted_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }

    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.inserted_at)
    }
}

/// TTL cache for generated aura profiles, keyed by (provider, name).
/// Expired entries are kept around so they can serve as a fallback when a
/// fresh generation attempt fails.
pub struct AuraCache {
    profiles: RwLock<HashMap<String, CacheEntry<AuraProfile>>>,
    pub cache_duration: Duration,
}

impl AuraCache {
    pub fn new(cache_days: u64) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            cache_duration: Duration::from_secs(cache_days * 24 * 60 * 60),
        }
    }

    fn key(provider: &str, name: &str) -> String {
        format!("{}:{}", provider, name.trim().to_lowercase())
    }

    pub fn get(&self, provider: &str, name: &str) -> Option<(AuraProfile, u64)> {
        let profiles = self.profiles.read();

        if let Some(entry) = profiles.get(&Self::key(provider, name)) {
            if !entry.is_expired() {
                return Some((entry.data.clone(), entry.age().as_secs()));
            }
        }

        None
    }

    pub fn get_even_expired(&self, provider: &str, name: &str) -> Option<(AuraProfile, u64)> {
        let profiles = self.profiles.read();

        profiles
            .get(&Self::key(provider, name))
            .map(|entry| (entry.data.clone(), entry.age().as_secs()))
    }

    pub fn store(&self, provider: &str, profile: AuraProfile) {
        let mut profiles = self.profiles.write();
        profiles.insert(
            Self::key(provider, &profile.name),
            CacheEntry::new(profile, self.cache_duration),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::aura::EntityType;
    use chrono::Utc;

    fn profile(name: &str) -> AuraProfile {
        AuraProfile {
            name: name.to_string(),
            entity_type: EntityType::Person,
            description: "A person.".to_string(),
            claim_to_fame: "Famous.".to_string(),
            recommended_hashtags: "#A, #B".to_string(),
            aura_meter: 50,
            aura_reason: "Middling.".to_string(),
            image_url: None,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_entry_is_served_with_age() {
        let cache = AuraCache::new(1);
        cache.store("gemini", profile("Ada Lovelace"));

        let (found, age) = cache.get("gemini", "Ada Lovelace").unwrap();
        assert_eq!(found.name, "Ada Lovelace");
        assert!(age <= 1);
    }

    #[test]
    fn lookup_is_scoped_per_provider_and_case_insensitive() {
        let cache = AuraCache::new(1);
        cache.store("gemini", profile("Ada Lovelace"));

        assert!(cache.get("groq", "Ada Lovelace").is_none());
        assert!(cache.get("gemini", "ada lovelace").is_some());
    }

    #[test]
    fn expired_entry_only_surfaces_through_fallback() {
        // Zero-day TTL expires immediately
        let cache = AuraCache::new(0);
        cache.store("gemini", profile("Ada Lovelace"));
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert!(cache.get("gemini", "Ada Lovelace").is_none());
        assert!(cache.get_even_expired("gemini", "Ada Lovelace").is_some());
    }
}
