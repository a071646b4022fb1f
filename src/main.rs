#[macro_use]
extern crate rocket;

use std::env;

use dotenv::dotenv;
use env_logger::Env;
use log::info;
use rocket::figment::{
    providers::{Format, Toml},
    Figment, Profile,
};
use rocket::Config;

use auraah::build_rocket;

#[launch]
async fn rocket() -> _ {
    dotenv().ok();

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    // Load config
    let mut figment = Figment::from(Config::default()).merge(Toml::file("App.toml").nested());

    // API keys come from the environment
    if let Ok(key) = env::var("GEMINI_API_KEY") {
        figment = figment.merge(("gemini_api_key", key));
    }
    if let Ok(key) = env::var("GROQ_API_KEY") {
        figment = figment.merge(("groq_api_key", key));
    }
    if let Ok(key) = env::var("UNSPLASH_ACCESS_KEY") {
        figment = figment.merge(("unsplash_access_key", key));
    }
    if let Ok(key) = env::var("TAVILY_API_KEY") {
        figment = figment.merge(("tavily_api_key", key));
    }

    // Merge image host allow-list if available
    if let Ok(hosts) = env::var("IMAGE_HOST_ALLOWLIST") {
        figment = figment.merge((
            "image_host_allowlist",
            hosts.split(',').map(|s| s.trim().to_string()).collect::<Vec<String>>(),
        ));
    }

    figment = figment.select(Profile::from_env_or("APP_PROFILE", "default"));

    info!("Configuration loaded successfully");

    build_rocket(figment).await
}
