use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::Config as RocketConfig;
use std::env;

pub struct Config;

impl Config {
    fn figment() -> Figment {
        // Get the current profile
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());

        Figment::from(RocketConfig::default())
            .merge(Toml::file("Rocket.toml").nested())
            .select(&profile)
            .merge(Env::prefixed("ROCKET_").global())
    }

    pub fn mongodb_uri() -> String {
        Self::figment()
            .extract_inner("mongodb_uri")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
    }

    pub fn database_name() -> String {
        Self::figment()
            .extract_inner("database_name")
            .unwrap_or_else(|_| "mento-services".to_string())
    }

    /// Shared secret used to sign trigger invocations. Unset means unsigned
    /// bodies are accepted.
    pub fn trigger_secret() -> Option<String> {
        Self::figment()
            .extract_inner::<String>("trigger_secret")
            .ok()
            .filter(|secret| !secret.is_empty())
    }

    pub fn change_streams_enabled() -> bool {
        Self::figment()
            .extract_inner("change_streams")
            .unwrap_or(false)
    }

    pub fn is_development() -> bool {
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());
        profile == "development"
    }
}
