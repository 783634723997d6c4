#[macro_use]
extern crate rocket;

mod config;
mod db;
mod error;
mod guards;
mod models;
mod routes;
mod store;
mod triggers;
mod utils;

use dotenvy::dotenv;
use log::info;
use rocket::{Build, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

use crate::config::Config;
use crate::guards::TriggerSecret;

/* ----------------------------- ERRORS ----------------------------- */

#[catch(400)]
fn bad_request() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Malformed trigger event"
    })
}

#[catch(401)]
fn unauthorized() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Invalid trigger signature"
    })
}

#[catch(404)]
fn not_found() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Resource not found (check /api/v1 prefix)"
    })
}

#[catch(500)]
fn internal_error() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Internal server error"
    })
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/api/v1/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- SERVER ----------------------------- */

/// Routes and catchers without any database attached. The caller manages a
/// `TriggerService`.
pub fn server(secret: TriggerSecret) -> Rocket<Build> {
    rocket::build()
        .manage(secret)
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Health
                routes::health::health,
                // Review triggers
                routes::review::review_created,
                routes::review::review_updated,
                routes::review::review_deleted,
                routes::review::review_written,
                // Job triggers
                routes::job::job_updated,
                routes::job::job_deleted,
            ],
        )
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register("/", catchers![bad_request, unauthorized, not_found, internal_error])
}

/* ----------------------------- LAUNCH ----------------------------- */

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    let secret = Config::trigger_secret();
    if secret.is_none() && !Config::is_development() {
        log::warn!("trigger_secret is not set; trigger endpoints accept unsigned calls");
    }

    info!("🚀 Mento triggers running");
    info!("📚 Swagger UI → http://localhost:8000/api/docs");

    server(TriggerSecret(secret))
        .attach(db::init())
        .attach(triggers::listener::fairing())
}
