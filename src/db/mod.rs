use std::sync::Arc;

use log::{error, info};
use rocket::fairing::AdHoc;

use crate::config::Config;
use crate::store::MongoStore;
use crate::triggers::TriggerService;

/// Connects to MongoDB on ignite and manages both the store and the
/// trigger service built on it. Launch aborts if the database is unreachable.
pub fn init() -> AdHoc {
    AdHoc::try_on_ignite("MongoDB", |rocket| async {
        let uri = Config::mongodb_uri();
        let database_name = Config::database_name();

        match MongoStore::connect(&uri, &database_name).await {
            Ok(store) => {
                info!("✓ MongoDB connected successfully ({})", database_name);
                let triggers = TriggerService::new(Arc::new(store.clone()));
                Ok(rocket.manage(store).manage(triggers))
            }
            Err(e) => {
                error!("✗ Failed to connect to MongoDB: {}", e);
                Err(rocket)
            }
        }
    })
}
